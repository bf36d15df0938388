//! Flag and command spec strings
//!
//! Actions describe their CLI shape with the familiar commander grammar:
//!
//! - flags: `-s, --long`, `--long <value>`, `--long [value]`,
//!   `--long <values...>`, `--no-long`
//! - commands: `name <required> [optional] <rest...>`
//!
//! Parsing happens once, when the action is declared.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SpecError;

/// Convert a kebab-case flag name into its camelCase input key.
///
/// # Example
///
/// ```
/// use outfitter_contracts::cli_spec::to_camel_case;
///
/// assert_eq!(to_camel_case("dry-run"), "dryRun");
/// assert_eq!(to_camel_case("path"), "path");
/// ```
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' || c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Whether a flag takes a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagValue {
    /// Boolean switch
    None,
    /// `<value>`
    Required,
    /// `[value]`; a bare flag yields `true`
    Optional,
}

/// A parsed flag string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub short: Option<char>,
    /// Long name without the leading `--`
    pub long: String,
    pub value: FlagValue,
    pub value_name: Option<String>,
    pub variadic: bool,
    /// `--no-<name>` form; the key defaults to `true`
    pub negated: bool,
    /// Input object key
    pub key: String,
}

fn invalid_flags(flags: &str, reason: impl Into<String>) -> SpecError {
    SpecError::InvalidFlags {
        flags: flags.to_string(),
        reason: reason.into(),
    }
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Parse `<name>`, `[name]`, `<name...>`; returns (name, required, variadic).
fn parse_placeholder(token: &str) -> Option<(String, bool, bool)> {
    let (required, inner) = if let Some(rest) = token.strip_prefix('<') {
        (true, rest.strip_suffix('>')?)
    } else if let Some(rest) = token.strip_prefix('[') {
        (false, rest.strip_suffix(']')?)
    } else {
        return None;
    };
    let (inner, variadic) = match inner.strip_suffix("...") {
        Some(name) => (name, true),
        None => (inner, false),
    };
    is_name(inner).then(|| (inner.to_string(), required, variadic))
}

impl FlagSpec {
    pub fn parse(flags: &str) -> Result<Self, SpecError> {
        let mut short = None;
        let mut long: Option<String> = None;
        let mut placeholder = None;

        for token in flags
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            if let Some(name) = token.strip_prefix("--") {
                if long.is_some() {
                    return Err(invalid_flags(flags, "more than one long flag"));
                }
                if !is_name(name) {
                    return Err(invalid_flags(flags, format!("invalid long flag '{token}'")));
                }
                long = Some(name.to_string());
            } else if let Some(name) = token.strip_prefix('-') {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphanumeric() && short.is_none() => {
                        short = Some(c)
                    }
                    _ => return Err(invalid_flags(flags, format!("invalid short flag '{token}'"))),
                }
            } else if token.starts_with('<') || token.starts_with('[') {
                if placeholder.is_some() {
                    return Err(invalid_flags(flags, "more than one value placeholder"));
                }
                placeholder = Some(
                    parse_placeholder(token)
                        .ok_or_else(|| invalid_flags(flags, format!("malformed placeholder '{token}'")))?,
                );
            } else {
                return Err(invalid_flags(flags, format!("unexpected token '{token}'")));
            }
        }

        let long = long.ok_or_else(|| invalid_flags(flags, "a long flag (--name) is required"))?;
        let (value, value_name, variadic) = match placeholder {
            None => (FlagValue::None, None, false),
            Some((name, true, variadic)) => (FlagValue::Required, Some(name), variadic),
            Some((name, false, variadic)) => (FlagValue::Optional, Some(name), variadic),
        };

        let negated = long.starts_with("no-");
        if negated && value != FlagValue::None {
            return Err(invalid_flags(flags, "negated flags cannot take a value"));
        }
        let key = match long.strip_prefix("no-") {
            Some(rest) if negated => to_camel_case(rest),
            _ => to_camel_case(&long),
        };

        Ok(Self {
            short,
            long,
            value,
            value_name,
            variadic,
            negated,
            key,
        })
    }

    pub fn takes_value(&self) -> bool {
        self.value != FlagValue::None
    }
}

/// One positional argument of a command spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    pub required: bool,
    pub variadic: bool,
}

impl ArgSpec {
    /// Input object key.
    pub fn key(&self) -> String {
        to_camel_case(&self.name)
    }
}

impl fmt::Display for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dots = if self.variadic { "..." } else { "" };
        if self.required {
            write!(f, "<{}{dots}>", self.name)
        } else {
            write!(f, "[{}{dots}]", self.name)
        }
    }
}

/// A parsed command spec string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Literal subcommand name; `None` for argument-only (base) specs
    pub name: Option<String>,
    pub args: Vec<ArgSpec>,
}

fn invalid_command(spec: &str, reason: impl Into<String>) -> SpecError {
    SpecError::InvalidCommand {
        spec: spec.to_string(),
        reason: reason.into(),
    }
}

impl CommandSpec {
    pub fn parse(spec: &str) -> Result<Self, SpecError> {
        let mut name = None;
        let mut args: Vec<ArgSpec> = Vec::new();

        for (i, token) in spec.split_whitespace().enumerate() {
            if let Some((arg, required, variadic)) = parse_placeholder(token) {
                if args.last().is_some_and(|a| a.variadic) {
                    return Err(invalid_command(spec, "only the last argument may be variadic"));
                }
                if required && args.iter().any(|a| !a.required) {
                    return Err(invalid_command(
                        spec,
                        format!("required argument '{arg}' follows an optional one"),
                    ));
                }
                args.push(ArgSpec {
                    name: arg,
                    required,
                    variadic,
                });
            } else if i == 0 && is_name(token) {
                name = Some(token.to_string());
            } else {
                return Err(invalid_command(spec, format!("unexpected token '{token}'")));
            }
        }

        Ok(Self { name, args })
    }

    /// Argument-only spec that binds to the group command itself.
    pub fn is_base(&self) -> bool {
        self.name.is_none()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.name.iter().cloned().collect();
        parts.extend(self.args.iter().map(ToString::to_string));
        f.write_str(&parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("--force", None, "force", FlagValue::None)]
    #[case("-f, --force", Some('f'), "force", FlagValue::None)]
    #[case("--dry-run", None, "dryRun", FlagValue::None)]
    #[case("-o, --out-dir <dir>", Some('o'), "outDir", FlagValue::Required)]
    #[case("--level [n]", None, "level", FlagValue::Optional)]
    fn parses_flag_strings(
        #[case] flags: &str,
        #[case] short: Option<char>,
        #[case] key: &str,
        #[case] value: FlagValue,
    ) {
        let spec = FlagSpec::parse(flags).unwrap();
        assert_eq!(spec.short, short);
        assert_eq!(spec.key, key);
        assert_eq!(spec.value, value);
        assert!(!spec.negated);
    }

    #[test]
    fn parses_variadic_flag() {
        let spec = FlagSpec::parse("--tag <tags...>").unwrap();
        assert!(spec.variadic);
        assert_eq!(spec.value_name.as_deref(), Some("tags"));
    }

    #[test]
    fn parses_negated_flag() {
        let spec = FlagSpec::parse("--no-color").unwrap();
        assert!(spec.negated);
        assert_eq!(spec.long, "no-color");
        assert_eq!(spec.key, "color");
    }

    #[rstest]
    #[case("")]
    #[case("-f")]
    #[case("--a --b")]
    #[case("--path <dir")]
    #[case("--no-color <x>")]
    #[case("-ab, --all")]
    #[case("--path dir")]
    fn rejects_malformed_flags(#[case] flags: &str) {
        assert!(matches!(
            FlagSpec::parse(flags),
            Err(SpecError::InvalidFlags { .. })
        ));
    }

    #[test]
    fn parses_named_command() {
        let spec = CommandSpec::parse("copy <src> [dest]").unwrap();
        assert_eq!(spec.name.as_deref(), Some("copy"));
        assert_eq!(spec.args.len(), 2);
        assert!(spec.args[0].required);
        assert!(!spec.args[1].required);
        assert!(!spec.is_base());
        assert_eq!(spec.to_string(), "copy <src> [dest]");
    }

    #[test]
    fn args_only_command_is_base() {
        let spec = CommandSpec::parse("[directory]").unwrap();
        assert!(spec.is_base());
        assert_eq!(spec.args[0].name, "directory");

        assert!(CommandSpec::parse("").unwrap().is_base());
    }

    #[test]
    fn variadic_argument() {
        let spec = CommandSpec::parse("rm <paths...>").unwrap();
        assert!(spec.args[0].variadic);
        assert_eq!(spec.to_string(), "rm <paths...>");
    }

    #[rstest]
    #[case("rm <paths...> <extra>")]
    #[case("copy [src] <dest>")]
    #[case("copy extra <src>")]
    #[case("copy <>")]
    fn rejects_malformed_commands(#[case] spec: &str) {
        assert!(matches!(
            CommandSpec::parse(spec),
            Err(SpecError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn camel_case_keys() {
        assert_eq!(to_camel_case("delay-ms"), "delayMs");
        assert_eq!(to_camel_case("out_dir"), "outDir");
        assert_eq!(to_camel_case("a"), "a");
    }
}
