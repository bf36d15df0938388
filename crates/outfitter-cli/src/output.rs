//! Output modes and the stdout/stderr writers
//!
//! Mode resolution is a pure function of flags and the environment snapshot;
//! it never writes to the process environment.

use std::fmt;
use std::io;

use outfitter_contracts::config::{ENV_JSON, ENV_JSONL, env_flag};
use outfitter_contracts::EnvSnapshot;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Human,
    Json,
    Jsonl,
}

impl OutputMode {
    /// Parse a `--output` value. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "human" | "text" => Some(OutputMode::Human),
            "json" => Some(OutputMode::Json),
            "jsonl" | "ndjson" => Some(OutputMode::Jsonl),
            _ => None,
        }
    }

    pub fn is_json(self) -> bool {
        matches!(self, OutputMode::Json | OutputMode::Jsonl)
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Human => write!(f, "human"),
            OutputMode::Json => write!(f, "json"),
            OutputMode::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Output-related flags as parsed from the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFlags {
    /// `--output <mode>`
    pub output: Option<String>,
    /// Legacy `--json`
    pub json: bool,
    /// Legacy `--jsonl`
    pub jsonl: bool,
}

impl OutputFlags {
    /// Best-effort scan of raw argv, used when argument parsing itself failed
    /// and the error still has to be reported in the requested mode.
    pub fn scan<S: AsRef<str>>(argv: &[S]) -> Self {
        let mut flags = Self::default();
        let mut iter = argv.iter().map(AsRef::as_ref);
        while let Some(arg) = iter.next() {
            match arg {
                "--" => break,
                "--json" => flags.json = true,
                "--jsonl" => flags.jsonl = true,
                "--output" => flags.output = iter.next().map(str::to_string),
                _ => {
                    if let Some(value) = arg.strip_prefix("--output=") {
                        flags.output = Some(value.to_string());
                    }
                }
            }
        }
        flags
    }
}

/// Resolve the output mode.
///
/// Precedence: `explicit` > `--output` > `--jsonl` > `--json` >
/// `OUTFITTER_JSONL` > `OUTFITTER_JSON` > human. An unrecognized `--output`
/// value resolves to human rather than failing.
pub fn resolve_output_mode(
    explicit: Option<OutputMode>,
    flags: &OutputFlags,
    env: &EnvSnapshot,
) -> OutputMode {
    if let Some(mode) = explicit {
        return mode;
    }
    if let Some(output) = &flags.output {
        return OutputMode::parse(output).unwrap_or_default();
    }
    if flags.jsonl {
        return OutputMode::Jsonl;
    }
    if flags.json {
        return OutputMode::Json;
    }
    if env_flag(env, ENV_JSONL) {
        return OutputMode::Jsonl;
    }
    if env_flag(env, ENV_JSON) {
        return OutputMode::Json;
    }
    OutputMode::Human
}

/// Write `text` followed by a newline and wait for the stream to accept all
/// of it.
pub async fn write_line<W>(writer: &mut W, text: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(text.as_bytes()).await?;
    if !text.ends_with('\n') {
        writer.write_all(b"\n").await?;
    }
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use outfitter_test_utils::env_from;
    use rstest::rstest;

    fn flags(output: Option<&str>, json: bool, jsonl: bool) -> OutputFlags {
        OutputFlags {
            output: output.map(str::to_string),
            json,
            jsonl,
        }
    }

    #[test]
    fn nothing_set_is_human() {
        assert_eq!(
            resolve_output_mode(None, &OutputFlags::default(), &env_from(&[])),
            OutputMode::Human
        );
    }

    #[test]
    fn jsonl_env_beats_json_env() {
        let env = env_from(&[("OUTFITTER_JSON", "1"), ("OUTFITTER_JSONL", "1")]);
        assert_eq!(
            resolve_output_mode(None, &OutputFlags::default(), &env),
            OutputMode::Jsonl
        );
    }

    #[test]
    fn explicit_output_human_beats_legacy_json() {
        assert_eq!(
            resolve_output_mode(None, &flags(Some("human"), true, false), &env_from(&[])),
            OutputMode::Human
        );
    }

    #[rstest]
    #[case(Some("json"), false, false, OutputMode::Json)]
    #[case(Some("jsonl"), true, false, OutputMode::Jsonl)]
    #[case(Some("yaml"), true, true, OutputMode::Human)]
    #[case(None, true, false, OutputMode::Json)]
    #[case(None, true, true, OutputMode::Jsonl)]
    fn flag_cases(
        #[case] output: Option<&str>,
        #[case] json: bool,
        #[case] jsonl: bool,
        #[case] expected: OutputMode,
    ) {
        assert_eq!(
            resolve_output_mode(None, &flags(output, json, jsonl), &env_from(&[])),
            expected
        );
    }

    #[test]
    fn flags_beat_env() {
        let env = env_from(&[("OUTFITTER_JSONL", "true")]);
        assert_eq!(
            resolve_output_mode(None, &flags(None, true, false), &env),
            OutputMode::Json
        );
    }

    #[test]
    fn explicit_parameter_wins() {
        let env = env_from(&[("OUTFITTER_JSONL", "1")]);
        assert_eq!(
            resolve_output_mode(Some(OutputMode::Human), &flags(Some("json"), true, true), &env),
            OutputMode::Human
        );
    }

    #[test]
    fn falsy_env_is_ignored() {
        let env = env_from(&[("OUTFITTER_JSON", "0")]);
        assert_eq!(
            resolve_output_mode(None, &OutputFlags::default(), &env),
            OutputMode::Human
        );
    }

    #[test]
    fn scan_raw_argv() {
        assert_eq!(
            OutputFlags::scan(&["add", "--output=json", "--a"]),
            flags(Some("json"), false, false)
        );
        assert_eq!(
            OutputFlags::scan(&["add", "--jsonl", "--", "--json"]),
            flags(None, false, true)
        );
        assert_eq!(
            OutputFlags::scan(&["--output", "jsonl"]),
            flags(Some("jsonl"), false, false)
        );
    }

    #[tokio::test]
    async fn write_line_appends_newline() {
        let mut buf: Vec<u8> = Vec::new();
        write_line(&mut buf, "sum: 5").await.unwrap();
        write_line(&mut buf, "done\n").await.unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "sum: 5\ndone\n");
    }
}
