//! Static resources and URI-templated resources

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use outfitter_contracts::OutfitterError;
use serde::Serialize;

use crate::error::{Error, Result};

/// A `resources/read` request routed to a reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub uri: String,
    /// Values bound by the matching template; empty for static resources
    pub variables: BTreeMap<String, String>,
}

/// Content returned by a reader
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub text: String,
}

/// Produces the contents of a resource
#[async_trait]
pub trait ResourceReader: Send + Sync {
    async fn read(&self, request: ResourceRequest) -> std::result::Result<ResourceContents, OutfitterError>;
}

#[async_trait]
impl<F, Fut> ResourceReader for F
where
    F: Fn(ResourceRequest) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<ResourceContents, OutfitterError>> + Send,
{
    async fn read(&self, request: ResourceRequest) -> std::result::Result<ResourceContents, OutfitterError> {
        self(request).await
    }
}

/// Entry in `resources/list`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Entry in `resources/templates/list`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplateDescriptor {
    pub uri_template: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A resource at a fixed URI
#[derive(Clone)]
pub struct ResourceSpec {
    uri: String,
    name: String,
    description: Option<String>,
    mime_type: Option<String>,
    reader: Arc<dyn ResourceReader>,
}

impl ResourceSpec {
    pub fn new(uri: impl Into<String>, name: impl Into<String>, reader: impl ResourceReader + 'static) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
            reader: Arc::new(reader),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            uri: self.uri.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }

    pub async fn read(&self) -> std::result::Result<ResourceContents, OutfitterError> {
        self.reader
            .read(ResourceRequest {
                uri: self.uri.clone(),
                variables: BTreeMap::new(),
            })
            .await
    }
}

impl fmt::Debug for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSpec")
            .field("uri", &self.uri)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(String),
}

/// Level-1 URI template (`scheme://path/{var}`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = template;
        while !rest.is_empty() {
            match rest.find(['{', '}']) {
                None => {
                    segments.push(Segment::Literal(rest.to_string()));
                    break;
                }
                Some(pos) if rest[pos..].starts_with('}') => return Err(invalid("unmatched '}'")),
                Some(pos) => {
                    if pos > 0 {
                        segments.push(Segment::Literal(rest[..pos].to_string()));
                    }
                    let after = &rest[pos + 1..];
                    let end = after.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
                    let name = &after[..end];
                    if name.is_empty() || name.contains('{') {
                        return Err(invalid("variable names must be non-empty"));
                    }
                    if matches!(segments.last(), Some(Segment::Var(_))) {
                        return Err(invalid("adjacent variables are ambiguous"));
                    }
                    segments.push(Segment::Var(name.to_string()));
                    rest = &after[end + 1..];
                }
            }
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Var(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Bind variables from `uri`, or `None` when it does not match.
    ///
    /// A variable extends to the next literal. A trailing variable takes the
    /// rest of the URI but never spans a `/`.
    pub fn matches(&self, uri: &str) -> Option<BTreeMap<String, String>> {
        let mut vars = BTreeMap::new();
        let mut rest = uri;
        let mut segments = self.segments.iter().peekable();
        while let Some(segment) = segments.next() {
            match segment {
                Segment::Literal(lit) => rest = rest.strip_prefix(lit.as_str())?,
                Segment::Var(name) => {
                    let value = match segments.peek() {
                        Some(Segment::Literal(next)) => {
                            let end = rest.find(next.as_str())?;
                            &rest[..end]
                        }
                        _ => {
                            if rest.contains('/') {
                                return None;
                            }
                            rest
                        }
                    };
                    if value.is_empty() {
                        return None;
                    }
                    vars.insert(name.clone(), value.to_string());
                    rest = &rest[value.len()..];
                }
            }
        }
        rest.is_empty().then_some(vars)
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A family of resources addressed by a URI template
#[derive(Clone)]
pub struct ResourceTemplateSpec {
    template: UriTemplate,
    name: String,
    description: Option<String>,
    mime_type: Option<String>,
    completions: BTreeMap<String, Vec<String>>,
    reader: Arc<dyn ResourceReader>,
}

impl ResourceTemplateSpec {
    pub fn new(
        template: &str,
        name: impl Into<String>,
        reader: impl ResourceReader + 'static,
    ) -> Result<Self> {
        Ok(Self {
            template: UriTemplate::parse(template)?,
            name: name.into(),
            description: None,
            mime_type: None,
            completions: BTreeMap::new(),
            reader: Arc::new(reader),
        })
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Offer `values` for `completion/complete` on `variable`.
    pub fn complete(mut self, variable: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.completions
            .insert(variable.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn template(&self) -> &UriTemplate {
        &self.template
    }

    pub fn has_completions(&self) -> bool {
        self.completions.values().any(|v| !v.is_empty())
    }

    pub fn completions(&self, variable: &str) -> &[String] {
        self.completions.get(variable).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn descriptor(&self) -> ResourceTemplateDescriptor {
        ResourceTemplateDescriptor {
            uri_template: self.template.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }

    /// Read `uri` if this template matches it.
    pub async fn read(&self, uri: &str) -> Option<std::result::Result<ResourceContents, OutfitterError>> {
        let variables = self.template.matches(uri)?;
        Some(
            self.reader
                .read(ResourceRequest {
                    uri: uri.to_string(),
                    variables,
                })
                .await,
        )
    }
}

impl fmt::Debug for ResourceTemplateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTemplateSpec")
            .field("template", &self.template.as_str())
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
