//! Prompt templates

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use outfitter_contracts::OutfitterError;
use serde::Serialize;
use serde_json::{Value, json};

/// One argument accepted by a prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(skip)]
    pub completions: Vec<String>,
}

impl PromptArgument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: false,
            completions: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn complete(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.completions = values.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of a rendered prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Value,
}

impl PromptMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: json!({"type": "text", "text": text.into()}),
        }
    }
}

/// Renders a prompt from its arguments
#[async_trait]
pub trait PromptRenderer: Send + Sync {
    async fn render(&self, arguments: BTreeMap<String, String>) -> Result<Vec<PromptMessage>, OutfitterError>;
}

#[async_trait]
impl<F, Fut> PromptRenderer for F
where
    F: Fn(BTreeMap<String, String>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<PromptMessage>, OutfitterError>> + Send,
{
    async fn render(&self, arguments: BTreeMap<String, String>) -> Result<Vec<PromptMessage>, OutfitterError> {
        self(arguments).await
    }
}

/// Entry in `prompts/list`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Clone)]
pub struct PromptSpec {
    name: String,
    description: Option<String>,
    arguments: Vec<PromptArgument>,
    renderer: Arc<dyn PromptRenderer>,
}

impl PromptSpec {
    pub fn new(name: impl Into<String>, renderer: impl PromptRenderer + 'static) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
            renderer: Arc::new(renderer),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn argument(mut self, argument: PromptArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_completions(&self) -> bool {
        self.arguments.iter().any(|a| !a.completions.is_empty())
    }

    pub fn completions(&self, argument: &str) -> &[String] {
        self.arguments
            .iter()
            .find(|a| a.name == argument)
            .map(|a| a.completions.as_slice())
            .unwrap_or_default()
    }

    pub fn descriptor(&self) -> PromptDescriptor {
        PromptDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self.arguments.clone(),
        }
    }

    /// Check required arguments, then render.
    pub async fn get(&self, arguments: BTreeMap<String, String>) -> Result<Vec<PromptMessage>, OutfitterError> {
        if let Some(missing) = self
            .arguments
            .iter()
            .find(|a| a.required && !arguments.contains_key(&a.name))
        {
            return Err(OutfitterError::validation_field(
                missing.name.clone(),
                format!("Missing required argument: {}", missing.name),
            ));
        }
        self.renderer.render(arguments).await
    }
}

impl fmt::Debug for PromptSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptSpec")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}
