//! Template descriptors as submitted by the operator.
//!
//! A template is pre-approved on the provider side; the caller only chooses
//! which one to send and fills its variables. Text variables may carry a
//! [`Placeholder`] tag that is resolved per contact at send time.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

pub const DEFAULT_TEMPLATE_LANGUAGE: &str = "en_US";

/// Which template to send and how to fill its variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequest {
    #[serde(default)]
    pub template_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_language: Option<String>,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

impl TemplateRequest {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            template_language: None,
            components: Vec::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.template_language = Some(language.into());
        self
    }

    pub fn with_component(mut self, component: ComponentSpec) -> Self {
        self.components.push(component);
        self
    }

    /// Language code sent to the provider; blank values fall back to `en_US`.
    pub fn language(&self) -> &str {
        match self.template_language.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code,
            _ => DEFAULT_TEMPLATE_LANGUAGE,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.template_name.trim().is_empty() {
            return Err(DomainError::validation("templateName is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Header,
    Body,
}

/// One template component and its ordered parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl ComponentSpec {
    pub fn new(kind: ComponentKind, parameters: Vec<ParameterSpec>) -> Self {
        Self { kind, parameters }
    }

    pub fn body(parameters: Vec<ParameterSpec>) -> Self {
        Self::new(ComponentKind::Body, parameters)
    }

    pub fn header(parameters: Vec<ParameterSpec>) -> Self {
        Self::new(ComponentKind::Header, parameters)
    }
}

/// A template parameter.
///
/// Text parameters are the only ones eligible for placeholder substitution.
/// Anything else (image, document, video, currency...) is kept as raw JSON and
/// forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterSpec {
    Text(TextParameter),
    Media(serde_json::Value),
}

impl ParameterSpec {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextParameter::new(text))
    }

    pub fn placeholder(placeholder: Placeholder) -> Self {
        Self::text(placeholder.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextTag {
    #[serde(rename = "text")]
    Text,
}

/// `{"type": "text", "text": "..."}` plus any provider fields such as
/// `parameter_name`, which are forwarded as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextParameter {
    #[serde(rename = "type")]
    pub tag: TextTag,
    pub text: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TextParameter {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            tag: TextTag::Text,
            text: text.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Same parameter with its text replaced.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    pub fn placeholder(&self) -> Option<Placeholder> {
        Placeholder::parse(&self.text)
    }
}

/// Reserved literal text resolved per contact.
///
/// Matching is exact: `" {{name}}"` or `"Hi {{name}}"` are plain literals.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Name,
    Phone,
}

impl Placeholder {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "{{name}}" => Some(Self::Name),
            "{{phone}}" => Some(Self::Phone),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "{{name}}",
            Self::Phone => "{{phone}}",
        }
    }
}
