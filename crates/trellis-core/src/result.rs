//! The framework's result of a handler and what it asks to render.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::template::TemplateInstance;

/// `text/html`.
pub const TEXT_HTML: &str = "text/html";

/// `application/octet-stream`.
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// Message payload carried to error pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message text.
    pub text: String,
}

impl Message {
    /// Create a new message.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// What a result asks the template engine to render.
pub enum Renderable {
    /// A bound template ready to execute.
    Model(Box<dyn TemplateInstance>),
    /// Values to bind onto a template resolved by name.
    Mapping(serde_json::Map<String, serde_json::Value>),
    /// Payload for a symbolic error page.
    Message(Message),
    /// Any other value a handler handed to the framework.
    Opaque {
        /// Runtime type name of the value.
        type_name: &'static str,
        /// The value.
        value: Box<dyn Any>,
    },
}

impl Renderable {
    /// Wrap an arbitrary value, remembering its type name.
    #[must_use]
    pub fn opaque<T: Any>(value: T) -> Self {
        Self::Opaque {
            type_name: std::any::type_name::<T>(),
            value: Box::new(value),
        }
    }

    /// Name of the runtime type this renderable carries.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Model(_) => "Model",
            Self::Mapping(_) => "Mapping",
            Self::Message(_) => "Message",
            Self::Opaque { type_name, .. } => type_name,
        }
    }
}

impl fmt::Debug for Renderable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(model) => f.debug_tuple("Model").field(model).finish(),
            Self::Mapping(map) => f.debug_tuple("Mapping").field(map).finish(),
            Self::Message(message) => f.debug_tuple("Message").field(message).finish(),
            Self::Opaque { type_name, .. } => f
                .debug_struct("Opaque")
                .field("type_name", type_name)
                .finish_non_exhaustive(),
        }
    }
}

/// Result of a request handler.
#[derive(Debug)]
pub struct RenderResult {
    status: u16,
    content_type: Option<String>,
    charset: String,
    template: Option<String>,
    headers: BTreeMap<String, String>,
    renderable: Option<Renderable>,
}

impl RenderResult {
    /// Create a result with the given status.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            charset: "utf-8".to_string(),
            template: None,
            headers: BTreeMap::new(),
            renderable: None,
        }
    }

    /// `200 OK`.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Set the content type to `text/html`.
    #[must_use]
    pub fn html(mut self) -> Self {
        self.content_type = Some(TEXT_HTML.to_string());
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the template name explicitly.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Set what should be rendered.
    #[must_use]
    pub fn render(mut self, renderable: Renderable) -> Self {
        self.renderable = Some(renderable);
        self
    }

    /// Render a bound template.
    #[must_use]
    pub fn render_model(self, model: impl TemplateInstance + 'static) -> Self {
        self.render(Renderable::Model(Box::new(model)))
    }

    /// Render a value mapping onto a template resolved by name.
    #[must_use]
    pub fn render_map(self, values: serde_json::Map<String, serde_json::Value>) -> Self {
        self.render(Renderable::Mapping(values))
    }

    /// Render an error page message.
    #[must_use]
    pub fn render_message(self, message: Message) -> Self {
        self.render(Renderable::Message(message))
    }

    /// HTTP status.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Set the content type in place.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    /// Charset.
    #[must_use]
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Template name, if set or already resolved.
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Record the template name in place.
    pub fn set_template(&mut self, template: impl Into<String>) {
        self.template = Some(template.into());
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Set a response header.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// What should be rendered.
    #[must_use]
    pub const fn renderable(&self) -> Option<&Renderable> {
        self.renderable.as_ref()
    }

    /// Take the renderable out for rendering.
    pub fn take_renderable(&mut self) -> Option<Renderable> {
        self.renderable.take()
    }

    /// `Content-Type` header value including the charset.
    #[must_use]
    pub fn content_type_header(&self) -> Option<String> {
        self.content_type
            .as_ref()
            .map(|content_type| format!("{content_type}; charset={}", self.charset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_type_name() {
        let renderable = Renderable::opaque(42_u32);
        assert_eq!(renderable.type_name(), "u32");
        assert_eq!(
            Renderable::Message(Message::new("hi")).type_name(),
            "Message"
        );
    }

    #[test]
    fn test_content_type_header() {
        let result = RenderResult::ok().html();
        assert_eq!(
            result.content_type_header().as_deref(),
            Some("text/html; charset=utf-8")
        );
        assert!(RenderResult::ok().content_type_header().is_none());
    }

    #[test]
    fn test_take_renderable() {
        let mut result = RenderResult::ok().render_message(Message::new("oops"));
        assert!(result.take_renderable().is_some());
        assert!(result.renderable().is_none());
    }
}
