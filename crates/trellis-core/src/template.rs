//! Template instances and request context propagation.
//!
//! The dispatcher [`attach`](TemplateInstance::attach)es a context to the root
//! template of a render. Every template included while rendering
//! [`inherit`](TemplateInstance::inherit)s the very same `Arc` from its
//! parent, so all fragments of a composed page observe one context.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::{EngineError, Result};

/// Content category a template declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// HTML, values are escaped.
    #[default]
    Html,
    /// Raw bytes, values are written verbatim.
    Raw,
}

/// Static facts about a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDescriptor {
    /// Directory or package the template lives in.
    pub path: String,
    /// Template name.
    pub name: String,
    /// Declared content category.
    pub content_type: ContentType,
    /// Output charset.
    pub charset: String,
}

impl TemplateDescriptor {
    /// Descriptor for a UTF-8 HTML template.
    #[must_use]
    pub fn html(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            content_type: ContentType::Html,
            charset: "UTF-8".to_string(),
        }
    }

    /// Descriptor for a raw template.
    #[must_use]
    pub fn raw(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Raw,
            ..Self::html(path, name)
        }
    }
}

/// Rendered bytes plus the content category they were produced with.
#[derive(Debug, Clone, Default)]
pub struct Output {
    content_type: ContentType,
    charset: String,
    buf: Vec<u8>,
}

impl Output {
    /// Create an empty output.
    #[must_use]
    pub fn new(content_type: ContentType, charset: impl Into<String>) -> Self {
        Self {
            content_type,
            charset: charset.into(),
            buf: Vec::new(),
        }
    }

    /// Append text without escaping.
    pub fn write_raw(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
    }

    /// Append bytes without escaping.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a value, HTML-escaped for HTML output.
    pub fn write_value(&mut self, value: impl fmt::Display) {
        let text = value.to_string();
        match self.content_type {
            ContentType::Html => self.write_raw(&escape_html(&text)),
            ContentType::Raw => self.write_raw(&text),
        }
    }

    /// Content category.
    #[must_use]
    pub const fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Charset.
    #[must_use]
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Rendered bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Number of rendered bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing was rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume into the rendered bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.buf))
    }
}

/// Escape the characters HTML treats specially.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Holder for the request context a template renders against.
#[derive(Debug, Clone, Default)]
pub struct ContextSlot(Option<Arc<RequestContext>>);

impl ContextSlot {
    /// An empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self(None)
    }

    /// The attached context, if any.
    #[must_use]
    pub const fn get(&self) -> Option<&Arc<RequestContext>> {
        self.0.as_ref()
    }

    /// Whether a context was attached.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.0.is_some()
    }

    fn fill(&mut self, context: Arc<RequestContext>, template: &str) -> Result<()> {
        if self.0.is_some() {
            return Err(EngineError::contract(format!(
                "Template '{template}' already has a request context attached"
            )));
        }
        self.0 = Some(context);
        Ok(())
    }
}

/// A unit of executable template logic.
pub trait TemplateInstance: fmt::Debug {
    /// Static facts about this template.
    fn descriptor(&self) -> TemplateDescriptor;

    /// Context slot of this instance.
    fn slot(&self) -> &ContextSlot;

    /// Mutable context slot of this instance.
    fn slot_mut(&mut self) -> &mut ContextSlot;

    /// Write this template's output. Called only once a context is present.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render_body(&self, out: &mut Output) -> Result<()>;

    /// Attach the render's context to this root instance.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if a context is already attached.
    fn attach(&mut self, context: Arc<RequestContext>) -> Result<()> {
        let name = self.descriptor().name;
        self.slot_mut().fill(context, &name)
    }

    /// Share the parent's context with this included instance.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if the parent has no context.
    fn inherit(&mut self, parent: &dyn TemplateInstance) -> Result<()> {
        let Some(context) = parent.slot().get() else {
            return Err(EngineError::contract(format!(
                "Template '{}' included '{}' without a request context attached",
                parent.descriptor().name,
                self.descriptor().name
            )));
        };
        let context = Arc::clone(context);
        let name = self.descriptor().name;
        self.slot_mut().fill(context, &name)
    }

    /// The attached context.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if none was attached or inherited.
    fn context(&self) -> Result<&Arc<RequestContext>> {
        self.slot().get().ok_or_else(|| {
            EngineError::contract(format!(
                "Template '{}' rendered without a request context",
                self.descriptor().name
            ))
        })
    }

    /// Render into an existing output.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is present or rendering fails.
    fn render_into(&self, out: &mut Output) -> Result<()> {
        self.context()?;
        self.render_body(out)
    }

    /// Render into a fresh output.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is present or rendering fails.
    fn render(&self) -> Result<Output> {
        let descriptor = self.descriptor();
        let mut out = Output::new(descriptor.content_type, descriptor.charset);
        self.render_into(&mut out)?;
        Ok(out)
    }

    /// Render `child` as part of this template.
    ///
    /// # Errors
    ///
    /// Returns an error if this template has no context or the child fails.
    fn include(&self, child: &mut dyn TemplateInstance, out: &mut Output) -> Result<()>
    where
        Self: Sized,
    {
        child.inherit(self)?;
        child.render_into(out)
    }
}
