//! Narrow interfaces onto the surrounding web framework.
//!
//! Trellis never implements routing, sessions, message lookup or transport
//! itself. It reads them through these traits.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::RuntimeMode;
use crate::context::Locale;
use crate::result::RenderResult;

/// Reverse routing from a handler reference to a URL path.
pub trait Router: fmt::Debug + Send + Sync {
    /// Resolve `handler::method` with the given parameters.
    ///
    /// Returns `None` when no route matches.
    fn reverse_route(&self, handler: &str, method: &str, params: &[(String, String)])
    -> Option<String>;
}

/// Message lookup for internationalization.
pub trait MessageResolver: fmt::Debug + Send + Sync {
    /// Look up `key` for `lang`, formatting positional `args` into it.
    fn get(&self, key: &str, lang: &str, args: &[String]) -> Option<String>;
}

/// Request language detection.
pub trait LocaleResolver: fmt::Debug + Send + Sync {
    /// Language requested by the client, if any is acceptable.
    fn request_language(&self, request: &dyn Request) -> Option<String>;

    /// Language used when the request carries none.
    fn default_language(&self) -> String;

    /// Locale for a language tag.
    fn locale_for(&self, tag: &str) -> Locale {
        Locale::parse(tag)
    }
}

/// Human friendly relative time formatting ("3 minutes ago").
pub trait RelativeTime: fmt::Debug + Send + Sync {
    /// Describe `then` relative to `now`.
    fn format(&self, then: SystemTime, now: SystemTime, locale: &Locale) -> String;
}

/// Read access to the request's session cookie.
pub trait SessionStore {
    /// Whether the session holds no data.
    fn is_empty(&self) -> bool;

    /// Snapshot of the session data.
    fn data(&self) -> BTreeMap<String, String>;

    /// Token guarding forms against cross-site request forgery.
    fn authenticity_token(&self) -> Option<String>;
}

/// Read access to the flash scope of the current request.
pub trait FlashStore {
    /// Flash entries visible to the current request.
    fn current(&self) -> BTreeMap<String, String>;
}

/// Route that matched the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// HTTP method.
    pub http_method: String,
    /// Path pattern.
    pub uri: String,
    /// Handler type, e.g. `controllers.ApplicationController`.
    pub controller: String,
    /// Handler method, e.g. `index`.
    pub method: String,
}

impl Route {
    /// Create a new route.
    #[must_use]
    pub fn new(
        http_method: impl Into<String>,
        uri: impl Into<String>,
        controller: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            http_method: http_method.into(),
            uri: uri.into(),
            controller: controller.into(),
            method: method.into(),
        }
    }
}

/// The inbound request as seen by the render pipeline.
pub trait Request {
    /// Base path the application is mounted under.
    fn context_path(&self) -> &str;

    /// Active session, if the request has one.
    fn session(&self) -> Option<&dyn SessionStore>;

    /// Flash scope, if the request has one.
    fn flash(&self) -> Option<&dyn FlashStore>;

    /// Route that matched the request.
    fn route(&self) -> Option<&Route>;

    /// Request header value.
    fn header(&self, name: &str) -> Option<&str>;

    /// Request attributes set by filters or handlers.
    fn attributes(&self) -> BTreeMap<String, serde_json::Value>;

    /// Commit the response headers for `result` and return the body sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the response can no longer be written.
    fn finalize_headers(&mut self, result: &RenderResult) -> std::io::Result<Box<dyn Write + '_>>;
}

/// Shared, read-only collaborators every request context refers to.
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Reverse router.
    pub router: Arc<dyn Router>,
    /// Message lookup.
    pub messages: Arc<dyn MessageResolver>,
    /// Language detection.
    pub locales: Arc<dyn LocaleResolver>,
    /// Relative time formatting.
    pub relative_time: Arc<dyn RelativeTime>,
    /// Runtime mode of the application.
    pub mode: RuntimeMode,
}
