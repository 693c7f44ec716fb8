//! In-memory collaborators.
//!
//! These back the CLI and the test suites. A real deployment plugs the
//! framework's own router, message bundles and request types in instead.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::form_urlencoded;

use crate::collaborators::{
    Collaborators, FlashStore, LocaleResolver, MessageResolver, RelativeTime, Request, Route,
    Router, SessionStore,
};
use crate::config::{ConfigError, RuntimeMode};
use crate::context::Locale;
use crate::result::RenderResult;

/// Router backed by a fixed table of path patterns.
///
/// Patterns use `{name}` or `{name: regex}` placeholders. Parameters without
/// a placeholder are appended as a query string.
#[derive(Debug, Clone, Default)]
pub struct StaticRouter {
    context_path: String,
    routes: BTreeMap<(String, String), String>,
}

impl StaticRouter {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every generated path with `context_path`.
    #[must_use]
    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    /// Register a route.
    #[must_use]
    pub fn route(
        mut self,
        handler: impl Into<String>,
        method: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        self.routes
            .insert((handler.into(), method.into()), pattern.into());
        self
    }
}

impl Router for StaticRouter {
    fn reverse_route(
        &self,
        handler: &str,
        method: &str,
        params: &[(String, String)],
    ) -> Option<String> {
        let pattern = self
            .routes
            .get(&(handler.to_string(), method.to_string()))?;

        let mut path = String::with_capacity(pattern.len());
        let mut used = Vec::new();
        let mut rest = pattern.as_str();
        while let Some(start) = rest.find('{') {
            path.push_str(&rest[..start]);
            let end = rest[start..].find('}')? + start;
            let name = rest[start + 1..end]
                .split(':')
                .next()
                .unwrap_or_default()
                .trim();
            let (_, value) = params.iter().find(|(key, _)| key == name)?;
            path.push_str(value);
            used.push(name.to_string());
            rest = &rest[end + 1..];
        }
        path.push_str(rest);

        let mut query = form_urlencoded::Serializer::new(String::new());
        let mut has_query = false;
        for (key, value) in params.iter().filter(|(key, _)| !used.contains(key)) {
            query.append_pair(key, value);
            has_query = true;
        }
        if has_query {
            path.push('?');
            path.push_str(&query.finish());
        }

        Some(format!("{}{}", self.context_path, path))
    }
}

/// Message bundle keyed by language, then by message key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBundle {
    languages: BTreeMap<String, BTreeMap<String, String>>,
}

impl MessageBundle {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one message.
    #[must_use]
    pub fn with(
        mut self,
        lang: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.languages
            .entry(lang.into())
            .or_default()
            .insert(key.into(), message.into());
        self
    }

    /// Parse a bundle from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is not a map of maps.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Load a bundle from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let bundle = Self::from_yaml_str(&content)?;
        debug!("Loaded message bundle from {}", path.display());
        Ok(bundle)
    }
}

impl MessageResolver for MessageBundle {
    fn get(&self, key: &str, lang: &str, args: &[String]) -> Option<String> {
        let language = Locale::parse(lang).language;
        let message = self
            .languages
            .get(lang)
            .and_then(|messages| messages.get(key))
            .or_else(|| {
                self.languages
                    .get(&language)
                    .and_then(|messages| messages.get(key))
            })?;

        Some(
            args.iter()
                .enumerate()
                .fold(message.clone(), |message, (i, arg)| {
                    message.replace(&format!("{{{i}}}"), arg)
                }),
        )
    }
}

/// Locale resolution against a list of supported languages.
#[derive(Debug, Clone)]
pub struct ConfiguredLocales {
    supported: Vec<String>,
    default_language: String,
}

impl ConfiguredLocales {
    /// Create a resolver.
    #[must_use]
    pub fn new(supported: Vec<String>, default_language: impl Into<String>) -> Self {
        Self {
            supported,
            default_language: default_language.into(),
        }
    }

    fn match_supported(&self, requested: &str) -> Option<&String> {
        let requested_language = Locale::parse(requested).language;
        self.supported
            .iter()
            .find(|lang| lang.eq_ignore_ascii_case(requested))
            .or_else(|| {
                self.supported
                    .iter()
                    .find(|lang| Locale::parse(lang).language == requested_language)
            })
    }
}

impl LocaleResolver for ConfiguredLocales {
    fn request_language(&self, request: &dyn Request) -> Option<String> {
        request
            .header("Accept-Language")?
            .split(',')
            .filter_map(|entry| entry.split(';').next())
            .map(str::trim)
            .filter(|tag| !tag.is_empty() && *tag != "*")
            .find_map(|tag| self.match_supported(tag))
            .cloned()
    }

    fn default_language(&self) -> String {
        self.default_language.clone()
    }
}

/// English relative time phrases.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishRelativeTime;

impl RelativeTime for EnglishRelativeTime {
    fn format(&self, then: SystemTime, now: SystemTime, _locale: &Locale) -> String {
        let (elapsed, past) = match now.duration_since(then) {
            Ok(elapsed) => (elapsed, true),
            Err(err) => (err.duration(), false),
        };

        let secs = elapsed.as_secs();
        if secs < 60 {
            return if past {
                "moments ago".to_string()
            } else {
                "moments from now".to_string()
            };
        }

        let (amount, unit) = match secs {
            s if s < 3_600 => (s / 60, "minute"),
            s if s < 86_400 => (s / 3_600, "hour"),
            s if s < 604_800 => (s / 86_400, "day"),
            s if s < 2_592_000 => (s / 604_800, "week"),
            s if s < 31_536_000 => (s / 2_592_000, "month"),
            s => (s / 31_536_000, "year"),
        };
        let plural = if amount == 1 { "" } else { "s" };

        if past {
            format!("{amount} {unit}{plural} ago")
        } else {
            format!("{amount} {unit}{plural} from now")
        }
    }
}

/// Session held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    data: BTreeMap<String, String>,
    authenticity_token: Option<String>,
}

impl MemorySession {
    /// Add a session entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Set the authenticity token.
    #[must_use]
    pub fn with_authenticity_token(mut self, token: impl Into<String>) -> Self {
        self.authenticity_token = Some(token.into());
        self
    }
}

impl SessionStore for MemorySession {
    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn data(&self) -> BTreeMap<String, String> {
        self.data.clone()
    }

    fn authenticity_token(&self) -> Option<String> {
        self.authenticity_token.clone()
    }
}

/// Flash scope held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFlash {
    data: BTreeMap<String, String>,
}

impl MemoryFlash {
    /// Add a flash entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

impl FlashStore for MemoryFlash {
    fn current(&self) -> BTreeMap<String, String> {
        self.data.clone()
    }
}

/// Response captured by a [`MemoryRequest`].
#[derive(Debug, Clone, Default)]
pub struct CapturedResponse {
    /// Status sent, once headers were finalized.
    pub status: Option<u16>,
    /// Headers sent.
    pub headers: BTreeMap<String, String>,
    /// Body bytes written.
    pub body: Vec<u8>,
    /// Number of write calls made on the body sink.
    pub writes: usize,
}

impl CapturedResponse {
    /// Header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body as text.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Request held in memory, capturing whatever response is written.
#[derive(Debug, Default)]
pub struct MemoryRequest {
    path: String,
    context_path: String,
    headers: BTreeMap<String, String>,
    session: Option<MemorySession>,
    flash: Option<MemoryFlash>,
    route: Option<Route>,
    attributes: BTreeMap<String, serde_json::Value>,
    fail_writes: bool,
    response: CapturedResponse,
}

impl MemoryRequest {
    /// Create a request for `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the context path.
    #[must_use]
    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    /// Add a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the session.
    #[must_use]
    pub fn with_session(mut self, session: MemorySession) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the flash scope.
    #[must_use]
    pub fn with_flash(mut self, flash: MemoryFlash) -> Self {
        self.flash = Some(flash);
        self
    }

    /// Set the matched route.
    #[must_use]
    pub fn with_route(mut self, route: Route) -> Self {
        self.route = Some(route);
        self
    }

    /// Set a request attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Make every write to the response fail.
    #[must_use]
    pub const fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Response written so far.
    #[must_use]
    pub const fn response(&self) -> &CapturedResponse {
        &self.response
    }
}

impl Request for MemoryRequest {
    fn context_path(&self) -> &str {
        &self.context_path
    }

    fn session(&self) -> Option<&dyn SessionStore> {
        self.session.as_ref().map(|s| s as &dyn SessionStore)
    }

    fn flash(&self) -> Option<&dyn FlashStore> {
        self.flash.as_ref().map(|f| f as &dyn FlashStore)
    }

    fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn attributes(&self) -> BTreeMap<String, serde_json::Value> {
        self.attributes.clone()
    }

    fn finalize_headers(&mut self, result: &RenderResult) -> io::Result<Box<dyn Write + '_>> {
        self.response.status = Some(result.status());
        self.response.headers.extend(
            result
                .headers()
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        if let Some(content_type) = result.content_type_header() {
            self.response
                .headers
                .insert("Content-Type".to_string(), content_type);
        }

        Ok(Box::new(BodySink {
            response: &mut self.response,
            fail: self.fail_writes,
        }))
    }
}

struct BodySink<'a> {
    response: &'a mut CapturedResponse,
    fail: bool,
}

impl Write for BodySink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"));
        }
        self.response.writes += 1;
        self.response.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Collaborators built from the in-memory implementations.
#[must_use]
pub fn standalone_collaborators(languages: &[&str], default_language: &str) -> Collaborators {
    Collaborators {
        router: Arc::new(StaticRouter::new()),
        messages: Arc::new(MessageBundle::new()),
        locales: Arc::new(ConfiguredLocales::new(
            languages.iter().map(ToString::to_string).collect(),
            default_language,
        )),
        relative_time: Arc::new(EnglishRelativeTime),
        mode: RuntimeMode::Test,
    }
}

/// Shift `now` back by `secs`, for relative time formatting.
#[must_use]
pub fn seconds_ago(now: SystemTime, secs: u64) -> SystemTime {
    now.checked_sub(Duration::from_secs(secs)).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_router_placeholders_and_query() {
        let router = StaticRouter::new()
            .with_context_path("/ctx")
            .route("ninja.AssetsController", "serveStatic", "/assets/{fileName: .*}")
            .route("UserController", "show", "/users/{id}");

        assert_eq!(
            router
                .reverse_route(
                    "ninja.AssetsController",
                    "serveStatic",
                    &[("fileName".to_string(), "css/site.css".to_string())]
                )
                .as_deref(),
            Some("/ctx/assets/css/site.css")
        );
        assert_eq!(
            router
                .reverse_route(
                    "UserController",
                    "show",
                    &[
                        ("id".to_string(), "7".to_string()),
                        ("tab".to_string(), "posts".to_string())
                    ]
                )
                .as_deref(),
            Some("/ctx/users/7?tab=posts")
        );
        assert!(router.reverse_route("UserController", "show", &[]).is_none());
    }

    #[test]
    fn test_static_router_encodes_query_values() {
        let router = StaticRouter::new().route("SearchController", "find", "/search");

        assert_eq!(
            router
                .reverse_route(
                    "SearchController",
                    "find",
                    &[
                        ("q".to_string(), "fish & chips".to_string()),
                        ("next".to_string(), "/a?b=c".to_string())
                    ]
                )
                .as_deref(),
            Some("/search?q=fish+%26+chips&next=%2Fa%3Fb%3Dc")
        );
    }

    #[test]
    fn test_message_bundle_formats_and_falls_back_to_language() {
        let bundle = MessageBundle::from_yaml_str(
            "en:\n  greeting: \"Hello {0}!\"\n  saved: Saved\n",
        )
        .unwrap();
        assert_eq!(
            bundle.get("greeting", "en-US", &["Joe".to_string()]).as_deref(),
            Some("Hello Joe!")
        );
        assert_eq!(bundle.get("saved", "en", &[]).as_deref(), Some("Saved"));
        assert!(bundle.get("saved", "de", &[]).is_none());
    }

    #[test]
    fn test_configured_locales_match_accept_language() {
        let locales = ConfiguredLocales::new(vec!["en".to_string(), "de".to_string()], "en");
        let request = MemoryRequest::new("/").with_header("accept-language", "fr;q=1, de-AT;q=0.8");
        assert_eq!(locales.request_language(&request).as_deref(), Some("de"));

        let request = MemoryRequest::new("/").with_header("Accept-Language", "fr");
        assert!(locales.request_language(&request).is_none());
    }

    #[test]
    fn test_english_relative_time() {
        let now = SystemTime::now();
        let locale = Locale::parse("en");
        let formatter = EnglishRelativeTime;
        assert_eq!(formatter.format(now, now, &locale), "moments ago");
        assert_eq!(
            formatter.format(seconds_ago(now, 180), now, &locale),
            "3 minutes ago"
        );
        assert_eq!(
            formatter.format(seconds_ago(now, 3_600), now, &locale),
            "1 hour ago"
        );
        assert_eq!(
            formatter.format(now + Duration::from_secs(2 * 86_400), now, &locale),
            "2 days from now"
        );
    }

    #[test]
    fn test_memory_request_captures_response() {
        let mut request = MemoryRequest::new("/");
        let mut result = RenderResult::ok().html();
        result.set_header("Content-Length", "2");
        {
            let mut sink = request.finalize_headers(&result).unwrap();
            sink.write_all(b"hi").unwrap();
        }
        let response = request.response();
        assert_eq!(response.status, Some(200));
        assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(response.body_text(), "hi");
    }
}
