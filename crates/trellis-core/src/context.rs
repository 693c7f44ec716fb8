//! The per-request context exposed to templates as `N`.
//!
//! A [`RequestContext`] is built exactly once per render by the
//! [`ContextFactory`] and shared by reference with every template taking
//! part in that render.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, instrument};

use crate::collaborators::{Collaborators, MessageResolver, RelativeTime, Request, Router};
use crate::config::RuntimeMode;
use crate::error::{EngineError, Result};

/// Handler serving static assets.
pub const ASSETS_CONTROLLER: &str = "ninja.AssetsController";

/// Form field carrying the authenticity token.
pub const AUTHENTICITY_TOKEN: &str = "authenticityToken";

/// Language and optional region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale {
    /// Lowercase language code.
    pub language: String,
    /// Uppercase region code.
    pub region: Option<String>,
}

impl Locale {
    /// Parse a tag such as `en`, `en-US` or `en_US`.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        let mut parts = tag.trim().splitn(2, ['-', '_']);
        let language = parts.next().unwrap_or_default().to_ascii_lowercase();
        let region = parts
            .next()
            .filter(|region| !region.is_empty())
            .map(str::to_ascii_uppercase);
        Self { language, region }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{}", self.language, region),
            None => f.write_str(&self.language),
        }
    }
}

/// Immutable snapshot of framework state for one render.
pub struct RequestContext {
    lang: String,
    locale: Locale,
    session: BTreeMap<String, String>,
    flash: BTreeMap<String, String>,
    context_path: String,
    attributes: BTreeMap<String, serde_json::Value>,
    authenticity_token: Option<String>,
    router: Arc<dyn Router>,
    messages: Arc<dyn MessageResolver>,
    relative_time: Arc<dyn RelativeTime>,
    mode: RuntimeMode,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("lang", &self.lang)
            .field("locale", &self.locale)
            .field("session", &self.session)
            .field("flash", &self.flash)
            .field("context_path", &self.context_path)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    /// Effective language tag.
    #[must_use]
    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Locale derived from [`Self::lang`].
    #[must_use]
    pub const fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Session data; empty when the request had no session.
    #[must_use]
    pub const fn session(&self) -> &BTreeMap<String, String> {
        &self.session
    }

    /// Flash messages, translated where a message key matched.
    #[must_use]
    pub const fn flash(&self) -> &BTreeMap<String, String> {
        &self.flash
    }

    /// Base path of the application.
    #[must_use]
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Request attributes.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.attributes
    }

    /// Single request attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Reverse route to `handler::method`.
    ///
    /// # Errors
    ///
    /// Returns an error if the router knows no such route.
    pub fn reverse_route(
        &self,
        handler: &str,
        method: &str,
        params: &[(String, String)],
    ) -> Result<String> {
        self.router
            .reverse_route(handler, method, params)
            .ok_or_else(|| {
                EngineError::contract(format!("Unable to find route for {handler}.{method}"))
            })
    }

    /// URL of a static asset.
    ///
    /// # Errors
    ///
    /// Returns an error if the assets route is not registered.
    pub fn assets_at(&self, file: &str) -> Result<String> {
        self.reverse_route(
            ASSETS_CONTROLLER,
            "serveStatic",
            &[("fileName".to_string(), file.to_string())],
        )
    }

    /// URL of a webjar asset.
    ///
    /// # Errors
    ///
    /// Returns an error if the webjars route is not registered.
    pub fn web_jars_at(&self, file: &str) -> Result<String> {
        self.reverse_route(
            ASSETS_CONTROLLER,
            "serveWebJars",
            &[("fileName".to_string(), file.to_string())],
        )
    }

    /// Translate `key`, falling back to the key itself.
    #[must_use]
    pub fn i18n(&self, key: &str, args: &[String]) -> String {
        self.message(key, args).unwrap_or_else(|| key.to_string())
    }

    /// Translate `key` if the application defines it.
    #[must_use]
    pub fn message(&self, key: &str, args: &[String]) -> Option<String> {
        self.messages.get(key, &self.lang, args)
    }

    /// Describe `instant` relative to now.
    #[must_use]
    pub fn pretty_time(&self, instant: SystemTime) -> String {
        self.relative_time
            .format(instant, SystemTime::now(), &self.locale)
    }

    /// Session authenticity token.
    #[must_use]
    pub fn authenticity_token(&self) -> Option<&str> {
        self.authenticity_token.as_deref()
    }

    /// Hidden form input carrying the authenticity token.
    #[must_use]
    pub fn authenticity_form(&self) -> String {
        format!(
            "<input type=\"hidden\" value=\"{}\" name=\"{AUTHENTICITY_TOKEN}\" />",
            self.authenticity_token.as_deref().unwrap_or_default()
        )
    }

    /// Whether running in production.
    #[must_use]
    pub const fn is_prod(&self) -> bool {
        self.mode.is_prod()
    }

    /// Whether running under tests.
    #[must_use]
    pub const fn is_test(&self) -> bool {
        self.mode.is_test()
    }

    /// Whether running in development.
    #[must_use]
    pub const fn is_dev(&self) -> bool {
        self.mode.is_dev()
    }
}

/// Builds [`RequestContext`] values from framework collaborators.
#[derive(Debug, Clone)]
pub struct ContextFactory {
    collaborators: Collaborators,
}

impl ContextFactory {
    /// Create a factory over the given collaborators.
    #[must_use]
    pub const fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Collaborators used by this factory.
    #[must_use]
    pub const fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Snapshot the request into a new context.
    ///
    /// Only reads from the request and collaborators.
    #[instrument(skip_all, fields(context_path = request.context_path()))]
    pub fn create(&self, request: &dyn Request) -> RequestContext {
        let locales = &self.collaborators.locales;

        // one fallback rule feeds both the tag and the locale
        let lang = locales
            .request_language(request)
            .unwrap_or_else(|| locales.default_language());
        let locale = locales.locale_for(&lang);

        let (session, authenticity_token) = match request.session() {
            Some(session) if !session.is_empty() => {
                (session.data(), session.authenticity_token())
            }
            Some(session) => (BTreeMap::new(), session.authenticity_token()),
            None => (BTreeMap::new(), None),
        };

        let flash: BTreeMap<String, String> = request
            .flash()
            .map(|flash| {
                flash
                    .current()
                    .into_iter()
                    .map(|(key, value)| {
                        let translated = self
                            .collaborators
                            .messages
                            .get(&value, &lang, &[])
                            .unwrap_or(value);
                        (key, translated)
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            lang = %lang,
            session_entries = session.len(),
            flash_entries = flash.len(),
            "Created request context"
        );

        RequestContext {
            lang,
            locale,
            session,
            flash,
            context_path: request.context_path().to_string(),
            attributes: request.attributes(),
            authenticity_token,
            router: Arc::clone(&self.collaborators.router),
            messages: Arc::clone(&self.collaborators.messages),
            relative_time: Arc::clone(&self.collaborators.relative_time),
            mode: self.collaborators.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standalone::{MemoryFlash, MemoryRequest, MemorySession, standalone_collaborators};

    #[test]
    fn test_locale_parse() {
        assert_eq!(Locale::parse("en").to_string(), "en");
        assert_eq!(Locale::parse("pt_br").to_string(), "pt-BR");
        assert_eq!(Locale::parse("de-AT").region.as_deref(), Some("AT"));
    }

    #[test]
    fn test_language_falls_back_to_default() {
        let factory = ContextFactory::new(standalone_collaborators(&["en", "de"], "de"));
        let request = MemoryRequest::new("/");

        let context = factory.create(&request);
        assert_eq!(context.lang(), "de");
        assert_eq!(context.locale(), &Locale::parse("de"));
    }

    #[test]
    fn test_language_from_request() {
        let factory = ContextFactory::new(standalone_collaborators(&["en", "de"], "en"));
        let request = MemoryRequest::new("/").with_header("Accept-Language", "de-DE,de;q=0.9");

        let context = factory.create(&request);
        assert_eq!(context.lang(), "de");
        assert_eq!(context.locale().language, "de");
    }

    #[test]
    fn test_empty_session_is_empty_map() {
        let factory = ContextFactory::new(standalone_collaborators(&["en"], "en"));
        let request = MemoryRequest::new("/").with_session(MemorySession::default());

        let context = factory.create(&request);
        assert!(context.session().is_empty());
        assert!(context.authenticity_token().is_none());
    }

    #[test]
    fn test_session_snapshot() {
        let factory = ContextFactory::new(standalone_collaborators(&["en"], "en"));
        let session = MemorySession::default()
            .with("username", "joe")
            .with_authenticity_token("t0k3n");
        let request = MemoryRequest::new("/").with_session(session);

        let context = factory.create(&request);
        assert_eq!(context.session().get("username").map(String::as_str), Some("joe"));
        assert_eq!(context.authenticity_token(), Some("t0k3n"));
        assert!(context.authenticity_form().contains("value=\"t0k3n\""));
    }

    #[test]
    fn test_flash_keeps_raw_value_without_translation() {
        let factory = ContextFactory::new(standalone_collaborators(&["en"], "en"));
        let flash = MemoryFlash::default().with("success", "Saved without a key");
        let request = MemoryRequest::new("/").with_flash(flash);

        let context = factory.create(&request);
        assert_eq!(
            context.flash().get("success").map(String::as_str),
            Some("Saved without a key")
        );
    }

    #[test]
    fn test_i18n_falls_back_to_key() {
        let factory = ContextFactory::new(standalone_collaborators(&["en"], "en"));
        let context = factory.create(&MemoryRequest::new("/"));
        assert_eq!(context.i18n("missing.key", &[]), "missing.key");
    }

    #[test]
    fn test_unknown_route_is_reported() {
        let factory = ContextFactory::new(standalone_collaborators(&["en"], "en"));
        let context = factory.create(&MemoryRequest::new("/"));
        let err = context.reverse_route("Nope", "index", &[]).unwrap_err();
        assert!(err.to_string().contains("Nope.index"));
    }
}
