//! Table mapping symbolic error ids to the view that renders them.
//!
//! The table is seeded with [`CommonError`] for every page, probed once at
//! startup for application overrides and then frozen behind an `Arc`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};
use trellis_core::result::Message;
use trellis_core::template::TemplateInstance;

use crate::common_error::CommonError;
use crate::engine::ViewEngine;
use crate::registry::{ViewFactory, ViewRegistry};

/// Well-known error pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorPage {
    /// 500.
    InternalServerError,
    /// 400.
    BadRequest,
    /// 403.
    Forbidden,
    /// 404.
    NotFound,
    /// 401.
    Unauthorized,
}

impl ErrorPage {
    /// Every error page.
    pub const ALL: [Self; 5] = [
        Self::InternalServerError,
        Self::BadRequest,
        Self::Forbidden,
        Self::NotFound,
        Self::Unauthorized,
    ];

    /// Symbolic id the framework uses as template name.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::InternalServerError => "views/system/500internalServerError.ftl.html",
            Self::BadRequest => "views/system/400badRequest.ftl.html",
            Self::Forbidden => "views/system/403forbidden.ftl.html",
            Self::NotFound => "views/system/404notFound.ftl.html",
            Self::Unauthorized => "views/system/401unauthorized.ftl.html",
        }
    }

    /// Page for a symbolic id.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|page| page.id() == id)
    }

    /// Name an override is registered under, below `<namespace>.system`.
    #[must_use]
    pub const fn override_name(self) -> &'static str {
        match self {
            Self::InternalServerError => "internal_server_error",
            Self::BadRequest => "bad_request",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
        }
    }

    /// HTTP status.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::InternalServerError => 500,
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Unauthorized => 401,
        }
    }

    /// Page title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::InternalServerError => "Internal Server Error",
            Self::BadRequest => "Bad Request",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::Unauthorized => "Unauthorized",
        }
    }
}

/// Where an error page comes from.
#[derive(Clone)]
pub enum ErrorSource {
    /// The built-in [`CommonError`].
    Builtin,
    /// A factory from the [`ViewRegistry`].
    Registered(ViewFactory),
    /// A minijinja view, by name.
    View(String),
}

impl fmt::Debug for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => f.write_str("Builtin"),
            Self::Registered(_) => f.write_str("Registered"),
            Self::View(name) => f.debug_tuple("View").field(name).finish(),
        }
    }
}

/// Frozen error page table.
#[derive(Debug)]
pub struct ErrorPages {
    sources: BTreeMap<ErrorPage, ErrorSource>,
}

impl ErrorPages {
    /// Source the page resolves to.
    #[must_use]
    pub fn source(&self, page: ErrorPage) -> &ErrorSource {
        self.sources.get(&page).unwrap_or(&ErrorSource::Builtin)
    }

    /// Instantiate the page bound to `message`.
    ///
    /// # Errors
    ///
    /// Returns an error if an overriding view can no longer be bound.
    pub fn instantiate(
        &self,
        page: ErrorPage,
        message: &Message,
        engine: &ViewEngine,
    ) -> trellis_core::Result<Box<dyn TemplateInstance>> {
        match self.source(page) {
            ErrorSource::Builtin => Ok(Box::new(CommonError::new(page.title(), message.clone()))),
            ErrorSource::Registered(factory) => Ok(factory(message)),
            ErrorSource::View(name) => {
                let mut values = serde_json::Map::new();
                values.insert("message".to_string(), serde_json::json!(message));
                values.insert("title".to_string(), serde_json::json!(page.title()));
                Ok(Box::new(engine.bind(name, values)?))
            }
        }
    }
}

/// Startup builder for [`ErrorPages`].
#[derive(Debug)]
pub struct ErrorPagesBuilder {
    sources: BTreeMap<ErrorPage, ErrorSource>,
}

impl ErrorPagesBuilder {
    /// Seed every page with the built-in template.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            sources: ErrorPage::ALL
                .into_iter()
                .map(|page| (page, ErrorSource::Builtin))
                .collect(),
        }
    }

    /// Replace the source of one page.
    #[must_use]
    pub fn with_override(mut self, page: ErrorPage, source: ErrorSource) -> Self {
        self.sources.insert(page, source);
        self
    }

    /// Probe for application overrides of every page.
    ///
    /// A factory registered as `<namespace>.system.<page>` wins over a view
    /// named `<namespace>/system/<page><suffix>`. Pages without either keep
    /// their current source.
    #[must_use]
    #[instrument(skip(self, registry, engine))]
    pub fn discover(mut self, registry: &ViewRegistry, engine: &ViewEngine, namespace: &str) -> Self {
        for page in ErrorPage::ALL {
            let registered = format!("{namespace}.system.{}", page.override_name());
            let view = format!(
                "{namespace}/system/{}{}",
                page.override_name(),
                engine.suffix()
            );

            if let Some(factory) = registry.get(&registered) {
                debug!("Error page {:?} overridden by {}", page, registered);
                self.sources
                    .insert(page, ErrorSource::Registered(Arc::clone(factory)));
            } else if engine.contains(&view) {
                debug!("Error page {:?} overridden by view {}", page, view);
                self.sources.insert(page, ErrorSource::View(view));
            }
        }
        self
    }

    /// Freeze the table.
    #[must_use]
    pub fn build(self) -> Arc<ErrorPages> {
        Arc::new(ErrorPages {
            sources: self.sources,
        })
    }
}

impl Default for ErrorPagesBuilder {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip_and_reject_unknown() {
        for page in ErrorPage::ALL {
            assert_eq!(ErrorPage::from_id(page.id()), Some(page));
        }
        assert_eq!(ErrorPage::from_id("views/system/418teapot.ftl.html"), None);
    }

    #[test]
    fn test_defaults_are_builtin() {
        let pages = ErrorPagesBuilder::with_defaults().build();
        for page in ErrorPage::ALL {
            assert!(matches!(pages.source(page), ErrorSource::Builtin));
        }
    }

    #[test]
    fn test_discover_prefers_registry_over_view() {
        let mut registry = ViewRegistry::new();
        registry.register("views.system.not_found", |m: &Message| {
            CommonError::new("Custom", m.clone())
        });
        let mut engine = ViewEngine::new(".trellis.html");
        engine
            .add_template("views/system/not_found.trellis.html", "nf")
            .unwrap();
        engine
            .add_template("views/system/forbidden.trellis.html", "fb")
            .unwrap();

        let pages = ErrorPagesBuilder::with_defaults()
            .discover(&registry, &engine, "views")
            .build();

        assert!(matches!(
            pages.source(ErrorPage::NotFound),
            ErrorSource::Registered(_)
        ));
        assert!(matches!(
            pages.source(ErrorPage::Forbidden),
            ErrorSource::View(name) if name == "views/system/forbidden.trellis.html"
        ));
        assert!(matches!(
            pages.source(ErrorPage::BadRequest),
            ErrorSource::Builtin
        ));
    }
}
