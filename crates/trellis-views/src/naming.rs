//! Template name resolution for results that name no template.

use std::fmt;

use trellis_core::{RenderResult, Route};

/// Derives a template name from the matched route.
pub trait TemplateNameResolver: fmt::Debug + Send + Sync {
    /// Template name for `result`, or `None` if it cannot be derived.
    fn resolve(&self, route: Option<&Route>, result: &RenderResult, suffix: &str) -> Option<String>;
}

/// Names views `/<namespace>/<Controller>/<method><suffix>`.
///
/// A leading `controllers.` package is dropped and remaining package
/// separators become directories, so `controllers.admin.UserController`
/// with method `list` maps to `/views/admin/UserController/list.trellis.html`.
#[derive(Debug, Clone)]
pub struct ControllerConvention {
    namespace: String,
}

impl ControllerConvention {
    /// Create the convention for views below `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl Default for ControllerConvention {
    fn default() -> Self {
        Self::new("views")
    }
}

impl TemplateNameResolver for ControllerConvention {
    fn resolve(&self, route: Option<&Route>, _result: &RenderResult, suffix: &str) -> Option<String> {
        let route = route?;
        let controller = route
            .controller
            .strip_prefix("controllers.")
            .unwrap_or(&route.controller)
            .replace('.', "/");
        Some(format!(
            "/{}/{}/{}{}",
            self.namespace, controller, route.method, suffix
        ))
    }
}

/// Strip exactly one leading `/`.
#[must_use]
pub fn strip_leading_separator(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_leading_separator() {
        assert_eq!(strip_leading_separator("/views/a.html"), "views/a.html");
        assert_eq!(strip_leading_separator("//views/a.html"), "/views/a.html");
        assert_eq!(strip_leading_separator("views/a.html"), "views/a.html");
    }

    #[test]
    fn test_controller_convention() {
        let convention = ControllerConvention::default();
        let route = Route::new("GET", "/", "controllers.ApplicationController", "index");
        assert_eq!(
            convention
                .resolve(Some(&route), &RenderResult::ok(), ".trellis.html")
                .as_deref(),
            Some("/views/ApplicationController/index.trellis.html")
        );

        let nested = Route::new("GET", "/admin", "controllers.admin.UserController", "list");
        assert_eq!(
            convention
                .resolve(Some(&nested), &RenderResult::ok(), ".trellis.html")
                .as_deref(),
            Some("/views/admin/UserController/list.trellis.html")
        );
    }

    #[test]
    fn test_no_route_no_name() {
        assert!(
            ControllerConvention::default()
                .resolve(None, &RenderResult::ok(), ".trellis.html")
                .is_none()
        );
    }
}
