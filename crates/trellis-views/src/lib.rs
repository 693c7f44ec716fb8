//! Trellis Views - minijinja views and render dispatching.
//!
//! This crate plugs minijinja into the Trellis render pipeline. Views are
//! loaded from a directory, see the request context as `N` and are rendered
//! by the [`RenderDispatcher`] together with native templates and the
//! framework's error pages.

#![warn(rust_2024_compatibility, missing_docs, missing_debug_implementations)]

pub mod bridge;
pub mod common_error;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod error_pages;
pub mod naming;
pub mod registry;
pub mod view;

pub use bridge::ContextObject;
pub use common_error::CommonError;
pub use config::{ParsedView, ViewConfig};
pub use dispatcher::{CONTENT_TYPE, FILE_SUFFIX, RenderDispatcher};
pub use engine::ViewEngine;
pub use error::{Result, ViewError};
pub use error_pages::{ErrorPage, ErrorPages, ErrorPagesBuilder, ErrorSource};
pub use naming::{ControllerConvention, TemplateNameResolver};
pub use registry::{ViewFactory, ViewRegistry};
pub use view::JinjaView;

/// Re-export common types for convenience.
pub mod prelude {
    pub use crate::{ErrorPage, RenderDispatcher, ViewEngine, ViewError, ViewRegistry};
}
