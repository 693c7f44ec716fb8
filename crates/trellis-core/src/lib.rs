//! Trellis Core - request context, propagation and rendering errors.
//!
//! This crate holds the engine-agnostic half of Trellis: the per-request
//! context templates see as `N`, the protocol that shares one context across
//! every fragment of a render, and the normalized failure type the framework
//! receives when rendering goes wrong.

#![warn(rust_2024_compatibility, missing_docs, missing_debug_implementations)]

pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod result;
pub mod standalone;
pub mod template;

pub use collaborators::{
    Collaborators, FlashStore, LocaleResolver, MessageResolver, RelativeTime, Request, Route,
    Router, SessionStore,
};
pub use config::{AdapterConfig, ConfigError, RuntimeMode};
pub use context::{ContextFactory, Locale, RequestContext};
pub use error::{CompileDiagnostic, EngineError, FailureKind, RenderingFailure, Result};
pub use result::{Message, RenderResult, Renderable};
pub use template::{ContentType, ContextSlot, Output, TemplateDescriptor, TemplateInstance};

/// Re-export common types for convenience.
pub mod prelude {
    pub use crate::{
        AdapterConfig, ContextFactory, EngineError, RenderResult, Renderable, RenderingFailure,
        RequestContext, Result, TemplateInstance,
    };
}
