//! Render dispatching.
//!
//! [`RenderDispatcher::invoke`] turns a handler's [`RenderResult`] into
//! response bytes:
//!
//! 1. classify the renderable and resolve it to a template instance
//! 2. build the request context once and attach it to that root
//! 3. render into a buffer
//! 4. set the content type and length, finalize headers, write the buffer
//!
//! Whatever fails on the way is normalized into a [`RenderingFailure`].

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, info, instrument};
use trellis_core::result::{APPLICATION_OCTET_STREAM, TEXT_HTML};
use trellis_core::{
    AdapterConfig, Collaborators, ContentType, ContextFactory, EngineError, RenderResult,
    Renderable, RenderingFailure, Request, Result, TemplateInstance,
};

use crate::engine::ViewEngine;
use crate::error_pages::{ErrorPage, ErrorPages, ErrorPagesBuilder, ErrorSource};
use crate::naming::{ControllerConvention, TemplateNameResolver, strip_leading_separator};
use crate::registry::ViewRegistry;

/// Content type of rendered views.
pub const CONTENT_TYPE: &str = TEXT_HTML;

/// Default file suffix of views.
pub const FILE_SUFFIX: &str = ".trellis.html";

/// Entry point the framework calls to render a result.
#[derive(Debug)]
pub struct RenderDispatcher {
    factory: ContextFactory,
    engine: Arc<ViewEngine>,
    error_pages: Arc<ErrorPages>,
    name_resolver: Arc<dyn TemplateNameResolver>,
    reload: bool,
}

impl RenderDispatcher {
    /// Create a dispatcher.
    ///
    /// Seeds the error page table, probes `registry` and `engine` for
    /// overrides and freezes it. The reload flag is fixed here as well.
    #[instrument(skip_all)]
    pub fn new(
        config: &AdapterConfig,
        collaborators: Collaborators,
        engine: Arc<ViewEngine>,
        registry: &ViewRegistry,
    ) -> Self {
        let error_pages = ErrorPagesBuilder::with_defaults()
            .discover(registry, &engine, &config.views.namespace)
            .build();
        let reload = config.reload_enabled();
        info!(
            reload,
            views = engine.names().len(),
            "Render dispatcher ready"
        );

        Self {
            factory: ContextFactory::new(collaborators),
            engine,
            error_pages,
            name_resolver: Arc::new(ControllerConvention::new(config.views.namespace.clone())),
            reload,
        }
    }

    /// Use a different template name resolver.
    #[must_use]
    pub fn with_name_resolver(mut self, resolver: impl TemplateNameResolver + 'static) -> Self {
        self.name_resolver = Arc::new(resolver);
        self
    }

    /// Content type of rendered views.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    /// File suffix of views.
    #[must_use]
    pub fn suffix_of_templates(&self) -> &str {
        self.engine.suffix()
    }

    /// Whether views are recompiled before each render.
    #[must_use]
    pub const fn reload_enabled(&self) -> bool {
        self.reload
    }

    /// Frozen error page table.
    #[must_use]
    pub const fn error_pages(&self) -> &Arc<ErrorPages> {
        &self.error_pages
    }

    /// Render `result` and write it to `request`'s response.
    ///
    /// # Errors
    ///
    /// Returns a located failure if the renderable is unsupported, the
    /// template fails to parse, compile or render, or the response cannot be
    /// written. Nothing is written unless rendering succeeded.
    #[instrument(skip_all, fields(status = result.status()))]
    pub fn invoke(
        &self,
        request: &mut dyn Request,
        result: &mut RenderResult,
    ) -> std::result::Result<(), RenderingFailure> {
        self.dispatch(request, result).map_err(|err| {
            let failure = RenderingFailure::from(err)
                .with_template(result.template().map(ToString::to_string));
            debug!(kind = ?failure.kind(), "Render failed: {}", failure);
            failure
        })
    }

    fn dispatch(&self, request: &mut dyn Request, result: &mut RenderResult) -> Result<()> {
        let mut root = self.resolve(&*request, result)?;

        let context = Arc::new(self.factory.create(&*request));
        root.attach(context)?;

        let out = root.render()?;
        debug!(
            template = %root.descriptor().name,
            bytes = out.len(),
            "Rendered template"
        );

        if result.content_type().is_none() {
            result.set_content_type(match out.content_type() {
                ContentType::Html => TEXT_HTML,
                ContentType::Raw => APPLICATION_OCTET_STREAM,
            });
        }
        result.set_header("Content-Length", out.len().to_string());

        let mut sink = request
            .finalize_headers(result)
            .map_err(EngineError::Transport)?;
        sink.write_all(out.as_bytes())
            .map_err(EngineError::Transport)?;
        sink.flush().map_err(EngineError::Transport)
    }

    fn resolve(
        &self,
        request: &dyn Request,
        result: &mut RenderResult,
    ) -> Result<Box<dyn TemplateInstance>> {
        match result.take_renderable() {
            Some(Renderable::Model(model)) => Ok(model),
            Some(Renderable::Mapping(values)) => self.bind_mapping(request, result, values),
            None => self.bind_mapping(request, result, serde_json::Map::new()),
            Some(Renderable::Message(message)) => {
                match result.template().and_then(ErrorPage::from_id) {
                    Some(page) => {
                        if let (true, ErrorSource::View(name)) =
                            (self.reload, self.error_pages.source(page))
                        {
                            self.engine.refresh(name)?;
                        }
                        self.error_pages.instantiate(page, &message, &self.engine)
                    }
                    None => Err(EngineError::contract(format!(
                        "Unsupported renderable of type Message for template '{}'",
                        result.template().unwrap_or_default()
                    ))),
                }
            }
            Some(other) => Err(EngineError::contract(format!(
                "Unsupported renderable of type {}",
                other.type_name()
            ))),
        }
    }

    fn bind_mapping(
        &self,
        request: &dyn Request,
        result: &mut RenderResult,
        values: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Box<dyn TemplateInstance>> {
        let name = match result.template() {
            Some(name) => name.to_string(),
            None => self
                .name_resolver
                .resolve(request.route(), result, self.engine.suffix())
                .ok_or_else(|| {
                    EngineError::contract("Unable to resolve a template name without a route")
                })?,
        };
        let name = strip_leading_separator(&name).to_string();
        result.set_template(name.as_str());

        if self.reload {
            self.engine.refresh(&name)?;
        }

        Ok(Box::new(self.engine.bind(&name, values)?))
    }
}
