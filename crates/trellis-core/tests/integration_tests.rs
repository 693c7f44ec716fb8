// Integration tests for Trellis Core
//
// These tests exercise context creation and propagation together with the
// in-memory collaborators.

use std::sync::Arc;

use trellis_core::config::AdapterConfig;
use trellis_core::context::ContextFactory;
use trellis_core::error::{EngineError, FailureKind, RenderingFailure};
use trellis_core::standalone::{
    MemoryFlash, MemoryRequest, MemorySession, MessageBundle, StaticRouter,
    standalone_collaborators,
};
use trellis_core::template::{ContextSlot, Output, TemplateDescriptor, TemplateInstance};
use trellis_core::{Collaborators, Result};

#[derive(Debug, Default)]
struct Fragment {
    name: &'static str,
    slot: ContextSlot,
}

impl TemplateInstance for Fragment {
    fn descriptor(&self) -> TemplateDescriptor {
        TemplateDescriptor::html("views", self.name)
    }

    fn slot(&self) -> &ContextSlot {
        &self.slot
    }

    fn slot_mut(&mut self) -> &mut ContextSlot {
        &mut self.slot
    }

    fn render_body(&self, out: &mut Output) -> Result<()> {
        let context = self.context()?;
        out.write_raw("[");
        out.write_value(context.lang());
        out.write_raw("]");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Layout {
    slot: ContextSlot,
}

impl TemplateInstance for Layout {
    fn descriptor(&self) -> TemplateDescriptor {
        TemplateDescriptor::html("views", "layout")
    }

    fn slot(&self) -> &ContextSlot {
        &self.slot
    }

    fn slot_mut(&mut self) -> &mut ContextSlot {
        &mut self.slot
    }

    fn render_body(&self, out: &mut Output) -> Result<()> {
        let mut header = Fragment {
            name: "header",
            ..Fragment::default()
        };
        let mut footer = Fragment {
            name: "footer",
            ..Fragment::default()
        };
        self.include(&mut header, out)?;
        self.include(&mut footer, out)?;
        Ok(())
    }
}

fn collaborators() -> Collaborators {
    let mut collaborators = standalone_collaborators(&["en", "de"], "en");
    collaborators.messages = Arc::new(
        MessageBundle::new()
            .with("en", "flash.saved", "Your changes were saved")
            .with("de", "flash.saved", "Gespeichert"),
    );
    collaborators.router = Arc::new(
        StaticRouter::new()
            .with_context_path("/app")
            .route("ninja.AssetsController", "serveStatic", "/assets/{fileName: .*}")
            .route("ninja.AssetsController", "serveWebJars", "/webjars/{fileName: .*}"),
    );
    collaborators
}

#[test]
fn test_should_integration_composed_render_shares_one_context() {
    let factory = ContextFactory::new(collaborators());
    let request = MemoryRequest::new("/").with_header("Accept-Language", "de");
    let context = Arc::new(factory.create(&request));

    let mut layout = Layout::default();
    layout
        .attach(Arc::clone(&context))
        .expect("Failed to attach context");
    let out = layout.render().expect("Failed to render layout");

    assert_eq!(out.to_string(), "[de][de]");
    assert_eq!(Arc::strong_count(&context), 2);
}

#[test]
fn test_should_integration_detached_root_fails_fast() {
    let layout = Layout::default();
    let err = layout.render().expect_err("Render should fail");
    let failure = RenderingFailure::from(err);

    assert_eq!(failure.kind(), FailureKind::ContractViolation);
    assert_eq!(failure.line_number(), -1);
}

#[test]
fn test_should_integration_flash_translated_for_request_language() {
    let factory = ContextFactory::new(collaborators());
    let request = MemoryRequest::new("/")
        .with_header("Accept-Language", "de-CH")
        .with_flash(
            MemoryFlash::default()
                .with("success", "flash.saved")
                .with("error", "Plain text"),
        );

    let context = factory.create(&request);
    assert_eq!(
        context.flash().get("success").map(String::as_str),
        Some("Gespeichert")
    );
    assert_eq!(
        context.flash().get("error").map(String::as_str),
        Some("Plain text")
    );
}

#[test]
fn test_should_integration_asset_urls() {
    let factory = ContextFactory::new(collaborators());
    let context = factory.create(&MemoryRequest::new("/"));

    assert_eq!(
        context.assets_at("css/app.css").expect("Failed to resolve asset"),
        "/app/assets/css/app.css"
    );
    assert_eq!(
        context
            .web_jars_at("bootstrap/bootstrap.min.css")
            .expect("Failed to resolve webjar"),
        "/app/webjars/bootstrap/bootstrap.min.css"
    );
}

#[test]
fn test_should_integration_session_token_and_attributes() {
    let factory = ContextFactory::new(collaborators());
    let request = MemoryRequest::new("/")
        .with_session(
            MemorySession::default()
                .with("username", "joe")
                .with_authenticity_token("abc"),
        )
        .with_attribute("USER", serde_json::json!("Joe"));

    let context = factory.create(&request);
    assert_eq!(context.attribute("USER"), Some(&serde_json::json!("Joe")));
    assert_eq!(
        context.authenticity_form(),
        "<input type=\"hidden\" value=\"abc\" name=\"authenticityToken\" />"
    );
}

#[test]
fn test_should_integration_transport_error_normalized() {
    let err = EngineError::Transport(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "closed",
    ));
    let failure = RenderingFailure::from(err);
    assert_eq!(failure.kind(), FailureKind::Transport);
    assert!(std::error::Error::source(&failure).is_some());
}

#[test]
fn test_should_integration_config_file_round_trip() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(".trellis").join("config.yml");

    let mut config = AdapterConfig::default_config();
    config.i18n.languages = vec!["en".to_string(), "fr".to_string()];
    config.save_to_file(&path).expect("Failed to save config");

    let loaded = AdapterConfig::load_from_file(&path).expect("Failed to load config");
    assert_eq!(loaded.i18n.languages, config.i18n.languages);
    assert_eq!(loaded.views.file_suffix, config.views.file_suffix);
}
