//! Command logic for Trellis CLI.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};
use trellis_core::config::AdapterConfig;
use trellis_core::standalone::{CapturedResponse, MemoryRequest};
use trellis_core::{EngineError, Message, RenderResult, RenderingFailure};
use trellis_views::{ErrorPage, RenderDispatcher, ViewEngine, ViewError, ViewRegistry};

use crate::cli::RenderArgs;
use crate::config::ConfigManager;
use crate::error::{CliError, Result as CliResult};
use crate::output::OutputFormatter;

const SAMPLE_VIEW: &str = "<!DOCTYPE html>
<html lang=\"{{ N.lang }}\">
<head>
  <meta charset=\"utf-8\">
  <title>{{ N.i18n(\"app.title\") }}</title>
</head>
<body>
  <h1>{{ N.i18n(\"app.greeting\", name | default(\"world\")) }}</h1>
  <p><a href=\"{{ N.context_path }}/\">{{ N.context_path }}/</a></p>
</body>
</html>
";

const SAMPLE_MESSAGES: &str = "en:
  app.title: Trellis
  app.greeting: \"Hello {0}!\"
";

/// Create a project skeleton in `project_path`.
///
/// # Errors
///
/// Returns an error if files cannot be written, or a configuration exists
/// and `force` is not set.
#[instrument(skip(project_path))]
pub fn init(project_path: &Path, force: bool) -> CliResult<()> {
    let config_path = ConfigManager::config_file_path(project_path);
    if config_path.exists() && !force {
        return Err(CliError::invalid_args(format!(
            "{} already exists, use --force to overwrite",
            config_path.display()
        )));
    }

    let mut config = AdapterConfig::default_config();
    config.i18n.messages = Some(".trellis/messages.yml".to_string());
    config.save_to_file(&config_path)?;
    std::fs::write(project_path.join(".trellis").join("messages.yml"), SAMPLE_MESSAGES)?;

    let sample = project_path
        .join(&config.views.directory)
        .join(&config.views.namespace)
        .join("ApplicationController")
        .join(format!("index{}", config.views.file_suffix));
    if let Some(parent) = sample.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !sample.exists() {
        std::fs::write(&sample, SAMPLE_VIEW)?;
    }

    let output = OutputFormatter::new();
    output.success(&format!(
        "Initialized Trellis project in {}",
        project_path.display()
    ));
    output.list_item("Config:", &config_path.display().to_string());
    output.list_item("Sample view:", &sample.display().to_string());
    output.info(&format!(
        "Try `trellis render {}/ApplicationController/index{}`",
        config.views.namespace, config.views.file_suffix
    ));
    Ok(())
}

/// Print every view of the project.
///
/// # Errors
///
/// Returns an error if the views cannot be loaded.
#[instrument(skip(config))]
pub fn list_views(config: &ConfigManager, verbose: bool) -> CliResult<()> {
    let engine = load_engine(config)?;
    let views: Vec<_> = engine
        .names()
        .into_iter()
        .map(|name| {
            let view_config = engine.view_config(&name);
            (name, view_config)
        })
        .collect();

    OutputFormatter::new().view_list(&views, verbose);
    Ok(())
}

/// Compile every view and report each failure with its location.
///
/// # Errors
///
/// Returns an error if any view fails to compile.
#[instrument(skip(config))]
pub fn check_views(config: &ConfigManager) -> CliResult<()> {
    let output = OutputFormatter::new();

    match load_engine(config) {
        Ok(engine) if engine.names().is_empty() => {
            output.warning(&format!("No views found in {}", config.views_dir().display()));
            Ok(())
        }
        Ok(engine) => {
            output.success(&format!("{} views compiled", engine.names().len()));
            Ok(())
        }
        Err(CliError::Views(ViewError::Engine(EngineError::Compile { diagnostics }))) => {
            for diagnostic in &diagnostics {
                output.error(&diagnostic.to_string());
            }
            let failure = RenderingFailure::from(EngineError::Compile { diagnostics });
            Err(CliError::Render(failure))
        }
        Err(err) => Err(err),
    }
}

/// Render a view or error page for a simulated request.
///
/// # Errors
///
/// Returns an error if the arguments are invalid or rendering fails.
#[instrument(skip(config, args), fields(template = %args.template))]
pub fn render(config: &ConfigManager, args: &RenderArgs) -> CliResult<CapturedResponse> {
    let engine = Arc::new(load_engine(config)?);
    let collaborators = config.collaborators(&args.context_path)?;
    let dispatcher = RenderDispatcher::new(
        config.config(),
        collaborators,
        engine,
        &ViewRegistry::new(),
    );

    let mut result = if args.error {
        let page = ErrorPage::ALL
            .into_iter()
            .find(|page| page.override_name() == args.template || page.id() == args.template)
            .ok_or_else(|| {
                CliError::invalid_args(format!("Unknown error page '{}'", args.template))
            })?;
        RenderResult::new(page.status())
            .with_template(page.id())
            .render_message(Message::new(args.message.clone()))
    } else {
        let values = match &args.data {
            Some(data) => serde_json::from_str(data)?,
            None => serde_json::Map::new(),
        };
        RenderResult::ok()
            .with_template(args.template.clone())
            .render_map(values)
    };

    let mut request = MemoryRequest::new(format!("{}/", args.context_path))
        .with_context_path(args.context_path.clone());
    if let Some(lang) = &args.lang {
        request = request.with_header("Accept-Language", lang.clone());
    }

    let output = OutputFormatter::new();
    if let Err(failure) = dispatcher.invoke(&mut request, &mut result) {
        output.failure(&failure);
        return Err(failure.into());
    }

    debug!(
        project = %config.project_path().display(),
        bytes = request.response().body.len(),
        "Rendered {}",
        result.template().unwrap_or_default()
    );
    info!("Rendered {}", args.template);
    Ok(request.response().clone())
}

fn load_engine(config: &ConfigManager) -> CliResult<ViewEngine> {
    let views = &config.config().views;
    Ok(ViewEngine::load(config.views_dir(), views.file_suffix.clone())?)
}
