//! Minijinja views compiled from a directory of template files.
//!
//! The compiled environment lives in an [`ArcSwap`] so a development-mode
//! reload can replace it while renders already in flight keep the snapshot
//! they started with.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use minijinja::{AutoEscape, Environment, State, Value, escape_formatter};
use tracing::{debug, info, instrument, warn};
use trellis_core::error::CompileDiagnostic;
use trellis_core::template::escape_html;
use trellis_core::{ContentType, EngineError};

use crate::config::{ParsedView, ViewConfig};
use crate::error::{Result, ViewError};
use crate::view::JinjaView;

/// A compiled view and where it came from.
#[derive(Debug, Clone)]
pub(crate) struct CompiledView {
    pub(crate) config: ViewConfig,
    pub(crate) line_offset: usize,
}

/// One compiled snapshot of every view.
#[derive(Debug)]
pub(crate) struct Compiled {
    pub(crate) env: Environment<'static>,
    pub(crate) views: BTreeMap<String, CompiledView>,
}

impl Compiled {
    fn empty() -> Self {
        Self {
            env: new_environment(Arc::new(BTreeSet::new())),
            views: BTreeMap::new(),
        }
    }

    /// Translate a minijinja runtime error into a located render error.
    pub(crate) fn render_error(
        &self,
        root: &str,
        fallback_name: &str,
        err: minijinja::Error,
    ) -> EngineError {
        let located = innermost(&err);
        let name = located.name().unwrap_or(fallback_name).to_string();
        let offset = self.views.get(&name).map_or(0, |view| view.line_offset);
        let line = located.line().map(|line| line + offset);
        let message = describe(located);
        let (template_path, template_name) = split_location(root, &name);

        EngineError::Render {
            message,
            template_path,
            template_name,
            line,
            source: Some(Box::new(err)),
        }
    }
}

/// View engine over a directory of minijinja templates.
#[derive(Debug)]
pub struct ViewEngine {
    root: Option<PathBuf>,
    suffix: String,
    inline: BTreeMap<String, String>,
    compiled: ArcSwap<Compiled>,
}

impl ViewEngine {
    /// Create an engine with no views.
    #[must_use]
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            root: None,
            suffix: suffix.into(),
            inline: BTreeMap::new(),
            compiled: ArcSwap::from_pointee(Compiled::empty()),
        }
    }

    /// Load every `*<suffix>` file below `dir`.
    ///
    /// View names are paths relative to `dir`, separated by `/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory does not exist or any view fails
    /// to compile.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn load(dir: impl AsRef<Path>, suffix: impl Into<String>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ViewError::MissingDirectory(dir.to_path_buf()));
        }

        let suffix = suffix.into();
        let inline = BTreeMap::new();
        let compiled = compile(Some(dir), &suffix, &inline)?;
        info!("Loaded {} views from {}", compiled.views.len(), dir.display());

        Ok(Self {
            root: Some(dir.to_path_buf()),
            suffix,
            inline,
            compiled: ArcSwap::from_pointee(compiled),
        })
    }

    /// Recompile every view from its source.
    ///
    /// On failure the previous snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Returns a compile error carrying every diagnostic.
    #[instrument(skip(self))]
    pub fn reload(&self) -> trellis_core::Result<()> {
        let compiled = compile(self.root.as_deref(), &self.suffix, &self.inline)?;
        debug!("Reloaded {} views", compiled.views.len());
        self.compiled.store(Arc::new(compiled));
        Ok(())
    }

    /// Recompile every view from its source ahead of rendering `name`.
    ///
    /// Views that compile replace the current snapshot. Views that fail are
    /// left out of it and only reported here when one of them is `name`.
    ///
    /// # Errors
    ///
    /// Returns a compile error carrying the diagnostics of `name`.
    #[instrument(skip(self))]
    pub fn refresh(&self, name: &str) -> trellis_core::Result<()> {
        let (compiled, diagnostics) =
            compile_views(self.root.as_deref(), &self.suffix, &self.inline);
        let (own, others): (Vec<_>, Vec<_>) = diagnostics
            .into_iter()
            .partition(|diagnostic| diagnostic.artifact == name);
        for diagnostic in &others {
            warn!(
                view = %diagnostic.artifact,
                "Skipping view that failed to compile: {}", diagnostic.message
            );
        }

        debug!("Refreshed {} views", compiled.views.len());
        self.compiled.store(Arc::new(compiled));
        if own.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Compile { diagnostics: own })
        }
    }

    /// Register a view from source.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the source is malformed.
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> trellis_core::Result<()> {
        let name = name.into();
        let source = source.into();
        check_syntax(&name, &source)?;

        self.inline.insert(name.clone(), source);
        self.reload()?;
        debug!("Registered view: {}", name);
        Ok(())
    }

    /// Bind `values` to the view called `name`.
    ///
    /// # Errors
    ///
    /// Returns a render error if no such view exists.
    pub fn bind(
        &self,
        name: &str,
        values: serde_json::Map<String, serde_json::Value>,
    ) -> trellis_core::Result<JinjaView> {
        let compiled = self.compiled.load_full();
        if !compiled.views.contains_key(name) {
            let (template_path, template_name) = split_location(&self.root_label(), name);
            return Err(EngineError::Render {
                message: format!("View '{name}' not found"),
                template_path,
                template_name,
                line: None,
                source: None,
            });
        }

        Ok(JinjaView::new(
            compiled,
            self.root_label(),
            name.to_string(),
            Value::from_serialize(&values),
        ))
    }

    /// Whether a view called `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.compiled.load().views.contains_key(name)
    }

    /// Names of all views, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.compiled.load().views.keys().cloned().collect()
    }

    /// Configuration of the view called `name`.
    #[must_use]
    pub fn view_config(&self, name: &str) -> Option<ViewConfig> {
        self.compiled
            .load()
            .views
            .get(name)
            .map(|view| view.config.clone())
    }

    /// File suffix of views.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Directory views are loaded from.
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn root_label(&self) -> String {
        self.root
            .as_ref()
            .map(|root| root.display().to_string())
            .unwrap_or_default()
    }
}

fn new_environment(raw_views: Arc<BTreeSet<String>>) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(move |name: &str| {
        if raw_views.contains(name) {
            AutoEscape::None
        } else {
            AutoEscape::Html
        }
    });
    env.set_formatter(html_formatter);
    env
}

// escapes like native templates do, leaving `/` intact
fn html_formatter(
    out: &mut minijinja::Output<'_>,
    state: &State<'_, '_>,
    value: &Value,
) -> std::result::Result<(), minijinja::Error> {
    match state.auto_escape() {
        AutoEscape::Html if !value.is_safe() && !value.is_undefined() && !value.is_none() => {
            out.write_str(&escape_html(&value.to_string()))?;
            Ok(())
        }
        _ => escape_formatter(out, state, value),
    }
}

fn check_syntax(name: &str, source: &str) -> trellis_core::Result<()> {
    let parsed = ParsedView::parse(source).map_err(|err| EngineError::Parse {
        message: format!("Failed to parse front matter: {err}"),
        template_path: name.to_string(),
        line: err.location().map(|location| location.line() + 1),
        source: Some(Box::new(err)),
    })?;

    let mut scratch = Environment::new();
    scratch
        .add_template_owned(name.to_string(), parsed.body)
        .map_err(|err| EngineError::Parse {
            message: describe(&err),
            template_path: name.to_string(),
            line: err.line().map(|line| line + parsed.line_offset),
            source: Some(Box::new(err)),
        })
}

fn compile(
    root: Option<&Path>,
    suffix: &str,
    inline: &BTreeMap<String, String>,
) -> trellis_core::Result<Compiled> {
    let (compiled, diagnostics) = compile_views(root, suffix, inline);
    if diagnostics.is_empty() {
        Ok(compiled)
    } else {
        Err(EngineError::Compile { diagnostics })
    }
}

// failing views are left out of the snapshot and reported alongside it
fn compile_views(
    root: Option<&Path>,
    suffix: &str,
    inline: &BTreeMap<String, String>,
) -> (Compiled, Vec<CompileDiagnostic>) {
    let mut diagnostics = Vec::new();
    let mut sources = Vec::new();

    if let Some(root) = root {
        let mut files = Vec::new();
        if let Err(err) = collect_files(root, root, suffix, &mut files) {
            diagnostics.push(io_diagnostic(root, &err));
        }
        files.sort();
        for (name, file) in files {
            match std::fs::read_to_string(&file) {
                Ok(source) => sources.push((name, file, source)),
                Err(err) => diagnostics.push(io_diagnostic(&file, &err)),
            }
        }
    }
    sources.extend(
        inline
            .iter()
            .map(|(name, source)| (name.clone(), PathBuf::from(name), source.clone())),
    );

    let mut parsed = Vec::with_capacity(sources.len());
    for (name, file, source) in sources {
        match ParsedView::parse(&source) {
            Ok(view) => parsed.push((name, file, view)),
            Err(err) => diagnostics.push(CompileDiagnostic {
                message: format!("Failed to parse front matter: {err}"),
                template_line: err.location().map(|location| location.line() + 1),
                template_file: file,
                artifact: name,
                artifact_line: None,
            }),
        }
    }

    let raw_views: BTreeSet<String> = parsed
        .iter()
        .filter(|(_, _, view)| view.config.content_type == ContentType::Raw)
        .map(|(name, _, _)| name.clone())
        .collect();
    let mut env = new_environment(Arc::new(raw_views));
    let mut views = BTreeMap::new();

    for (name, file, view) in parsed {
        match env.add_template_owned(name.clone(), view.body) {
            Ok(()) => {
                views.insert(
                    name,
                    CompiledView {
                        config: view.config,
                        line_offset: view.line_offset,
                    },
                );
            }
            Err(err) => diagnostics.push(CompileDiagnostic {
                message: describe(&err),
                template_file: file,
                template_line: err.line().map(|line| line + view.line_offset),
                artifact: name,
                artifact_line: err.line(),
            }),
        }
    }

    (Compiled { env, views }, diagnostics)
}

fn collect_files(
    dir: &Path,
    root: &Path,
    suffix: &str,
    found: &mut Vec<(String, PathBuf)>,
) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, root, suffix, found)?;
            continue;
        }

        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(suffix));
        if let (true, Ok(relative)) = (matches, path.strip_prefix(root)) {
            let name = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            found.push((name, path));
        }
    }
    Ok(())
}

fn io_diagnostic(path: &Path, err: &io::Error) -> CompileDiagnostic {
    CompileDiagnostic {
        message: format!("Failed to read views: {err}"),
        template_file: path.to_path_buf(),
        template_line: None,
        artifact: path.display().to_string(),
        artifact_line: None,
    }
}

// include and extends failures wrap the error raised in the fragment
fn innermost(err: &minijinja::Error) -> &minijinja::Error {
    let mut located = err;
    let mut cause = std::error::Error::source(err);
    while let Some(current) = cause {
        if let Some(inner) = current.downcast_ref::<minijinja::Error>() {
            if inner.name().is_some() && inner.line().is_some() {
                located = inner;
            }
        }
        cause = std::error::Error::source(current);
    }
    located
}

fn describe(err: &minijinja::Error) -> String {
    match err.detail() {
        Some(detail) => format!("{}: {detail}", err.kind()),
        None => err.kind().to_string(),
    }
}

fn split_location(root: &str, name: &str) -> (String, String) {
    let full = if root.is_empty() {
        name.to_string()
    } else {
        format!("{}/{name}", root.trim_end_matches('/'))
    };
    match full.rsplit_once('/') {
        Some((path, file)) => (path.to_string(), file.to_string()),
        None => (String::new(), full),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::template::TemplateInstance;

    #[test]
    fn test_add_template_reports_parse_error() {
        let mut engine = ViewEngine::new(".trellis.html");
        let err = engine
            .add_template("views/broken.trellis.html", "line one\n{% if %}")
            .unwrap_err();
        match err {
            EngineError::Parse {
                template_path,
                line,
                ..
            } => {
                assert_eq!(template_path, "views/broken.trellis.html");
                assert_eq!(line, Some(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!engine.contains("views/broken.trellis.html"));
    }

    #[test]
    fn test_parse_error_line_counts_front_matter() {
        let mut engine = ViewEngine::new(".trellis.html");
        let err = engine
            .add_template("a.trellis.html", "---\ncharset: UTF-8\n---\n{% for %}")
            .unwrap_err();
        assert!(matches!(err, EngineError::Parse { line: Some(4), .. }));
    }

    #[test]
    fn test_bind_unknown_view() {
        let engine = ViewEngine::new(".trellis.html");
        let err = engine
            .bind("views/missing.trellis.html", serde_json::Map::new())
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_raw_view_descriptor() {
        let mut engine = ViewEngine::new(".trellis.html");
        engine
            .add_template("export.trellis.html", "---\ncontentType: raw\n---\n<{{ v }}>")
            .unwrap();
        let view = engine.bind("export.trellis.html", serde_json::Map::new()).unwrap();
        assert_eq!(view.descriptor().content_type, ContentType::Raw);
        assert_eq!(
            engine.view_config("export.trellis.html").unwrap().content_type,
            ContentType::Raw
        );
    }

    #[test]
    fn test_render_error_points_at_included_fragment() {
        let mut engine = ViewEngine::new(".trellis.html");
        engine
            .add_template("partials/broken.trellis.html", "ok\n{{ missing.attr }}")
            .unwrap();
        engine
            .add_template(
                "outer.trellis.html",
                "<div>{% include 'partials/broken.trellis.html' %}</div>",
            )
            .unwrap();

        let compiled = engine.compiled.load_full();
        let err = compiled
            .env
            .get_template("outer.trellis.html")
            .unwrap()
            .render(())
            .unwrap_err();
        match compiled.render_error("", "outer.trellis.html", err) {
            EngineError::Render {
                template_path,
                template_name,
                line,
                ..
            } => {
                assert_eq!(template_path, "partials");
                assert_eq!(template_name, "broken.trellis.html");
                assert_eq!(line, Some(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_split_location() {
        assert_eq!(
            split_location("templates", "views/app/index.trellis.html"),
            (
                "templates/views/app".to_string(),
                "index.trellis.html".to_string()
            )
        );
        assert_eq!(
            split_location("", "index.trellis.html"),
            (String::new(), "index.trellis.html".to_string())
        );
    }

    #[test]
    fn test_load_missing_directory() {
        let err = ViewEngine::load("/definitely/not/here", ".trellis.html").unwrap_err();
        assert!(matches!(err, ViewError::MissingDirectory(_)));
    }
}
