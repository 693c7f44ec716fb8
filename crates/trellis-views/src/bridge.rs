//! The request context as seen from minijinja.
//!
//! Fields read as attributes (`N.context_path`, `N.flash.success`) and the
//! helpers are methods (`N.i18n("greeting", user)`, `N.assets_at("app.css")`).

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use minijinja::value::{Enumerator, Kwargs, Object, Rest, from_args};
use minijinja::{Error, ErrorKind, State, Value};
use trellis_core::{EngineError, RequestContext};

const FIELDS: &[&str] = &[
    "context_path",
    "lang",
    "locale",
    "session",
    "flash",
    "attributes",
];

/// Wrapper exposing a shared [`RequestContext`] to views.
#[derive(Debug)]
pub struct ContextObject(Arc<RequestContext>);

impl ContextObject {
    /// Wrap `context` into a template value.
    #[must_use]
    pub fn value(context: Arc<RequestContext>) -> Value {
        Value::from_object(Self(context))
    }

    /// The wrapped context.
    #[must_use]
    pub const fn context(&self) -> &Arc<RequestContext> {
        &self.0
    }
}

fn invalid(err: EngineError) -> Error {
    Error::new(ErrorKind::InvalidOperation, err.to_string())
}

impl Object for ContextObject {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let context = &self.0;
        let value = match key.as_str()? {
            "context_path" | "contextPath" => Value::from(context.context_path()),
            "lang" => Value::from(context.lang()),
            "locale" => Value::from(context.locale().to_string()),
            "session" => Value::from_serialize(context.session()),
            "flash" => Value::from_serialize(context.flash()),
            "attributes" => Value::from_serialize(context.attributes()),
            _ => return None,
        };
        Some(value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(FIELDS)
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        let context = &self.0;
        match method {
            "reverse_route" | "reverseRoute" => {
                let (handler, name, params): (&str, &str, Kwargs) = from_args(args)?;
                let params = params
                    .args()
                    .map(|key| {
                        let value: Value = params.get(key)?;
                        Ok((key.to_string(), value.to_string()))
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                context
                    .reverse_route(handler, name, &params)
                    .map(Value::from)
                    .map_err(invalid)
            }
            "assets_at" | "assetsAt" => {
                let (file,): (&str,) = from_args(args)?;
                context.assets_at(file).map(Value::from).map_err(invalid)
            }
            "web_jars_at" | "webJarsAt" => {
                let (file,): (&str,) = from_args(args)?;
                context.web_jars_at(file).map(Value::from).map_err(invalid)
            }
            "i18n" => {
                let (key, rest): (&str, Rest<Value>) = from_args(args)?;
                let rest: Vec<String> = rest.iter().map(ToString::to_string).collect();
                Ok(Value::from(context.i18n(key, &rest)))
            }
            "pretty_time" | "prettyTime" => {
                let (secs,): (u64,) = from_args(args)?;
                let instant = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
                Ok(Value::from(context.pretty_time(instant)))
            }
            "authenticity_token" | "authenticityToken" => {
                Ok(context.authenticity_token().map_or(Value::from(()), Value::from))
            }
            "authenticity_form" | "authenticityForm" => {
                Ok(Value::from_safe_string(context.authenticity_form()))
            }
            "is_prod" | "isProd" => Ok(Value::from(context.is_prod())),
            "is_test" | "isTest" => Ok(Value::from(context.is_test())),
            "is_dev" | "isDev" => Ok(Value::from(context.is_dev())),
            _ => Err(Error::new(
                ErrorKind::UnknownMethod,
                format!("N has no method named {method}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::{Environment, context};
    use trellis_core::ContextFactory;
    use trellis_core::standalone::{
        MemoryFlash, MemoryRequest, MemorySession, MessageBundle, StaticRouter,
        standalone_collaborators,
    };

    fn render(source: &str) -> Result<String, Error> {
        let mut collaborators = standalone_collaborators(&["en"], "en");
        collaborators.messages =
            Arc::new(MessageBundle::new().with("en", "hello", "Hello {0}!"));
        collaborators.router = Arc::new(
            StaticRouter::new()
                .route("UserController", "show", "/users/{id}")
                .route("ninja.AssetsController", "serveStatic", "/assets/{fileName}"),
        );
        let request = MemoryRequest::new("/")
            .with_context_path("/ctx")
            .with_session(
                MemorySession::default()
                    .with("user", "joe")
                    .with_authenticity_token("tok"),
            )
            .with_flash(MemoryFlash::default().with("success", "done"));
        let context = Arc::new(ContextFactory::new(collaborators).create(&request));

        let mut env = Environment::new();
        env.add_template("t", source)?;
        env.get_template("t")?
            .render(context! { N => ContextObject::value(context) })
    }

    #[test]
    fn test_fields() {
        assert_eq!(
            render("{{ N.context_path }}|{{ N.lang }}|{{ N.session.user }}|{{ N.flash.success }}")
                .unwrap(),
            "/ctx|en|joe|done"
        );
    }

    #[test]
    fn test_helpers() {
        assert_eq!(render("{{ N.i18n('hello', 'Joe') }}").unwrap(), "Hello Joe!");
        assert_eq!(render("{{ N.i18n('nope') }}").unwrap(), "nope");
        assert_eq!(
            render("{{ N.reverse_route('UserController', 'show', id=7) }}").unwrap(),
            "/users/7"
        );
        assert_eq!(render("{{ N.assets_at('a.css') }}").unwrap(), "/assets/a.css");
        assert_eq!(render("{{ N.authenticity_token() }}").unwrap(), "tok");
    }

    #[test]
    fn test_mode_flags_drive_conditionals() {
        assert_eq!(
            render("{% if N.is_test() %}test{% endif %}{% if N.isProd() %}prod{% endif %}")
                .unwrap(),
            "test"
        );
        assert_eq!(
            render("{% if N.is_dev() %}dev{% else %}not dev{% endif %}").unwrap(),
            "not dev"
        );
    }

    #[test]
    fn test_unknown_route_is_a_render_error() {
        let err = render("{{ N.reverse_route('Nope', 'index') }}").unwrap_err();
        assert!(err.to_string().contains("Unable to find route for Nope.index"));
    }
}
