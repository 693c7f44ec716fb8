//! Explicit registry of native view factories.
//!
//! Applications register their own error page implementations here under
//! symbolic names such as `views.system.not_found`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use trellis_core::result::Message;
use trellis_core::template::TemplateInstance;

/// Constructor for a native view bound to a message.
pub type ViewFactory = Arc<dyn Fn(&Message) -> Box<dyn TemplateInstance> + Send + Sync>;

/// Registry of view factories keyed by symbolic name.
#[derive(Clone, Default)]
pub struct ViewRegistry {
    factories: HashMap<String, ViewFactory>,
}

impl fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRegistry")
            .field("names", &self.list())
            .finish()
    }
}

impl ViewRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory.
    ///
    /// # Arguments
    ///
    /// * `name` - Symbolic name, e.g. `views.system.not_found`.
    /// * `factory` - Constructor for the view.
    pub fn register<F, T>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Message) -> T + Send + Sync + 'static,
        T: TemplateInstance + 'static,
    {
        let factory: ViewFactory =
            Arc::new(move |message: &Message| -> Box<dyn TemplateInstance> {
                Box::new(factory(message))
            });
        self.factories.insert(name.into(), factory);
    }

    /// Look up a factory by name.
    ///
    /// # Returns
    ///
    /// Returns `Some` if a factory was registered, `None` otherwise.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ViewFactory> {
        self.factories.get(name)
    }

    /// List all registered names, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check if a name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_error::CommonError;

    #[test]
    fn test_register_and_build() {
        let mut registry = ViewRegistry::new();
        registry.register("views.system.not_found", |message: &Message| {
            CommonError::new("Gone", message.clone())
        });

        assert!(registry.contains("views.system.not_found"));
        assert!(!registry.contains("views.system.forbidden"));

        let factory = registry.get("views.system.not_found").unwrap();
        let view = factory(&Message::new("x"));
        assert_eq!(view.descriptor().name, "common_error");
    }

    #[test]
    fn test_list_sorted() {
        let mut registry = ViewRegistry::new();
        registry.register("b", |m: &Message| CommonError::new("b", m.clone()));
        registry.register("a", |m: &Message| CommonError::new("a", m.clone()));
        assert_eq!(registry.list(), vec!["a", "b"]);
    }
}
