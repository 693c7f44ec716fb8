//! A minijinja view bound to its values.

use std::sync::Arc;

use minijinja::{Value, context};
use trellis_core::Result;
use trellis_core::template::{ContextSlot, Output, TemplateDescriptor, TemplateInstance};

use crate::bridge::ContextObject;
use crate::engine::Compiled;

/// View bound to the values of one render.
///
/// The request context is exposed to the view, and to every fragment it
/// includes or extends, as `N`.
#[derive(Debug)]
pub struct JinjaView {
    compiled: Arc<Compiled>,
    root: String,
    name: String,
    values: Value,
    slot: ContextSlot,
}

impl JinjaView {
    pub(crate) fn new(compiled: Arc<Compiled>, root: String, name: String, values: Value) -> Self {
        Self {
            compiled,
            root,
            name,
            values,
            slot: ContextSlot::new(),
        }
    }

    /// View name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TemplateInstance for JinjaView {
    fn descriptor(&self) -> TemplateDescriptor {
        let mut descriptor = TemplateDescriptor::html(self.root.clone(), self.name.clone());
        if let Some(view) = self.compiled.views.get(&self.name) {
            descriptor.content_type = view.config.content_type;
            descriptor.charset.clone_from(&view.config.charset);
        }
        descriptor
    }

    fn slot(&self) -> &ContextSlot {
        &self.slot
    }

    fn slot_mut(&mut self) -> &mut ContextSlot {
        &mut self.slot
    }

    fn render_body(&self, out: &mut Output) -> Result<()> {
        let n = ContextObject::value(Arc::clone(self.context()?));
        let template = self
            .compiled
            .env
            .get_template(&self.name)
            .map_err(|err| self.compiled.render_error(&self.root, &self.name, err))?;
        let rendered = template
            .render(context! { N => n, ..self.values.clone() })
            .map_err(|err| self.compiled.render_error(&self.root, &self.name, err))?;

        out.write_raw(&rendered);
        Ok(())
    }
}
