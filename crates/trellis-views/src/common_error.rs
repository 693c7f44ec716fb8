//! Built-in error page rendered when the application supplies no override.

use trellis_core::result::Message;
use trellis_core::template::{ContextSlot, Output, TemplateDescriptor, TemplateInstance};
use trellis_core::Result;

const BACK_KEY: &str = "error.back";
const BACK_TEXT: &str = "Back to home";

/// Native template used for every error page by default.
#[derive(Debug)]
pub struct CommonError {
    title: String,
    message: Message,
    slot: ContextSlot,
}

impl CommonError {
    /// Create the page with a title and the message to show.
    #[must_use]
    pub fn new(title: impl Into<String>, message: Message) -> Self {
        Self {
            title: title.into(),
            message,
            slot: ContextSlot::new(),
        }
    }
}

impl TemplateInstance for CommonError {
    fn descriptor(&self) -> TemplateDescriptor {
        TemplateDescriptor::html("views/system", "common_error")
    }

    fn slot(&self) -> &ContextSlot {
        &self.slot
    }

    fn slot_mut(&mut self) -> &mut ContextSlot {
        &mut self.slot
    }

    fn render_body(&self, out: &mut Output) -> Result<()> {
        let context = self.context()?;

        out.write_raw("<!DOCTYPE html>\n<html lang=\"");
        out.write_value(context.lang());
        out.write_raw("\">\n<head>\n<meta charset=\"utf-8\">\n<title>");
        out.write_value(&self.title);
        out.write_raw("</title>\n</head>\n<body>\n<h1>");
        out.write_value(&self.title);
        out.write_raw("</h1>\n<p>");
        out.write_value(&self.message.text);
        out.write_raw("</p>\n<a href=\"");
        out.write_value(context.context_path());
        out.write_raw("/\">");
        out.write_value(
            context
                .message(BACK_KEY, &[])
                .unwrap_or_else(|| BACK_TEXT.to_string()),
        );
        out.write_raw("</a>\n</body>\n</html>\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use trellis_core::ContextFactory;
    use trellis_core::standalone::{MemoryRequest, MessageBundle, standalone_collaborators};

    #[test]
    fn test_links_back_to_context_path() {
        let factory = ContextFactory::new(standalone_collaborators(&["en"], "en"));
        let context = factory.create(&MemoryRequest::new("/").with_context_path("/context"));

        let mut page = CommonError::new("Not Found", Message::new("<nothing> here"));
        page.attach(Arc::new(context)).unwrap();
        let html = page.render().unwrap().to_string();

        assert!(html.contains("href=\"/context/\""));
        assert!(html.contains("<title>Not Found</title>"));
        assert!(html.contains("&lt;nothing&gt; here"));
    }

    #[test]
    fn test_back_link_text_without_messages() {
        let factory = ContextFactory::new(standalone_collaborators(&["en"], "en"));
        let context = factory.create(&MemoryRequest::new("/").with_context_path("/context"));

        let mut page = CommonError::new("Not Found", Message::new("gone"));
        page.attach(Arc::new(context)).unwrap();
        let html = page.render().unwrap().to_string();

        assert!(html.contains("<a href=\"/context/\">Back to home</a>"));
    }

    #[test]
    fn test_back_link_text_is_translated() {
        let mut collaborators = standalone_collaborators(&["de"], "de");
        collaborators.messages =
            Arc::new(MessageBundle::new().with("de", "error.back", "Zur Startseite"));
        let context = ContextFactory::new(collaborators).create(&MemoryRequest::new("/"));

        let mut page = CommonError::new("Not Found", Message::new("gone"));
        page.attach(Arc::new(context)).unwrap();
        let html = page.render().unwrap().to_string();

        assert!(html.contains("<a href=\"/\">Zur Startseite</a>"));
    }
}
