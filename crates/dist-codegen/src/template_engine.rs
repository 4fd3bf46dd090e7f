//! Template engine for worker generation using Handlebars.
//!
//! Wraps Handlebars with the built-in worker templates registered. Output is
//! JavaScript, so HTML escaping is disabled; values that end up inside string
//! literals are passed in already quoted.
//!
//! # Examples
//!
//! ```
//! use distributor_codegen::template_engine::TemplateEngine;
//!
//! let mut engine = TemplateEngine::new().unwrap();
//! engine.register_template_string("banner", "// {{name}} <generated>").unwrap();
//! let out = engine.render("banner", &serde_json::json!({"name": "S1"})).unwrap();
//! assert_eq!(out, "// S1 <generated>");
//! ```

use distributor_core::{Error, Result};
use handlebars::Handlebars;
use serde::Serialize;

/// Name of the worker module template.
pub const WORKER_TEMPLATE: &str = "worker/start";

/// Template engine for code generation.
///
/// # Thread Safety
///
/// This type is `Send` and `Sync`.
#[derive(Debug)]
pub struct TemplateEngine<'a> {
    handlebars: Handlebars<'a>,
}

impl<'a> TemplateEngine<'a> {
    /// Creates a new template engine with the worker templates registered.
    ///
    /// # Errors
    ///
    /// Returns error if template registration fails (should not happen
    /// with valid built-in templates).
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();

        // Strict mode: fail on missing variables
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);

        Self::register_worker_templates(&mut handlebars)?;

        Ok(Self { handlebars })
    }

    fn register_worker_templates(handlebars: &mut Handlebars<'a>) -> Result<()> {
        handlebars
            .register_template_string(
                WORKER_TEMPLATE,
                include_str!("../templates/worker/start.js.hbs"),
            )
            .map_err(|e| Error::TemplateError {
                template: WORKER_TEMPLATE.to_string(),
                message: format!("registration failed: {e}"),
            })
    }

    /// Renders a template with the given context.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Template name is not registered
    /// - Context cannot be serialized
    /// - A variable is missing (strict mode)
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        self.handlebars
            .render(template_name, context)
            .map_err(|e| Error::TemplateError {
                template: template_name.to_string(),
                message: format!("rendering failed: {e}"),
            })
    }

    /// Registers a custom template.
    ///
    /// Registering under [`WORKER_TEMPLATE`] replaces the built-in worker
    /// layout.
    ///
    /// # Errors
    ///
    /// Returns error if template string is invalid.
    pub fn register_template_string(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| Error::TemplateError {
                template: name.to_string(),
                message: format!("registration failed: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn worker_context() -> serde_json::Value {
        json!({
            "imports": ["import amqp from \"amqplib\";"],
            "start_routine": "waitForCallS1",
            "connection_url": "\"amqp://localhost\"",
            "queue": "\"jobs\"",
            "handlers": [
                {
                    "name": "add",
                    "name_literal": "\"add\"",
                    "parameters": "a, b",
                    "has_parameters": true
                },
                {
                    "name": "ping",
                    "name_literal": "\"ping\"",
                    "parameters": "",
                    "has_parameters": false
                }
            ]
        })
    }

    #[test]
    fn test_template_engine_creation() {
        assert!(TemplateEngine::new().is_ok());
    }

    #[test]
    fn test_render_worker_template() {
        let engine = TemplateEngine::new().unwrap();
        let rendered = engine.render(WORKER_TEMPLATE, &worker_context()).unwrap();

        assert!(rendered.contains("import amqp from \"amqplib\";"));
        assert!(rendered.contains("async function waitForCallS1() {"));
        assert!(rendered.contains("await amqp.connect(\"amqp://localhost\");"));
        assert!(rendered.contains("await channel.assertQueue(queueName, { durable: false });"));
        assert!(rendered.contains("const { a, b } = message.parameters;"));
        assert!(rendered.contains("const resultadd = await add(a, b);"));
        assert!(rendered.contains("const resultping = await ping();"));
        assert!(rendered.contains("{ noAck: true },"));
        assert!(rendered.trim_end().ends_with("waitForCallS1();"));
    }

    #[test]
    fn test_quotes_are_not_html_escaped() {
        let engine = TemplateEngine::new().unwrap();
        let rendered = engine.render(WORKER_TEMPLATE, &worker_context()).unwrap();
        assert!(!rendered.contains("&quot;"));
    }

    #[test]
    fn test_missing_variable_fails_in_strict_mode() {
        let engine = TemplateEngine::new().unwrap();
        let err = engine
            .render(WORKER_TEMPLATE, &json!({"imports": []}))
            .unwrap_err();
        assert!(err.is_template_error());
    }

    #[test]
    fn test_unknown_template() {
        let engine = TemplateEngine::new().unwrap();
        assert!(engine.render("nope", &json!({})).is_err());
    }

    #[test]
    fn test_register_invalid_template() {
        let mut engine = TemplateEngine::new().unwrap();
        assert!(engine.register_template_string("bad", "{{#each}}").is_err());
    }
}
