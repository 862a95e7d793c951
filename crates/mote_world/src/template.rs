//! Entity templates — named blueprints of component payloads.
//!
//! A template maps component names to serialized JSON payload text. Payloads
//! are stored as opaque text and re-decoded at every instantiation, so two
//! entities created from the same template share no state.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

/// Errors surfaced during template registration from text.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template text was not valid JSON.
    #[error("malformed template text: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Registry of named entity templates.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, HashMap<String, String>>,
}

impl TemplateRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Register templates from a structured value.
    ///
    /// `data` must be an object mapping template name to an object of
    /// component name → field-value mapping. Existing templates with the
    /// same name are overwritten; entries that are not objects are skipped.
    /// Returns the number of templates registered.
    pub fn register(&mut self, data: &Value) -> usize {
        let mut count = 0;
        if let Some(templates) = data.as_object() {
            for (template_name, payloads) in templates {
                if let Some(components) = payloads.as_object() {
                    let stored: HashMap<String, String> = components
                        .iter()
                        .map(|(name, value)| (name.clone(), value.to_string()))
                        .collect();
                    self.templates.insert(template_name.clone(), stored);
                    count += 1;
                }
            }
        }
        count
    }

    /// Register templates from JSON text.
    ///
    /// Malformed text is a genuine error; a well-formed value goes through
    /// [`TemplateRegistry::register`].
    pub fn register_json(&mut self, text: &str) -> Result<usize, TemplateError> {
        let data: Value = serde_json::from_str(text)?;
        Ok(self.register(&data))
    }

    /// Returns the stored component payloads for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HashMap<String, String>> {
        self.templates.get(name)
    }

    /// Returns `true` if a template named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Returns the number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` if no templates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_register_from_value() {
        let mut templates = TemplateRegistry::new();
        let count = templates.register(&json!({
            "Player": {
                "position": {"x": 5, "y": 10},
                "player": {}
            },
            "Enemy": {
                "position": {}
            }
        }));
        assert_eq!(count, 2);
        assert!(templates.contains("Player"));
        assert!(templates.contains("Enemy"));
        assert_eq!(templates.len(), 2);

        let player = templates.get("Player").unwrap();
        assert_eq!(player.len(), 2);
        // Payloads are stored as opaque serialized text.
        let position: Value = serde_json::from_str(&player["position"]).unwrap();
        assert_eq!(position, json!({"x": 5, "y": 10}));
    }

    #[test]
    fn test_register_from_json_text() {
        let mut templates = TemplateRegistry::new();
        let count = templates
            .register_json(r#"{"Test": {"position": {"x": 3.14159, "y": 5000}}}"#)
            .unwrap();
        assert_eq!(count, 1);
        assert!(templates.contains("Test"));
    }

    #[test]
    fn test_register_malformed_text_is_an_error() {
        let mut templates = TemplateRegistry::new();
        assert!(templates.register_json("{oops").is_err());
        assert!(templates.is_empty());
    }

    #[test]
    fn test_register_non_object_data_registers_nothing() {
        let mut templates = TemplateRegistry::new();
        assert_eq!(templates.register(&json!(42)), 0);
        assert_eq!(templates.register(&json!(["a", "b"])), 0);
        // Non-object template bodies are skipped, valid siblings still land.
        assert_eq!(
            templates.register(&json!({"Good": {"tag": {}}, "Bad": 7})),
            1
        );
        assert!(templates.contains("Good"));
        assert!(!templates.contains("Bad"));
    }

    #[test]
    fn test_same_name_overwrites() {
        let mut templates = TemplateRegistry::new();
        templates.register(&json!({"Player": {"position": {"x": 1}}}));
        templates.register(&json!({"Player": {"position": {"x": 2}}}));
        assert_eq!(templates.len(), 1);

        let payload = &templates.get("Player").unwrap()["position"];
        let decoded: Value = serde_json::from_str(payload).unwrap();
        assert_eq!(decoded, json!({"x": 2}));
    }
}
