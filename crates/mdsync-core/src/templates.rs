//! Template library for the insert-template picker.
//!
//! Template text is supplied by the embedding application; this module only
//! organizes it. Inserting a template goes through the session, which parses
//! the content and replaces the selection in one transaction.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{EditorError, Result};

/// A named markdown snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: SmolStr,
    pub category: SmolStr,
    pub content: String,
}

impl Template {
    pub fn new(name: impl Into<SmolStr>, category: impl Into<SmolStr>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            content: content.into(),
        }
    }
}

/// Ordered collection of templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    pub fn new(templates: Vec<Template>) -> Self {
        Self { templates }
    }

    /// Load a library from a JSON array of `{name, category, content}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn push(&mut self, template: Template) {
        self.templates.push(template);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    /// Distinct categories, in order of first appearance.
    pub fn categories(&self) -> Vec<SmolStr> {
        let mut out: Vec<SmolStr> = Vec::new();
        for t in &self.templates {
            if !out.contains(&t.category) {
                out.push(t.category.clone());
            }
        }
        out
    }

    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Template> + 'a {
        self.templates.iter().filter(move |t| t.category == category)
    }

    pub fn get(&self, name: &str) -> Result<&Template> {
        self.templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| EditorError::UnknownTemplate(name.to_string()))
    }
}
