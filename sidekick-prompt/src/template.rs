use std::collections::HashMap;

use regex::Regex;
use sidekick_core::{SidekickError, Value};

/// Text with `{{name}}` placeholders.
///
/// Substitution is a single pass, so values that themselves contain
/// `{{...}}` are inserted literally. Unknown placeholders render empty.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn render(&self, vars: &HashMap<String, Value>) -> Result<String, SidekickError> {
        let pattern = Regex::new(r"\{\{\s*(\w+)\s*\}\}")
            .map_err(|e| SidekickError::InvalidConfig(e.to_string()))?;
        let rendered = pattern.replace_all(&self.template, |caps: &regex::Captures| {
            let key = &caps[1];
            match vars.get(key) {
                Some(value) => value
                    .as_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| value.to_string()),
                None => String::new(),
            }
        });
        Ok(rendered.to_string())
    }
}
