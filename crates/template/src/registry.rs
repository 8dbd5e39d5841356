//! Named template lookup.

use crate::Template;
use compact_str::CompactString;
use mcore::{Error, RequestType};
use std::collections::BTreeMap;

/// Lookup from display name to template.
///
/// Built once at startup and read-only thereafter; lookups return copies of
/// the (stateless) template value.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<CompactString, Template>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry populated with every built-in template.
    pub fn defaults() -> Self {
        let mut registry = Self::new();
        for template in [
            Template::Llama3,
            Template::ChatML,
            Template::Alpaca,
            Template::CodeLlamaFim,
            Template::Plain,
        ] {
            registry.register(template);
        }
        registry
    }

    /// Register a template under its display name. Replaces any previous
    /// entry with the same name.
    pub fn register(&mut self, template: Template) {
        self.templates
            .insert(CompactString::const_new(template.name()), template);
    }

    /// Look up a template by name.
    pub fn get(&self, name: &str) -> Result<Template, Error> {
        self.templates
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownTemplate(name.into()))
    }

    /// Look up a chat template by name; rejects completion templates.
    pub fn get_chat(&self, name: &str) -> Result<Template, Error> {
        self.get_kind(name, RequestType::Chat)
    }

    /// Look up a completion template by name; rejects chat templates.
    pub fn get_completion(&self, name: &str) -> Result<Template, Error> {
        self.get_kind(name, RequestType::Completion)
    }

    /// The registered names, sorted.
    pub fn names(&self) -> Vec<CompactString> {
        self.templates.keys().cloned().collect()
    }

    fn get_kind(&self, name: &str, kind: RequestType) -> Result<Template, Error> {
        let template = self.get(name)?;
        if template.kind() != kind {
            return Err(Error::UnknownTemplate(name.into()));
        }
        Ok(template)
    }
}
