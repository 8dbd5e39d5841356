//! Named provider lookup.

use crate::Provider;
use compact_str::CompactString;
use mcore::Error;
use std::collections::BTreeMap;

/// Lookup from display name to provider instance.
///
/// Built once at startup and read-only thereafter.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<CompactString, Provider>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry populated with every built-in provider, the
    /// OpenAI-compatible one without an API key.
    pub fn defaults() -> Self {
        let mut registry = Self::new();
        for provider in [
            Provider::Ollama,
            Provider::OpenAiCompat { api_key: None },
            Provider::LmStudio,
        ] {
            registry.register(provider);
        }
        registry
    }

    /// Register a provider under its display name. Replaces any previous
    /// entry with the same name.
    pub fn register(&mut self, provider: Provider) {
        self.providers
            .insert(CompactString::const_new(provider.name()), provider);
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Result<Provider, Error> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownProvider(name.into()))
    }

    /// The registered names, sorted.
    pub fn names(&self) -> Vec<CompactString> {
        self.providers.keys().cloned().collect()
    }
}
