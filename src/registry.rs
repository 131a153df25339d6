//! Operator registry: named chunker and retriever factories.
//!
//! An explicitly constructed map, populated at startup and passed by
//! reference (usually behind an `Arc`); there is no global mutable
//! registry. Lookup of an unknown name returns `None`; callers decide
//! whether to default or surface a config error.

use std::collections::HashMap;
use std::sync::Arc;

use crate::chunkers::{build_chunker, Chunker};
use crate::error::{Result, RetrievalError};
use crate::retrievers::{build_retriever, Retriever, RetrieverDeps};
use crate::types::config::{ChunkerConfig, OperatorSpec, RetrieverConfig};

/// Builds a chunker from a `{name, params}` spec.
pub type ChunkerFactory = Arc<dyn Fn(&OperatorSpec) -> Result<Arc<dyn Chunker>> + Send + Sync>;

/// Builds a retriever from a `{name, params}` spec and runtime deps.
pub type RetrieverFactory =
    Arc<dyn Fn(&OperatorSpec, &RetrieverDeps) -> Result<Arc<dyn Retriever>> + Send + Sync>;

/// Named factories for chunkers and retrievers.
#[derive(Default)]
pub struct OperatorRegistry {
    chunkers: HashMap<String, ChunkerFactory>,
    retrievers: HashMap<String, RetrieverFactory>,
}

impl OperatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in strategy.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for name in ChunkerConfig::NAMES {
            registry.register_chunker(
                *name,
                Arc::new(|spec: &OperatorSpec| {
                    let config = ChunkerConfig::from_spec(spec)?;
                    build_chunker(&config)
                }),
            );
        }
        for name in RetrieverConfig::NAMES {
            registry.register_retriever(
                *name,
                Arc::new(|spec: &OperatorSpec, deps: &RetrieverDeps| {
                    let config = RetrieverConfig::from_spec(spec)?;
                    build_retriever(&config, deps)
                }),
            );
        }
        registry
    }

    /// Register (or replace) a chunker factory.
    pub fn register_chunker(&mut self, name: impl Into<String>, factory: ChunkerFactory) {
        self.chunkers.insert(name.into(), factory);
    }

    /// Register (or replace) a retriever factory.
    pub fn register_retriever(&mut self, name: impl Into<String>, factory: RetrieverFactory) {
        self.retrievers.insert(name.into(), factory);
    }

    /// Look up a chunker factory. Unknown names are `None`, never an
    /// error.
    pub fn chunker(&self, name: &str) -> Option<&ChunkerFactory> {
        self.chunkers.get(name)
    }

    /// Look up a retriever factory.
    pub fn retriever(&self, name: &str) -> Option<&RetrieverFactory> {
        self.retrievers.get(name)
    }

    /// Registered chunker names, sorted.
    pub fn list_chunkers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.chunkers.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Registered retriever names, sorted.
    pub fn list_retrievers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.retrievers.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Build a chunker, raising a config error for unknown names.
    pub fn resolve_chunker(&self, spec: &OperatorSpec) -> Result<Arc<dyn Chunker>> {
        let factory = self.chunker(&spec.name).ok_or_else(|| {
            RetrievalError::config(format!(
                "unknown chunker '{}'; registered: {:?}",
                spec.name,
                self.list_chunkers()
            ))
        })?;
        factory(spec)
    }

    /// Build a retriever, raising a config error for unknown names.
    pub fn resolve_retriever(
        &self,
        spec: &OperatorSpec,
        deps: &RetrieverDeps,
    ) -> Result<Arc<dyn Retriever>> {
        let factory = self.retriever(&spec.name).ok_or_else(|| {
            RetrievalError::config(format!(
                "unknown retriever '{}'; registered: {:?}",
                spec.name,
                self.list_retrievers()
            ))
        })?;
        factory(spec, deps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let registry = OperatorRegistry::with_builtins();
        assert_eq!(registry.list_chunkers().len(), ChunkerConfig::NAMES.len());
        assert_eq!(
            registry.list_retrievers().len(),
            RetrieverConfig::NAMES.len()
        );
        assert!(registry.chunker("separator").is_some());
        assert!(registry.retriever("hybrid").is_some());
    }

    #[test]
    fn test_unknown_name_is_none() {
        let registry = OperatorRegistry::with_builtins();
        assert!(registry.chunker("nope").is_none());
        assert!(registry.retriever("nope").is_none());
    }

    #[test]
    fn test_resolve_unknown_is_config_error() {
        let registry = OperatorRegistry::with_builtins();
        let err = registry
            .resolve_chunker(&OperatorSpec::named("nope"))
            .err()
            .unwrap();
        assert!(matches!(err, RetrievalError::Config { .. }));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = OperatorRegistry::new();
        registry.register_chunker(
            "custom",
            Arc::new(|spec: &OperatorSpec| {
                let config = ChunkerConfig::from_spec(&OperatorSpec {
                    name: "fixed".to_string(),
                    params: spec.params.clone(),
                })?;
                build_chunker(&config)
            }),
        );
        assert!(registry
            .resolve_chunker(&OperatorSpec::named("custom"))
            .is_ok());
        assert_eq!(registry.list_chunkers(), vec!["custom"]);
    }
}
