use std::{collections::HashSet, sync::Arc};

use dashmap::DashMap;
use tracing::debug;

use crate::{
    parser::ParseOptions,
    rules::{CompileError, CompiledRule},
};

/// Compiled rules keyed by their raw text.
///
/// Identical rule strings across collections share one `Arc<CompiledRule>`.
/// Lookups and inserts lock one shard only.
#[derive(Debug, Default)]
pub struct RuleCache {
    entries: DashMap<String, Arc<CompiledRule>>,
    options: ParseOptions,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParseOptions) -> Self {
        RuleCache {
            entries: DashMap::new(),
            options,
        }
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    /// Returns the cached rule for `source`, compiling it on first use.
    ///
    /// Compile failures are not cached.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<CompiledRule>, CompileError> {
        if let Some(hit) = self.entries.get(source) {
            return Ok(Arc::clone(hit.value()));
        }
        let compiled = Arc::new(CompiledRule::compile_with(source, self.options)?);
        debug!(rule = source, "compiled rule");
        // a concurrent compile of the same text may have won the race
        let entry = self
            .entries
            .entry(source.to_string())
            .or_insert(compiled);
        Ok(Arc::clone(entry.value()))
    }

    /// Drops every entry whose text is not in `live`.
    pub fn retain_sources(&self, live: &HashSet<&str>) {
        self.entries.retain(|source, _| {
            let keep = live.contains(source.as_str());
            if !keep {
                debug!(rule = %source, "evicted unreferenced rule");
            }
            keep
        });
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_entry() {
        let cache = RuleCache::new();
        let a = cache.get_or_compile("views > 10").unwrap();
        let b = cache.get_or_compile("views > 10").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failures_not_cached() {
        let cache = RuleCache::new();
        assert!(cache.get_or_compile("views >").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_retain() {
        let cache = RuleCache::new();
        cache.get_or_compile("a = 1").unwrap();
        cache.get_or_compile("b = 2").unwrap();
        cache.retain_sources(&HashSet::from(["b = 2"]));
        assert!(!cache.contains("a = 1"));
        assert!(cache.contains("b = 2"));
    }
}
