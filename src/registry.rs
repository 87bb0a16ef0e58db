//! Published rule sets, one per collection.
//!
//! Readers take a snapshot with [`RuleRegistry::get`] and keep evaluating
//! against it even while a writer republishes. A definition is compiled in
//! full before it replaces anything, so a bad rule never reaches readers.
//! Writers are serialized so cache eviction always sees the latest snapshot.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use arc_swap::ArcSwap;
use thiserror::Error;
use tracing::debug;

use crate::{
    cache::RuleCache,
    config::EngineConfig,
    rules::{CollectionDef, CollectionRules, CompileError, CompiledRule, RuleError},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Collection name must not be empty")]
    EmptyName,

    #[error("Collection `{collection}` has an {source}")]
    InvalidRule {
        collection: String,
        #[source]
        source: RuleError,
    },
}

type Snapshot = HashMap<String, Arc<CollectionRules>>;

#[derive(Debug)]
pub struct RuleRegistry {
    collections: ArcSwap<Snapshot>,
    cache: RuleCache,
    writer: Mutex<()>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        RuleRegistry {
            collections: ArcSwap::from_pointee(HashMap::new()),
            cache: RuleCache::with_options(config.parse_options()),
            writer: Mutex::new(()),
        }
    }

    /// Compiles and publishes a collection's rules, replacing any earlier
    /// definition under the same name.
    pub fn upsert(&self, def: &CollectionDef) -> Result<Arc<CollectionRules>, RegistryError> {
        if def.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let _writer = self.lock_writer();
        let rules = CollectionRules::compile_with(def, |source| self.cache.get_or_compile(source))
            .map_err(|source| RegistryError::InvalidRule {
                collection: def.name.clone(),
                source,
            })?;
        let rules = Arc::new(rules);

        self.collections.rcu(|current| {
            let mut next = Snapshot::clone(current);
            next.insert(def.name.clone(), Arc::clone(&rules));
            next
        });
        debug!(collection = %def.name, kind = ?def.kind, "published collection rules");
        self.evict_unreferenced();
        Ok(rules)
    }

    /// Unpublishes a collection. Returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        let _writer = self.lock_writer();
        if !self.collections.load().contains_key(name) {
            return false;
        }
        self.collections.rcu(|current| {
            let mut next = Snapshot::clone(current);
            next.remove(name);
            next
        });
        debug!(collection = name, "removed collection rules");
        self.evict_unreferenced();
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<CollectionRules>> {
        self.collections.load().get(name).cloned()
    }

    /// Every published collection at one instant.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.collections.load_full()
    }

    /// Compiles a client-supplied filter under the registry's limits.
    ///
    /// Client filters are not cached: their text is unbounded.
    pub fn compile_filter(&self, source: &str) -> Result<CompiledRule, CompileError> {
        CompiledRule::compile_with(source, self.cache.options())
    }

    pub fn cache(&self) -> &RuleCache {
        &self.cache
    }

    pub fn len(&self) -> usize {
        self.collections.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The guarded state is the snapshot itself, which a panicking writer
    // never leaves half-published.
    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict_unreferenced(&self) {
        let snapshot = self.collections.load();
        let live: HashSet<&str> = snapshot.values().flat_map(|rules| rules.sources()).collect();
        self.cache.retain_sources(&live);
    }
}
