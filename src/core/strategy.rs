//! Copy strategy abstraction and registry
//!
//! A strategy is one interchangeable way of copying a single file. The
//! registry keeps strategy names unique and hands out shared, immutable
//! instances.

use crate::error::{BenchError, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A named, blocking file-copy primitive
pub trait CopyStrategy: Send + Sync {
    /// Unique name of the strategy
    fn name(&self) -> &str;

    /// Copy `source` to `dest`, returning bytes written
    fn copy(&self, source: &Path, dest: &Path) -> Result<u64>;

    /// Native async form of this strategy, if it has one
    fn as_async(&self) -> Option<Arc<dyn AsyncCopyStrategy>> {
        None
    }
}

/// A named, async file-copy primitive
#[async_trait]
pub trait AsyncCopyStrategy: Send + Sync {
    /// Unique name of the strategy
    fn name(&self) -> &str;

    /// Copy `source` to `dest`, returning bytes written
    async fn copy(&self, source: &Path, dest: &Path) -> Result<u64>;
}

/// Strategy built from a closure
pub struct FnStrategy<F> {
    name: String,
    func: F,
}

impl<F> FnStrategy<F>
where
    F: Fn(&Path, &Path) -> Result<u64> + Send + Sync,
{
    /// Create a new closure-backed strategy
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> CopyStrategy for FnStrategy<F>
where
    F: Fn(&Path, &Path) -> Result<u64> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn copy(&self, source: &Path, dest: &Path) -> Result<u64> {
        (self.func)(source, dest)
    }
}

/// Runs an async strategy to completion on a tokio runtime handle
pub struct BlockingAdapter<S> {
    inner: Arc<S>,
    handle: tokio::runtime::Handle,
}

impl<S: AsyncCopyStrategy + 'static> BlockingAdapter<S> {
    /// Wrap an async strategy
    pub fn new(inner: Arc<S>, handle: tokio::runtime::Handle) -> Self {
        Self { inner, handle }
    }
}

impl<S: AsyncCopyStrategy + 'static> CopyStrategy for BlockingAdapter<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn copy(&self, source: &Path, dest: &Path) -> Result<u64> {
        // Must not be invoked from inside a runtime worker thread
        self.handle.block_on(self.inner.copy(source, dest))
    }

    fn as_async(&self) -> Option<Arc<dyn AsyncCopyStrategy>> {
        let inner: Arc<dyn AsyncCopyStrategy> = self.inner.clone();
        Some(inner)
    }
}

/// Ordered set of strategies with unique names
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn CopyStrategy>>,
}

impl StrategyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy; fails if the name is already taken
    pub fn register(&mut self, strategy: Arc<dyn CopyStrategy>) -> Result<()> {
        let name = strategy.name();
        if name.is_empty() {
            return Err(BenchError::config("strategy name must not be empty"));
        }
        if self.get(name).is_some() {
            return Err(BenchError::DuplicateStrategy(name.to_string()));
        }

        tracing::debug!("Registered strategy '{}'", name);
        self.strategies.push(strategy);
        Ok(())
    }

    /// Look up a strategy by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn CopyStrategy>> {
        self.strategies
            .iter()
            .find(|s| s.name() == name)
            .map(Arc::clone)
    }

    /// Keep only the named strategies, in the order given
    pub fn select(&self, names: &[String]) -> Result<StrategyRegistry> {
        let mut selected = StrategyRegistry::new();
        for name in names {
            let strategy = self
                .get(name)
                .ok_or_else(|| BenchError::UnknownStrategy(name.clone()))?;
            selected.register(strategy)?;
        }
        Ok(selected)
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Iterate over strategies in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CopyStrategy>> {
        self.strategies.iter()
    }

    /// Number of strategies
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}
