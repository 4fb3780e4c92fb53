//! Per-source resource cache.
//!
//! Only one transport should exist per package source so that connections
//! are pooled rather than opened per query. [`ResourceCache`] builds each
//! resource on first use and hands every later caller the same `Arc`.

use dashmap::DashMap;
use log::debug;
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::source::{PackageSource, SourceKey};

/// Builds the resource bound to one package source.
pub trait ResourceFactory: Send + Sync {
    type Resource: Send + Sync;
    type Error;

    fn create(&self, source: &PackageSource) -> Result<Self::Resource, Self::Error>;
}

type Slot<R> = Arc<OnceCell<Arc<R>>>;

/// Lazily constructs at most one resource per [`SourceKey`].
///
/// Each key owns a cell. The map's shard lock is held only long enough to
/// find or insert that cell; construction runs on the cell itself, so
/// concurrent callers for the same key wait for the first one and receive
/// its resource while other keys stay readable. A failed construction
/// leaves the cell empty.
pub struct ResourceCache<F: ResourceFactory> {
    factory: F,
    resources: DashMap<SourceKey, Slot<F::Resource>>,
}

impl<F: ResourceFactory> ResourceCache<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            resources: DashMap::new(),
        }
    }

    /// Returns the resource for `source`, building it on first use.
    ///
    /// Non-HTTP sources have no resource: the result is `Ok(None)` and the
    /// factory is not consulted.
    pub fn get_or_create(&self, source: &PackageSource) -> Result<Option<Arc<F::Resource>>, F::Error> {
        if !source.is_http() {
            debug!("{} is not an HTTP source, no resource created", source);
            return Ok(None);
        }

        let slot = self.slot(source.key());
        let resource = slot.get_or_try_init(|| {
            debug!("Creating resource for {}", source);
            self.factory.create(source).map(Arc::new)
        })?;
        Ok(Some(Arc::clone(resource)))
    }

    fn slot(&self, key: SourceKey) -> Slot<F::Resource> {
        if let Some(slot) = self.resources.get(&key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.resources.entry(key).or_default().value())
    }

    /// Returns true if a resource has been built for `source`.
    pub fn contains(&self, source: &PackageSource) -> bool {
        self.resources
            .get(&source.key())
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Number of resources built so far.
    pub fn len(&self) -> usize {
        self.resources
            .iter()
            .filter(|slot| slot.value().get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}
