//! Prepared history-insert plans
//!
//! Plans are keyed by history relation id and remember the qualified name
//! they were prepared for. A prepared statement names its target, so a
//! renamed history table needs a fresh plan; a lookup re-prepares when the
//! relation's current name differs from the cached one.
//!
//! The cache is owned by the engine that uses it. There is no process-wide
//! instance.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::PlanCacheConfig;
use crate::row::{QualifiedName, Relation, RelationId};
use crate::storage::{PreparedInsert, StorageFacility, StorageResult};

/// How a plan lookup was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanLookup {
    /// Cached plan reused
    Hit,
    /// First plan for this relation
    Prepared,
    /// Cached plan replaced because the relation was renamed
    Refreshed,
    /// Cache full; plan prepared for this insert only and released after
    Uncached,
}

/// Passive lookup statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanCacheStats {
    pub hits: u64,
    pub prepares: u64,
    pub refreshes: u64,
    pub uncached: u64,
}

#[derive(Debug, Clone)]
struct CachedPlan {
    name: QualifiedName,
    plan: PreparedInsert,
}

#[derive(Debug)]
pub struct InsertPlanCache {
    max_entries: usize,
    entries: HashMap<RelationId, CachedPlan>,
    stats: PlanCacheStats,
}

impl InsertPlanCache {
    pub fn new(config: &PlanCacheConfig) -> Self {
        Self {
            max_entries: if config.enabled { config.max_entries } else { 0 },
            entries: HashMap::new(),
            stats: PlanCacheStats::default(),
        }
    }

    /// Returns a plan valid for `relation`'s current name.
    pub fn plan_for(
        &mut self,
        relation: &Relation,
        storage: &mut dyn StorageFacility,
    ) -> StorageResult<(PreparedInsert, PlanLookup)> {
        if let Some(cached) = self.entries.get(&relation.id) {
            if cached.name == relation.name {
                self.stats.hits += 1;
                return Ok((cached.plan.clone(), PlanLookup::Hit));
            }
        }

        let plan = storage.prepare_insert(relation)?;
        let lookup = if let Some(stale) = self.entries.remove(&relation.id) {
            storage.release_insert(&stale.plan);
            self.stats.refreshes += 1;
            PlanLookup::Refreshed
        } else if self.entries.len() < self.max_entries {
            self.stats.prepares += 1;
            PlanLookup::Prepared
        } else {
            self.stats.uncached += 1;
            return Ok((plan, PlanLookup::Uncached));
        };

        self.entries.insert(
            relation.id,
            CachedPlan {
                name: relation.name.clone(),
                plan: plan.clone(),
            },
        );
        Ok((plan, lookup))
    }

    /// Qualified name the cached plan for `id` targets
    pub fn cached_name(&self, id: RelationId) -> Option<&QualifiedName> {
        self.entries.get(&id).map(|c| &c.name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> PlanCacheStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
