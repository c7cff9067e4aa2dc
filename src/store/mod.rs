//! In-memory LTM configuration store
//!
//! Pools own their members: a pool entry and its member table share one map
//! slot, so deleting a pool drops its members under the same lock and no
//! reader can observe members of a pool that is gone.

pub mod record;

pub use record::{Body, NewMember, NewPool, NewVirtual, Record};

use std::collections::HashMap;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use crate::error::{ResourceKind, SimError};
use crate::ident::ResourceKey;
use record::{pool_field_name, verbatim_field_name};

#[derive(Debug, Clone)]
struct PoolEntry {
    record: Record,
    members: HashMap<String, Record>,
}

/// Pools, their members and virtual servers, keyed by `(partition, name)`
#[derive(Default)]
pub struct ResourceStore {
    pools: DashMap<ResourceKey, PoolEntry>,
    virtuals: DashMap<ResourceKey, Record>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Pools
    // =========================================================================

    pub fn list_pools(&self) -> Vec<Record> {
        let mut pools: Vec<(ResourceKey, Record)> = self
            .pools
            .iter()
            .map(|e| (e.key().clone(), e.record.listed_under(e.key())))
            .collect();
        pools.sort_by(|a, b| a.0.cmp(&b.0));
        pools.into_iter().map(|(_, r)| r).collect()
    }

    /// Create or overwrite a pool. An existing member table is kept.
    pub fn create_pool(&self, pool: NewPool) -> Record {
        let key = pool.key.clone();
        let record = pool.into_record();

        match self.pools.entry(key.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().record = record.clone(),
            Entry::Vacant(entry) => {
                entry.insert(PoolEntry {
                    record: record.clone(),
                    members: HashMap::new(),
                });
            }
        }

        info!("Pool created: {}", key);
        record
    }

    pub fn get_pool(&self, key: &ResourceKey) -> Result<Record, SimError> {
        self.pools
            .get(key)
            .map(|e| e.record.clone())
            .ok_or(SimError::NotFound(ResourceKind::Pool))
    }

    /// Merge `patch` into a pool; `lb_method`, `min_up_members` and
    /// `monitor_type` land on their canonical field names.
    pub fn update_pool(&self, key: &ResourceKey, patch: Body) -> Result<Record, SimError> {
        let mut entry = self
            .pools
            .get_mut(key)
            .ok_or(SimError::NotFound(ResourceKind::Pool))?;
        entry.record.merge(patch, pool_field_name);
        info!("Pool updated: {}", key);
        Ok(entry.record.clone())
    }

    /// Remove a pool together with all of its members
    pub fn delete_pool(&self, key: &ResourceKey) -> Result<(), SimError> {
        let (_, entry) = self
            .pools
            .remove(key)
            .ok_or(SimError::NotFound(ResourceKind::Pool))?;
        info!("Pool deleted: {} ({} members)", key, entry.members.len());
        Ok(())
    }

    // =========================================================================
    // Pool members
    // =========================================================================

    pub fn list_members(&self, pool: &ResourceKey) -> Result<Vec<Record>, SimError> {
        let entry = self
            .pools
            .get(pool)
            .ok_or(SimError::NotFound(ResourceKind::Pool))?;
        let mut members: Vec<(&String, &Record)> = entry.members.iter().collect();
        members.sort_by(|a, b| a.0.cmp(b.0));
        Ok(members.into_iter().map(|(_, r)| r.clone()).collect())
    }

    /// Create or overwrite a member of an existing pool
    pub fn create_member(&self, pool: &ResourceKey, body: &Body) -> Result<Record, SimError> {
        let mut entry = self
            .pools
            .get_mut(pool)
            .ok_or(SimError::NotFound(ResourceKind::Pool))?;

        let member = NewMember::from_body(pool, body);
        let name = member.name.clone();
        let record = member.into_record(pool);
        entry.members.insert(name.clone(), record.clone());

        info!("Pool member created: {} -> {}", pool, name);
        Ok(record)
    }

    pub fn get_member(&self, pool: &ResourceKey, member_id: &str) -> Result<Record, SimError> {
        let entry = self
            .pools
            .get(pool)
            .ok_or(SimError::NotFound(ResourceKind::Pool))?;
        let name = resolve_member(&entry.members, member_id)?;
        Ok(entry.members[&name].clone())
    }

    /// Shallow merge with no field renaming
    pub fn update_member(
        &self,
        pool: &ResourceKey,
        member_id: &str,
        patch: Body,
    ) -> Result<Record, SimError> {
        let mut entry = self
            .pools
            .get_mut(pool)
            .ok_or(SimError::NotFound(ResourceKind::Pool))?;
        let name = resolve_member(&entry.members, member_id)?;

        let member = entry
            .members
            .get_mut(&name)
            .ok_or(SimError::NotFound(ResourceKind::Member))?;
        member.merge(patch, verbatim_field_name);
        let record = member.clone();

        info!("Pool member updated: {} -> {}", pool, name);
        Ok(record)
    }

    pub fn delete_member(&self, pool: &ResourceKey, member_id: &str) -> Result<(), SimError> {
        let mut entry = self
            .pools
            .get_mut(pool)
            .ok_or(SimError::NotFound(ResourceKind::Pool))?;
        let name = resolve_member(&entry.members, member_id)?;
        entry.members.remove(&name);

        info!("Pool member deleted: {} -> {}", pool, name);
        Ok(())
    }

    // =========================================================================
    // Virtual servers
    // =========================================================================

    pub fn list_virtuals(&self) -> Vec<Record> {
        let mut virtuals: Vec<(ResourceKey, Record)> = self
            .virtuals
            .iter()
            .map(|e| (e.key().clone(), e.value().listed_under(e.key())))
            .collect();
        virtuals.sort_by(|a, b| a.0.cmp(&b.0));
        virtuals.into_iter().map(|(_, r)| r).collect()
    }

    /// Create or overwrite a virtual server. The referenced pool is not checked.
    pub fn create_virtual(&self, virtual_server: NewVirtual) -> Record {
        let key = virtual_server.key.clone();
        let record = virtual_server.into_record();
        self.virtuals.insert(key.clone(), record.clone());
        info!("Virtual created: {}", key);
        record
    }

    pub fn get_virtual(&self, key: &ResourceKey) -> Result<Record, SimError> {
        self.virtuals
            .get(key)
            .map(|r| r.clone())
            .ok_or(SimError::NotFound(ResourceKind::Virtual))
    }

    pub fn update_virtual(&self, key: &ResourceKey, patch: Body) -> Result<Record, SimError> {
        let mut record = self
            .virtuals
            .get_mut(key)
            .ok_or(SimError::NotFound(ResourceKind::Virtual))?;
        record.merge(patch, verbatim_field_name);
        info!("Virtual updated: {}", key);
        Ok(record.clone())
    }

    pub fn delete_virtual(&self, key: &ResourceKey) -> Result<(), SimError> {
        self.virtuals
            .remove(key)
            .ok_or(SimError::NotFound(ResourceKind::Virtual))?;
        info!("Virtual deleted: {}", key);
        Ok(())
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn virtual_count(&self) -> usize {
        self.virtuals.len()
    }
}

/// Find a member by the name inside `member_id` (`~Common~m1` -> `m1`),
/// falling back to the raw identifier.
fn resolve_member(members: &HashMap<String, Record>, member_id: &str) -> Result<String, SimError> {
    let resolved = ResourceKey::parse(member_id).name;
    if members.contains_key(&resolved) {
        Ok(resolved)
    } else if members.contains_key(member_id) {
        Ok(member_id.to_string())
    } else {
        Err(SimError::NotFound(ResourceKind::Member))
    }
}
