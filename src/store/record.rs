//! Stored resource records and the typed create requests that build them
//!
//! Records are kept as JSON objects: updates merge arbitrary client fields
//! verbatim, so the stored shape is whatever the client last wrote on top of
//! the defaults filled in at creation.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::SimError;
use crate::ident::{split_full_path, ResourceKey, DEFAULT_PARTITION};

/// A decoded JSON request body
pub type Body = Map<String, Value>;

pub const POOL_KIND: &str = "tm:ltm:pool:poolstate";
pub const MEMBER_KIND: &str = "tm:ltm:pool:members:membersstate";
pub const VIRTUAL_KIND: &str = "tm:ltm:virtual:virtualstate";

/// One stored resource
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// Shallow, last-write-wins merge. `canonical` maps an incoming field
    /// name to the name it is stored under.
    pub fn merge(&mut self, patch: Body, canonical: fn(&str) -> &str) {
        for (field, value) in patch {
            let target = canonical(field.as_str()).to_string();
            self.0.insert(target, value);
        }
    }

    /// Copy for a collection listing with the store key written over the
    /// record's own name and partition filled in when missing
    pub fn listed_under(&self, key: &ResourceKey) -> Record {
        let mut item = self.clone();
        item.0
            .entry("partition")
            .or_insert_with(|| Value::String(key.partition.clone()));
        item.set("name", Value::String(key.name.clone()));
        item
    }
}

/// Pool fields that clients may send under a snake-case alias
pub fn pool_field_name(field: &str) -> &str {
    match field {
        "lb_method" => "loadBalancingMode",
        "min_up_members" => "minUpMembers",
        "monitor_type" => "monitor",
        other => other,
    }
}

/// Member and virtual fields are stored as sent
pub fn verbatim_field_name(field: &str) -> &str {
    field
}

// ============================================================================
// Field helpers
// ============================================================================

fn non_empty_str<'a>(body: &'a Body, field: &str) -> Option<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// First present, non-null value among `fields`, else `default`
fn field_or(body: &Body, fields: &[&str], default: Value) -> Value {
    fields
        .iter()
        .filter_map(|f| body.get(*f))
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(default)
}

/// Resolve the key a create request targets.
///
/// Precedence for the name: `name`, then the last segment of `fullPath`. A
/// `name` field that is present but empty is rejected rather than skipped.
/// Precedence for the partition: `tmPartition`, then `partition`, then
/// `Common`. The `fullPath` partition segment is never used.
pub fn derive_key(body: &Body) -> Result<ResourceKey, SimError> {
    let name = match body.get("name") {
        Some(_) => non_empty_str(body, "name"),
        None => non_empty_str(body, "fullPath").map(|path| split_full_path(path).1),
    }
    .filter(|name| !name.is_empty())
    .ok_or(SimError::MissingField("name"))?;

    let partition = non_empty_str(body, "tmPartition")
        .or_else(|| non_empty_str(body, "partition"))
        .unwrap_or(DEFAULT_PARTITION);
    Ok(ResourceKey::new(partition, name))
}

fn identity(key: &ResourceKey, kind: &str, self_link: String) -> Body {
    let mut record = Body::new();
    record.insert("kind".into(), json!(kind));
    record.insert("name".into(), json!(key.name));
    record.insert("partition".into(), json!(key.partition));
    record.insert("tmPartition".into(), json!(key.partition));
    record.insert("fullPath".into(), json!(key.full_path()));
    record.insert("selfLink".into(), json!(self_link));
    record
}

pub fn pool_link(key: &ResourceKey) -> String {
    format!("/mgmt/tm/ltm/pool/{}", key.tilde_path())
}

pub fn members_link(pool: &ResourceKey) -> String {
    format!("{}/members", pool_link(pool))
}

pub fn virtual_link(key: &ResourceKey) -> String {
    format!("/mgmt/tm/ltm/virtual/{}", key.tilde_path())
}

// ============================================================================
// Create requests
// ============================================================================

/// A validated pool create request
#[derive(Debug, Clone, PartialEq)]
pub struct NewPool {
    pub key: ResourceKey,
    pub description: Value,
    pub load_balancing_mode: Value,
    pub min_up_members: Value,
    pub min_up_members_action: Value,
    pub min_up_members_checking: Value,
    pub monitor: Value,
}

impl NewPool {
    pub fn from_body(body: &Body) -> Result<Self, SimError> {
        Ok(Self {
            key: derive_key(body)?,
            description: field_or(body, &["description"], json!("")),
            load_balancing_mode: field_or(
                body,
                &["loadBalancingMode", "lb_method"],
                json!("round-robin"),
            ),
            min_up_members: field_or(body, &["minUpMembers", "min_up_members"], json!(0)),
            min_up_members_action: field_or(
                body,
                &["minUpMembersAction", "min_up_members_action"],
                json!("failover"),
            ),
            min_up_members_checking: field_or(
                body,
                &["minUpMembersChecking", "min_up_members_checking"],
                json!("disabled"),
            ),
            monitor: field_or(body, &["monitor", "monitor_type"], json!("none")),
        })
    }

    pub fn into_record(self) -> Record {
        let mut record = identity(&self.key, POOL_KIND, pool_link(&self.key));
        record.insert("description".into(), self.description);
        record.insert("loadBalancingMode".into(), self.load_balancing_mode);
        record.insert("minUpMembers".into(), self.min_up_members);
        record.insert("minUpMembersAction".into(), self.min_up_members_action);
        record.insert("minUpMembersChecking".into(), self.min_up_members_checking);
        record.insert("monitor".into(), self.monitor);
        record.insert(
            "membersReference".into(),
            json!({ "link": members_link(&self.key) }),
        );
        Record(record)
    }
}

/// A validated pool member create request
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub name: String,
    pub address: Value,
    pub port: Value,
    pub description: Value,
    pub session: Value,
    pub ratio: Value,
    pub state: Value,
}

impl NewMember {
    /// Member name precedence: `name`, then `address`, then `{pool}:{port}`
    pub fn from_body(pool: &ResourceKey, body: &Body) -> Self {
        let name = non_empty_str(body, "name")
            .or_else(|| non_empty_str(body, "address"))
            .map(str::to_string)
            .unwrap_or_else(|| {
                let port = match body.get("port") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => "0".to_string(),
                };
                format!("{}:{}", pool.name, port)
            });

        Self {
            name,
            address: field_or(body, &["address"], Value::Null),
            port: field_or(body, &["port"], Value::Null),
            description: field_or(body, &["description"], json!("")),
            session: field_or(body, &["session"], json!("user-enabled")),
            ratio: field_or(body, &["ratio"], json!(1)),
            state: field_or(body, &["state"], json!("user-up")),
        }
    }

    pub fn into_record(self, pool: &ResourceKey) -> Record {
        let key = ResourceKey::new(pool.partition.clone(), self.name);
        let self_link = format!("{}/{}", members_link(pool), key.tilde_path());
        let mut record = identity(&key, MEMBER_KIND, self_link);
        record.insert("address".into(), self.address);
        record.insert("port".into(), self.port);
        record.insert("description".into(), self.description);
        record.insert("session".into(), self.session);
        record.insert("ratio".into(), self.ratio);
        record.insert("state".into(), self.state);
        Record(record)
    }
}

/// A validated virtual server create request
#[derive(Debug, Clone, PartialEq)]
pub struct NewVirtual {
    pub key: ResourceKey,
    pub description: Value,
    pub destination: Value,
    /// Soft reference; the named pool need not exist
    pub pool: Value,
    pub enabled: Value,
    pub connection_limit: Value,
}

impl NewVirtual {
    pub fn from_body(body: &Body) -> Result<Self, SimError> {
        Ok(Self {
            key: derive_key(body)?,
            description: field_or(body, &["description"], json!("")),
            destination: field_or(body, &["destination"], Value::Null),
            pool: field_or(body, &["pool"], Value::Null),
            enabled: field_or(body, &["enabled"], json!(true)),
            connection_limit: field_or(body, &["connectionLimit"], json!(0)),
        })
    }

    pub fn into_record(self) -> Record {
        let mut record = identity(&self.key, VIRTUAL_KIND, virtual_link(&self.key));
        record.insert("description".into(), self.description);
        record.insert("destination".into(), self.destination);
        record.insert("pool".into(), self.pool);
        record.insert("enabled".into(), self.enabled);
        record.insert("connectionLimit".into(), self.connection_limit);
        Record(record)
    }
}
