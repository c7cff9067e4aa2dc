//! Response envelopes in the iControl REST shapes clients expect

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::{Token, TOKEN_TIMEOUT_SECS};
use crate::config::Credentials;
use crate::store::Record;

pub const POOL_COLLECTION_KIND: &str = "tm:ltm:pool:poolcollectionstate";
pub const MEMBER_COLLECTION_KIND: &str = "tm:ltm:pool:members:memberscollectionstate";
pub const VIRTUAL_COLLECTION_KIND: &str = "tm:ltm:virtual:virtualcollectionstate";

const TOKEN_KIND: &str = "shared:authz:tokens:authtokenitemstate";
const SYS_VERSION: &str = "17.1.0";
const HOST: &str = "https://localhost";

/// A collection listing
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub kind: &'static str,
    #[serde(rename = "selfLink")]
    pub self_link: String,
    pub items: Vec<Record>,
}

impl Collection {
    pub fn new(kind: &'static str, self_link: impl Into<String>, items: Vec<Record>) -> Self {
        Self {
            kind,
            self_link: self_link.into(),
            items,
        }
    }
}

/// Body returned by every delete
pub fn deleted() -> Value {
    json!({ "message": "deleted" })
}

fn start_time(micros: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// The `token` object shared by login and token lookup
pub fn token_descriptor(token: &Token) -> Value {
    json!({
        "token": token.token,
        "name": token.token,
        "userName": token.username,
        "authProviderName": token.login_provider,
        "user": {
            "link": format!(
                "{}/mgmt/cm/system/authn/providers/{}/users/{}",
                HOST, token.login_provider, token.username
            )
        },
        "timeout": TOKEN_TIMEOUT_SECS,
        "startTime": start_time(token.created_micros),
        "address": "127.0.0.1",
        "partition": "[All]",
        "generation": 1,
        "lastUpdateMicros": token.created_micros,
        "expirationMicros": token.expiration_micros,
        "kind": TOKEN_KIND,
        "selfLink": format!("{}/mgmt/shared/authz/tokens/{}", HOST, token.token),
    })
}

/// Full login response wrapping the token descriptor
pub fn login_response(token: &Token) -> Value {
    json!({
        "username": token.username,
        "loginReference": {
            "link": format!(
                "{}/mgmt/cm/system/authn/providers/{}/login",
                HOST, token.login_provider
            )
        },
        "loginProviderName": token.login_provider,
        "token": token_descriptor(token),
        "generation": 0,
        "lastUpdateMicros": 0,
    })
}

/// Fixed `/mgmt/tm/sys` catalog
pub fn sys_catalog() -> Value {
    let items: Vec<Value> = ["application", "db", "global-settings", "provision"]
        .iter()
        .map(|module| {
            json!({
                "reference": {
                    "link": format!("{}/mgmt/tm/sys/{}?ver={}", HOST, module, SYS_VERSION)
                }
            })
        })
        .collect();

    json!({
        "kind": "tm:sys:collectionstate",
        "selfLink": format!("{}/mgmt/tm/sys?ver={}", HOST, SYS_VERSION),
        "items": items,
    })
}

/// Fixed `/mgmt/tm/sys/global-settings` entries
pub fn global_settings() -> Value {
    json!({
        "kind": "tm:sys:global-settings:globalsettingsstate",
        "selfLink": format!("{}/mgmt/tm/sys/global-settings?ver={}", HOST, SYS_VERSION),
        "entries": {
            "https://localhost/mgmt/tm/sys/global-settings/0": {
                "nestedStats": {
                    "entries": {
                        "hostname": {"description": "f5-simulator"},
                        "product": {"description": "BIG-IP VE"},
                        "version": {"description": SYS_VERSION},
                        "edition": {"description": "Point Release 1"},
                        "userMode": {"description": "Appliance"},
                        "builtOn": {"description": "241118 184920"},
                        "jobId": {"description": "1234567"}
                    }
                }
            }
        }
    })
}

/// Liveness payload for `/`
pub fn root_status(credentials: &Credentials) -> Value {
    json!({
        "ok": true,
        "time": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        "auth": "Basic authentication or X-F5-Auth-Token required",
        "default_credentials": format!(
            "username: {}, password: {}",
            credentials.username, credentials.password
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token() -> Token {
        Token {
            token: "ABCDEFGHIJKLMNOPQRSTUVWXYZ".to_string(),
            username: "admin".to_string(),
            login_provider: "tmos".to_string(),
            created_micros: 1_700_000_000_000_000,
            expiration_micros: 1_700_001_200_000_000,
        }
    }

    #[test]
    fn test_login_response_shape() {
        let body = login_response(&sample_token());

        assert_eq!(body["username"], "admin");
        assert_eq!(body["loginProviderName"], "tmos");
        assert_eq!(body["token"]["token"], "ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        assert_eq!(body["token"]["timeout"], 1200);
        assert_eq!(body["token"]["expirationMicros"], 1_700_001_200_000_000i64);
        assert_eq!(body["token"]["startTime"], "2023-11-14T22:13:20.000000Z");
        assert_eq!(
            body["token"]["selfLink"],
            "https://localhost/mgmt/shared/authz/tokens/ABCDEFGHIJKLMNOPQRSTUVWXYZ"
        );
    }

    #[test]
    fn test_collection_serialization() {
        let body = serde_json::to_value(Collection::new(
            POOL_COLLECTION_KIND,
            "/mgmt/tm/ltm/pool",
            vec![],
        ))
        .unwrap();

        assert_eq!(body["kind"], POOL_COLLECTION_KIND);
        assert_eq!(body["selfLink"], "/mgmt/tm/ltm/pool");
        assert!(body["items"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_sys_catalog() {
        let body = sys_catalog();
        assert_eq!(body["items"].as_array().unwrap().len(), 4);
        assert_eq!(
            global_settings()["entries"]["https://localhost/mgmt/tm/sys/global-settings/0"]
                ["nestedStats"]["entries"]["version"]["description"],
            "17.1.0"
        );
    }

    #[test]
    fn test_root_status_hint() {
        let body = root_status(&Credentials::new("ops", "pw"));
        assert_eq!(body["ok"], true);
        assert_eq!(body["default_credentials"], "username: ops, password: pw");
    }
}
