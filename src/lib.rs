//! Simulator for the BIG-IP iControl REST management API.
//!
//! Keeps LTM pools, pool members and virtual servers in memory and serves
//! them behind the same basic-auth / `X-F5-Auth-Token` scheme as a real
//! appliance, so provisioning tools can be exercised without one.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod ident;
pub mod server;
pub mod store;

pub use error::SimError;
pub use ident::ResourceKey;
