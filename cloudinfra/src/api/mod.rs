//! CloudInfra REST API client
//!
//! One sub-API per endpoint family, reached from [`Client`]:
//! `client.servers().get(&ctx, id)`.

pub mod actions;
pub mod client;
pub mod common;
pub mod error;
pub mod firewalls;
pub mod load_balancers;
pub mod pool;
pub mod routes;
pub mod servers;
pub mod ssh_keys;
pub mod vpcs;

#[cfg(test)]
pub mod test_helpers;

pub use client::{Client, DEFAULT_ENDPOINT};
pub use common::{ApiResponse, Page};
pub use error::ApiError;
pub use pool::ConnectionPoolConfig;
