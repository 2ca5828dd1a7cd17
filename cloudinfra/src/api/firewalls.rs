//! Server firewall API implementation
//!
//! Each server has exactly one rule set, replaced as a whole.

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};
use tfkit::Context;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Firewall {
    pub server_id: i64,
    /// The API sends null for a server without rules
    #[serde(default)]
    pub rules: Option<Vec<FirewallRule>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FirewallRule {
    pub direction: String,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default)]
    pub source_ips: Option<Vec<String>>,
    #[serde(default)]
    pub destination_ips: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SetFirewallRequest {
    pub rules: Vec<FirewallRule>,
}

#[derive(Debug, Deserialize)]
struct FirewallEnvelope {
    firewall: Firewall,
}

pub struct FirewallsApi<'a> {
    client: &'a Client,
}

impl<'a> FirewallsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /servers/{id}/firewall
    pub async fn get(&self, ctx: &Context, server_id: i64) -> Result<Firewall, ApiError> {
        let envelope: FirewallEnvelope = self
            .client
            .get(ctx, &format!("/servers/{}/firewall", server_id), &[])
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.firewall)
    }

    /// PUT /servers/{id}/firewall
    pub async fn set(
        &self,
        ctx: &Context,
        server_id: i64,
        request: &SetFirewallRequest,
    ) -> Result<Firewall, ApiError> {
        let envelope: FirewallEnvelope = self
            .client
            .put(ctx, &format!("/servers/{}/firewall", server_id), request)
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.firewall)
    }

    /// DELETE /servers/{id}/firewall
    pub async fn delete(&self, ctx: &Context, server_id: i64) -> Result<(), ApiError> {
        self.client
            .delete(ctx, &format!("/servers/{}/firewall", server_id))
            .await?
            .expect_status(204)
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_rules_deserialize_as_none() {
        let fw: Firewall = serde_json::from_str(r#"{"server_id":4,"rules":null}"#).unwrap();
        assert!(fw.rules.is_none());
    }
}
