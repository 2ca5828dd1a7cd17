//! Load balancer API implementation

use super::actions::Action;
use super::common::{page_query, Links, Meta, Page};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};
use tfkit::Context;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadBalancer {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub load_balancer_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<i64>,
    #[serde(default)]
    pub ipv4_address: Option<String>,
    #[serde(default)]
    pub health_check: Option<HealthCheck>,
    #[serde(default)]
    pub forwarding_rules: Option<Vec<ForwardingRule>>,
    #[serde(default)]
    pub target_server_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthCheck {
    pub protocol: String,
    pub port: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForwardingRule {
    pub entry_protocol: String,
    pub entry_port: i64,
    pub target_protocol: String,
    pub target_port: i64,
}

/// Request body for POST /load_balancers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateLoadBalancerRequest {
    pub name: String,
    pub load_balancer_type: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    pub forwarding_rules: Vec<ForwardingRule>,
    pub target_server_ids: Vec<i64>,
}

/// Request body for PUT /load_balancers/{id}
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UpdateLoadBalancerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    pub forwarding_rules: Vec<ForwardingRule>,
    pub target_server_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLoadBalancerResponse {
    pub load_balancer: LoadBalancer,
    #[serde(default)]
    pub action: Option<Action>,
}

#[derive(Debug, Deserialize)]
struct LoadBalancerEnvelope {
    load_balancer: LoadBalancer,
}

#[derive(Debug, Deserialize)]
struct LoadBalancerList {
    #[serde(default)]
    load_balancers: Option<Vec<LoadBalancer>>,
    #[serde(default)]
    links: Option<Links>,
    #[serde(default)]
    meta: Option<Meta>,
}

pub struct LoadBalancersApi<'a> {
    client: &'a Client,
}

impl<'a> LoadBalancersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /load_balancers
    pub async fn list(
        &self,
        ctx: &Context,
        page: u32,
        per_page: u32,
    ) -> Result<Page<LoadBalancer>, ApiError> {
        let list: LoadBalancerList = self
            .client
            .get(ctx, "/load_balancers", &page_query(page, per_page))
            .await?
            .expect_status(200)?
            .json()?;
        Ok(Page::new(
            list.load_balancers.unwrap_or_default(),
            list.links,
            list.meta,
        ))
    }

    /// GET /load_balancers/{id}
    pub async fn get(&self, ctx: &Context, id: i64) -> Result<LoadBalancer, ApiError> {
        let envelope: LoadBalancerEnvelope = self
            .client
            .get(ctx, &format!("/load_balancers/{}", id), &[])
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.load_balancer)
    }

    /// POST /load_balancers
    pub async fn create(
        &self,
        ctx: &Context,
        request: &CreateLoadBalancerRequest,
    ) -> Result<CreateLoadBalancerResponse, ApiError> {
        self.client
            .post(ctx, "/load_balancers", request)
            .await?
            .expect_status(201)?
            .json()
    }

    /// PUT /load_balancers/{id}
    pub async fn update(
        &self,
        ctx: &Context,
        id: i64,
        request: &UpdateLoadBalancerRequest,
    ) -> Result<LoadBalancer, ApiError> {
        let envelope: LoadBalancerEnvelope = self
            .client
            .put(ctx, &format!("/load_balancers/{}", id), request)
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.load_balancer)
    }

    /// DELETE /load_balancers/{id}
    pub async fn delete(&self, ctx: &Context, id: i64) -> Result<(), ApiError> {
        self.client
            .delete(ctx, &format!("/load_balancers/{}", id))
            .await?
            .expect_status(204)
            .map(|_| ())
    }
}
