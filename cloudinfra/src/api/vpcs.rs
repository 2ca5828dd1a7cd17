//! VPC API implementation

use super::common::{page_query, Links, Meta, Page};
use super::{ApiError, Client};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tfkit::Context;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vpc {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub ip_range: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

/// Request body for POST /vpcs
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateVpcRequest {
    pub name: String,
    pub ip_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Request body for PUT /vpcs/{id}
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UpdateVpcRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Sent as null to clear the description
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VpcEnvelope {
    vpc: Vpc,
}

#[derive(Debug, Deserialize)]
struct VpcList {
    #[serde(default)]
    vpcs: Option<Vec<Vpc>>,
    #[serde(default)]
    links: Option<Links>,
    #[serde(default)]
    meta: Option<Meta>,
}

pub struct VpcsApi<'a> {
    client: &'a Client,
}

impl<'a> VpcsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /vpcs
    pub async fn list(
        &self,
        ctx: &Context,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Vpc>, ApiError> {
        let list: VpcList = self
            .client
            .get(ctx, "/vpcs", &page_query(page, per_page))
            .await?
            .expect_status(200)?
            .json()?;
        Ok(Page::new(list.vpcs.unwrap_or_default(), list.links, list.meta))
    }

    /// GET /vpcs/{id}
    pub async fn get(&self, ctx: &Context, id: i64) -> Result<Vpc, ApiError> {
        let envelope: VpcEnvelope = self
            .client
            .get(ctx, &format!("/vpcs/{}", id), &[])
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.vpc)
    }

    /// POST /vpcs
    pub async fn create(
        &self,
        ctx: &Context,
        request: &CreateVpcRequest,
    ) -> Result<Vpc, ApiError> {
        let envelope: VpcEnvelope = self
            .client
            .post(ctx, "/vpcs", request)
            .await?
            .expect_status(201)?
            .json()?;
        Ok(envelope.vpc)
    }

    /// PUT /vpcs/{id}
    pub async fn update(
        &self,
        ctx: &Context,
        id: i64,
        request: &UpdateVpcRequest,
    ) -> Result<Vpc, ApiError> {
        let envelope: VpcEnvelope = self
            .client
            .put(ctx, &format!("/vpcs/{}", id), request)
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.vpc)
    }

    /// DELETE /vpcs/{id}
    pub async fn delete(&self, ctx: &Context, id: i64) -> Result<(), ApiError> {
        self.client
            .delete(ctx, &format!("/vpcs/{}", id))
            .await?
            .expect_status(204)
            .map(|_| ())
    }
}
