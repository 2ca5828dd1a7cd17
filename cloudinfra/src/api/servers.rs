//! Server API implementation

use super::actions::Action;
use super::common::{page_query, Links, Meta, Page};
use super::{ApiError, Client};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tfkit::Context;

/// Server as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub server_type: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<i64>,
    #[serde(default)]
    pub ssh_keys: Option<Vec<i64>>,
    #[serde(default)]
    pub backups: Option<bool>,
    #[serde(default)]
    pub delete_protection: Option<bool>,
    #[serde(default)]
    pub ipv4_address: Option<String>,
    #[serde(default)]
    pub ipv6_address: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

/// Request body for POST /servers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateServerRequest {
    pub name: String,
    pub server_type: String,
    pub image: String,
    pub location: String,
    pub ssh_keys: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backups: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_protection: Option<bool>,
}

/// Request body for PUT /servers/{id}
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UpdateServerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backups: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_protection: Option<bool>,
}

/// Response from POST /servers; the action tracks provisioning
#[derive(Debug, Clone, Deserialize)]
pub struct CreateServerResponse {
    pub server: Server,
    #[serde(default)]
    pub action: Option<Action>,
}

#[derive(Debug, Deserialize)]
struct ServerEnvelope {
    server: Server,
}

#[derive(Debug, Deserialize)]
struct ServerList {
    #[serde(default)]
    servers: Option<Vec<Server>>,
    #[serde(default)]
    links: Option<Links>,
    #[serde(default)]
    meta: Option<Meta>,
}

/// Servers API for server operations
pub struct ServersApi<'a> {
    client: &'a Client,
}

impl<'a> ServersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /servers
    pub async fn list(
        &self,
        ctx: &Context,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Server>, ApiError> {
        let list: ServerList = self
            .client
            .get(ctx, "/servers", &page_query(page, per_page))
            .await?
            .expect_status(200)?
            .json()?;
        Ok(Page::new(
            list.servers.unwrap_or_default(),
            list.links,
            list.meta,
        ))
    }

    /// GET /servers/{id}
    pub async fn get(&self, ctx: &Context, id: i64) -> Result<Server, ApiError> {
        let envelope: ServerEnvelope = self
            .client
            .get(ctx, &format!("/servers/{}", id), &[])
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.server)
    }

    /// POST /servers
    pub async fn create(
        &self,
        ctx: &Context,
        request: &CreateServerRequest,
    ) -> Result<CreateServerResponse, ApiError> {
        self.client
            .post(ctx, "/servers", request)
            .await?
            .expect_status(201)?
            .json()
    }

    /// PUT /servers/{id}
    pub async fn update(
        &self,
        ctx: &Context,
        id: i64,
        request: &UpdateServerRequest,
    ) -> Result<Server, ApiError> {
        let envelope: ServerEnvelope = self
            .client
            .put(ctx, &format!("/servers/{}", id), request)
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.server)
    }

    /// DELETE /servers/{id}
    pub async fn delete(&self, ctx: &Context, id: i64) -> Result<(), ApiError> {
        self.client
            .delete(ctx, &format!("/servers/{}", id))
            .await?
            .expect_status(204)
            .map(|_| ())
    }
}
