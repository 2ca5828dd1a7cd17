//! SSH key API implementation

use super::common::{page_query, Links, Meta, Page};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};
use tfkit::Context;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SshKey {
    pub id: i64,
    pub name: String,
    pub public_key: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateSshKeyRequest {
    pub name: String,
    pub public_key: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpdateSshKeyRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct SshKeyEnvelope {
    ssh_key: SshKey,
}

#[derive(Debug, Deserialize)]
struct SshKeyList {
    #[serde(default)]
    ssh_keys: Option<Vec<SshKey>>,
    #[serde(default)]
    links: Option<Links>,
    #[serde(default)]
    meta: Option<Meta>,
}

pub struct SshKeysApi<'a> {
    client: &'a Client,
}

impl<'a> SshKeysApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /ssh_keys
    pub async fn list(
        &self,
        ctx: &Context,
        page: u32,
        per_page: u32,
    ) -> Result<Page<SshKey>, ApiError> {
        let list: SshKeyList = self
            .client
            .get(ctx, "/ssh_keys", &page_query(page, per_page))
            .await?
            .expect_status(200)?
            .json()?;
        Ok(Page::new(
            list.ssh_keys.unwrap_or_default(),
            list.links,
            list.meta,
        ))
    }

    /// GET /ssh_keys/{id}
    pub async fn get(&self, ctx: &Context, id: i64) -> Result<SshKey, ApiError> {
        let envelope: SshKeyEnvelope = self
            .client
            .get(ctx, &format!("/ssh_keys/{}", id), &[])
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.ssh_key)
    }

    /// POST /ssh_keys
    pub async fn create(
        &self,
        ctx: &Context,
        request: &CreateSshKeyRequest,
    ) -> Result<SshKey, ApiError> {
        let envelope: SshKeyEnvelope = self
            .client
            .post(ctx, "/ssh_keys", request)
            .await?
            .expect_status(201)?
            .json()?;
        Ok(envelope.ssh_key)
    }

    /// PUT /ssh_keys/{id}
    pub async fn update(
        &self,
        ctx: &Context,
        id: i64,
        request: &UpdateSshKeyRequest,
    ) -> Result<SshKey, ApiError> {
        let envelope: SshKeyEnvelope = self
            .client
            .put(ctx, &format!("/ssh_keys/{}", id), request)
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.ssh_key)
    }

    /// DELETE /ssh_keys/{id}
    pub async fn delete(&self, ctx: &Context, id: i64) -> Result<(), ApiError> {
        self.client
            .delete(ctx, &format!("/ssh_keys/{}", id))
            .await?
            .expect_status(204)
            .map(|_| ())
    }
}
