//! VPC route table API implementation
//!
//! The route table of a VPC is replaced as a whole.

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};
use tfkit::Context;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub destination: String,
    pub gateway: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteTable {
    pub vpc_id: i64,
    #[serde(default)]
    pub routes: Option<Vec<Route>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SetRoutesRequest {
    pub routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct RouteTableEnvelope {
    route_table: RouteTable,
}

pub struct RoutesApi<'a> {
    client: &'a Client,
}

impl<'a> RoutesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /vpcs/{id}/routes
    pub async fn get(&self, ctx: &Context, vpc_id: i64) -> Result<RouteTable, ApiError> {
        let envelope: RouteTableEnvelope = self
            .client
            .get(ctx, &format!("/vpcs/{}/routes", vpc_id), &[])
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.route_table)
    }

    /// PUT /vpcs/{id}/routes
    pub async fn set(
        &self,
        ctx: &Context,
        vpc_id: i64,
        request: &SetRoutesRequest,
    ) -> Result<RouteTable, ApiError> {
        let envelope: RouteTableEnvelope = self
            .client
            .put(ctx, &format!("/vpcs/{}/routes", vpc_id), request)
            .await?
            .expect_status(200)?
            .json()?;
        Ok(envelope.route_table)
    }

    /// DELETE /vpcs/{id}/routes
    pub async fn delete(&self, ctx: &Context, vpc_id: i64) -> Result<(), ApiError> {
        self.client
            .delete(ctx, &format!("/vpcs/{}/routes", vpc_id))
            .await?
            .expect_status(204)
            .map(|_| ())
    }
}
