use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;
use tfkit::Context;
use url::Url;

use super::common::ApiResponse;
use super::error::ApiError;
use super::pool::ConnectionPoolConfig;

pub const DEFAULT_ENDPOINT: &str = "https://api.cloudinfra.dev/v1";

/// CloudInfra API client
///
/// Cheap to clone. Requests are never retried; every call races the
/// caller's [`Context`] and is dropped on cancellation.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
}

impl Client {
    /// Create a new API client with default connection settings
    pub fn new(endpoint: &str, token: &str, insecure: bool) -> Result<Self, ApiError> {
        Self::with_config(endpoint, token, insecure, ConnectionPoolConfig::default())
    }

    pub fn with_config(
        endpoint: &str,
        token: &str,
        insecure: bool,
        pool_config: ConnectionPoolConfig,
    ) -> Result<Self, ApiError> {
        let base_url = endpoint.trim_end_matches('/').to_string();
        Url::parse(&base_url)?;

        let http_client = pool_config.build_client(insecure)?;
        let auth_header = format!("Bearer {}", token);

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                auth_header,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Sends one request and returns status and body without judging either
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("{} request to: {}", method, url);

        let mut builder = self
            .inner
            .http_client
            .request(method, &url)
            .header(AUTHORIZATION, &self.inner.auth_header);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(ApiResponse { status, body })
        };

        let response = ctx
            .run(exchange)
            .await
            .map_err(|_| ApiError::Cancelled)??;

        tracing::debug!("Response status {} from {}", response.status, path);
        Ok(response)
    }

    pub async fn get(
        &self,
        ctx: &Context,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse, ApiError> {
        self.request::<()>(ctx, Method::GET, path, query, None)
            .await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.request(ctx, Method::POST, path, &[], Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.request(ctx, Method::PUT, path, &[], Some(body)).await
    }

    pub async fn delete(&self, ctx: &Context, path: &str) -> Result<ApiResponse, ApiError> {
        self.request::<()>(ctx, Method::DELETE, path, &[], None)
            .await
    }

    pub fn servers(&self) -> super::servers::ServersApi<'_> {
        super::servers::ServersApi::new(self)
    }

    pub fn load_balancers(&self) -> super::load_balancers::LoadBalancersApi<'_> {
        super::load_balancers::LoadBalancersApi::new(self)
    }

    pub fn vpcs(&self) -> super::vpcs::VpcsApi<'_> {
        super::vpcs::VpcsApi::new(self)
    }

    pub fn ssh_keys(&self) -> super::ssh_keys::SshKeysApi<'_> {
        super::ssh_keys::SshKeysApi::new(self)
    }

    pub fn firewalls(&self) -> super::firewalls::FirewallsApi<'_> {
        super::firewalls::FirewallsApi::new(self)
    }

    pub fn routes(&self) -> super::routes::RoutesApi<'_> {
        super::routes::RoutesApi::new(self)
    }

    pub fn actions(&self) -> super::actions::ActionsApi<'_> {
        super::actions::ActionsApi::new(self)
    }
}
