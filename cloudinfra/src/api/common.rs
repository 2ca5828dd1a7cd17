//! Common types shared by CloudInfra API endpoints

use super::error::ApiError;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Raw response: status code plus body text. Endpoint methods decide which
/// statuses count as success.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Passes the response through if it carries `expected`. A 404 becomes
    /// [`ApiError::NotFound`] so reads can tell a vanished resource apart from
    /// other failures.
    pub fn expect_status(self, expected: u16) -> Result<Self, ApiError> {
        match self.status {
            s if s == expected => Ok(self),
            404 => Err(ApiError::NotFound(self.body)),
            status => Err(ApiError::UnexpectedStatus {
                status,
                body: self.body,
            }),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, self.body);
            ApiError::Decode(e.to_string())
        })
    }
}

/// Links section of a list response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub pages: Option<PageLinks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
}

impl Links {
    /// More pages exist only if the next-page link is present
    pub fn has_next(&self) -> bool {
        self.pages.as_ref().is_some_and(|p| p.next.is_some())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub total: Option<u64>,
}

/// One page of a list endpoint
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next: bool,
    pub total: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, links: Option<Links>, meta: Option<Meta>) -> Self {
        Self {
            items,
            has_next: links.is_some_and(|l| l.has_next()),
            total: meta.and_then(|m| m.total),
        }
    }
}

/// Query parameters for one page of a list endpoint
pub fn page_query(page: u32, per_page: u32) -> [(&'static str, String); 2] {
    [("page", page.to_string()), ("per_page", per_page.to_string())]
}
