//! Provider data handed to resources at construction

use crate::api::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct CloudInfraProviderData {
    pub client: Arc<Client>,
}

impl CloudInfraProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}
