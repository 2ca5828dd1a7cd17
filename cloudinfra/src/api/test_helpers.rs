//! Test helpers for the CloudInfra API

use super::Client;

pub fn create_test_client(url: &str) -> Client {
    Client::new(url, "test-token", false).unwrap()
}

/// JSON body of one list page; `next` adds a next-page link
pub fn list_page_body(key: &str, items: serde_json::Value, next: Option<u32>) -> String {
    let links = match next {
        Some(page) => serde_json::json!({
            "pages": { "next": format!("https://api.cloudinfra.dev/v1/{}?page={}", key, page) }
        }),
        None => serde_json::json!({ "pages": {} }),
    };
    serde_json::json!({ key: items, "links": links, "meta": {} }).to_string()
}
