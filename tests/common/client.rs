//! HTTP client for the admin API

use reqwest::{Client, Response};
use serde_json::{json, Value};

pub struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn refresh(&self) -> Response {
        self.client
            .post(self.url("/v1/sync/refresh"))
            .send()
            .await
            .expect("refresh request failed")
    }

    pub async fn now_playing(&self) -> Response {
        self.client
            .get(self.url("/v1/sync/now-playing"))
            .send()
            .await
            .expect("now-playing request failed")
    }

    pub async fn transitions(&self) -> Value {
        self.client
            .get(self.url("/v1/sync/transitions"))
            .send()
            .await
            .expect("transitions request failed")
            .json()
            .await
            .expect("transitions body is not JSON")
    }

    pub async fn set_visible(&self, visible: bool) -> Response {
        self.client
            .put(self.url("/v1/sync/visibility"))
            .json(&json!({ "visible": visible }))
            .send()
            .await
            .expect("visibility request failed")
    }

    pub async fn connectivity_restored(&self) -> Response {
        self.client
            .post(self.url("/v1/sync/connectivity"))
            .send()
            .await
            .expect("connectivity request failed")
    }

    pub async fn stop(&self) -> Response {
        self.client
            .post(self.url("/v1/sync/stop"))
            .send()
            .await
            .expect("stop request failed")
    }

    pub async fn start(&self) -> Response {
        self.client
            .post(self.url("/v1/sync/start"))
            .send()
            .await
            .expect("start request failed")
    }
}
