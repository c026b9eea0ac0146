use crate::{config::AppConfig, http_client::handle_http_response};
use anyhow::{Context, Result};
use log::info;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use trait_variant::make;

/// Connection status as reported by the device
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceStatus {
    pub ssid: Option<String>,
    pub state: Option<String>,
    pub ip: Option<String>,
}

/// Station credentials submitted to the device connect endpoint
#[derive(Debug, Serialize)]
pub struct ConnectRequest {
    pub ssid: String,
    pub pass: String,
}

/// Broker credentials submitted to the device broker-config endpoint
#[derive(Debug, Serialize)]
pub struct BrokerConfig {
    pub uri: String,
    pub user: String,
    pub pass: String,
}

/// Client surface of the jaQC device REST API
///
/// `update_ui_assets` is the only call the settings panel depends on; the
/// remaining calls cover the device's connectivity surface, which not every
/// firmware revision serves yet. Callers must treat their absence as a
/// normal failure.
#[make(Send)]
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait DeviceClient {
    async fn update_ui_assets(&self) -> Result<()>;
    async fn status(&self) -> Result<DeviceStatus>;
    async fn connect(&self, request: ConnectRequest) -> Result<()>;
    async fn configure_broker(&self, config: BrokerConfig) -> Result<()>;
}

#[derive(Clone)]
pub struct JaqcDeviceClient {
    client: Client,
    base_url: String,
}

impl JaqcDeviceClient {
    // API endpoint constants
    const UPDATE_UI_ENDPOINT: &str = "/api/update_web_all";
    const STATUS_ENDPOINT: &str = "/api/status";
    const CONNECT_ENDPOINT: &str = "/api/connect";
    const BROKER_CONFIG_ENDPOINT: &str = "/api/mqtt_config";

    pub fn new() -> Result<Self> {
        Self::with_base_url(&AppConfig::get().device.base_url)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to create device HTTP client")?;

        Ok(JaqcDeviceClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_url(&self, path: &str) -> String {
        let normalized_path = path.trim_start_matches('/');
        format!("{}/{normalized_path}", self.base_url)
    }

    /// GET request to the device API
    async fn get(&self, path: &str) -> Result<String> {
        let url = self.build_url(path);
        info!("GET {url}");

        let res = self
            .client
            .get(&url)
            .send()
            .await
            .context(format!("failed to send GET request to {url}"))?;

        handle_http_response(res, &format!("GET {url}")).await
    }

    /// POST request to the device API with JSON body. The body carries
    /// credentials and is not logged.
    async fn post_json(&self, path: &str, body: impl Serialize) -> Result<String> {
        let url = self.build_url(path);
        info!("POST {url}");

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context(format!("failed to send POST request to {url}"))?;

        handle_http_response(res, &format!("POST {url}")).await
    }
}

impl DeviceClient for JaqcDeviceClient {
    /// Ask the device to refresh its served UI assets. The response body is
    /// not part of the contract and is dropped.
    async fn update_ui_assets(&self) -> Result<()> {
        self.get(Self::UPDATE_UI_ENDPOINT).await.map(|_| ())
    }

    async fn status(&self) -> Result<DeviceStatus> {
        serde_json::from_str(&self.get(Self::STATUS_ENDPOINT).await?)
            .context("failed to parse device status")
    }

    async fn connect(&self, request: ConnectRequest) -> Result<()> {
        self.post_json(Self::CONNECT_ENDPOINT, request)
            .await
            .map(|_| ())
    }

    async fn configure_broker(&self, config: BrokerConfig) -> Result<()> {
        self.post_json(Self::BROKER_CONFIG_ENDPOINT, config)
            .await
            .map(|_| ())
    }
}
