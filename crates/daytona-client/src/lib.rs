//! # Daytona platform client
//!
//! Thin reqwest wrapper over the snapshot and docker-registry endpoints the
//! snapshot lifecycle needs. Every request carries the bearer token and the
//! organization header configured in [`ProviderConfig`].
//!
//! ```no_run
//! use daytona_client::{PlatformClient, ProviderConfig, ProviderSettings};
//! use daytona_common::SnapshotApi;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProviderConfig::from_env(ProviderSettings::default())?;
//! let client = PlatformClient::new(&config)?;
//! let snapshot = client.get_snapshot("my-snapshot").await?;
//! println!("{} is {:?}", snapshot.name, snapshot.state);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use daytona_common::{ApiError, ApiResult, CreateSnapshot, PushAccess, SnapshotApi, SnapshotDto};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

pub mod config;

pub use config::{ConfigError, ProviderConfig, ProviderSettings};
use config::{API_URL_ENV, ORGANIZATION_ENV, TOKEN_ENV};

pub const ORGANIZATION_HEADER: &str = "x-daytona-organization-id";

#[derive(Clone, Debug)]
pub struct PlatformClient {
    client: Client,
    base_url: Url,
}

impl PlatformClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.token)).map_err(
            |_| ConfigError::Invalid {
                name: TOKEN_ENV,
                value: "<redacted>".to_string(),
            },
        )?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            HeaderName::from_static(ORGANIZATION_HEADER),
            HeaderValue::from_str(&config.organization_id).map_err(|_| ConfigError::Invalid {
                name: ORGANIZATION_ENV,
                value: config.organization_id.clone(),
            })?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let base_url = Url::parse(&config.api_url).map_err(|_| ConfigError::Invalid {
            name: API_URL_ENV,
            value: config.api_url.clone(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                name: API_URL_ENV,
                value: config.api_url.clone(),
            });
        }

        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&impl Serialize>,
    ) -> ApiResult<Response> {
        debug!(%method, %url, "Daytona API request");
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        check_status(response).await
    }

    async fn json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(message));
    }
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl SnapshotApi for PlatformClient {
    #[instrument(skip(self))]
    async fn get_snapshot(&self, id_or_name: &str) -> ApiResult<SnapshotDto> {
        let url = self.url(&["snapshots", id_or_name]);
        let response = self.send(Method::GET, url, None::<&()>).await?;
        Self::json(response).await
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn create_snapshot(&self, request: CreateSnapshot) -> ApiResult<SnapshotDto> {
        let url = self.url(&["snapshots"]);
        let response = self.send(Method::POST, url, Some(&request)).await?;
        Self::json(response).await
    }

    #[instrument(skip(self))]
    async fn remove_snapshot(&self, id: &str) -> ApiResult<()> {
        let url = self.url(&["snapshots", id]);
        self.send(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_transient_push_access(&self) -> ApiResult<PushAccess> {
        let url = self.url(&["docker-registry", "registry-push-access"]);
        let response = self.send(Method::GET, url, None::<&()>).await?;
        Self::json(response).await
    }
}
