use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{DeveloperId, LevelId},
    error::ErrorEnvelope,
    protocol::{Collection, DeveloperPayload, LevelPayload},
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    entity::{
        Developer, DeveloperFields, DeveloperRoster, Entity, Fetched, Level, LevelCatalog,
        LevelFields,
    },
    error::GatewayError,
};

/// REST access for one record type.
#[async_trait]
pub trait EntityGateway<E: Entity>: Send + Sync {
    async fn list(&self) -> Result<Fetched<E>, GatewayError>;

    /// Auxiliary data the page shows next to its own rows.
    async fn fetch_context(&self) -> Result<E::Context, GatewayError>;

    async fn create(&self, fields: &E::Fields) -> Result<E, GatewayError>;

    async fn update(&self, id: E::Id, fields: &E::Fields) -> Result<E, GatewayError>;

    async fn delete(&self, id: E::Id) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: Url,
    pub timeout: Option<Duration>,
}

impl GatewayConfig {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let trimmed = base_url.trim();
        let mut base_url = Url::parse(trimmed)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// JSON-over-HTTP gateway for both record types.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|err| GatewayError::Transport {
            url: config.base_url.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|err| GatewayError::Transport {
                url: format!("{}{path}", self.base_url),
                message: err.to_string(),
            })
    }

    async fn execute(&self, request: RequestBuilder, url: &Url) -> Result<Response, GatewayError> {
        let response = request.send().await.map_err(|err| GatewayError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "gateway response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|envelope| envelope.message().map(str::to_string));
        warn!(url = %url, status = status.as_u16(), error = ?message, "request failed");
        if status == reqwest::StatusCode::NOT_FOUND {
            Err(GatewayError::NotFound {
                url: url.to_string(),
                message,
            })
        } else {
            Err(GatewayError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response, url: &Url) -> Result<T, GatewayError> {
        response.json().await.map_err(|err| GatewayError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let url = self.endpoint(path)?;
        let response = self.execute(self.http.get(url.clone()), &url).await?;
        Self::decode(response, &url).await
    }

    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let request = self.http.request(method, url.clone()).json(body);
        let response = self.execute(request, &url).await?;
        Self::decode(response, &url).await
    }

    pub async fn delete_path(&self, path: &str) -> Result<(), GatewayError> {
        let url = self.endpoint(path)?;
        self.execute(self.http.delete(url.clone()), &url).await?;
        Ok(())
    }

    async fn level_payloads(&self) -> Result<Vec<LevelPayload>, GatewayError> {
        let collection: Collection<LevelPayload> = self.get_json("levels").await?;
        Ok(collection.into_vec())
    }

    async fn developer_payloads(&self) -> Result<Vec<DeveloperPayload>, GatewayError> {
        let collection: Collection<DeveloperPayload> = self.get_json("developers").await?;
        Ok(collection.into_vec())
    }
}

#[async_trait]
impl EntityGateway<Level> for HttpGateway {
    async fn list(&self) -> Result<Fetched<Level>, GatewayError> {
        let payloads = self.level_payloads().await?;
        let roster = DeveloperRoster::from_levels(&payloads);
        let records = payloads.into_iter().map(Level::from_payload).collect();
        Ok(Fetched::new(records).with_context(roster))
    }

    async fn fetch_context(&self) -> Result<DeveloperRoster, GatewayError> {
        let payloads = self.developer_payloads().await?;
        let developers: Vec<Developer> =
            payloads.into_iter().map(Developer::from_payload).collect();
        Ok(DeveloperRoster::from_developers(&developers))
    }

    async fn create(&self, fields: &LevelFields) -> Result<Level, GatewayError> {
        let payload: LevelPayload = self
            .send_json(Method::POST, "levels", &fields.request())
            .await?;
        Ok(Level::from_payload(payload))
    }

    async fn update(&self, id: LevelId, fields: &LevelFields) -> Result<Level, GatewayError> {
        let payload: LevelPayload = self
            .send_json(Method::PUT, &format!("levels/{id}"), &fields.request())
            .await?;
        Ok(Level::from_payload(payload))
    }

    async fn delete(&self, id: LevelId) -> Result<(), GatewayError> {
        self.delete_path(&format!("levels/{id}")).await
    }
}

#[async_trait]
impl EntityGateway<Developer> for HttpGateway {
    async fn list(&self) -> Result<Fetched<Developer>, GatewayError> {
        let payloads = self.developer_payloads().await?;
        Ok(Fetched::new(
            payloads.into_iter().map(Developer::from_payload).collect(),
        ))
    }

    async fn fetch_context(&self) -> Result<LevelCatalog, GatewayError> {
        let payloads = self.level_payloads().await?;
        Ok(LevelCatalog::from_levels(&payloads))
    }

    async fn create(&self, fields: &DeveloperFields) -> Result<Developer, GatewayError> {
        let payload: DeveloperPayload = self
            .send_json(Method::POST, "developers", &fields.request())
            .await?;
        Ok(Developer::from_payload(payload))
    }

    async fn update(
        &self,
        id: DeveloperId,
        fields: &DeveloperFields,
    ) -> Result<Developer, GatewayError> {
        let payload: DeveloperPayload = self
            .send_json(Method::PUT, &format!("developers/{id}"), &fields.request())
            .await?;
        Ok(Developer::from_payload(payload))
    }

    async fn delete(&self, id: DeveloperId) -> Result<(), GatewayError> {
        self.delete_path(&format!("developers/{id}")).await
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
