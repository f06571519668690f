use beacon_core::{Instance, Status};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, IntoUrl, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;

use crate::errors::ClientError;

const APPS_PATH: [&str; 3] = ["eureka", "v2", "apps"];
const JSON: &str = "application/json";

/// Body of a registration request.
#[derive(Serialize)]
struct Registration<'a> {
    instance: &'a Instance,
}

/// Lifecycle operations against a single registry.
///
/// Holds no state besides the transport and the base URL. Clones share the
/// underlying connection pool, and overlapping calls are fine: the registry
/// orders them, not this client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    base_url: Url,
}

impl RegistryClient {
    pub fn new(base_url: impl IntoUrl) -> Result<Self, ClientError> {
        Self::with_client(Client::new(), base_url)
    }

    /// Uses a caller-built transport; timeouts, TLS and pooling are set there.
    pub fn with_client(http: Client, base_url: impl IntoUrl) -> Result<Self, ClientError> {
        let base_url = base_url
            .into_url()
            .map_err(|err| ClientError::InvalidBaseUrl(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Publishes (or refreshes) the full descriptor of `instance`.
    ///
    /// The body is encoded before anything touches the network.
    pub async fn register(&self, instance: &Instance) -> Result<(), ClientError> {
        let body = serde_json::to_vec(&Registration { instance })?;
        let url = self.apps_url(&[&instance.app])?;
        let request = self.http.post(url).header(CONTENT_TYPE, JSON).body(body);

        match self.exchange(request).await? {
            StatusCode::NO_CONTENT => Ok(()),
            other => Err(ClientError::UnexpectedStatus(other.as_u16())),
        }
    }

    pub async fn deregister(&self, app: &str, instance_id: &str) -> Result<(), ClientError> {
        let url = self.apps_url(&[app, instance_id])?;

        match self.exchange(self.http.delete(url)).await? {
            StatusCode::OK => Ok(()),
            other => Err(ClientError::UnexpectedStatus(other.as_u16())),
        }
    }

    /// Renews the lease. A 404 means the registry forgot the instance and
    /// surfaces as [`ClientError::InstanceNotFound`].
    pub async fn heartbeat(&self, app: &str, instance_id: &str) -> Result<(), ClientError> {
        let url = self.apps_url(&[app, instance_id])?;
        let request = self.http.put(url).header(CONTENT_TYPE, JSON);

        match self.exchange(request).await? {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(ClientError::InstanceNotFound),
            other => Err(ClientError::UnexpectedStatus(other.as_u16())),
        }
    }

    /// Forces the advertised status. Only a 500 counts as failure; the
    /// registry treats every other answer as accepted.
    pub async fn override_status(
        &self,
        app: &str,
        instance_id: &str,
        status: Status,
    ) -> Result<(), ClientError> {
        let url = self.apps_url(&[app, instance_id, "status"])?;
        let request = self
            .http
            .put(url)
            .query(&[("value", status.as_str())])
            .header(CONTENT_TYPE, JSON);

        status_update_outcome(self.exchange(request).await?)
    }

    /// Clears the override so the instance is back to UP. Same failure rule
    /// as [`override_status`](Self::override_status).
    pub async fn remove_status_override(
        &self,
        app: &str,
        instance_id: &str,
    ) -> Result<(), ClientError> {
        let url = self.apps_url(&[app, instance_id, "status"])?;
        let request = self
            .http
            .delete(url)
            .query(&[("value", Status::Up.as_str())])
            .header(CONTENT_TYPE, JSON);

        status_update_outcome(self.exchange(request).await?)
    }

    pub async fn out_of_service(&self, app: &str, instance_id: &str) -> Result<(), ClientError> {
        self.override_status(app, instance_id, Status::OutOfService)
            .await
    }

    pub async fn back_in_service(&self, app: &str, instance_id: &str) -> Result<(), ClientError> {
        self.remove_status_override(app, instance_id).await
    }

    fn apps_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(APPS_PATH)
            .extend(segments);
        Ok(url)
    }

    /// One round trip. The response is drained and dropped before returning,
    /// leaving only its status code.
    async fn exchange(&self, request: RequestBuilder) -> Result<StatusCode, ClientError> {
        let request = request.build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self.http.execute(request).await?;
        let status = response.status();
        tracing::debug!(%method, %url, status = status.as_u16(), "registry exchange");

        release(response).await;
        Ok(status)
    }
}

fn status_update_outcome(status: StatusCode) -> Result<(), ClientError> {
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        return Err(ClientError::StatusUpdateFailed);
    }
    Ok(())
}

async fn release(response: Response) {
    let url = response.url().clone();
    if let Err(err) = response.bytes().await {
        tracing::debug!(%url, error = %err, "could not drain registry response body");
    }
}
