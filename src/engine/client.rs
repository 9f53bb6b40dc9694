use crate::engine::decode::decode_restored;
use crate::engine::CancelToken;
use crate::error::RestoreError;
use crate::model::{Restoration, RestoreConfig, RestoreResponse, SelectedFile};
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Url;

#[derive(Clone)]
pub struct RestoreClient {
    pub http: reqwest::Client,
    pub endpoint: Url,
    pub field_name: String,
}

impl RestoreClient {
    pub fn new(cfg: &RestoreConfig) -> Result<Self> {
        let endpoint = Url::parse(&cfg.endpoint)
            .with_context(|| format!("invalid endpoint URL: {}", cfg.endpoint))?;
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            endpoint,
            field_name: cfg.field_name.clone(),
        })
    }

    /// Root of the service, where it answers liveness probes.
    pub fn root_url(&self) -> Url {
        let mut u = self.endpoint.clone();
        u.set_path("/");
        u.set_query(None);
        u
    }

    /// Ask the service root for its banner message.
    pub async fn probe(&self) -> Result<String> {
        let v: serde_json::Value = self
            .http
            .get(self.root_url())
            .send()
            .await
            .context("probe request failed")?
            .error_for_status()
            .context("probe returned an error status")?
            .json()
            .await
            .context("probe returned invalid JSON")?;
        Ok(v.get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("ready")
            .to_string())
    }

    fn classify(&self, e: reqwest::Error) -> RestoreError {
        if e.is_timeout() {
            RestoreError::Timeout {
                endpoint: self.endpoint.to_string(),
            }
        } else if e.is_connect() {
            RestoreError::Connect {
                endpoint: self.endpoint.to_string(),
                source: e,
            }
        } else {
            RestoreError::Request(e)
        }
    }

    /// Issue exactly one restoration request for `file`.
    pub async fn restore(&self, file: &SelectedFile) -> Result<Restoration, RestoreError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime)
            .map_err(RestoreError::Request)?;
        let form = Form::new().part(self.field_name.clone(), part);

        tracing::info!(
            endpoint = %self.endpoint,
            file = %file.file_name,
            bytes = file.bytes.len(),
            "sending restoration request"
        );
        let resp = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.classify(e))?;
        if !status.is_success() {
            return Err(RestoreError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RestoreResponse =
            serde_json::from_str(&body).map_err(RestoreError::InvalidResponse)?;
        let Some(payload) = parsed.restored_image.clone().filter(|p| !p.is_empty()) else {
            return Err(RestoreError::MissingPayload {
                message: parsed.failure_message(),
            });
        };

        tokio::task::spawn_blocking(move || decode_restored(payload))
            .await
            .map_err(|e| RestoreError::io("decode task failed", std::io::Error::other(e)))?
    }

    /// Like [`restore`](Self::restore), but gives up with `None` once `cancel` fires.
    pub async fn restore_cancellable(
        &self,
        file: &SelectedFile,
        cancel: &CancelToken,
    ) -> Option<Result<Restoration, RestoreError>> {
        tokio::select! {
            res = self.restore(file) => Some(res),
            _ = cancel.cancelled() => None,
        }
    }
}
