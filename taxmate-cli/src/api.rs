//! Client for the TaxMate backend's statement endpoints.
//!
//! Every call returns `Result<T, ServiceError>`: transport failures, timeouts
//! and error statuses all come back as values for the caller to show.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;
use taxmate_core::{
    ConfirmRequest, ConfirmResponse, ImportRequest, ImportedRow, RowsResponse, ServiceError,
    Statement,
};
use tracing::{info, warn};

use crate::config::ApiSection;

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    statement_timeout: Duration,
}

impl ApiClient {
    pub fn from_config(api: &ApiSection) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &api.access_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).context("access token is not a valid header value")?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url: api.base_url.trim_end_matches('/').to_string(),
            http,
            statement_timeout: Duration::from_secs(api.statement_timeout_secs),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `POST /me/hustles/{hustle}/statements/import`
    pub async fn import_statement(
        &self,
        hustle_id: &str,
        req: &ImportRequest,
    ) -> Result<Statement, ServiceError> {
        info!(hustle_id, rows = req.rows.len(), file = %req.file_name, "importing statement");
        let url = self.url(&format!("me/hustles/{hustle_id}/statements/import"));
        self.send(self.http.post(url).json(req).timeout(self.statement_timeout)).await
    }

    /// `POST /me/hustles/{hustle}/statements/{statement}/confirm`
    pub async fn confirm_statement(
        &self,
        hustle_id: &str,
        statement_id: &str,
        req: &ConfirmRequest,
    ) -> Result<ConfirmResponse, ServiceError> {
        info!(hustle_id, statement_id, items = req.items.len(), "confirming statement");
        let url = self.url(&format!("me/hustles/{hustle_id}/statements/{statement_id}/confirm"));
        self.send(self.http.post(url).json(req).timeout(self.statement_timeout)).await
    }

    /// `GET /me/hustles/{hustle}/statements/{statement}/rows`
    pub async fn statement_rows(
        &self,
        hustle_id: &str,
        statement_id: &str,
    ) -> Result<Vec<ImportedRow>, ServiceError> {
        let url = self.url(&format!("me/hustles/{hustle_id}/statements/{statement_id}/rows"));
        let rows: RowsResponse = self.send(self.http.get(url).timeout(self.statement_timeout)).await?;
        Ok(rows.into_rows())
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ServiceError> {
        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "request failed");
                return Err(ServiceError::new(e.to_string()));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = ServiceError::from_body(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %err, "service returned an error");
            return Err(err);
        }

        resp.json::<T>()
            .await
            .map_err(|e| ServiceError::new(format!("unexpected response: {e}")))
    }
}
