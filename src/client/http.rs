//! HTTP client for the report backend.
//!
//! One `HttpClient` serves every backend seam of the engine: schema
//! discovery, report execution, saved report storage and export
//! rendering. JSON envelopes of the form `{success: false, error}` are
//! turned into [`ClientError::Remote`].

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::error::{ClientError, ClientResult};
use super::protocol::{
    endpoints, ExecutePayload, ExecuteReportRequest, ExecuteReportResponse, ExportReportRequest,
    LoadReportResponse, LoadReportsResponse, SaveReportRequest, SaveReportResponse,
    TableColumnsResponse,
};
use crate::catalog::{ColumnInfo, Connection, SchemaProvider};
use crate::config::{EndpointSettings, Settings};
use crate::execution::{ExecutionPage, ReportExecutor};
use crate::export::{ExportFormat, ExportService};
use crate::model::{ReportConfig, ReportResult, SavedReport, SavedReportSummary};
use crate::persistence::{PersistenceResult, ReportRepository};

/// CSRF header used when none is configured.
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRFToken";

/// REST client for the report backend.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    base_url: Url,
    endpoints: EndpointSettings,
    csrf_header: String,
    csrf_token: Option<String>,
    timeout_secs: u64,
}

impl HttpClient {
    /// Client with default endpoint paths, no CSRF token and a 30 second timeout.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::build(base_url, EndpointSettings::default(), DEFAULT_CSRF_HEADER, None, 30)
    }

    /// Client configured from the `[server]` and `[endpoints]` sections.
    pub fn from_settings(settings: &Settings) -> ClientResult<Self> {
        let token = settings
            .server
            .resolved_csrf_token()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Self::build(
            &settings.server.base_url,
            settings.endpoints.clone(),
            &settings.server.csrf_header,
            token,
            settings.server.timeout_seconds,
        )
    }

    fn build(
        base_url: &str,
        endpoints: EndpointSettings,
        csrf_header: &str,
        csrf_token: Option<String>,
        timeout_secs: u64,
    ) -> ClientResult<Self> {
        // Url::join replaces the last segment unless the base ends in '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url =
            Url::parse(&normalized).map_err(|_| ClientError::InvalidUrl(base_url.to_string()))?;

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            endpoints,
            csrf_header: csrf_header.to_string(),
            csrf_token,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Replace the CSRF token, e.g. after the hosting page rotated it.
    pub fn set_csrf_token(&mut self, token: Option<String>) {
        self.csrf_token = token;
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| ClientError::InvalidUrl(format!("{}{}", self.base_url, path)))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, &str)],
    ) -> ClientResult<T> {
        let request = self.http.get(self.url(path)?).query(query);
        let body = self.send(endpoint, request).await?;
        decode(endpoint, &body)
    }

    async fn post<B, T>(&self, endpoint: &'static str, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.post_raw(endpoint, path, body).await?;
        decode(endpoint, &body)
    }

    async fn post_raw<B>(&self, endpoint: &'static str, path: &str, body: &B) -> ClientResult<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let json = serde_json::to_vec(body).map_err(|source| ClientError::SerializeFailed {
            endpoint: endpoint.to_string(),
            source,
        })?;

        let mut request = self
            .http
            .post(self.url(path)?)
            .header(CONTENT_TYPE, "application/json")
            .body(json);
        if let Some(token) = &self.csrf_token {
            request = request.header(self.csrf_header.as_str(), token.as_str());
        }

        self.send(endpoint, request).await
    }

    async fn send(&self, endpoint: &'static str, request: RequestBuilder) -> ClientResult<Vec<u8>> {
        debug!(endpoint, "sending request");
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(endpoint, e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint, status = status.as_u16(), "request failed");
            return Err(ClientError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_reqwest(endpoint, e, self.timeout_secs))?;
        debug!(endpoint, bytes = bytes.len(), "response received");
        Ok(bytes.to_vec())
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> ClientResult<T> {
    serde_json::from_slice(body).map_err(|e| ClientError::DecodeFailed {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

/// Turn a `{success: false}` envelope into an error.
fn ensure_success(endpoint: &str, success: bool, error: Option<String>) -> ClientResult<()> {
    if success {
        Ok(())
    } else {
        Err(ClientError::remote(
            endpoint,
            error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

#[async_trait]
impl SchemaProvider for HttpClient {
    async fn list_connections(&self) -> ClientResult<Vec<Connection>> {
        self.get(endpoints::CONNECTIONS, &self.endpoints.connections, &[])
            .await
    }

    async fn list_tables(&self, connection_id: &str) -> ClientResult<Vec<String>> {
        self.get(
            endpoints::TABLES,
            &self.endpoints.tables,
            &[("connection_id", connection_id)],
        )
        .await
    }

    async fn list_columns(&self, connection_id: &str, table: &str) -> ClientResult<Vec<ColumnInfo>> {
        let response: TableColumnsResponse = self
            .get(
                endpoints::TABLE_COLUMNS,
                &self.endpoints.table_columns,
                &[("connection_id", connection_id), ("table", table)],
            )
            .await?;
        Ok(response.columns)
    }
}

#[async_trait]
impl ReportExecutor for HttpClient {
    async fn execute_report(
        &self,
        config: &ReportConfig,
        page: u32,
        page_size: u32,
    ) -> ClientResult<ExecutionPage> {
        let request = ExecuteReportRequest {
            report_config: ExecutePayload {
                config,
                page,
                page_size,
            },
        };
        let response: ExecuteReportResponse = self
            .post(endpoints::EXECUTE_REPORT, &self.endpoints.execute_report, &request)
            .await?;
        ensure_success(endpoints::EXECUTE_REPORT, response.success, response.error)?;

        let data = response.data.unwrap_or_default();
        let total_rows = response.total_rows.unwrap_or(data.rows.len() as u64);
        Ok(ExecutionPage {
            headers: data.headers,
            rows: data.rows,
            total_rows,
        })
    }
}

#[async_trait]
impl ReportRepository for HttpClient {
    async fn save_report(&self, name: &str, config: &ReportConfig) -> PersistenceResult<SavedReport> {
        let request = save_request(None, name, config);
        let response: SaveReportResponse = self
            .post(endpoints::SAVE_REPORT, &self.endpoints.save_report, &request)
            .await?;
        ensure_success(endpoints::SAVE_REPORT, response.success, response.error)?;

        let id = response.report_id.ok_or_else(|| ClientError::DecodeFailed {
            endpoint: endpoints::SAVE_REPORT.to_string(),
            message: "response carries no report_id".to_string(),
        })?;
        Ok(SavedReport {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
            config: config.clone(),
        })
    }

    async fn update_report(
        &self,
        id: &str,
        name: &str,
        config: &ReportConfig,
    ) -> PersistenceResult<SavedReport> {
        let request = save_request(Some(id), name, config);
        let response: SaveReportResponse = self
            .post(endpoints::SAVE_REPORT, &self.endpoints.save_report, &request)
            .await?;
        ensure_success(endpoints::SAVE_REPORT, response.success, response.error)?;

        // The save response carries no timestamp; read it back.
        self.load_report(id).await
    }

    async fn list_reports(&self) -> PersistenceResult<Vec<SavedReportSummary>> {
        let response: LoadReportsResponse = self
            .get(endpoints::LOAD_REPORTS, &self.endpoints.load_reports, &[])
            .await?;
        ensure_success(endpoints::LOAD_REPORTS, response.success, response.error)?;
        Ok(response.reports.into_iter().map(Into::into).collect())
    }

    async fn load_report(&self, id: &str) -> PersistenceResult<SavedReport> {
        let response: LoadReportResponse = self
            .get(endpoints::LOAD_REPORT, &self.endpoints.load_report, &[("id", id)])
            .await?;
        ensure_success(endpoints::LOAD_REPORT, response.success, response.error)?;

        let report = response.report.ok_or_else(|| ClientError::NotFound {
            kind: "report",
            id: id.to_string(),
        })?;
        Ok(report.into())
    }
}

#[async_trait]
impl ExportService for HttpClient {
    async fn export_report(
        &self,
        config: &ReportConfig,
        format: ExportFormat,
        data: &ReportResult,
    ) -> ClientResult<Vec<u8>> {
        let request = ExportReportRequest {
            report_config: config,
            format,
            data,
        };
        self.post_raw(endpoints::EXPORT_REPORT, &self.endpoints.export_report, &request)
            .await
    }
}

/// `saveReport` body. Updates carry the id and still send the name.
fn save_request<'a>(
    id: Option<&'a str>,
    name: &'a str,
    config: &'a ReportConfig,
) -> SaveReportRequest<'a> {
    SaveReportRequest {
        report_id: id,
        report_name: name,
        report_config: config,
    }
}
