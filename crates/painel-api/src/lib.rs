// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use painel_app::{
    DashboardData, DashboardQuery, Failure, FieldDescriptor, IndicatorStructure, SavePayload,
    UploadReceipt,
};
use reqwest::StatusCode;
use reqwest::blocking::multipart::Form;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Why a call to the dashboard server did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never got a usable answer: connection or I/O failure, a
    /// non-success HTTP status, or a body that is not the expected JSON.
    #[error("{0}")]
    Transport(String),
    /// The server answered with `success: false`.
    #[error("{0}")]
    Application(String),
}

impl ApiError {
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application(_))
    }
}

impl From<ApiError> for Failure {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Transport(message) => Failure::transport(message),
            ApiError::Application(message) => Failure::application(message),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

const UNSPECIFIED_FAILURE: &str = "the server reported a failure without a message";

#[derive(Debug, Deserialize)]
struct IndicatorsBody {
    #[serde(default)]
    indicadores: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DashboardBody {
    tabela_html: String,
    grafico_base64: String,
}

#[derive(Debug, Deserialize)]
struct StructureBody {
    nome_planilha: String,
    nome_aba: String,
    #[serde(default)]
    colunas: Vec<FieldDescriptor>,
}

#[derive(Debug, Deserialize)]
struct UploadBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    planilhas_carregadas: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: HttpClient,
}

impl Client {
    /// `timeout` of `None` waits as long as the server takes.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("server.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "server.base_url must use http or https, got {:?}",
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .context("build HTTP client")?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn send(&self, path: &str, request: RequestBuilder) -> ApiResult<Response> {
        tracing::debug!(path, "sending request");
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, &error))?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(path, status = status.as_u16(), "request rejected");
            return Err(status_error(status));
        }
        Ok(response)
    }

    /// Fetches the index page so the server assigns the `session_id`
    /// cookie every data endpoint keys on.
    pub fn open_session(&self) -> ApiResult<()> {
        self.send("/", self.http.get(self.endpoint("/")))?;
        Ok(())
    }

    pub fn list_indicators(&self, sector: &str) -> ApiResult<Vec<String>> {
        let path = "get_indicadores";
        let request = self
            .http
            .get(self.endpoint(path))
            .query(&[("setor", sector)]);
        let body: IndicatorsBody = decode(self.send(path, request)?, "indicator list")?;
        Ok(body.indicadores)
    }

    pub fn dashboard_data(&self, query: &DashboardQuery) -> ApiResult<DashboardData> {
        let path = "get_dados";
        let request = self.http.get(self.endpoint(path)).query(&query.params());
        let body: DashboardBody = decode(self.send(path, request)?, "dashboard data")?;
        Ok(DashboardData {
            table_html: body.tabela_html,
            chart_src: body.grafico_base64,
        })
    }

    pub fn indicator_structure(
        &self,
        sector: &str,
        indicator: &str,
    ) -> ApiResult<IndicatorStructure> {
        let path = "get_estrutura_indicador";
        let request = self
            .http
            .get(self.endpoint(path))
            .query(&[("setor", sector), ("indicador", indicator)]);
        let body: StructureBody = decode(self.send(path, request)?, "indicator structure")?;
        Ok(IndicatorStructure {
            spreadsheet_name: body.nome_planilha,
            sheet_name: body.nome_aba,
            fields: body.colunas,
        })
    }

    /// Sends the spreadsheet as the multipart field `file`.
    pub fn upload(&self, file: &Path) -> ApiResult<UploadReceipt> {
        let path = "upload";
        let form = Form::new().file("file", file).map_err(|error| {
            ApiError::Transport(format!("read {}: {error}", file.display()))
        })?;
        let request = self.http.post(self.endpoint(path)).multipart(form);
        let body: UploadBody = decode(self.send(path, request)?, "upload result")?;
        Ok(UploadReceipt {
            loaded: body.planilhas_carregadas,
            message: body.message,
        })
    }

    pub fn save_values(&self, payload: &SavePayload) -> ApiResult<()> {
        let path = "salvar_dados";
        let request = self.http.post(self.endpoint(path)).json(payload);
        let _: Value = decode(self.send(path, request)?, "save result")?;
        Ok(())
    }

    /// Seeds the server's sector table. Returns the server's message.
    pub fn initialize_database(&self) -> ApiResult<String> {
        self.admin("inicializar_banco")
    }

    /// Moves session spreadsheets into the server's database.
    pub fn migrate_data(&self) -> ApiResult<String> {
        self.admin("migrar_dados")
    }

    fn admin(&self, path: &str) -> ApiResult<String> {
        let request = self.http.get(self.endpoint(path));
        let body: MessageBody = decode(self.send(path, request)?, path)?;
        Ok(body.message)
    }
}

/// Reads the `{success, error, ...}` envelope every endpoint answers with.
fn decode<T: DeserializeOwned>(response: Response, what: &str) -> ApiResult<T> {
    let value: Value = response
        .json()
        .map_err(|error| ApiError::Transport(format!("decode {what}: {error}")))?;
    check_envelope(value, what)
}

fn check_envelope<T: DeserializeOwned>(value: Value, what: &str) -> ApiResult<T> {
    let succeeded = value
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !succeeded {
        let message = value
            .get("error")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .unwrap_or(UNSPECIFIED_FAILURE);
        return Err(ApiError::Application(message.to_owned()));
    }
    serde_json::from_value(value)
        .map_err(|error| ApiError::Transport(format!("decode {what}: {error}")))
}

fn connection_error(base_url: &str, error: &reqwest::Error) -> ApiError {
    if error.is_timeout() {
        return ApiError::Transport(format!("request to {base_url} timed out"));
    }
    ApiError::Transport(format!("cannot reach {base_url} ({error})"))
}

fn status_error(status: StatusCode) -> ApiError {
    let text = match status.canonical_reason() {
        Some(reason) => reason.to_owned(),
        None => format!("HTTP {}", status.as_u16()),
    };
    ApiError::Transport(text)
}
