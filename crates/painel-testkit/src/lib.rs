// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use painel_app::{
    DashboardData, Failure, FieldDescriptor, FieldKind, IndicatorStructure, Reply, Request,
    RequestKind, Runtime, UploadReceipt,
};
use serde_json::{Value, json};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Response, Server};
use url::Url;

/// Table markup shaped like pandas `DataFrame.to_html` output.
pub const PANDAS_TABLE: &str = concat!(
    "<table border=\"1\" class=\"dataframe table table-striped table-bordered\">\n",
    "  <thead>\n",
    "    <tr style=\"text-align: right;\">\n",
    "      <th>Mes</th>\n",
    "      <th>Valor</th>\n",
    "      <th>Meta</th>\n",
    "    </tr>\n",
    "  </thead>\n",
    "  <tbody>\n",
    "    <tr>\n",
    "      <td>Jan</td>\n",
    "      <td>120.5</td>\n",
    "      <td>-4</td>\n",
    "    </tr>\n",
    "  </tbody>\n",
    "</table>"
);

pub const CHART_SRC: &str = "data:image/png;base64,iVBORw0KGgo=";
pub const SESSION_COOKIE: &str = "session_id=4f7c2d1e-test";

/// What the mock server saw for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub cookie: Option<String>,
}

impl RecordedRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> BTreeMap<String, String> {
        self.query.iter().cloned().collect()
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).context("decode request body as JSON")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl MockResponse {
    pub fn json(value: Value) -> Self {
        Self {
            status: 200,
            body: value.to_string(),
            headers: vec![("Content-Type".to_owned(), "application/json".to_owned())],
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
            headers: vec![("Content-Type".to_owned(), "text/plain".to_owned())],
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }
}

type Handler = dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static;

/// A tiny_http server on an ephemeral port that answers through a handler
/// closure and records every request. Stops when dropped.
pub struct MockServer {
    base_url: String,
    server: Arc<Server>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    pub fn start<F>(handler: F) -> Result<Self>
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        let server = Server::http("127.0.0.1:0")
            .map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());
        let server = Arc::new(server);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Box<Handler> = Box::new(handler);

        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let recorded = record(&mut request);
                    let reply = handler(&recorded);
                    lock(&requests).push(recorded);
                    let _ = request.respond(to_response(reply));
                }
            })
        };

        Ok(Self {
            base_url,
            server,
            requests,
            handle: Some(handle),
        })
    }

    /// Serves [`dashboard_routes`].
    pub fn dashboard() -> Result<Self> {
        Self::start(dashboard_routes)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        lock(&self.requests)
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }

    pub fn paths(&self) -> Vec<String> {
        lock(&self.requests)
            .iter()
            .map(|request| request.path.clone())
            .collect()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn record(request: &mut tiny_http::Request) -> RecordedRequest {
    let mut body = Vec::new();
    let _ = request.as_reader().read_to_end(&mut body);

    let header = |name: &str| {
        request
            .headers()
            .iter()
            .find(|header| header.field.as_str().as_str().eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str().to_owned())
    };
    let content_type = header("Content-Type");
    let cookie = header("Cookie");

    let (path, query) = match Url::parse(&format!("http://mock{}", request.url())) {
        Ok(url) => (
            url.path().to_owned(),
            url.query_pairs()
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect(),
        ),
        Err(_) => (request.url().to_owned(), Vec::new()),
    };

    RecordedRequest {
        method: request.method().to_string(),
        path,
        query,
        body,
        content_type,
        cookie,
    }
}

fn to_response(reply: MockResponse) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    for (name, value) in &reply.headers {
        if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            response = response.with_header(header);
        }
    }
    response
}

pub fn session_response() -> MockResponse {
    MockResponse::text(200, "<html></html>")
        .with_header("Set-Cookie", &format!("{SESSION_COOKIE}; Path=/"))
}

pub fn indicators_response(names: &[&str]) -> MockResponse {
    MockResponse::json(json!({"success": true, "indicadores": names}))
}

pub fn dashboard_response(table_html: &str, chart_src: &str) -> MockResponse {
    MockResponse::json(json!({
        "success": true,
        "tabela_html": table_html,
        "grafico_base64": chart_src,
    }))
}

/// `fields` are `(nome, tipo)` pairs.
pub fn structure_response(spreadsheet: &str, sheet: &str, fields: &[(&str, &str)]) -> MockResponse {
    let colunas = fields
        .iter()
        .map(|(name, kind)| json!({"nome": name, "tipo": kind}))
        .collect::<Vec<_>>();
    MockResponse::json(json!({
        "success": true,
        "nome_planilha": spreadsheet,
        "nome_aba": sheet,
        "colunas": colunas,
    }))
}

pub fn upload_response(loaded: &[&str], message: &str) -> MockResponse {
    MockResponse::json(json!({
        "success": true,
        "message": message,
        "planilhas_carregadas": loaded,
    }))
}

pub fn message_response(message: &str) -> MockResponse {
    MockResponse::json(json!({"success": true, "message": message}))
}

pub fn failure_response(error: &str) -> MockResponse {
    MockResponse::json(json!({"success": false, "error": error}))
}

/// Default fields the server reports for an indicator.
pub fn default_fields() -> [(&'static str, &'static str); 4] {
    [
        ("Data", "data"),
        ("Valor", "numero"),
        ("Meta", "numero"),
        ("Observacao", "texto"),
    ]
}

/// A well-behaved dashboard server: sector "Finance" has "Revenue" and
/// "Costs", every other sector is empty.
pub fn dashboard_routes(request: &RecordedRequest) -> MockResponse {
    match request.path.as_str() {
        "/" => session_response(),
        "/get_indicadores" => match request.param("setor") {
            Some("Finance") => indicators_response(&["Revenue", "Costs"]),
            Some(_) => indicators_response(&[]),
            None => failure_response("Setor não especificado"),
        },
        "/get_dados" => dashboard_response(PANDAS_TABLE, CHART_SRC),
        "/get_estrutura_indicador" => {
            let indicator = request.param("indicador").unwrap_or_default();
            structure_response("financeiro", indicator, &default_fields())
        }
        "/upload" => upload_response(&["financeiro"], "Arquivo financeiro.xlsx carregado com sucesso"),
        "/salvar_dados" => message_response("Dados salvos com sucesso"),
        "/inicializar_banco" => message_response("Banco de dados inicializado com sucesso"),
        "/migrar_dados" => message_response("Dados migrados com sucesso"),
        _ => MockResponse::text(404, "not found"),
    }
}

/// Writes a small file named `name` into `dir` for upload tests. The bytes
/// only need to travel; nothing parses them client-side.
pub fn spreadsheet_fixture(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, b"PK\x03\x04painel-fixture")
        .with_context(|| format!("write fixture {}", path.display()))?;
    Ok(path)
}

pub fn temp_dir() -> Result<tempfile::TempDir> {
    tempfile::tempdir().context("create temp dir")
}

pub fn fields(pairs: &[(&str, &str)]) -> Vec<FieldDescriptor> {
    pairs
        .iter()
        .map(|(name, kind)| FieldDescriptor::new(name, FieldKind::parse(kind)))
        .collect()
}

#[derive(Debug, Default)]
struct Script {
    seen: Vec<Request>,
    replies: BTreeMap<RequestKind, VecDeque<Reply>>,
}

/// A [`Runtime`] that answers from queued replies. Clones share the same
/// script, so a front-end may hand copies to worker threads.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRuntime {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: Reply) -> &Self {
        lock(&self.script)
            .replies
            .entry(reply.kind())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn seen(&self) -> Vec<Request> {
        lock(&self.script).seen.clone()
    }

    pub fn seen_kinds(&self) -> Vec<RequestKind> {
        self.seen().iter().map(Request::kind).collect()
    }
}

impl Runtime for ScriptedRuntime {
    fn execute(&mut self, request: &Request) -> Reply {
        let mut script = lock(&self.script);
        script.seen.push(request.clone());
        let kind = request.kind();
        script
            .replies
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| unscripted(kind))
    }
}

fn unscripted(kind: RequestKind) -> Reply {
    let failure = Failure::transport(format!("no scripted reply for {}", kind.as_str()));
    match kind {
        RequestKind::Indicators => Reply::Indicators(Err(failure)),
        RequestKind::Dashboard => Reply::Dashboard(Err(failure)),
        RequestKind::Structure => Reply::Structure(Err(failure)),
        RequestKind::Upload => Reply::Upload(Err(failure)),
        RequestKind::Save => Reply::Saved(Err(failure)),
    }
}

pub fn indicators_reply(names: &[&str]) -> Reply {
    Reply::Indicators(Ok(names.iter().map(|name| (*name).to_owned()).collect()))
}

pub fn dashboard_reply() -> Reply {
    Reply::Dashboard(Ok(DashboardData {
        table_html: PANDAS_TABLE.to_owned(),
        chart_src: CHART_SRC.to_owned(),
    }))
}

pub fn structure_reply(sheet: &str) -> Reply {
    Reply::Structure(Ok(IndicatorStructure {
        spreadsheet_name: "financeiro".to_owned(),
        sheet_name: sheet.to_owned(),
        fields: fields(&default_fields()),
    }))
}

pub fn upload_reply(loaded: &[&str]) -> Reply {
    Reply::Upload(Ok(UploadReceipt {
        loaded: loaded.iter().map(|name| (*name).to_owned()).collect(),
        message: "Arquivo carregado com sucesso".to_owned(),
    }))
}

#[cfg(test)]
mod tests {
    use super::{
        MockServer, ScriptedRuntime, dashboard_routes, indicators_reply, spreadsheet_fixture,
        temp_dir,
    };
    use anyhow::Result;
    use painel_app::{Reply, Request, RequestKind, Runtime};
    use std::io::{Read, Write};
    use std::net::TcpStream;

    #[test]
    fn mock_server_records_path_and_query() -> Result<()> {
        let server = MockServer::start(dashboard_routes)?;
        let address = server.base_url().trim_start_matches("http://").to_owned();

        let mut stream = TcpStream::connect(&address)?;
        write!(
            stream,
            "GET /get_indicadores?setor=Gest%C3%A3o HTTP/1.1\r\nHost: {address}\r\nConnection: close\r\n\r\n"
        )?;
        let mut response = String::new();
        stream.read_to_string(&mut response)?;
        assert!(response.contains("\"success\":true"));

        let requests = server.requests_to("/get_indicadores");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].param("setor"), Some("Gestão"));
        assert_eq!(requests[0].method, "GET");
        Ok(())
    }

    #[test]
    fn scripted_runtime_replays_in_order_and_fails_when_empty() {
        let mut runtime = ScriptedRuntime::new();
        runtime
            .push(indicators_reply(&["Revenue"]))
            .push(indicators_reply(&["Costs"]));
        let request = Request::Indicators {
            sector: "Finance".to_owned(),
        };

        assert_eq!(runtime.execute(&request), indicators_reply(&["Revenue"]));
        assert_eq!(runtime.execute(&request), indicators_reply(&["Costs"]));
        assert!(matches!(runtime.execute(&request), Reply::Indicators(Err(_))));
        assert_eq!(runtime.seen_kinds(), vec![RequestKind::Indicators; 3]);
    }

    #[test]
    fn spreadsheet_fixture_writes_named_file() -> Result<()> {
        let dir = temp_dir()?;
        let path = spreadsheet_fixture(dir.path(), "vendas.xlsx")?;
        assert!(path.ends_with("vendas.xlsx"));
        assert!(path.exists());
        Ok(())
    }
}
