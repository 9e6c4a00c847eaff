// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Sectors offered by the server's index page, in display order.
pub const DEFAULT_SECTORS: [&str; 12] = [
    "Comercial",
    "Engenharia de Produto",
    "Financeiro",
    "Compras",
    "Gestão de Pessoas",
    "Produção Matriz",
    "Produção Filial",
    "PCP",
    "Manutenção",
    "Engenharia Industrial",
    "Qualidade",
    "Direção",
];

pub const SPREADSHEET_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    Number,
    Date,
    Text,
}

impl FieldKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Number => "numero",
            Self::Date => "data",
            Self::Text => "texto",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "numero" => Self::Number,
            "data" => Self::Date,
            _ => Self::Text,
        }
    }
}

impl From<String> for FieldKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FieldKind> for String {
    fn from(value: FieldKind) -> Self {
        value.as_str().to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
}

impl ChartKind {
    pub const ALL: [Self; 3] = [Self::Line, Self::Bar, Self::Pie];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Line => "linha",
            Self::Bar => "barra",
            Self::Pie => "pizza",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::Pie => "pie",
        }
    }

    /// Accepts both the wire names and the display labels.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "linha" | "line" => Some(Self::Line),
            "barra" | "bar" => Some(Self::Bar),
            "pizza" | "pie" => Some(Self::Pie),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL
            .iter()
            .position(|kind| *kind == self)
            .unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewKind {
    Visualize,
    FillIn,
    Analyze,
}

impl ViewKind {
    pub const ALL: [Self; 3] = [Self::Visualize, Self::FillIn, Self::Analyze];

    /// Suffix of the container and navigation element ids.
    pub const fn dom_key(self) -> &'static str {
        match self {
            Self::Visualize => "visualizacao",
            Self::FillIn => "preenchimento",
            Self::Analyze => "analise",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Visualize => "visualize",
            Self::FillIn => "fill in",
            Self::Analyze => "analyze",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "visualize" | "visualizacao" => Some(Self::Visualize),
            "fill-in" | "fill_in" | "preenchimento" => Some(Self::FillIn),
            "analyze" | "analise" => Some(Self::Analyze),
            _ => None,
        }
    }
}

/// Which views this build exposes. Disabled views stay in the navigation
/// bar but only raise the "coming soon" notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub fill_in: bool,
    pub analyze: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            fill_in: true,
            analyze: true,
        }
    }
}

impl Capabilities {
    pub const fn allows(self, view: ViewKind) -> bool {
        match view {
            ViewKind::Visualize => true,
            ViewKind::FillIn => self.fill_in,
            ViewKind::Analyze => self.analyze,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub sector: String,
    pub indicator: String,
}

impl Selection {
    pub fn is_complete(&self) -> bool {
        !self.sector.is_empty() && !self.indicator.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardQuery {
    pub sector: String,
    pub indicator: String,
    pub chart: ChartKind,
    pub trend: bool,
}

impl DashboardQuery {
    pub fn params(&self) -> [(&'static str, String); 4] {
        [
            ("setor", self.sector.clone()),
            ("indicador", self.indicator.clone()),
            ("tipo_grafico", self.chart.as_str().to_owned()),
            ("mostrar_tendencia", self.trend.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardData {
    pub table_html: String,
    pub chart_src: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorStructure {
    pub spreadsheet_name: String,
    pub sheet_name: String,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillInContext {
    pub sector: String,
    pub indicator: String,
    pub spreadsheet_name: String,
    pub sheet_name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl FillInContext {
    pub fn new(selection: &Selection, structure: IndicatorStructure) -> Self {
        Self {
            sector: selection.sector.clone(),
            indicator: selection.indicator.clone(),
            spreadsheet_name: structure.spreadsheet_name,
            sheet_name: structure.sheet_name,
            fields: structure.fields,
        }
    }

    pub fn title(&self) -> String {
        format!("{} - {}", self.sector, self.indicator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub loaded: Vec<String>,
    pub message: String,
}

/// One collected form value.
///
/// A number field whose input does not parse is sent as `NotANumber`
/// (JSON `null`) instead of blocking the submission. This mirrors the
/// dashboard's long-standing behavior and is a reviewed decision point:
/// whether partial saves are intended is still an open product question.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    NotANumber,
    Text(String),
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(value) if value.is_finite() => serializer.serialize_f64(*value),
            Self::Number(_) | Self::NotANumber => serializer.serialize_none(),
            Self::Text(value) => serializer.serialize_str(value),
        }
    }
}

/// Field values keyed by column name, serialized in descriptor order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues(Vec<(String, FieldValue)>);

impl FieldValues {
    pub fn push(&mut self, name: &str, value: FieldValue) {
        self.0.push((name.to_owned(), value));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

impl Serialize for FieldValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavePayload {
    #[serde(rename = "setor")]
    pub sector: String,
    #[serde(rename = "indicador")]
    pub indicator: String,
    #[serde(rename = "nome_planilha")]
    pub spreadsheet_name: String,
    #[serde(rename = "nome_aba")]
    pub sheet_name: String,
    #[serde(rename = "dados")]
    pub values: FieldValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network error, non-success HTTP status, or an undecodable body.
    Transport,
    /// The server answered with `success: false`.
    Application,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: message.into(),
        }
    }

    pub fn application(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Application,
            message: message.into(),
        }
    }

    /// User-facing text: transport errors get the call-site prefix, server
    /// errors are shown verbatim.
    pub fn describe(&self, prefix: &str) -> String {
        match self.kind {
            FailureKind::Transport => format!("{prefix}: {}", self.message),
            FailureKind::Application => self.message.clone(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Transport => write!(f, "transport error: {}", self.message),
            FailureKind::Application => write!(f, "server error: {}", self.message),
        }
    }
}

pub fn is_spreadsheet_name(name: &str) -> bool {
    SPREADSHEET_EXTENSIONS
        .iter()
        .any(|extension| name.ends_with(extension))
}

pub fn file_display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
