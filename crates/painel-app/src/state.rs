// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::forms::{FormLayout, blank_values, build_form, build_save_payload, validate_upload};
use crate::table::{TableGrid, parse_grid, tag_numeric_cells};
use crate::{
    Capabilities, ChartKind, DashboardData, DashboardQuery, Failure, FillInContext,
    IndicatorStructure, RequestKind, RequestToken, RequestTokens, SavePayload, Selection,
    UploadReceipt, ViewKind,
};

pub const SELECT_BOTH_MESSAGE: &str = "Please select a sector and an indicator.";
pub const NO_FILL_IN_INDICATOR_MESSAGE: &str = "No indicator selected for filling in.";
pub const SAVED_MESSAGE: &str = "Data saved successfully!";

pub const LOADING_DATA_MESSAGE: &str = "Loading data...";
pub const LOADING_STRUCTURE_MESSAGE: &str = "Loading indicator structure...";
pub const UPLOADING_MESSAGE: &str = "Uploading file, please wait...";
pub const SAVING_MESSAGE: &str = "Saving data, please wait...";

const LOAD_DATA_PREFIX: &str = "Error loading data";
const LOAD_STRUCTURE_PREFIX: &str = "Error loading indicator structure";
const UPLOAD_PREFIX: &str = "Error uploading file";
const SAVE_PREFIX: &str = "Error saving data";

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Indicators { sector: String },
    Dashboard(DashboardQuery),
    Structure { sector: String, indicator: String },
    Upload { path: PathBuf },
    Save(SavePayload),
}

impl Request {
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::Indicators { .. } => RequestKind::Indicators,
            Self::Dashboard(_) => RequestKind::Dashboard,
            Self::Structure { .. } => RequestKind::Structure,
            Self::Upload { .. } => RequestKind::Upload,
            Self::Save(_) => RequestKind::Save,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssuedRequest {
    pub token: RequestToken,
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Indicators(Result<Vec<String>, Failure>),
    Dashboard(Result<DashboardData, Failure>),
    Structure(Result<IndicatorStructure, Failure>),
    Upload(Result<UploadReceipt, Failure>),
    Saved(Result<(), Failure>),
}

impl Reply {
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::Indicators(_) => RequestKind::Indicators,
            Self::Dashboard(_) => RequestKind::Dashboard,
            Self::Structure(_) => RequestKind::Structure,
            Self::Upload(_) => RequestKind::Upload,
            Self::Saved(_) => RequestKind::Save,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Indicators(Err(failure))
            | Self::Dashboard(Err(failure))
            | Self::Structure(Err(failure))
            | Self::Upload(Err(failure))
            | Self::Saved(Err(failure)) => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Start,
    SelectSector(String),
    SelectIndicator(String),
    SetChart(ChartKind),
    SetTrend(bool),
    Refresh,
    ChooseFile(Option<PathBuf>),
    Upload,
    Navigate(ViewKind),
    EditField { name: String, value: String },
    SubmitFillIn,
    CancelFillIn,
    DismissNotice,
    Completed { token: RequestToken, reply: Reply },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorOptions {
    Loading,
    Available(Vec<String>),
    Empty,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardPanel {
    Idle,
    /// `table_html` already carries the tone classes; `grid` is the same
    /// table as text.
    Loaded {
        table_html: String,
        grid: Option<TableGrid>,
        chart_src: String,
        indicator: String,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillInForm {
    pub context: FillInContext,
    pub layout: FormLayout,
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillInPanel {
    Placeholder,
    Failed(String),
    Form(FillInForm),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPanel {
    pub file: Option<PathBuf>,
    pub loaded: Option<Vec<String>>,
}

impl UploadPanel {
    pub fn status_line(&self) -> Option<String> {
        self.loaded
            .as_ref()
            .map(|names| format!("{} file(s) loaded: {}", names.len(), names.join(", ")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
    ComingSoon,
}

/// Everything the page shows. A state value is never mutated after it is
/// rendered: [`DashboardState::dispatch`] returns the next state.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub capabilities: Capabilities,
    pub sectors: Vec<String>,
    pub view: ViewKind,
    pub selection: Selection,
    pub indicators: IndicatorOptions,
    pub chart: ChartKind,
    pub trend: bool,
    pub dashboard: DashboardPanel,
    pub upload: UploadPanel,
    pub fill_in: FillInPanel,
    pub loading: Option<String>,
    pub notice: Option<Notice>,
    tokens: RequestTokens,
    dashboard_request: Option<DashboardQuery>,
    structure_request: Option<Selection>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(
            crate::DEFAULT_SECTORS
                .iter()
                .map(|sector| (*sector).to_owned())
                .collect(),
            Capabilities::default(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: DashboardState,
    pub requests: Vec<IssuedRequest>,
}

impl DashboardState {
    pub fn new(sectors: Vec<String>, capabilities: Capabilities) -> Self {
        let sector = sectors.first().cloned().unwrap_or_default();
        Self {
            capabilities,
            sectors,
            view: ViewKind::Visualize,
            selection: Selection {
                sector,
                indicator: String::new(),
            },
            indicators: IndicatorOptions::Loading,
            chart: ChartKind::Line,
            trend: false,
            dashboard: DashboardPanel::Idle,
            upload: UploadPanel::default(),
            fill_in: FillInPanel::Placeholder,
            loading: None,
            notice: None,
            tokens: RequestTokens::default(),
            dashboard_request: None,
            structure_request: None,
        }
    }

    /// Starting view; ignored when the view is disabled.
    pub fn with_view(mut self, view: ViewKind) -> Self {
        if self.capabilities.allows(view) {
            self.view = view;
        }
        self
    }

    pub fn with_chart(mut self, chart: ChartKind) -> Self {
        self.chart = chart;
        self
    }

    pub fn tokens(&self) -> &RequestTokens {
        &self.tokens
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.tokens.is_current(token)
    }

    pub fn dispatch(&self, message: Message) -> Transition {
        let mut next = self.clone();
        let mut requests = Vec::new();
        next.apply(message, &mut requests);
        Transition {
            state: next,
            requests,
        }
    }

    fn apply(&mut self, message: Message, out: &mut Vec<IssuedRequest>) {
        match message {
            Message::Start => self.load_indicators(out),
            Message::SelectSector(sector) => {
                self.selection.sector = sector;
                self.load_indicators(out);
            }
            Message::SelectIndicator(indicator) => {
                self.selection.indicator = indicator;
                self.discard_structure();
                self.fill_in = FillInPanel::Placeholder;
                if self.view == ViewKind::FillIn {
                    self.load_structure(out);
                }
            }
            Message::SetChart(chart) => self.chart = chart,
            Message::SetTrend(trend) => self.trend = trend,
            Message::Refresh => self.refresh(out),
            Message::ChooseFile(file) => self.upload.file = file,
            Message::Upload => self.start_upload(out),
            Message::Navigate(view) => self.navigate(view, out),
            Message::EditField { name, value } => {
                if let FillInPanel::Form(form) = &mut self.fill_in
                    && let Some(slot) = form.values.get_mut(&name)
                {
                    *slot = value;
                }
            }
            Message::SubmitFillIn => self.submit_fill_in(out),
            Message::CancelFillIn => self.fill_in = FillInPanel::Placeholder,
            Message::DismissNotice => self.notice = None,
            Message::Completed { token, reply } => {
                if !self.tokens.is_current(token) || token.kind() != reply.kind() {
                    return;
                }
                self.complete(reply, out);
            }
        }
    }

    fn issue(&mut self, request: Request, out: &mut Vec<IssuedRequest>) {
        let token = self.tokens.issue(request.kind());
        out.push(IssuedRequest { token, request });
    }

    fn load_indicators(&mut self, out: &mut Vec<IssuedRequest>) {
        self.indicators = IndicatorOptions::Loading;
        self.selection.indicator.clear();
        self.discard_structure();
        self.fill_in = FillInPanel::Placeholder;
        let sector = self.selection.sector.clone();
        self.issue(Request::Indicators { sector }, out);
    }

    /// A structure reply in flight belongs to the old selection; bumping the
    /// token turns it stale.
    fn discard_structure(&mut self) {
        if self.structure_request.take().is_some() {
            self.tokens.issue(RequestKind::Structure);
            if self.loading.as_deref() == Some(LOADING_STRUCTURE_MESSAGE) {
                self.loading = None;
            }
        }
    }

    fn refresh(&mut self, out: &mut Vec<IssuedRequest>) {
        if !self.selection.is_complete() {
            self.notice = Some(Notice::Error(SELECT_BOTH_MESSAGE.to_owned()));
            return;
        }

        let query = DashboardQuery {
            sector: self.selection.sector.clone(),
            indicator: self.selection.indicator.clone(),
            chart: self.chart,
            trend: self.trend,
        };
        self.loading = Some(LOADING_DATA_MESSAGE.to_owned());
        self.dashboard_request = Some(query.clone());
        self.issue(Request::Dashboard(query), out);
    }

    fn start_upload(&mut self, out: &mut Vec<IssuedRequest>) {
        match validate_upload(self.upload.file.as_deref()) {
            Ok(path) => {
                self.loading = Some(UPLOADING_MESSAGE.to_owned());
                self.issue(Request::Upload { path }, out);
            }
            Err(message) => self.notice = Some(Notice::Error(message.to_owned())),
        }
    }

    fn navigate(&mut self, view: ViewKind, out: &mut Vec<IssuedRequest>) {
        if !self.capabilities.allows(view) {
            self.notice = Some(Notice::ComingSoon);
            return;
        }

        self.view = view;
        if view == ViewKind::FillIn {
            self.fill_in = FillInPanel::Placeholder;
            self.load_structure(out);
        }
    }

    fn load_structure(&mut self, out: &mut Vec<IssuedRequest>) {
        if !self.selection.is_complete() {
            self.fill_in = FillInPanel::Placeholder;
            return;
        }

        self.loading = Some(LOADING_STRUCTURE_MESSAGE.to_owned());
        self.structure_request = Some(self.selection.clone());
        self.issue(
            Request::Structure {
                sector: self.selection.sector.clone(),
                indicator: self.selection.indicator.clone(),
            },
            out,
        );
    }

    fn submit_fill_in(&mut self, out: &mut Vec<IssuedRequest>) {
        let payload = match &self.fill_in {
            FillInPanel::Form(form)
                if !form.context.sector.is_empty() && !form.context.indicator.is_empty() =>
            {
                build_save_payload(&form.context, &form.values)
            }
            _ => {
                self.notice = Some(Notice::Error(NO_FILL_IN_INDICATOR_MESSAGE.to_owned()));
                return;
            }
        };

        self.loading = Some(SAVING_MESSAGE.to_owned());
        self.issue(Request::Save(payload), out);
    }

    fn complete(&mut self, reply: Reply, out: &mut Vec<IssuedRequest>) {
        match reply {
            Reply::Indicators(result) => {
                self.indicators = match result {
                    Ok(names) if names.is_empty() => IndicatorOptions::Empty,
                    Ok(names) => IndicatorOptions::Available(names),
                    Err(_) => IndicatorOptions::Failed,
                };
                self.selection.indicator = match &self.indicators {
                    IndicatorOptions::Available(names) => names.first().cloned().unwrap_or_default(),
                    _ => String::new(),
                };
                if self.view == ViewKind::FillIn {
                    self.load_structure(out);
                }
            }
            Reply::Dashboard(result) => {
                self.loading = None;
                let query = self.dashboard_request.take();
                self.dashboard = match result {
                    Ok(data) => DashboardPanel::Loaded {
                        table_html: tag_numeric_cells(&data.table_html),
                        grid: parse_grid(&data.table_html),
                        chart_src: data.chart_src,
                        indicator: query
                            .map(|query| query.indicator)
                            .unwrap_or_else(|| self.selection.indicator.clone()),
                    },
                    Err(failure) => DashboardPanel::Failed(failure.describe(LOAD_DATA_PREFIX)),
                };
            }
            Reply::Structure(result) => {
                self.loading = None;
                let selection = self
                    .structure_request
                    .take()
                    .unwrap_or_else(|| self.selection.clone());
                self.fill_in = match result {
                    Ok(structure) => {
                        let context = FillInContext::new(&selection, structure);
                        FillInPanel::Form(FillInForm {
                            layout: build_form(&context.fields),
                            values: blank_values(&context.fields),
                            context,
                        })
                    }
                    Err(failure) => FillInPanel::Failed(failure.describe(LOAD_STRUCTURE_PREFIX)),
                };
            }
            Reply::Upload(result) => {
                self.loading = None;
                match result {
                    Ok(receipt) => {
                        self.upload.loaded = Some(receipt.loaded);
                        self.upload.file = None;
                        self.load_indicators(out);
                        self.notice = Some(Notice::Success(receipt.message));
                    }
                    Err(failure) => {
                        self.notice = Some(Notice::Error(failure.describe(UPLOAD_PREFIX)));
                    }
                }
            }
            Reply::Saved(result) => {
                self.loading = None;
                match result {
                    Ok(()) => {
                        self.fill_in = FillInPanel::Placeholder;
                        self.notice = Some(Notice::Success(SAVED_MESSAGE.to_owned()));
                        self.load_indicators(out);
                    }
                    Err(failure) => {
                        self.notice = Some(Notice::Error(failure.describe(SAVE_PREFIX)));
                    }
                }
            }
        }
    }
}
