// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! HTML rendering of a [`Page`]. Element ids match the dashboard template
//! so a page rendered here can stand in for the browser DOM in tests and
//! snapshots. Server table markup and chart sources are inserted as sent;
//! every other string is escaped.

use quick_xml::escape::escape;
use std::fmt::Write as _;

use crate::ChartKind;
use crate::forms::FIELDS_PER_ROW;
use crate::state::Notice;
use crate::view::{
    COMING_SOON_MESSAGE, ChartRegion, FILL_IN_PROMPT, FillInInfo, FillInView, FormView, Page,
    SelectView, TableRegion, VisualizeView,
};

pub const TABLE_CONTAINER_ID: &str = "tabela-container";
pub const CHART_CONTAINER_ID: &str = "grafico-container";
pub const LOADED_FILES_ID: &str = "planilhas-carregadas";
pub const FILL_IN_FORM_ID: &str = "form-preenchimento";
pub const FILL_IN_FIELDS_ID: &str = "campos-dinamicos";
pub const FILL_IN_INFO_ID: &str = "preenchimento-info";

fn hidden(visible: bool) -> &'static str {
    if visible { "" } else { " hidden" }
}

fn error_block(message: &str) -> String {
    format!(
        r#"<div class="alert alert-danger">{}</div>"#,
        escape(message)
    )
}

impl TableRegion {
    pub fn to_html(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Table { html, .. } => html.clone(),
            Self::Error(message) => error_block(message),
        }
    }
}

impl ChartRegion {
    pub fn to_html(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Image { src, alt } => format!(
                r#"<img src="{src}" class="img-fluid" alt="{}">"#,
                escape(alt.as_str())
            ),
            Self::Error(message) => error_block(message),
        }
    }
}

impl SelectView {
    pub fn to_html(&self) -> String {
        let mut out = format!(r#"<select id="{}" class="form-select">"#, self.dom_id);
        for option in &self.options {
            let _ = write!(
                out,
                r#"<option value="{}"{}>{}</option>"#,
                escape(option.value.as_str()),
                if option.selected { " selected" } else { "" },
                escape(option.label.as_str()),
            );
        }
        out.push_str("</select>");
        out
    }
}

impl FormView {
    pub fn to_html(&self) -> String {
        let mut out = format!(
            r#"<h5 id="indicador-selecionado">{}</h5><div id="{FILL_IN_FIELDS_ID}">"#,
            escape(self.title.as_str())
        );
        let column = 12 / FIELDS_PER_ROW;
        for row in &self.rows {
            out.push_str(r#"<div class="row">"#);
            for field in row {
                let input = &field.input;
                let id = input.dom_id();
                let _ = write!(
                    out,
                    r#"<div class="col-md-{column} mb-3"><label for="{id}" class="form-label">{label}</label><input type="{kind}" class="form-control" id="{id}" name="{name}" value="{value}"{step}{required}></div>"#,
                    id = escape(id.as_str()),
                    label = escape(input.label().as_str()),
                    kind = input.input_type.as_str(),
                    name = escape(input.name.as_str()),
                    value = escape(field.value.as_str()),
                    step = input
                        .step()
                        .map(|step| format!(r#" step="{step}""#))
                        .unwrap_or_default(),
                    required = if input.required { " required" } else { "" },
                );
            }
            out.push_str("</div>");
        }
        out.push_str("</div>");
        out
    }
}

impl VisualizeView {
    pub fn to_html(&self) -> String {
        let mut out = format!(
            r#"<div id="visualizacao-container"{}>"#,
            hidden(self.visible)
        );
        out.push_str(r#"<div class="chart-options">"#);
        for kind in ChartKind::ALL {
            let _ = write!(
                out,
                r#"<input type="radio" name="tipo-grafico" id="grafico-{wire}" value="{wire}"{checked}><label for="grafico-{wire}">{label}</label>"#,
                wire = kind.as_str(),
                checked = if kind == self.chart { " checked" } else { "" },
                label = kind.label(),
            );
        }
        let _ = write!(
            out,
            r#"<input type="checkbox" id="mostrar-tendencia"{}><label for="mostrar-tendencia">show trend</label></div>"#,
            if self.trend { " checked" } else { "" }
        );
        let _ = write!(
            out,
            r#"<div id="{TABLE_CONTAINER_ID}">{}</div><div id="{CHART_CONTAINER_ID}">{}</div>"#,
            self.table.to_html(),
            self.chart_region.to_html()
        );
        let _ = write!(
            out,
            r#"<form id="upload-form"><input type="file" id="file-input" accept=".xlsx,.xls"{}><button type="submit">Upload</button></form>"#,
            self.chosen_file
                .as_deref()
                .map(|name| format!(r#" data-file="{}""#, escape(name)))
                .unwrap_or_default()
        );
        let _ = write!(
            out,
            r#"<div id="{LOADED_FILES_ID}">{}</div></div>"#,
            self.loaded_files
                .as_deref()
                .map(|files| escape(files).into_owned())
                .unwrap_or_default()
        );
        out
    }
}

impl FillInView {
    pub fn to_html(&self) -> String {
        let mut out = format!(
            r#"<div id="preenchimento-container"{}>"#,
            hidden(self.visible)
        );
        match &self.info {
            FillInInfo::Hidden => {
                let _ = write!(out, r#"<div id="{FILL_IN_INFO_ID}" hidden></div>"#);
            }
            FillInInfo::Prompt => {
                let _ = write!(
                    out,
                    r#"<div id="{FILL_IN_INFO_ID}" class="alert alert-info">{FILL_IN_PROMPT}</div>"#
                );
            }
            FillInInfo::Error(message) => {
                let _ = write!(
                    out,
                    r#"<div id="{FILL_IN_INFO_ID}">{}</div>"#,
                    error_block(message)
                );
            }
        }
        let _ = write!(
            out,
            r#"<form id="{FILL_IN_FORM_ID}"{}>{}<button type="submit" class="btn btn-primary">Save</button><button type="button" id="btn-cancelar-preenchimento" class="btn btn-secondary">Cancel</button></form></div>"#,
            hidden(self.form.is_some()),
            self.form.as_ref().map(FormView::to_html).unwrap_or_default()
        );
        out
    }
}

fn notice_html(notice: &Notice) -> String {
    match notice {
        Notice::Success(message) => format!(
            r#"<div id="success-modal" class="modal show"><p id="success-message">{}</p></div>"#,
            escape(message.as_str())
        ),
        Notice::Error(message) => format!(
            r#"<div id="error-modal" class="modal show"><p id="error-message">{}</p></div>"#,
            escape(message.as_str())
        ),
        Notice::ComingSoon => format!(
            r#"<div id="future-modal" class="modal show"><p>{COMING_SOON_MESSAGE}</p></div>"#
        ),
    }
}

impl Page {
    pub fn to_html(&self) -> String {
        let mut out = String::from(r#"<nav class="navbar">"#);
        for entry in &self.nav {
            let _ = write!(
                out,
                r##"<a href="#" id="{}" class="nav-link{}{}">{}</a>"##,
                entry.dom_id(),
                if entry.active { " active" } else { "" },
                if entry.enabled { "" } else { " future" },
                entry.view.label()
            );
        }
        out.push_str("</nav>");
        out.push_str(&self.sectors.to_html());
        out.push_str(&self.indicators.to_html());
        out.push_str(&self.visualize.to_html());
        out.push_str(&self.fill_in.to_html());
        let _ = write!(
            out,
            r#"<div id="analise-container"{}><p>{COMING_SOON_MESSAGE}</p></div>"#,
            hidden(self.analyze_visible)
        );
        if let Some(message) = &self.loading {
            let _ = write!(
                out,
                r#"<div id="loading-modal" class="modal show"><p id="loading-message">{}</p></div>"#,
                escape(message.as_str())
            );
        }
        if let Some(notice) = &self.notice {
            out.push_str(&notice_html(notice));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::state::{DashboardPanel, DashboardState, Notice};
    use crate::{Capabilities, IndicatorOptions, ViewKind, render_page};

    fn base() -> DashboardState {
        DashboardState::new(vec!["Finance".to_owned()], Capabilities::default())
    }

    #[test]
    fn table_region_is_inserted_as_sent() {
        let mut state = base();
        let table = "<table><tbody><tr><td>Revenue</td></tr></tbody></table>";
        state.dashboard = DashboardPanel::Loaded {
            table_html: table.to_owned(),
            grid: None,
            chart_src: "data:image/png;base64,AAA".to_owned(),
            indicator: "Revenue".to_owned(),
        };
        let page = render_page(&state);
        assert_eq!(page.visualize.table.to_html(), table);
        assert_eq!(
            page.visualize.chart_region.to_html(),
            r#"<img src="data:image/png;base64,AAA" class="img-fluid" alt="Chart of Revenue">"#
        );
    }

    #[test]
    fn error_text_is_escaped() {
        let mut state = base();
        state.dashboard = DashboardPanel::Failed("<script>x</script>".to_owned());
        let html = render_page(&state).visualize.table.to_html();
        assert_eq!(
            html,
            r#"<div class="alert alert-danger">&lt;script&gt;x&lt;/script&gt;</div>"#
        );
    }

    #[test]
    fn page_marks_selected_options_and_hidden_views() {
        let mut state = base().with_view(ViewKind::FillIn);
        state.indicators = IndicatorOptions::Available(vec!["A & B".to_owned()]);
        state.selection.indicator = "A & B".to_owned();
        let html = render_page(&state).to_html();
        assert!(html.contains(r#"<option value="A &amp; B" selected>A &amp; B</option>"#));
        assert!(html.contains(r#"<div id="visualizacao-container" hidden>"#));
        assert!(html.contains(r#"<div id="preenchimento-container">"#));
        assert!(html.contains(r##"<a href="#" id="nav-preenchimento" class="nav-link active">"##));
    }

    #[test]
    fn disabled_views_are_marked_future() {
        let state = DashboardState::new(
            Vec::new(),
            Capabilities {
                fill_in: false,
                analyze: true,
            },
        );
        let html = render_page(&state).to_html();
        assert!(html.contains(r#"id="nav-preenchimento" class="nav-link future""#));
    }

    #[test]
    fn notices_render_as_modals() {
        let mut state = base();
        state.notice = Some(Notice::Success("Data saved successfully!".to_owned()));
        state.loading = Some("Saving data, please wait...".to_owned());
        let html = render_page(&state).to_html();
        assert!(html.contains(r#"<p id="success-message">Data saved successfully!</p>"#));
        assert!(html.contains(r#"<p id="loading-message">Saving data, please wait...</p>"#));
    }
}
