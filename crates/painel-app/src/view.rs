// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! A single projection from [`DashboardState`] to what the page shows. Both
//! the HTML renderer and the terminal front-end draw from a [`Page`].

use crate::forms::FormInput;
use crate::state::{DashboardPanel, DashboardState, FillInPanel, IndicatorOptions, Notice};
use crate::table::TableGrid;
use crate::{ChartKind, ViewKind};

pub const SECTOR_SELECT_ID: &str = "select-setor";
pub const INDICATOR_SELECT_ID: &str = "select-indicador";

pub const LOADING_OPTION_LABEL: &str = "Loading...";
pub const NO_INDICATORS_LABEL: &str = "No indicators available";
pub const INDICATORS_FAILED_LABEL: &str = "Error loading indicators";
pub const FILL_IN_PROMPT: &str = "Select a sector and an indicator to fill in values.";
pub const COMING_SOON_MESSAGE: &str = "This feature is coming soon.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub view: ViewKind,
    pub active: bool,
    pub enabled: bool,
}

impl NavEntry {
    pub fn dom_id(&self) -> String {
        format!("nav-{}", self.view.dom_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectView {
    pub dom_id: &'static str,
    pub options: Vec<SelectOption>,
}

impl SelectView {
    pub fn selected(&self) -> Option<&SelectOption> {
        self.options.iter().find(|option| option.selected)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.options.iter().position(|option| option.selected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRegion {
    Empty,
    /// Server markup with numeric cells tagged, plus a text grid when the
    /// markup could be walked.
    Table {
        html: String,
        grid: Option<TableGrid>,
    },
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartRegion {
    Empty,
    Image { src: String, alt: String },
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualizeView {
    pub visible: bool,
    pub chart: ChartKind,
    pub trend: bool,
    pub table: TableRegion,
    pub chart_region: ChartRegion,
    pub chosen_file: Option<String>,
    pub loaded_files: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFieldView {
    pub input: FormInput,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub title: String,
    pub rows: Vec<Vec<FormFieldView>>,
}

impl FormView {
    pub fn fields(&self) -> impl Iterator<Item = &FormFieldView> {
        self.rows.iter().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillInInfo {
    Hidden,
    Prompt,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillInView {
    pub visible: bool,
    pub info: FillInInfo,
    pub form: Option<FormView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub nav: Vec<NavEntry>,
    pub sectors: SelectView,
    pub indicators: SelectView,
    pub visualize: VisualizeView,
    pub fill_in: FillInView,
    pub analyze_visible: bool,
    pub loading: Option<String>,
    pub notice: Option<Notice>,
}

impl Page {
    pub fn active_view(&self) -> ViewKind {
        self.nav
            .iter()
            .find(|entry| entry.active)
            .map_or(ViewKind::Visualize, |entry| entry.view)
    }
}

pub fn render_page(state: &DashboardState) -> Page {
    let nav = ViewKind::ALL
        .iter()
        .map(|view| NavEntry {
            view: *view,
            active: *view == state.view,
            enabled: state.capabilities.allows(*view),
        })
        .collect();

    let (table, chart_region) = match &state.dashboard {
        DashboardPanel::Idle => (TableRegion::Empty, ChartRegion::Empty),
        DashboardPanel::Loaded {
            table_html,
            grid,
            chart_src,
            indicator,
        } => (
            TableRegion::Table {
                html: table_html.clone(),
                grid: grid.clone(),
            },
            ChartRegion::Image {
                src: chart_src.clone(),
                alt: format!("Chart of {indicator}"),
            },
        ),
        DashboardPanel::Failed(message) => (
            TableRegion::Error(message.clone()),
            ChartRegion::Error(message.clone()),
        ),
    };

    Page {
        nav,
        sectors: sector_select(state),
        indicators: indicator_select(state),
        visualize: VisualizeView {
            visible: state.view == ViewKind::Visualize,
            chart: state.chart,
            trend: state.trend,
            table,
            chart_region,
            chosen_file: state.upload.file.as_deref().map(crate::file_display_name),
            loaded_files: state.upload.status_line(),
        },
        fill_in: fill_in_view(state),
        analyze_visible: state.view == ViewKind::Analyze,
        loading: state.loading.clone(),
        notice: state.notice.clone(),
    }
}

fn sector_select(state: &DashboardState) -> SelectView {
    SelectView {
        dom_id: SECTOR_SELECT_ID,
        options: state
            .sectors
            .iter()
            .map(|sector| SelectOption {
                value: sector.clone(),
                label: sector.clone(),
                selected: *sector == state.selection.sector,
            })
            .collect(),
    }
}

fn indicator_select(state: &DashboardState) -> SelectView {
    let placeholder = |label: &str| {
        vec![SelectOption {
            value: String::new(),
            label: label.to_owned(),
            selected: true,
        }]
    };

    let options = match &state.indicators {
        IndicatorOptions::Loading => placeholder(LOADING_OPTION_LABEL),
        IndicatorOptions::Empty => placeholder(NO_INDICATORS_LABEL),
        IndicatorOptions::Failed => placeholder(INDICATORS_FAILED_LABEL),
        IndicatorOptions::Available(names) => names
            .iter()
            .map(|name| SelectOption {
                value: name.clone(),
                label: name.clone(),
                selected: *name == state.selection.indicator,
            })
            .collect(),
    };

    SelectView {
        dom_id: INDICATOR_SELECT_ID,
        options,
    }
}

fn fill_in_view(state: &DashboardState) -> FillInView {
    let visible = state.view == ViewKind::FillIn;
    match &state.fill_in {
        FillInPanel::Placeholder => FillInView {
            visible,
            info: FillInInfo::Prompt,
            form: None,
        },
        FillInPanel::Failed(message) => FillInView {
            visible,
            info: FillInInfo::Error(message.clone()),
            form: None,
        },
        FillInPanel::Form(form) => FillInView {
            visible,
            info: FillInInfo::Hidden,
            form: Some(FormView {
                title: form.context.title(),
                rows: form
                    .layout
                    .rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|input| FormFieldView {
                                input: input.clone(),
                                value: form.values.get(&input.name).cloned().unwrap_or_default(),
                            })
                            .collect()
                    })
                    .collect(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ChartRegion, FillInInfo, INDICATORS_FAILED_LABEL, NO_INDICATORS_LABEL, TableRegion,
        render_page,
    };
    use crate::state::{DashboardPanel, DashboardState, FillInForm, FillInPanel, IndicatorOptions};
    use crate::table::{parse_grid, tag_numeric_cells};
    use crate::{
        Capabilities, FieldDescriptor, FieldKind, FillInContext, IndicatorStructure, Selection,
        ViewKind, blank_values, build_form,
    };

    fn base() -> DashboardState {
        DashboardState::new(
            vec!["Finance".to_owned(), "Quality".to_owned()],
            Capabilities::default(),
        )
    }

    #[test]
    fn indicator_select_lists_server_order() {
        let mut state = base();
        state.indicators =
            IndicatorOptions::Available(vec!["Revenue".to_owned(), "Costs".to_owned()]);
        state.selection.indicator = "Revenue".to_owned();

        let page = render_page(&state);
        let labels = page
            .indicators
            .options
            .iter()
            .map(|option| option.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["Revenue", "Costs"]);
        assert_eq!(page.indicators.selected_index(), Some(0));
        assert_eq!(
            page.sectors.selected().map(|option| option.value.as_str()),
            Some("Finance")
        );
    }

    #[test]
    fn indicator_placeholders_have_empty_values() {
        let mut state = base();
        state.indicators = IndicatorOptions::Empty;
        let page = render_page(&state);
        assert_eq!(page.indicators.options.len(), 1);
        assert_eq!(page.indicators.options[0].label, NO_INDICATORS_LABEL);
        assert!(page.indicators.options[0].value.is_empty());

        state.indicators = IndicatorOptions::Failed;
        let page = render_page(&state);
        assert_eq!(page.indicators.options[0].label, INDICATORS_FAILED_LABEL);
    }

    #[test]
    fn loaded_dashboard_shows_tagged_table_and_describes_chart() {
        let mut state = base();
        let raw = "<table><tbody><tr><td>-2</td></tr></tbody></table>";
        state.dashboard = DashboardPanel::Loaded {
            table_html: tag_numeric_cells(raw),
            grid: parse_grid(raw),
            chart_src: "data:image/png;base64,AAA".to_owned(),
            indicator: "Revenue".to_owned(),
        };

        let page = render_page(&state);
        let TableRegion::Table { html, grid } = &page.visualize.table else {
            panic!("expected table, got {:?}", page.visualize.table);
        };
        assert!(html.contains(r#"<td class="valor-negativo">-2</td>"#));
        assert_eq!(grid.as_ref().map(|grid| grid.rows.len()), Some(1));
        assert_eq!(
            page.visualize.chart_region,
            ChartRegion::Image {
                src: "data:image/png;base64,AAA".to_owned(),
                alt: "Chart of Revenue".to_owned(),
            }
        );
    }

    #[test]
    fn failed_dashboard_shows_error_in_both_regions() {
        let mut state = base();
        state.dashboard = DashboardPanel::Failed("Indicador não encontrado".to_owned());
        let page = render_page(&state);
        assert_eq!(
            page.visualize.table,
            TableRegion::Error("Indicador não encontrado".to_owned())
        );
        assert_eq!(
            page.visualize.chart_region,
            ChartRegion::Error("Indicador não encontrado".to_owned())
        );
    }

    #[test]
    fn exactly_one_view_is_visible() {
        for view in ViewKind::ALL {
            let page = render_page(&base().with_view(view));
            let visible = [
                page.visualize.visible,
                page.fill_in.visible,
                page.analyze_visible,
            ];
            assert_eq!(visible.iter().filter(|shown| **shown).count(), 1);
            assert_eq!(page.active_view(), view);
        }
    }

    #[test]
    fn form_rows_carry_current_values() {
        let mut state = base().with_view(ViewKind::FillIn);
        let context = FillInContext::new(
            &Selection {
                sector: "Finance".to_owned(),
                indicator: "Revenue".to_owned(),
            },
            IndicatorStructure {
                spreadsheet_name: "financeiro".to_owned(),
                sheet_name: "Revenue".to_owned(),
                fields: vec![
                    FieldDescriptor::new("Data", FieldKind::Date),
                    FieldDescriptor::new("Valor", FieldKind::Number),
                    FieldDescriptor::new("Meta", FieldKind::Number),
                ],
            },
        );
        let mut values = blank_values(&context.fields);
        values.insert("Valor".to_owned(), "12".to_owned());
        state.fill_in = FillInPanel::Form(FillInForm {
            layout: build_form(&context.fields),
            values,
            context,
        });

        let page = render_page(&state);
        assert_eq!(page.fill_in.info, FillInInfo::Hidden);
        let form = page.fill_in.form.expect("form is shown");
        assert_eq!(form.title, "Finance - Revenue");
        assert_eq!(form.rows.len(), 2);
        let valor = form
            .fields()
            .find(|field| field.input.name == "Valor")
            .expect("valor field");
        assert_eq!(valor.value, "12");
    }

    #[test]
    fn placeholder_prompts_for_selection() {
        let page = render_page(&base().with_view(ViewKind::FillIn));
        assert_eq!(page.fill_in.info, FillInInfo::Prompt);
        assert!(page.fill_in.form.is_none());
    }
}
