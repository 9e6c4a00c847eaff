// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use painel_api::Client;
use painel_app::{
    BAD_EXTENSION_MESSAGE, Capabilities, ChartKind, ChartRegion, Controller, DashboardState,
    Message, NEGATIVE_CLASS, Notice, POSITIVE_CLASS, TableRegion, ViewKind, tag_numeric_cells,
};
use painel_cli::runtime::HttpRuntime;
use painel_testkit::{
    CHART_SRC, MockServer, PANDAS_TABLE, dashboard_routes, failure_response, spreadsheet_fixture,
    temp_dir,
};
use std::time::Duration;

fn started(server: &MockServer) -> Result<Controller<HttpRuntime>> {
    let client = Client::new(server.base_url(), Some(Duration::from_secs(5)))?;
    let state = DashboardState::new(
        vec!["Finance".to_owned(), "Quality".to_owned()],
        Capabilities::default(),
    );
    let mut controller = Controller::new(state, HttpRuntime::new(client));
    controller.start();
    Ok(controller)
}

#[test]
fn refresh_renders_the_server_table_and_chart() -> Result<()> {
    let server = MockServer::dashboard()?;
    let mut controller = started(&server)?;
    assert_eq!(controller.state().selection.indicator, "Revenue");

    controller.handle(Message::SetChart(ChartKind::Bar));
    controller.handle(Message::Refresh);

    let requests = server.requests_to("/get_dados");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].param("setor"), Some("Finance"));
    assert_eq!(requests[0].param("indicador"), Some("Revenue"));
    assert_eq!(requests[0].param("tipo_grafico"), Some("barra"));
    assert_eq!(requests[0].param("mostrar_tendencia"), Some("false"));

    let page = controller.page();
    let TableRegion::Table { html, grid } = &page.visualize.table else {
        panic!("expected a table, got {:?}", page.visualize.table);
    };
    assert_eq!(html, &tag_numeric_cells(PANDAS_TABLE));
    assert!(grid.is_some());
    assert_eq!(
        page.visualize.chart_region,
        ChartRegion::Image {
            src: CHART_SRC.to_owned(),
            alt: "Chart of Revenue".to_owned(),
        }
    );
    assert!(page.to_html().contains(&format!("src=\"{CHART_SRC}\"")));
    assert_eq!(controller.state().loading, None);
    Ok(())
}

#[test]
fn application_error_leaves_no_tagged_cells() -> Result<()> {
    let server = MockServer::start(|request| match request.path.as_str() {
        "/get_dados" => failure_response("Indicador não encontrado"),
        _ => dashboard_routes(request),
    })?;
    let mut controller = started(&server)?;
    controller.handle(Message::Refresh);

    let page = controller.page();
    assert_eq!(
        page.visualize.table,
        TableRegion::Error("Indicador não encontrado".to_owned())
    );
    let html = page.to_html();
    assert!(!html.contains(POSITIVE_CLASS));
    assert!(!html.contains(NEGATIVE_CLASS));
    Ok(())
}

#[test]
fn sector_without_indicators_blocks_refresh() -> Result<()> {
    let server = MockServer::dashboard()?;
    let mut controller = started(&server)?;
    controller.handle(Message::SelectSector("Quality".to_owned()));
    controller.handle(Message::Refresh);

    assert!(server.requests_to("/get_dados").is_empty());
    assert!(matches!(controller.state().notice, Some(Notice::Error(_))));
    Ok(())
}

#[test]
fn blank_numeric_field_is_sent_as_null() -> Result<()> {
    let server = MockServer::dashboard()?;
    let mut controller = started(&server)?;
    controller.handle(Message::Navigate(ViewKind::FillIn));
    assert!(controller.page().fill_in.form.is_some());

    controller.handle(Message::EditField {
        name: "Data".to_owned(),
        value: "2026-03-01".to_owned(),
    });
    controller.handle(Message::EditField {
        name: "Meta".to_owned(),
        value: "1500.5".to_owned(),
    });
    controller.handle(Message::SubmitFillIn);

    let requests = server.requests_to("/salvar_dados");
    assert_eq!(requests.len(), 1);
    let body = requests[0].json()?;
    assert_eq!(body["setor"], "Finance");
    assert_eq!(body["indicador"], "Revenue");
    assert_eq!(body["nome_planilha"], "financeiro");
    assert!(body["dados"]["Valor"].is_null());
    assert_eq!(body["dados"]["Meta"], 1500.5);
    assert_eq!(body["dados"]["Data"], "2026-03-01");
    Ok(())
}

#[test]
fn upload_reloads_indicators_once() -> Result<()> {
    let server = MockServer::dashboard()?;
    let mut controller = started(&server)?;
    let dir = temp_dir()?;
    let file = spreadsheet_fixture(dir.path(), "financeiro.xlsx")?;

    controller.handle(Message::ChooseFile(Some(file)));
    controller.handle(Message::Upload);

    assert_eq!(server.requests_to("/upload").len(), 1);
    let reloads = server.requests_to("/get_indicadores");
    assert_eq!(reloads.len(), 2);
    assert_eq!(reloads[1].param("setor"), Some("Finance"));
    assert_eq!(
        controller.state().notice,
        Some(Notice::Success(
            "Arquivo financeiro.xlsx carregado com sucesso".to_owned()
        ))
    );
    assert_eq!(
        controller.page().visualize.loaded_files.as_deref(),
        Some("1 file(s) loaded: financeiro")
    );
    Ok(())
}

#[test]
fn bad_extension_sends_nothing() -> Result<()> {
    let server = MockServer::dashboard()?;
    let mut controller = started(&server)?;
    let dir = temp_dir()?;
    let file = spreadsheet_fixture(dir.path(), "notes.csv")?;
    let before = server.requests().len();

    controller.handle(Message::ChooseFile(Some(file)));
    controller.handle(Message::Upload);

    assert_eq!(server.requests().len(), before);
    assert_eq!(
        controller.state().notice,
        Some(Notice::Error(BAD_EXTENSION_MESSAGE.to_owned()))
    );
    Ok(())
}

#[test]
fn entering_fill_in_always_refetches_structure() -> Result<()> {
    let server = MockServer::dashboard()?;
    let mut controller = started(&server)?;

    controller.handle(Message::Navigate(ViewKind::FillIn));
    controller.handle(Message::Navigate(ViewKind::Visualize));
    controller.handle(Message::Navigate(ViewKind::FillIn));

    let requests = server.requests_to("/get_estrutura_indicador");
    assert_eq!(requests.len(), 2);
    assert!(
        requests
            .iter()
            .all(|request| request.param("indicador") == Some("Revenue"))
    );
    Ok(())
}
