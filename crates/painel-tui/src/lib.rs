// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use painel_app::{
    COMING_SOON_MESSAGE, CellTone, ChartRegion, DashboardState, FILL_IN_PROMPT, FillInInfo,
    IssuedRequest, Message, Notice, Page, Reply, RequestToken, Runtime, SelectView, TableGrid,
    TableRegion, ViewKind, log_message, render_page,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    Completed { token: RequestToken, reply: Reply },
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Focus {
    Sector,
    Indicator,
    UploadPath,
    Field(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ViewData {
    focus: usize,
    upload_input: String,
    status: Option<String>,
    status_token: u64,
    help_visible: bool,
}

pub fn run_app<R>(state: DashboardState, runtime: R) -> Result<()>
where
    R: Runtime + Clone + Send + 'static,
{
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let result = match Terminal::new(backend).context("create terminal") {
        Ok(mut terminal) => event_loop(&mut terminal, state, &runtime),
        Err(error) => Err(error),
    };

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn event_loop<R>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut state: DashboardState,
    runtime: &R,
) -> Result<()>
where
    R: Runtime + Clone + Send + 'static,
{
    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    apply_message(&mut state, runtime, &internal_tx, Message::Start);
    let mut page = render_page(&state);

    loop {
        if process_internal_events(
            &mut state,
            &mut view_data,
            runtime,
            &internal_tx,
            &internal_rx,
        ) {
            page = render_page(&state);
        }

        terminal
            .draw(|frame| render(frame, &page, &view_data))
            .context("draw frame")?;

        if event::poll(Duration::from_millis(120)).context("poll event")?
            && let Event::Key(key) = event::read().context("read event")?
        {
            if handle_key_event(&mut state, runtime, &mut view_data, &internal_tx, key) {
                return Ok(());
            }
            page = render_page(&state);
        }
    }
}

/// Dispatches `message` and starts one worker per issued request.
fn apply_message<R>(
    state: &mut DashboardState,
    runtime: &R,
    internal_tx: &Sender<InternalEvent>,
    message: Message,
) where
    R: Runtime + Clone + Send + 'static,
{
    log_message(state, &message);
    let transition = state.dispatch(message);
    *state = transition.state;
    for issued in transition.requests {
        spawn_request(runtime, issued, internal_tx);
    }
}

fn spawn_request<R>(runtime: &R, issued: IssuedRequest, internal_tx: &Sender<InternalEvent>)
where
    R: Runtime + Clone + Send + 'static,
{
    tracing::debug!(
        kind = issued.token.kind().as_str(),
        seq = issued.token.seq(),
        "spawning request"
    );
    let mut runtime = runtime.clone();
    let sender = internal_tx.clone();
    thread::spawn(move || {
        let reply = runtime.execute(&issued.request);
        let _ = sender.send(InternalEvent::Completed {
            token: issued.token,
            reply,
        });
    });
}

/// Drains finished work. Returns whether anything was applied.
fn process_internal_events<R>(
    state: &mut DashboardState,
    view_data: &mut ViewData,
    runtime: &R,
    internal_tx: &Sender<InternalEvent>,
    internal_rx: &Receiver<InternalEvent>,
) -> bool
where
    R: Runtime + Clone + Send + 'static,
{
    let mut handled = false;
    while let Ok(event) = internal_rx.try_recv() {
        handle_internal_event(state, view_data, runtime, internal_tx, event);
        handled = true;
    }
    handled
}

fn handle_internal_event<R>(
    state: &mut DashboardState,
    view_data: &mut ViewData,
    runtime: &R,
    internal_tx: &Sender<InternalEvent>,
    event: InternalEvent,
) where
    R: Runtime + Clone + Send + 'static,
{
    match event {
        InternalEvent::Completed { token, reply } => {
            let upload_done = matches!(reply, Reply::Upload(Ok(_))) && state.is_current(token);
            apply_message(state, runtime, internal_tx, Message::Completed { token, reply });
            if upload_done {
                view_data.upload_input.clear();
            }
        }
        InternalEvent::ClearStatus { token } if token == view_data.status_token => {
            view_data.status = None;
        }
        InternalEvent::ClearStatus { .. } => {}
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn focus_order(page: &Page) -> Vec<Focus> {
    let mut order = vec![Focus::Sector, Focus::Indicator];
    match page.active_view() {
        ViewKind::Visualize => order.push(Focus::UploadPath),
        ViewKind::FillIn => {
            if let Some(form) = &page.fill_in.form {
                order.extend(
                    form.fields()
                        .map(|field| Focus::Field(field.input.name.clone())),
                );
            }
        }
        ViewKind::Analyze => {}
    }
    order
}

fn current_focus(page: &Page, view_data: &ViewData) -> Focus {
    let order = focus_order(page);
    order
        .get(view_data.focus)
        .or_else(|| order.last())
        .cloned()
        .unwrap_or(Focus::Sector)
}

fn move_focus(page: &Page, view_data: &mut ViewData, delta: isize) {
    let len = focus_order(page).len().max(1) as isize;
    let current = (view_data.focus as isize).min(len - 1);
    view_data.focus = (current + delta).rem_euclid(len) as usize;
}

/// Value of the neighbouring real option, or `None` when nothing changes.
fn step_option(select: &SelectView, delta: isize) -> Option<String> {
    let values = select
        .options
        .iter()
        .filter(|option| !option.value.is_empty())
        .collect::<Vec<_>>();
    if values.is_empty() {
        return None;
    }
    let len = values.len() as isize;
    let next = match values.iter().position(|option| option.selected) {
        Some(index) => (index as isize + delta).rem_euclid(len) as usize,
        None => 0,
    };
    let candidate = values[next];
    (!candidate.selected).then(|| candidate.value.clone())
}

fn field_value(page: &Page, name: &str) -> String {
    page.fill_in
        .form
        .as_ref()
        .and_then(|form| form.fields().find(|field| field.input.name == name))
        .map(|field| field.value.clone())
        .unwrap_or_default()
}

fn choose_upload_file<R>(
    state: &mut DashboardState,
    runtime: &R,
    view_data: &ViewData,
    internal_tx: &Sender<InternalEvent>,
) where
    R: Runtime + Clone + Send + 'static,
{
    let trimmed = view_data.upload_input.trim();
    let file = (!trimmed.is_empty()).then(|| PathBuf::from(trimmed));
    apply_message(state, runtime, internal_tx, Message::ChooseFile(file));
}

fn handle_key_event<R>(
    state: &mut DashboardState,
    runtime: &R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool
where
    R: Runtime + Clone + Send + 'static,
{
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if state.notice.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            apply_message(state, runtime, internal_tx, Message::DismissNotice);
        }
        return false;
    }

    // Requests that block the page keep the keyboard until they finish.
    if state.loading.is_some() {
        return false;
    }

    let page = render_page(state);
    match key.code {
        KeyCode::Tab => {
            move_focus(&page, view_data, 1);
            return false;
        }
        KeyCode::BackTab => {
            move_focus(&page, view_data, -1);
            return false;
        }
        _ => {}
    }

    match current_focus(&page, view_data) {
        Focus::UploadPath => match key.code {
            KeyCode::Char(ch) => {
                view_data.upload_input.push(ch);
                choose_upload_file(state, runtime, view_data, internal_tx);
                return false;
            }
            KeyCode::Backspace => {
                view_data.upload_input.pop();
                choose_upload_file(state, runtime, view_data, internal_tx);
                return false;
            }
            KeyCode::Enter => {
                apply_message(state, runtime, internal_tx, Message::Upload);
                return false;
            }
            _ => {}
        },
        Focus::Field(name) => match key.code {
            KeyCode::Char(ch) => {
                let mut value = field_value(&page, &name);
                value.push(ch);
                apply_message(
                    state,
                    runtime,
                    internal_tx,
                    Message::EditField { name, value },
                );
                return false;
            }
            KeyCode::Backspace => {
                let mut value = field_value(&page, &name);
                value.pop();
                apply_message(
                    state,
                    runtime,
                    internal_tx,
                    Message::EditField { name, value },
                );
                return false;
            }
            KeyCode::Enter => {
                apply_message(state, runtime, internal_tx, Message::SubmitFillIn);
                return false;
            }
            KeyCode::Esc => {
                apply_message(state, runtime, internal_tx, Message::CancelFillIn);
                view_data.focus = 0;
                emit_status(view_data, internal_tx, "form closed");
                return false;
            }
            _ => {}
        },
        Focus::Sector => {
            let delta = match key.code {
                KeyCode::Up | KeyCode::Left => Some(-1),
                KeyCode::Down | KeyCode::Right => Some(1),
                _ => None,
            };
            if let Some(delta) = delta {
                if let Some(sector) = step_option(&page.sectors, delta) {
                    apply_message(state, runtime, internal_tx, Message::SelectSector(sector));
                }
                return false;
            }
        }
        Focus::Indicator => {
            let delta = match key.code {
                KeyCode::Up | KeyCode::Left => Some(-1),
                KeyCode::Down | KeyCode::Right => Some(1),
                _ => None,
            };
            if let Some(delta) = delta {
                if let Some(indicator) = step_option(&page.indicators, delta) {
                    apply_message(
                        state,
                        runtime,
                        internal_tx,
                        Message::SelectIndicator(indicator),
                    );
                }
                return false;
            }
        }
    }

    let message = match key.code {
        KeyCode::Char(digit @ '1'..='3') => {
            let index = digit as usize - '1' as usize;
            let view = ViewKind::ALL[index];
            view_data.focus = 0;
            if state.capabilities.allows(view) {
                emit_status(view_data, internal_tx, format!("view: {}", view.label()));
            }
            Message::Navigate(view)
        }
        KeyCode::Char('c') => Message::SetChart(state.chart.next()),
        KeyCode::Char('t') => Message::SetTrend(!state.trend),
        KeyCode::Char('r') => Message::Refresh,
        KeyCode::Char('u') => Message::Upload,
        KeyCode::Char('?') => {
            view_data.help_visible = true;
            return false;
        }
        _ => return false,
    };
    apply_message(state, runtime, internal_tx, message);
    false
}

fn nav_titles(page: &Page) -> Vec<Line<'static>> {
    page.nav
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let style = if entry.enabled {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Line::from(Span::styled(
                format!("{} {}", index + 1, entry.view.label()),
                style,
            ))
        })
        .collect()
}

fn select_text(label: &str, select: &SelectView) -> String {
    let shown = select
        .selected()
        .map(|option| option.label.as_str())
        .unwrap_or("-");
    format!("{label}: < {shown} >")
}

fn chart_summary(region: &ChartRegion) -> String {
    match region {
        ChartRegion::Empty => String::new(),
        ChartRegion::Image { src, alt } => {
            let kind = src
                .strip_prefix("data:")
                .and_then(|rest| rest.split(';').next())
                .unwrap_or("image");
            format!("{alt} ({kind}, {} bytes)", src.len())
        }
        ChartRegion::Error(message) => message.clone(),
    }
}

fn visualize_text(page: &Page, view_data: &ViewData, focus: &Focus) -> Vec<String> {
    let visualize = &page.visualize;
    let mut lines = vec![format!(
        "chart: {} | trend: {}",
        visualize.chart.label(),
        if visualize.trend { "on" } else { "off" }
    )];
    let chart = chart_summary(&visualize.chart_region);
    if !chart.is_empty() {
        lines.push(chart);
    }
    let cursor = if *focus == Focus::UploadPath { "_" } else { "" };
    lines.push(format!("file: {}{cursor}", view_data.upload_input));
    if let Some(loaded) = &visualize.loaded_files {
        lines.push(loaded.clone());
    }
    lines
}

fn fill_in_text(page: &Page, focus: &Focus) -> String {
    let fill_in = &page.fill_in;
    if let Some(form) = &fill_in.form {
        let mut lines = vec![form.title.clone(), String::new()];
        for row in &form.rows {
            let cells = row
                .iter()
                .map(|field| {
                    let marker = if *focus == Focus::Field(field.input.name.clone()) {
                        ">"
                    } else {
                        " "
                    };
                    format!(
                        "{marker} {} [{}] ({})",
                        field.input.label(),
                        field.value,
                        field.input.input_type.as_str()
                    )
                })
                .collect::<Vec<_>>();
            lines.push(cells.join("    "));
        }
        lines.push(String::new());
        lines.push("enter save | esc cancel".to_owned());
        return lines.join("\n");
    }
    match &fill_in.info {
        FillInInfo::Error(message) => message.clone(),
        FillInInfo::Prompt | FillInInfo::Hidden => FILL_IN_PROMPT.to_owned(),
    }
}

fn notice_text(notice: &Notice) -> (&'static str, String) {
    match notice {
        Notice::Success(message) => ("success", message.clone()),
        Notice::Error(message) => ("error", message.clone()),
        Notice::ComingSoon => ("coming soon", COMING_SOON_MESSAGE.to_owned()),
    }
}

fn status_text(view_data: &ViewData) -> String {
    let default = "1/2/3 view | tab focus | arrows select | r refresh | c chart | t trend | u upload | ? help | ctrl+q";
    match &view_data.status {
        Some(status) => format!("{status} | {default}"),
        None => default.to_owned(),
    }
}

fn help_overlay_text() -> String {
    [
        "1 2 3      switch view (visualize, fill in, analyze)",
        "tab        move focus",
        "arrows     change the focused sector or indicator",
        "r          load table and chart",
        "c          cycle chart kind",
        "t          toggle trend line",
        "u          upload the typed spreadsheet path",
        "enter      upload (file focus) or save (form focus)",
        "esc        close the form or a message",
        "ctrl+q     quit",
    ]
    .join("\n")
}

fn tone_style(tone: CellTone) -> Style {
    match tone {
        CellTone::Positive => Style::default().fg(Color::Green),
        CellTone::Negative => Style::default().fg(Color::Red),
        CellTone::Neutral => Style::default(),
    }
}

fn render_grid(frame: &mut ratatui::Frame<'_>, area: Rect, grid: &TableGrid) {
    let columns = grid.column_count().max(1);
    let widths = vec![Constraint::Min(8); columns];
    let header = Row::new(grid.header.iter().map(|label| {
        Cell::from(label.clone()).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = grid.rows.iter().map(|row| {
        Row::new(
            row.cells
                .iter()
                .map(|cell| Cell::from(cell.text.clone()).style(tone_style(cell.tone))),
        )
    });
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("table"));
    frame.render_widget(table, area);
}

fn render_table_region(frame: &mut ratatui::Frame<'_>, area: Rect, region: &TableRegion) {
    let text = match region {
        TableRegion::Table {
            grid: Some(grid), ..
        } => {
            render_grid(frame, area, grid);
            return;
        }
        TableRegion::Table { html, grid: None } => html.clone(),
        TableRegion::Error(message) => message.clone(),
        TableRegion::Empty => "press r to load the selected indicator".to_owned(),
    };
    let style = if matches!(region, TableRegion::Error(_)) {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let body = Paragraph::new(text)
        .style(style)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("table"));
    frame.render_widget(body, area);
}

fn render(frame: &mut ratatui::Frame<'_>, page: &Page, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let selected = page
        .nav
        .iter()
        .position(|entry| entry.active)
        .unwrap_or(0);
    let tabs = Tabs::new(nav_titles(page))
        .block(Block::default().title("painel").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    let focus = current_focus(page, view_data);
    let focused = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let pick = |target: Focus| {
        if focus == target {
            focused
        } else {
            Style::default()
        }
    };
    let selects = Line::from(vec![
        Span::styled(select_text("sector", &page.sectors), pick(Focus::Sector)),
        Span::raw("   "),
        Span::styled(
            select_text("indicator", &page.indicators),
            pick(Focus::Indicator),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(selects).block(Block::default().borders(Borders::ALL)),
        layout[1],
    );

    match page.active_view() {
        ViewKind::Visualize => {
            let lines = visualize_text(page, view_data, &focus);
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(3),
                    Constraint::Length(lines.len() as u16 + 2),
                ])
                .split(layout[2]);
            render_table_region(frame, parts[0], &page.visualize.table);
            frame.render_widget(
                Paragraph::new(lines.join("\n"))
                    .block(Block::default().borders(Borders::ALL).title("chart & upload")),
                parts[1],
            );
        }
        ViewKind::FillIn => {
            frame.render_widget(
                Paragraph::new(fill_in_text(page, &focus))
                    .wrap(Wrap { trim: false })
                    .block(Block::default().borders(Borders::ALL).title("fill in")),
                layout[2],
            );
        }
        ViewKind::Analyze => {
            frame.render_widget(
                Paragraph::new(COMING_SOON_MESSAGE)
                    .block(Block::default().borders(Borders::ALL).title("analyze")),
                layout[2],
            );
        }
    }

    frame.render_widget(
        Paragraph::new(status_text(view_data)).style(Style::default().fg(Color::Yellow)),
        layout[3],
    );

    if let Some(message) = &page.loading {
        let area = centered_rect(40, 20, frame.area());
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(message.clone())
                .block(Block::default().title("please wait").borders(Borders::ALL)),
            area,
        );
    }

    if let Some(notice) = &page.notice {
        let (title, message) = notice_text(notice);
        let color = match notice {
            Notice::Error(_) => Color::Red,
            Notice::Success(_) => Color::Green,
            Notice::ComingSoon => Color::Cyan,
        };
        let area = centered_rect(50, 25, frame.area());
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(format!("{message}\n\nenter/esc to close"))
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .style(Style::default().fg(color)),
                ),
            area,
        );
    }

    if view_data.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(help_overlay_text())
                .block(Block::default().title("help").borders(Borders::ALL)),
            area,
        );
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
