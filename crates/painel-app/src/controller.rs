// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::VecDeque;

use crate::state::{DashboardState, IssuedRequest, Message, Reply, Request, Transition};
use crate::tokens::RequestToken;
use crate::view::{Page, render_page};

/// Executes one request against the dashboard server.
pub trait Runtime {
    fn execute(&mut self, request: &Request) -> Reply;
}

/// Drives a [`DashboardState`] synchronously: every request a message issues
/// is executed in issue order and its reply fed back before `handle`
/// returns.
pub struct Controller<R> {
    state: DashboardState,
    runtime: R,
    queue: VecDeque<IssuedRequest>,
}

impl<R: Runtime> Controller<R> {
    pub fn new(state: DashboardState, runtime: R) -> Self {
        Self {
            state,
            runtime,
            queue: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn page(&self) -> Page {
        render_page(&self.state)
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    pub fn into_runtime(self) -> R {
        self.runtime
    }

    /// Loads the indicator list for the initial sector.
    pub fn start(&mut self) {
        self.handle(Message::Start);
    }

    pub fn handle(&mut self, message: Message) {
        self.apply(message);
        while let Some(issued) = self.queue.pop_front() {
            tracing::debug!(
                kind = issued.token.kind().as_str(),
                seq = issued.token.seq(),
                "executing request"
            );
            let reply = self.runtime.execute(&issued.request);
            self.apply(Message::Completed {
                token: issued.token,
                reply,
            });
        }
    }

    fn apply(&mut self, message: Message) {
        log_message(&self.state, &message);
        let Transition { state, requests } = self.state.dispatch(message);
        self.state = state;
        self.queue.extend(requests);
    }
}

/// Logs failed and discarded completions before they reach `dispatch`.
pub fn log_message(state: &DashboardState, message: &Message) {
    let Message::Completed { token, reply } = message else {
        return;
    };
    if !state.is_current(*token) {
        tracing::debug!(
            kind = token.kind().as_str(),
            seq = token.seq(),
            latest = ?state.tokens().latest(token.kind()).map(RequestToken::seq),
            "discarding stale reply"
        );
        return;
    }
    if let Some(failure) = reply.failure() {
        tracing::warn!(kind = token.kind().as_str(), %failure, "request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::{Controller, Runtime};
    use crate::state::{Notice, Reply, Request};
    use crate::{
        Capabilities, DashboardData, DashboardState, FieldDescriptor, FieldKind, Failure,
        IndicatorStructure, Message, UploadReceipt, ViewKind,
    };
    use std::path::PathBuf;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<Request>,
        indicators: Vec<String>,
        fail_dashboard: bool,
    }

    impl Runtime for Recorder {
        fn execute(&mut self, request: &Request) -> Reply {
            self.seen.push(request.clone());
            match request {
                Request::Indicators { .. } => Reply::Indicators(Ok(self.indicators.clone())),
                Request::Dashboard(query) => {
                    if self.fail_dashboard {
                        Reply::Dashboard(Err(Failure::application("sem dados")))
                    } else {
                        Reply::Dashboard(Ok(DashboardData {
                            table_html: format!("<table><tr><td>{}</td></tr></table>", query.indicator),
                            chart_src: "data:image/png;base64,AAA".to_owned(),
                        }))
                    }
                }
                Request::Structure { .. } => Reply::Structure(Ok(IndicatorStructure {
                    spreadsheet_name: "financeiro".to_owned(),
                    sheet_name: "Revenue".to_owned(),
                    fields: vec![FieldDescriptor::new("Valor", FieldKind::Number)],
                })),
                Request::Upload { .. } => Reply::Upload(Ok(UploadReceipt {
                    loaded: vec!["finance".to_owned()],
                    message: "ok".to_owned(),
                })),
                Request::Save(_) => Reply::Saved(Ok(())),
            }
        }
    }

    fn controller(indicators: &[&str]) -> Controller<Recorder> {
        let runtime = Recorder {
            indicators: indicators.iter().map(|name| (*name).to_owned()).collect(),
            ..Recorder::default()
        };
        let mut controller = Controller::new(
            DashboardState::new(vec!["Finance".to_owned()], Capabilities::default()),
            runtime,
        );
        controller.start();
        controller
    }

    #[test]
    fn start_then_refresh_renders_the_table() {
        let mut controller = controller(&["Revenue"]);
        controller.handle(Message::Refresh);
        let page = controller.page();
        assert_eq!(
            page.visualize.table.to_html(),
            "<table><tr><td>Revenue</td></tr></table>"
        );
        assert_eq!(page.loading, None);
        assert_eq!(controller.runtime().seen.len(), 2);
    }

    #[test]
    fn failed_refresh_logs_and_shows_error() {
        let mut controller = controller(&["Revenue"]);
        controller.runtime_mut().fail_dashboard = true;
        controller.handle(Message::Refresh);
        assert_eq!(
            controller.page().visualize.table.to_html(),
            r#"<div class="alert alert-danger">sem dados</div>"#
        );
    }

    #[test]
    fn upload_runs_follow_up_reload_in_the_same_call() {
        let mut controller = controller(&["Revenue"]);
        controller.handle(Message::ChooseFile(Some(PathBuf::from("/tmp/finance.xlsx"))));
        controller.handle(Message::Upload);

        let seen = controller.into_runtime().seen;
        let kinds = seen.iter().map(Request::kind).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                crate::RequestKind::Indicators,
                crate::RequestKind::Upload,
                crate::RequestKind::Indicators,
            ]
        );
    }

    #[test]
    fn fill_in_round_trip_saves_and_notifies() {
        let mut controller = controller(&["Revenue"]);
        controller.handle(Message::Navigate(ViewKind::FillIn));
        assert!(controller.page().fill_in.form.is_some());

        controller.handle(Message::EditField {
            name: "Valor".to_owned(),
            value: "10".to_owned(),
        });
        controller.handle(Message::SubmitFillIn);

        assert_eq!(
            controller.state().notice,
            Some(Notice::Success("Data saved successfully!".to_owned()))
        );
        // The indicator reload re-enters the fill-in flow.
        assert!(controller.page().fill_in.form.is_some());
    }
}
