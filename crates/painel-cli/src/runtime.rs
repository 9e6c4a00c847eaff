// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use painel_api::Client;
use painel_app::{Failure, Reply, Request, Runtime};

/// Executes dashboard requests against the HTTP server. Clones share the
/// client's connection pool and session cookie.
#[derive(Debug, Clone)]
pub struct HttpRuntime {
    client: Client,
}

impl HttpRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Runtime for HttpRuntime {
    fn execute(&mut self, request: &Request) -> Reply {
        let client = &self.client;
        match request {
            Request::Indicators { sector } => {
                Reply::Indicators(client.list_indicators(sector).map_err(Failure::from))
            }
            Request::Dashboard(query) => {
                Reply::Dashboard(client.dashboard_data(query).map_err(Failure::from))
            }
            Request::Structure { sector, indicator } => Reply::Structure(
                client
                    .indicator_structure(sector, indicator)
                    .map_err(Failure::from),
            ),
            Request::Upload { path } => Reply::Upload(client.upload(path).map_err(Failure::from)),
            Request::Save(payload) => {
                Reply::Saved(client.save_values(payload).map_err(Failure::from))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HttpRuntime;
    use anyhow::Result;
    use painel_api::Client;
    use painel_app::{FailureKind, Reply, Request, Runtime};
    use painel_testkit::{MockServer, failure_response};
    use std::time::Duration;

    #[test]
    fn application_failures_keep_their_kind() -> Result<()> {
        let server = MockServer::start(|_| failure_response("Setor não encontrado"))?;
        let mut runtime = HttpRuntime::new(Client::new(
            server.base_url(),
            Some(Duration::from_secs(5)),
        )?);
        let reply = runtime.execute(&Request::Indicators {
            sector: "Finance".to_owned(),
        });
        let Reply::Indicators(Err(failure)) = &reply else {
            panic!("expected a failed indicator reply, got {reply:?}");
        };
        assert_eq!(failure.kind, FailureKind::Application);
        assert_eq!(failure.message, "Setor não encontrado");
        Ok(())
    }

    #[test]
    fn unreachable_server_is_a_transport_failure() -> Result<()> {
        let mut runtime = HttpRuntime::new(Client::new(
            "http://127.0.0.1:1",
            Some(Duration::from_millis(200)),
        )?);
        let reply = runtime.execute(&Request::Structure {
            sector: "Finance".to_owned(),
            indicator: "Revenue".to_owned(),
        });
        assert_eq!(
            reply.failure().map(|failure| failure.kind),
            Some(FailureKind::Transport)
        );
        Ok(())
    }
}
