use std::time::Duration;

use chrono::Utc;

use probe_core::CoreConfig;

use crate::command::{Response, ShellCommand, Target};
use crate::history::{HistoryEntry, ShellHistory};
use crate::local::{Executor, LocalExecutor};
use crate::remote::RemoteExecutor;

/// Routes commands to the right executor, applies configured defaults,
/// and owns the shell history.
///
/// One dispatcher per suite; the caller drains history once per task.
#[derive(Debug)]
pub struct Dispatcher {
    config: CoreConfig,
    history: ShellHistory,
    local: LocalExecutor,
    client: reqwest::Client,
}

impl Dispatcher {
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized (should never
    /// happen with rustls).
    #[must_use]
    pub fn new(config: CoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("probe/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("default HTTP client construction must not fail");
        Self {
            config,
            history: ShellHistory::new(),
            local: LocalExecutor,
            client,
        }
    }

    #[must_use]
    pub fn history(&self) -> &ShellHistory {
        &self.history
    }

    /// The defaults this dispatcher applies; callers seed per-query
    /// expectations from here.
    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The configured remote target, when a shell service is set up.
    #[must_use]
    pub fn remote_target(&self) -> Option<Target> {
        self.config
            .remote
            .as_ref()
            .map(|r| Target::Remote(r.endpoint.clone()))
    }

    /// Execute one command and record it in history.
    ///
    /// Transport failures come back inside the `Response`, never as an
    /// error; callers branch on `transport` / `exit_code`.
    pub async fn execute(&self, cmd: &ShellCommand) -> Response {
        let effective = if cmd.timeout().is_some() {
            cmd.clone()
        } else {
            cmd.clone()
                .with_timeout(Duration::from_secs(self.config.timeout_secs))
        };

        tracing::debug!(cmd = %effective.redacted_cmdline(), target = ?effective.target(), "dispatching command");

        let response = match effective.target() {
            Target::Local => self.local.run(&effective).await,
            Target::Remote(endpoint) => {
                RemoteExecutor::with_client(self.client.clone(), endpoint.clone())
                    .run(&effective)
                    .await
            }
        };

        if effective.include_in_history() {
            self.history.push(HistoryEntry {
                cmd: effective.redacted_cmdline(),
                label: effective.label().map(str::to_owned),
                exit_code: response.exit_code,
                transport: response.transport,
                duration_ms: response.duration_ms,
                timestamp: Utc::now(),
            });
        }

        response
    }

    /// Loop mode: run each command sequentially, collecting ordered
    /// results. One failure does not abort later items.
    pub async fn execute_all<'a, I>(&self, cmds: I) -> Vec<Response>
    where
        I: IntoIterator<Item = &'a ShellCommand>,
    {
        let mut responses = Vec::new();
        for cmd in cmds {
            responses.push(self.execute(cmd).await);
        }
        responses
    }
}
