use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use probe_core::{Secret, SecretKind};

use crate::command::{Response, ShellCommand, TransportStatus};
use crate::local::{DEFAULT_TIMEOUT, Executor};

/// Slack on top of the command timeout so the service can report its own
/// timeout before the HTTP call gives up.
const RPC_GRACE: Duration = Duration::from_secs(5);

/// Shell-service request. The cmdline ships with `${name.key}`
/// placeholders intact; secrets travel out-of-band for server-side
/// resolution.
#[derive(Debug, Serialize)]
struct RemoteRequest<'a> {
    cmd: &'a str,
    env: &'a HashMap<String, String>,
    secrets: Vec<RemoteSecret<'a>>,
    timeout_seconds: u64,
}

#[derive(Debug, Serialize)]
struct RemoteSecret<'a> {
    name: &'a str,
    kind: SecretKind,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct RemoteReply {
    stdout: String,
    stderr: String,
    exit_code: i32,
    transport_status: TransportStatus,
}

/// Client for a shell-service endpoint implementing the remote contract.
#[derive(Debug, Clone)]
pub struct RemoteExecutor {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteExecutor {
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized (should never
    /// happen with rustls).
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("probe/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("default HTTP client construction must not fail");
        Self::with_client(client, endpoint)
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn dispatch(&self, cmd: &ShellCommand) -> Response {
        let echo = cmd.redacted_cmdline();
        let timeout = cmd.timeout().unwrap_or(DEFAULT_TIMEOUT);
        let request = RemoteRequest {
            cmd: cmd.cmdline(),
            env: cmd.env(),
            secrets: cmd
                .secrets()
                .iter()
                .map(|s| RemoteSecret {
                    name: s.name(),
                    kind: s.kind(),
                    value: s.value().expose(),
                })
                .collect(),
            timeout_seconds: timeout.as_secs(),
        };

        let start = Instant::now();
        let result = self
            .client
            .post(&self.endpoint)
            .timeout(timeout + RPC_GRACE)
            .json(&request)
            .send()
            .await;

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;

        let reply = match result {
            Ok(rsp) if rsp.status().is_success() => rsp.json::<RemoteReply>().await,
            Ok(rsp) => {
                tracing::warn!(endpoint = %self.endpoint, status = %rsp.status(), "shell service rejected request");
                return failure(
                    &echo,
                    TransportStatus::ServiceError,
                    format!("shell service returned {}", rsp.status()),
                    duration_ms,
                    cmd.secret_values(),
                );
            }
            Err(e) if e.is_timeout() => {
                tracing::warn!(endpoint = %self.endpoint, "shell service call timed out");
                return failure(
                    &echo,
                    TransportStatus::Timeout,
                    "timeout".to_owned(),
                    duration_ms,
                    cmd.secret_values(),
                );
            }
            Err(e) => {
                return failure(
                    &echo,
                    TransportStatus::ConnectionError,
                    e.to_string(),
                    duration_ms,
                    cmd.secret_values(),
                );
            }
        };

        match reply {
            Ok(reply) => Response {
                stdout: reply.stdout,
                stderr: reply.stderr,
                exit_code: reply.exit_code,
                transport: reply.transport_status,
                cmd_echo: echo,
                secret_values: cmd.secret_values(),
                duration_ms,
            },
            Err(e) => failure(
                &echo,
                TransportStatus::ServiceError,
                format!("invalid shell service reply: {e}"),
                duration_ms,
                cmd.secret_values(),
            ),
        }
    }
}

impl Executor for RemoteExecutor {
    async fn run(&self, cmd: &ShellCommand) -> Response {
        self.dispatch(cmd).await
    }
}

fn failure(
    echo: &str,
    transport: TransportStatus,
    stderr: String,
    duration_ms: u64,
    secret_values: Vec<Secret>,
) -> Response {
    Response {
        stdout: String::new(),
        stderr,
        exit_code: -1,
        transport,
        cmd_echo: echo.to_owned(),
        secret_values,
        duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_core::SecretRef;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply_body(stdout: &str, exit_code: i32) -> serde_json::Value {
        serde_json::json!({
            "stdout": stdout,
            "stderr": "",
            "exit_code": exit_code,
            "transport_status": "ok",
        })
    }

    #[tokio::test]
    async fn round_trips_reply_into_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("pods: 3\n", 0)))
            .expect(1)
            .mount(&server)
            .await;

        let cmd = ShellCommand::builder("kubectl get pods").build().unwrap();
        let executor = RemoteExecutor::new(format!("{}/run", server.uri()));
        let rsp = executor.run(&cmd).await;
        assert_eq!(rsp.stdout, "pods: 3\n");
        assert_eq!(rsp.exit_code, 0);
        assert_eq!(rsp.transport, TransportStatus::Ok);
    }

    #[tokio::test]
    async fn placeholders_ship_unresolved_with_secrets_out_of_band() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "cmd": "curl -H \"Auth: ${auth.token}\"",
                "secrets": [{ "name": "auth", "kind": "inline", "value": "tok-9" }],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("", 0)))
            .expect(1)
            .mount(&server)
            .await;

        let cmd = ShellCommand::builder("curl -H \"Auth: ${auth.token}\"")
            .secret(SecretRef::inline("auth", "tok-9"))
            .build()
            .unwrap();
        let rsp = RemoteExecutor::new(server.uri()).run(&cmd).await;
        assert_eq!(rsp.transport, TransportStatus::Ok);
    }

    #[tokio::test]
    async fn timeout_seconds_forwarded() {
        let server = MockServer::start().await;
        Mock::given(body_partial_json(serde_json::json!({ "timeout_seconds": 7 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("", 0)))
            .expect(1)
            .mount(&server)
            .await;

        let cmd = ShellCommand::builder("true")
            .timeout(Duration::from_secs(7))
            .build()
            .unwrap();
        let rsp = RemoteExecutor::new(server.uri()).run(&cmd).await;
        assert_eq!(rsp.transport, TransportStatus::Ok);
    }

    #[tokio::test]
    async fn service_error_status_captured_not_thrown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let cmd = ShellCommand::builder("true").build().unwrap();
        let rsp = RemoteExecutor::new(server.uri()).run(&cmd).await;
        assert_eq!(rsp.transport, TransportStatus::ServiceError);
        assert_eq!(rsp.exit_code, -1);
        assert!(rsp.stderr.contains("503"));
    }

    #[tokio::test]
    async fn malformed_reply_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let cmd = ShellCommand::builder("true").build().unwrap();
        let rsp = RemoteExecutor::new(server.uri()).run(&cmd).await;
        assert_eq!(rsp.transport, TransportStatus::ServiceError);
    }

    #[tokio::test]
    async fn connection_refused_is_connection_error() {
        let cmd = ShellCommand::builder("true")
            .timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        let rsp = RemoteExecutor::new("http://127.0.0.1:9/run").run(&cmd).await;
        assert_eq!(rsp.transport, TransportStatus::ConnectionError);
    }

    #[tokio::test]
    async fn remote_echo_is_redacted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("", 0)))
            .mount(&server)
            .await;

        let cmd = ShellCommand::builder("login --password hunter2")
            .secret(SecretRef::inline("pw", "hunter2"))
            .build()
            .unwrap();
        let rsp = RemoteExecutor::new(server.uri()).run(&cmd).await;
        assert!(!rsp.cmd_echo.contains("hunter2"));
    }
}
