use std::collections::HashMap;
use std::io::Write as _;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::process::Command;

use probe_core::{Secret, SecretKind, SecretRef};

use crate::command::{Response, ShellCommand, TransportStatus};

/// Fallback when neither the command nor the dispatcher set a timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// `${name.key}`: name must be a declared secret, key is free-form.
static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z0-9_.\-]+)\}")
        .expect("placeholder regex is valid")
});

/// Execution backend behind the dispatcher. Local and remote
/// implementations share one `Response` contract; callers never branch
/// on which path ran.
pub trait Executor: Send + Sync {
    fn run(&self, cmd: &ShellCommand) -> impl Future<Output = Response> + Send;
}

/// Runs commands as `bash -c` subprocesses in their own process group.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExecutor;

impl Executor for LocalExecutor {
    async fn run(&self, cmd: &ShellCommand) -> Response {
        let echo = cmd.redacted_cmdline();
        let timeout = cmd.timeout().unwrap_or(DEFAULT_TIMEOUT);

        // File-kind secrets land in 0600 temp files that live until the
        // subprocess finishes; inline kinds are exported as env vars.
        let mut guards = Vec::new();
        let mut replacements: HashMap<String, String> = HashMap::new();
        let mut secret_env: Vec<(String, String)> = Vec::new();
        for secret in cmd.secrets() {
            match secret.kind() {
                SecretKind::Inline => {
                    replacements
                        .insert(secret.name().to_owned(), secret.value().expose().to_owned());
                    secret_env.push((
                        secret.name().to_owned(),
                        secret.value().expose().to_owned(),
                    ));
                }
                SecretKind::File => match materialize(secret) {
                    Ok(file) => {
                        replacements.insert(
                            secret.name().to_owned(),
                            file.path().display().to_string(),
                        );
                        guards.push(file);
                    }
                    Err(e) => {
                        return failure(
                            &echo,
                            TransportStatus::ConnectionError,
                            format!("failed to materialize secret {}: {e}", secret.name()),
                            cmd.secret_values(),
                        );
                    }
                },
            }
        }

        let resolved = resolve_placeholders(cmd.cmdline(), &replacements);

        let mut command = Command::new("bash");
        command
            .arg("-c")
            .arg(&*resolved)
            .envs(cmd.env())
            .envs(secret_env)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let start = Instant::now();
        let child = match command.spawn() {
            Ok(c) => c,
            Err(e) => {
                return failure(
                    &echo,
                    TransportStatus::ConnectionError,
                    e.to_string(),
                    cmd.secret_values(),
                );
            }
        };
        let pid = child.id();

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                drop(guards);
                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = start.elapsed().as_millis() as u64;
                Response {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code: output.status.code().unwrap_or(-1),
                    transport: TransportStatus::Ok,
                    cmd_echo: echo,
                    secret_values: cmd.secret_values(),
                    duration_ms,
                }
            }
            Ok(Err(e)) => failure(
                &echo,
                TransportStatus::ConnectionError,
                e.to_string(),
                cmd.secret_values(),
            ),
            Err(_) => {
                kill_process_group(pid);
                tracing::warn!(cmd = %echo, timeout_secs = timeout.as_secs(), "command timed out");
                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = start.elapsed().as_millis() as u64;
                Response {
                    stdout: String::new(),
                    stderr: "timeout".to_owned(),
                    exit_code: -1,
                    transport: TransportStatus::Timeout,
                    cmd_echo: echo,
                    secret_values: cmd.secret_values(),
                    duration_ms,
                }
            }
        }
    }
}

/// Resolve `${name.key}` against declared secrets; unknown names stay
/// verbatim so literal `${...}`-shaped text survives.
fn resolve_placeholders<'a>(
    cmdline: &'a str,
    replacements: &HashMap<String, String>,
) -> std::borrow::Cow<'a, str> {
    PLACEHOLDER_REGEX.replace_all(cmdline, |caps: &regex::Captures<'_>| {
        replacements
            .get(&caps[1])
            .cloned()
            .unwrap_or_else(|| caps[0].to_owned())
    })
}

fn materialize(secret: &SecretRef) -> std::io::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(secret.value().expose().as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn failure(
    echo: &str,
    transport: TransportStatus,
    stderr: String,
    secret_values: Vec<Secret>,
) -> Response {
    Response {
        stdout: String::new(),
        stderr,
        exit_code: -1,
        transport,
        cmd_echo: echo.to_owned(),
        secret_values,
        duration_ms: 0,
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // The subprocess runs in its own group; kill the whole tree so
        // pipelines and backgrounded children go with it.
        #[allow(clippy::cast_possible_wrap)]
        unsafe {
            libc::killpg(pid as i32, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
