// ABOUTME: OS-entity enumeration: processes, systemd services, containers, login sessions
// ABOUTME: Child-process queries run with hard timeouts and degrade to empty results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sysinfo::{ProcessesToUpdate, System, Users, MINIMUM_CPU_UPDATE_INTERVAL};
use tokio::process::Command;
use tokio::task;
use tracing::debug;

const SERVICE_TIMEOUT: Duration = Duration::from_secs(3);
const CONTAINER_TIMEOUT: Duration = Duration::from_secs(2);
const LOGIN_TIMEOUT: Duration = Duration::from_secs(2);

/// One process, as served by `GET /api/processes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Process ID.
    pub pid: u32,
    /// Executable name.
    pub name: String,
    /// CPU utilization percentage over the sample window.
    pub cpu: f64,
    /// Resident memory in bytes.
    pub memory: u64,
    /// Owning user, empty when unresolvable.
    pub username: String,
}

/// One systemd service unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Unit name including the `.service` suffix.
    pub name: String,
    /// Active state (active, inactive, failed).
    pub active: String,
    /// Sub state (running, dead, exited).
    pub sub: String,
}

/// One container from whichever runtime answered first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Short container ID.
    pub id: String,
    /// Image reference.
    pub image: String,
    /// Container name.
    pub name: String,
    /// Human-readable status line.
    pub state: String,
}

/// One interactive login session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSession {
    /// Logged-in user.
    pub user: String,
    /// Terminal.
    pub tty: String,
    /// Originating host; `who` output does not carry it reliably.
    pub host: String,
    /// Login time as the tool printed it.
    pub since: String,
}

/// Why a systemd query produced no answer. The handler maps
/// `Unavailable` to 503 and `Failed` to 500.
#[derive(Debug, thiserror::Error)]
pub enum ServiceQueryError {
    /// systemd (or systemctl) is not reachable on this host.
    #[error("systemd unavailable")]
    Unavailable,
    /// systemd answered with an error.
    #[error("service query failed: {0}")]
    Failed(String),
}

/// Enumerate processes with CPU sampled over the minimum interval.
pub async fn processes() -> Vec<ProcessInfo> {
    task::spawn_blocking(|| {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_processes(ProcessesToUpdate::All, true);

        let users = Users::new_with_refreshed_list();
        system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                cpu: f64::from(process.cpu_usage()),
                memory: process.memory(),
                username: process
                    .user_id()
                    .and_then(|uid| users.get_user_by_id(uid))
                    .map(|user| user.name().to_owned())
                    .unwrap_or_default(),
            })
            .collect()
    })
    .await
    .unwrap_or_default()
}

/// List systemd service units via `systemctl`.
///
/// # Errors
///
/// `Unavailable` when systemctl cannot be spawned or times out, `Failed`
/// when it runs but answers with an error status.
pub async fn services() -> Result<Vec<ServiceInfo>, ServiceQueryError> {
    let stdout = run_command(
        "systemctl",
        &[
            "list-units",
            "--type=service",
            "--all",
            "--plain",
            "--no-legend",
            "--no-pager",
        ],
        SERVICE_TIMEOUT,
    )
    .await
    .map_err(|e| match e {
        CommandError::Spawn(_) | CommandError::TimedOut => ServiceQueryError::Unavailable,
        CommandError::Failed(status) => ServiceQueryError::Failed(status),
    })?;
    Ok(parse_service_lines(&stdout))
}

/// List containers, trying docker first and podman second. Neither runtime
/// answering is an empty list, not an error.
pub async fn containers() -> Vec<ContainerInfo> {
    for runtime in ["docker", "podman"] {
        match run_command(
            runtime,
            &["ps", "--format", "{{.ID}}\t{{.Image}}\t{{.Names}}\t{{.Status}}"],
            CONTAINER_TIMEOUT,
        )
        .await
        {
            Ok(stdout) => return parse_container_lines(&stdout),
            Err(e) => debug!("{runtime} unavailable: {e}"),
        }
    }
    Vec::new()
}

/// List interactive sessions via `who`. Failure is an empty list.
pub async fn logins() -> Vec<LoginSession> {
    match run_command("who", &[], LOGIN_TIMEOUT).await {
        Ok(stdout) => parse_login_lines(&stdout),
        Err(e) => {
            debug!("who unavailable: {e}");
            Vec::new()
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("timed out")]
    TimedOut,
    #[error("exited with {0}")]
    Failed(String),
}

async fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, CommandError> {
    let output = tokio::time::timeout(
        timeout,
        Command::new(program).args(args).kill_on_drop(true).output(),
    )
    .await
    .map_err(|_| CommandError::TimedOut)?
    .map_err(|e| CommandError::Spawn(e.to_string()))?;

    if !output.status.success() {
        return Err(CommandError::Failed(output.status.to_string()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_service_lines(stdout: &str) -> Vec<ServiceInfo> {
    stdout
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 || !fields[0].ends_with(".service") {
                return None;
            }
            Some(ServiceInfo {
                name: fields[0].to_owned(),
                active: fields[2].to_owned(),
                sub: fields[3].to_owned(),
            })
        })
        .collect()
}

fn parse_container_lines(stdout: &str) -> Vec<ContainerInfo> {
    stdout
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 4 {
                return None;
            }
            Some(ContainerInfo {
                id: fields[0].trim().to_owned(),
                image: fields[1].trim().to_owned(),
                name: fields[2].trim().to_owned(),
                state: fields[3].trim().to_owned(),
            })
        })
        .collect()
}

fn parse_login_lines(stdout: &str) -> Vec<LoginSession> {
    stdout
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 2 {
                return None;
            }
            Some(LoginSession {
                user: fields[0].to_owned(),
                tty: fields[1].to_owned(),
                host: String::new(),
                since: fields[2..].join(" "),
            })
        })
        .collect()
}
