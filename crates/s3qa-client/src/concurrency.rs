// Copyright 2024 The s3qa Authors
// SPDX-License-Identifier: Apache-2.0

//! Concurrent storage clients.
//!
//! SDK clients run as tasks on the runtime and CLI clients as OS processes.
//! All clients start together, every one is joined, and outcomes are pushed
//! into a shared list as each finishes. The aggregate expectation is checked
//! afterwards; nothing is retried or cancelled.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use s3qa_core::{Error, Result};
use tracing::{error, info};

use crate::command::run_local_cmd;

/// How a client talks to the storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// The native SDK client.
    Sdk,
    /// A command line tool run as a process.
    Cli,
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sdk => f.write_str("sdk"),
            Self::Cli => f.write_str("cli"),
        }
    }
}

/// Result of one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOutcome {
    /// Label given when the client was added.
    pub client: String,
    /// Client type.
    pub kind: ClientKind,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Response summary or error message.
    pub detail: String,
}

impl fmt::Display for ClientOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "ok" } else { "failed" };
        write!(f, "{} ({}): {status}: {}", self.client, self.kind, self.detail)
    }
}

/// Aggregate predicate over all outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Every client must succeed.
    AllSucceed,
    /// At least one client must succeed.
    AnySucceed,
}

enum Job {
    Sdk(BoxFuture<'static, Result<String>>),
    Command(String),
}

/// A set of clients to launch together.
#[derive(Default)]
pub struct ConcurrentClients {
    jobs: Vec<(String, Job)>,
}

impl fmt::Debug for ConcurrentClients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.jobs.iter().map(|(label, _)| label.as_str()).collect();
        f.debug_struct("ConcurrentClients").field("clients", &labels).finish()
    }
}

impl ConcurrentClients {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an SDK client. The response is summarised with its `Debug` form.
    #[must_use]
    pub fn sdk<F, T>(mut self, label: impl Into<String>, operation: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: fmt::Debug,
    {
        let job = operation.map(|result| result.map(|response| format!("{response:?}"))).boxed();
        self.jobs.push((label.into(), Job::Sdk(job)));
        self
    }

    /// Add a CLI client running `command` through the shell.
    #[must_use]
    pub fn command(mut self, label: impl Into<String>, command: impl Into<String>) -> Self {
        self.jobs.push((label.into(), Job::Command(command.into())));
        self
    }

    /// Number of clients added.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns true if no client was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Start every client, wait for all of them and return outcomes in
    /// completion order.
    pub async fn run(self) -> Vec<ClientOutcome> {
        let outcomes = Arc::new(Mutex::new(Vec::with_capacity(self.jobs.len())));
        let mut handles = Vec::with_capacity(self.jobs.len());

        info!(clients = self.jobs.len(), "Starting concurrent clients");
        for (label, job) in self.jobs {
            let kind = match job {
                Job::Sdk(_) => ClientKind::Sdk,
                Job::Command(_) => ClientKind::Cli,
            };
            let shared = Arc::clone(&outcomes);
            let task_label = label.clone();
            let handle = tokio::spawn(async move {
                let outcome = run_job(task_label, job).await;
                info!(outcome = %outcome, "Client finished");
                shared.lock().push(outcome);
            });
            handles.push((label, kind, handle));
        }

        for (label, kind, handle) in handles {
            if let Err(e) = handle.await {
                error!(client = %label, error = %e, "Client task aborted");
                outcomes.lock().push(ClientOutcome {
                    client: label,
                    kind,
                    success: false,
                    detail: format!("task aborted: {e}"),
                });
            }
        }

        let collected = outcomes.lock().clone();
        collected
    }
}

async fn run_job(client: String, job: Job) -> ClientOutcome {
    match job {
        Job::Sdk(operation) => {
            let (success, detail) = match operation.await {
                Ok(summary) => (true, summary),
                Err(e) => (false, e.message()),
            };
            ClientOutcome { client, kind: ClientKind::Sdk, success, detail }
        }
        Job::Command(command) => {
            let (success, detail) = match run_local_cmd(&command).await {
                Ok(output) => (output.success, output.text().trim().to_string()),
                Err(e) => (false, e.to_string()),
            };
            ClientOutcome { client, kind: ClientKind::Cli, success, detail }
        }
    }
}

/// Evaluate `expectation` over `outcomes`. An empty list never satisfies it.
#[must_use]
pub fn evaluate(outcomes: &[ClientOutcome], expectation: Expectation) -> bool {
    if outcomes.is_empty() {
        return false;
    }
    match expectation {
        Expectation::AllSucceed => outcomes.iter().all(|o| o.success),
        Expectation::AnySucceed => outcomes.iter().any(|o| o.success),
    }
}

/// Check `expectation` and fail with every outcome listed when it does not
/// hold.
///
/// # Errors
///
/// Returns [`Error::Assertion`] if the expectation is not met.
pub fn assert_outcomes(outcomes: &[ClientOutcome], expectation: Expectation) -> Result<()> {
    let holds = evaluate(outcomes, expectation);
    info!(?expectation, holds, "Evaluated concurrent client outcomes");
    if holds {
        return Ok(());
    }
    let listed: Vec<String> = outcomes.iter().map(ToString::to_string).collect();
    Err(Error::Assertion(format!("{expectation:?} not met: [{}]", listed.join("; "))))
}
