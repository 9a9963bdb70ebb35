// ABOUTME: Shared fixtures for lifecycle tests: an in-memory recording engine and a log capture sink

use async_trait::async_trait;
use berth::config::{validate, ENGINE_CERT_PATH, ENGINE_SERVER_ADDRESS, ENGINE_URI, ENGINE_VERSION};
use berth::docker::{ContainerInspection, CreateRequest, DockerError, Engine, Feed, PullRequest};
use berth::ValidatedConfig;
use bollard::models::{ContainerState, ContainerStateStatusEnum};
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Settings from the end-to-end scenario
pub fn scenario_config() -> ValidatedConfig {
    validate(&HashMap::from([
        (ENGINE_VERSION.to_string(), "1.22".to_string()),
        (ENGINE_URI.to_string(), "tcp://localhost:2375".to_string()),
        (ENGINE_SERVER_ADDRESS.to_string(), "localhost".to_string()),
        (ENGINE_CERT_PATH.to_string(), "/certs".to_string()),
    ]))
    .expect("scenario settings are complete")
}

pub fn env(entries: &[(&str, &str)]) -> Vec<(String, String)> {
    entries.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeState {
    Created,
    Running,
    Exited,
}

#[derive(Debug, Default)]
pub struct EngineLog {
    /// Every engine call in order, e.g. "pull mysql:5.7", "start container-1"
    pub calls: Vec<String>,
    pub pulls: Vec<PullRequest>,
    pub creates: Vec<CreateRequest>,
    pub containers: HashMap<String, FakeState>,
    next_id: usize,
}

/// Engine double that keeps container state in memory and records every request.
///
/// Transitions follow Docker's answers: starting an unknown container is a 404,
/// stopping a stopped one a 304, removing a running one a 409.
#[derive(Clone, Default)]
pub struct RecordingEngine {
    pub log: Arc<Mutex<EngineLog>>,
    /// Lines the pull feed emits before closing
    pub pull_lines: Vec<String>,
    /// When set, the pull feed fails after its lines
    pub pull_error: Option<String>,
    /// Number of pull lines handed to the consumer
    pub pull_lines_read: Arc<AtomicUsize>,
    /// Lines the log feed emits; it then stays open
    pub log_lines: Vec<String>,
}

impl RecordingEngine {
    pub fn with_pull_lines(lines: &[&str]) -> Self {
        Self {
            pull_lines: lines.iter().map(|l| (*l).to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn state_of(&self, id: &str) -> Option<FakeState> {
        self.log.lock().unwrap().containers.get(id).copied()
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().calls.push(call);
    }
}

fn server_error(status_code: u16, message: String) -> DockerError {
    DockerError::DockerResponseServerError {
        status_code,
        message,
    }
}

#[async_trait]
impl Engine for RecordingEngine {
    fn pull_image(&self, request: &PullRequest) -> Feed {
        {
            let mut log = self.log.lock().unwrap();
            log.calls.push(format!("pull {}:{}", request.image, request.tag));
            log.pulls.push(request.clone());
        }

        let counter = self.pull_lines_read.clone();
        let lines = stream::iter(self.pull_lines.clone()).map(move |line| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{}\n", line).into_bytes())
        });
        let failure = stream::iter(
            self.pull_error
                .clone()
                .map(|message| Err(server_error(500, message))),
        );
        lines.chain(failure).boxed()
    }

    async fn create_container(&self, request: &CreateRequest) -> Result<String, DockerError> {
        let mut log = self.log.lock().unwrap();
        log.next_id += 1;
        let id = format!("container-{}", log.next_id);
        log.calls.push(format!("create {}", request.image));
        log.creates.push(request.clone());
        log.containers.insert(id.clone(), FakeState::Created);
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), DockerError> {
        self.record(format!("start {}", id));
        let mut log = self.log.lock().unwrap();
        match log.containers.get_mut(id) {
            None => Err(server_error(404, format!("No such container: {}", id))),
            Some(FakeState::Running) => Err(server_error(304, String::new())),
            Some(state) => {
                *state = FakeState::Running;
                Ok(())
            }
        }
    }

    async fn stop_container(&self, id: &str) -> Result<(), DockerError> {
        self.record(format!("stop {}", id));
        let mut log = self.log.lock().unwrap();
        match log.containers.get_mut(id) {
            None => Err(server_error(404, format!("No such container: {}", id))),
            Some(state) if *state != FakeState::Running => Err(server_error(304, String::new())),
            Some(state) => {
                *state = FakeState::Exited;
                Ok(())
            }
        }
    }

    async fn remove_container(&self, id: &str) -> Result<(), DockerError> {
        self.record(format!("remove {}", id));
        let mut log = self.log.lock().unwrap();
        match log.containers.get(id).copied() {
            None => Err(server_error(404, format!("No such container: {}", id))),
            Some(FakeState::Running) => Err(server_error(
                409,
                "You cannot remove a running container".to_string(),
            )),
            Some(_) => {
                log.containers.remove(id);
                Ok(())
            }
        }
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspection, DockerError> {
        self.record(format!("inspect {}", id));
        let state = self
            .state_of(id)
            .ok_or_else(|| server_error(404, format!("No such container: {}", id)))?;
        let status = match state {
            FakeState::Created => ContainerStateStatusEnum::CREATED,
            FakeState::Running => ContainerStateStatusEnum::RUNNING,
            FakeState::Exited => ContainerStateStatusEnum::EXITED,
        };

        Ok(ContainerInspection {
            id: Some(id.to_string()),
            state: Some(ContainerState {
                status: Some(status),
                running: Some(state == FakeState::Running),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn logs(&self, id: &str) -> Feed {
        self.record(format!("logs {}", id));
        let chunks: Vec<Result<Vec<u8>, DockerError>> = self
            .log_lines
            .iter()
            .map(|line| Ok(format!("{}\n", line).into_bytes()))
            .collect();
        stream::iter(chunks).chain(stream::pending()).boxed()
    }
}

/// In-memory sink for formatted tracing output
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
    }

    /// Install a plain-message subscriber for the current thread
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .without_time()
            .with_level(false)
            .with_target(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
