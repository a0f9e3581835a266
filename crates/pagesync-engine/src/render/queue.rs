use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::models::SourceMap;

/// Handle to a compiled artifact on the viewer side.
///
/// Transient and in-memory; nothing in the engine reads the artifact itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub path: String,
}

/// Successful compiler output: where the artifact lives plus the source map
/// linking text positions to rendered positions.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub artifact: ArtifactHandle,
    pub source_map: SourceMap,
}

/// Compiler failure, surfaced to the rendered-view error state.
///
/// `Clone` so one failure can fan out to every waiter sharing a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("compile failed: {message}")]
pub struct CompileError {
    pub message: String,
    pub details: Option<String>,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

/// The document compiler collaborator.
///
/// Treated as opaque, slow, and cancel-unaware; cancellation is cooperative
/// on the caller side only.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, content: &str) -> Result<CompileOutput, CompileError>;
}

/// A compile that actually ran, tagged with the queue generation that ran it.
///
/// Generations increase monotonically per started compile, so consumers can
/// drop results that a later compile has already superseded.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub generation: u64,
    pub output: Arc<CompileOutput>,
}

pub type CompileOutcome = Result<Compiled, CompileError>;

/// Awaitable handle to the outcome shared by every submission in one
/// in-flight period.
pub struct CompileTicket {
    rx: oneshot::Receiver<CompileOutcome>,
}

impl CompileTicket {
    pub async fn wait(self) -> CompileOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            // The queue never drops waiters while live; this arm only fires
            // when the whole queue was torn down mid-compile.
            Err(_) => Err(CompileError::new("render queue closed")),
        }
    }
}

struct QueueState {
    in_flight: bool,
    pending: Option<String>,
    waiters: Vec<oneshot::Sender<CompileOutcome>>,
    generation: u64,
}

/// Serializes compile requests and collapses bursts.
///
/// At most one compile is ever in flight. Submissions that arrive while one
/// is running overwrite a single pending slot (last write wins) and share the
/// outcome of the trailing compile, so every caller observes a result at
/// least as recent as its own submission.
#[derive(Clone)]
pub struct RenderQueue {
    compiler: Arc<dyn Compiler>,
    state: Arc<Mutex<QueueState>>,
}

impl RenderQueue {
    pub fn new(compiler: Arc<dyn Compiler>) -> Self {
        Self {
            compiler,
            state: Arc::new(Mutex::new(QueueState {
                in_flight: false,
                pending: None,
                waiters: Vec::new(),
                generation: 0,
            })),
        }
    }

    /// Submit content for compilation.
    ///
    /// Starts a compile immediately when idle; otherwise replaces the pending
    /// slot. The returned ticket resolves with the outcome of the trailing
    /// compile of the current in-flight period.
    pub fn submit(&self, content: String) -> CompileTicket {
        let (tx, rx) = oneshot::channel();
        let start = {
            let mut state = self.state.lock();
            state.waiters.push(tx);
            if state.in_flight {
                log::trace!("compile in flight, coalescing submission");
                state.pending = Some(content);
                None
            } else {
                state.in_flight = true;
                Some(content)
            }
        };

        if let Some(content) = start {
            let compiler = Arc::clone(&self.compiler);
            let state = Arc::clone(&self.state);
            tokio::spawn(drive(compiler, state, content));
        }

        CompileTicket { rx }
    }

    /// True when no compile is in flight and nothing is pending.
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        !state.in_flight && state.pending.is_none()
    }

    /// Generation of the most recently started compile.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }
}

/// Runs compiles until the pending slot drains, then settles every waiter
/// with the trailing outcome.
async fn drive(compiler: Arc<dyn Compiler>, state: Arc<Mutex<QueueState>>, mut content: String) {
    loop {
        let generation = {
            let mut st = state.lock();
            st.generation += 1;
            st.generation
        };
        log::debug!("starting compile generation {generation}");

        let result = compiler.compile(&content).await;

        let settled = {
            let mut st = state.lock();
            if let Some(next) = st.pending.take() {
                // A newer submission arrived mid-compile. Whatever happened
                // to this one, the trailing compile decides the outcome, and
                // a failure here is treated as transient.
                content = next;
                None
            } else {
                st.in_flight = false;
                Some(std::mem::take(&mut st.waiters))
            }
        };

        match settled {
            None => continue,
            Some(waiters) => {
                let outcome = match result {
                    Ok(output) => Ok(Compiled {
                        generation,
                        output: Arc::new(output),
                    }),
                    Err(err) => {
                        log::warn!("compile generation {generation} failed: {err}");
                        Err(err)
                    }
                };
                for waiter in waiters {
                    let _ = waiter.send(outcome.clone());
                }
                return;
            }
        }
    }
}
