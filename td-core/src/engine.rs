//! Boundary to the decomposition engine.
//!
//! An engine is launched once per request and produces a [`Job`]. The
//! [`Runner`] keeps at most one job alive; replacing or cancelling a job drops
//! its promise, so a superseded answer can never be observed.

use std::{
    io::{self, Read, Write},
    process::{Child, Command, ExitStatus, Stdio},
    sync::{Arc, Mutex, TryLockError},
    thread,
};

use poll_promise::Promise;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    decomposition::Decomposition,
    graph::{EdgeKey, GraphStore, VertexId},
};

#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct DecompositionRequest {
    pub nodes: Vec<VertexId>,
    pub edges: Vec<EdgeKey>,
}

impl DecompositionRequest {
    /// Vertices and edges of `store`, both ascending.
    #[must_use]
    pub fn from_store(store: &GraphStore) -> Self {
        let mut nodes: Vec<VertexId> = store.vertex_ids().collect();
        nodes.sort_unstable();
        let mut edges: Vec<EdgeKey> = store.edges().collect();
        edges.sort_unstable();
        Self { nodes, edges }
    }
}

/// Engine output; tree edges use 0-based positions in `bags`.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct DecompositionResponse {
    pub bags: Vec<Vec<VertexId>>,
    #[serde(rename = "treeEdges")]
    pub tree_edges: Vec<(usize, usize)>,
}

impl DecompositionResponse {
    #[must_use]
    pub fn into_decomposition(self) -> Decomposition {
        Decomposition::from_indexed(self.bags, self.tree_edges)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Reply {
    Failure { error: String },
    Success(DecompositionResponse),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to talk to the engine")]
    Io(#[from] io::Error),
    #[error("engine exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },
    #[error("engine reported: {0}")]
    Reported(String),
    #[error("engine output is not a decomposition")]
    Malformed(#[from] serde_json::Error),
    #[error("engine worker stopped unexpectedly")]
    Crashed,
}

pub type EngineResult = Result<DecompositionResponse, EngineError>;

/// A launched request.
pub struct Job {
    promise: Promise<EngineResult>,
    terminator: Option<Box<dyn FnOnce() + Send>>,
}

impl Job {
    #[must_use]
    pub fn new(promise: Promise<EngineResult>) -> Self {
        Self {
            promise,
            terminator: None,
        }
    }

    /// Runs `terminator` when the job is abandoned before it finishes.
    #[must_use]
    pub fn with_terminator(mut self, terminator: impl FnOnce() + Send + 'static) -> Self {
        self.terminator = Some(Box::new(terminator));
        self
    }

    /// Stops the work, where possible, and forgets the result.
    pub fn terminate(self) {
        if self.promise.ready().is_none() {
            if let Some(terminator) = self.terminator {
                terminator();
            }
        }
    }
}

pub trait Engine {
    /// Starts computing a decomposition of `request`.
    ///
    /// # Errors
    /// Returns an error if the engine could not be started.
    fn launch(&self, request: DecompositionRequest) -> Result<Job, EngineError>;
}

/// An external program that reads a request as JSON on stdin and answers
/// with JSON on stdout: either a response or `{"error": "..."}`.
#[derive(Clone, Debug)]
pub struct ProcessEngine {
    program: String,
    args: Vec<String>,
}

impl ProcessEngine {
    #[must_use]
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().collect(),
        }
    }
}

impl Engine for ProcessEngine {
    fn launch(&self, request: DecompositionRequest) -> Result<Job, EngineError> {
        let payload = serde_json::to_vec(&request)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        debug!(program = %self.program, pid = child.id(), "engine started");

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let child = Arc::new(Mutex::new(child));
        let worker = Arc::clone(&child);
        let promise = Promise::spawn_thread("decomposition", move || {
            exchange(&worker, stdin, stdout, stderr, payload)
        });

        Ok(Job::new(promise).with_terminator(move || match child.try_lock() {
            Ok(mut child) => {
                if let Err(err) = child.kill() {
                    warn!("failed to kill engine: {err}");
                } else {
                    debug!("engine killed");
                }
            }
            // the worker only holds the lock once output is complete
            Err(TryLockError::WouldBlock) => debug!("engine already finishing"),
            Err(TryLockError::Poisoned(_)) => warn!("engine handle poisoned"),
        }))
    }
}

fn exchange(
    child: &Mutex<Child>,
    stdin: Option<impl Write + Send + 'static>,
    stdout: Option<impl Read>,
    stderr: Option<impl Read + Send + 'static>,
    payload: Vec<u8>,
) -> EngineResult {
    let writer = stdin.map(|mut stdin| thread::spawn(move || stdin.write_all(&payload)));
    let errors = stderr.map(|mut stderr| {
        thread::spawn(move || {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text);
            text
        })
    });

    let mut output = Vec::new();
    if let Some(mut stdout) = stdout {
        stdout.read_to_end(&mut output)?;
    }
    let status = child.lock().map_err(|_| EngineError::Crashed)?.wait()?;
    if let Some(Ok(Err(err))) = writer.map(thread::JoinHandle::join) {
        // an engine may answer without reading all of its input
        debug!("engine input not fully written: {err}");
    }
    let stderr = errors
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    if !status.success() {
        return Err(EngineError::Exit {
            status,
            stderr: stderr.trim().to_owned(),
        });
    }
    match serde_json::from_slice(&output)? {
        Reply::Success(response) => Ok(response),
        Reply::Failure { error } => Err(EngineError::Reported(error)),
    }
}

/// A decomposition function run on a worker thread.
pub struct InProcessEngine<F> {
    solve: Arc<F>,
}

impl<F> InProcessEngine<F>
where
    F: Fn(DecompositionRequest) -> EngineResult + Send + Sync + 'static,
{
    pub fn new(solve: F) -> Self {
        Self {
            solve: Arc::new(solve),
        }
    }
}

impl<F> Engine for InProcessEngine<F>
where
    F: Fn(DecompositionRequest) -> EngineResult + Send + Sync + 'static,
{
    fn launch(&self, request: DecompositionRequest) -> Result<Job, EngineError> {
        let solve = Arc::clone(&self.solve);
        Ok(Job::new(Promise::spawn_thread("decomposition", move || {
            solve(request)
        })))
    }
}

/// Identifies one call to [`Runner::start`].
pub type RunId = u64;

#[derive(Default)]
pub enum RunState {
    #[default]
    Idle,
    Running {
        run: RunId,
        job: Job,
    },
    Cancelled {
        run: RunId,
    },
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        run: RunId,
        response: DecompositionResponse,
    },
    Failed {
        run: RunId,
        error: EngineError,
    },
}

/// Owns the single outstanding engine run.
pub struct Runner {
    engine: Box<dyn Engine>,
    state: RunState,
    last_run: RunId,
}

impl Runner {
    #[must_use]
    pub fn new(engine: Box<dyn Engine>) -> Self {
        Self {
            engine,
            state: RunState::Idle,
            last_run: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &RunState {
        &self.state
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running { .. })
    }

    /// Cancels any current run and launches a new one.
    ///
    /// # Errors
    /// Returns an error if the engine could not be launched; the runner is
    /// then idle.
    pub fn start(&mut self, request: DecompositionRequest) -> Result<RunId, EngineError> {
        self.cancel();
        self.state = RunState::Idle;
        let job = self.engine.launch(request)?;
        self.last_run += 1;
        let run = self.last_run;
        debug!(run, "decomposition run started");
        self.state = RunState::Running { run, job };
        Ok(run)
    }

    /// Terminates the current run. Its result is never reported.
    pub fn cancel(&mut self) {
        if let RunState::Running { run, job } = std::mem::take(&mut self.state) {
            job.terminate();
            debug!(run, "decomposition run cancelled");
            self.state = RunState::Cancelled { run };
        }
    }

    /// Collects the current run's result if it is ready.
    pub fn poll(&mut self) -> Option<RunOutcome> {
        match std::mem::take(&mut self.state) {
            RunState::Running { run, job } => match job.promise.try_take() {
                Ok(result) => Some(Self::outcome(run, result)),
                Err(promise) => {
                    self.state = RunState::Running {
                        run,
                        job: Job { promise, ..job },
                    };
                    None
                }
            },
            state => {
                self.state = state;
                None
            }
        }
    }

    /// Waits for the current run. Returns `None` if nothing is running.
    pub fn block_on(&mut self) -> Option<RunOutcome> {
        match std::mem::take(&mut self.state) {
            RunState::Running { run, job } => {
                Some(Self::outcome(run, job.promise.block_and_take()))
            }
            state => {
                self.state = state;
                None
            }
        }
    }

    fn outcome(run: RunId, result: EngineResult) -> RunOutcome {
        match result {
            Ok(response) => {
                debug!(run, bags = response.bags.len(), "decomposition run finished");
                RunOutcome::Completed { run, response }
            }
            Err(error) => {
                warn!(run, "decomposition run failed: {error}");
                RunOutcome::Failed { run, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use insta::assert_snapshot;
    use rstest::rstest;

    use super::{
        DecompositionRequest, DecompositionResponse, EngineError, InProcessEngine, RunOutcome,
        RunState, Runner,
    };
    use crate::graph::{GraphStore, Position, VertexId};

    fn path_request() -> DecompositionRequest {
        let mut store = GraphStore::new();
        let a = store.add_vertex(Position::default());
        let b = store.add_vertex(Position::default());
        let c = store.add_vertex(Position::default());
        store.add_edge(c, b);
        store.add_edge(b, a);
        DecompositionRequest::from_store(&store)
    }

    #[test]
    fn wire_format() {
        assert_snapshot!(
            serde_json::to_string(&path_request()).unwrap(),
            @r#"{"nodes":[1,2,3],"edges":["1-2","2-3"]}"#
        );
        let response: DecompositionResponse =
            serde_json::from_str(r#"{"bags":[[1,2],[2,3]],"treeEdges":[[0,1]]}"#).unwrap();
        let decomposition = response.into_decomposition();
        assert_eq!(decomposition.width(), 1);
        assert_eq!(decomposition.tree_edges().len(), 1);
    }

    fn path_engine(request: DecompositionRequest) -> super::EngineResult {
        let bags = request
            .edges
            .iter()
            .map(|key| vec![key.u(), key.v()])
            .collect::<Vec<_>>();
        let tree_edges = (1..bags.len()).map(|i| (i - 1, i)).collect();
        Ok(DecompositionResponse { bags, tree_edges })
    }

    #[test]
    fn in_process_run_completes() {
        let mut runner = Runner::new(Box::new(InProcessEngine::new(path_engine)));
        let run = runner.start(path_request()).unwrap();
        match runner.block_on() {
            Some(RunOutcome::Completed { run: done, response }) => {
                assert_eq!(done, run);
                assert_eq!(response.bags[0], vec![VertexId(1), VertexId(2)]);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(matches!(runner.state(), RunState::Idle));
        assert!(runner.poll().is_none());
    }

    #[test]
    fn restart_discards_previous_run() {
        let engine = InProcessEngine::new(|request: DecompositionRequest| {
            if request.nodes.is_empty() {
                thread::sleep(Duration::from_millis(200));
                return Ok(DecompositionResponse {
                    bags: vec![vec![VertexId(99)]],
                    tree_edges: vec![],
                });
            }
            path_engine(request)
        });
        let mut runner = Runner::new(Box::new(engine));
        let slow = runner.start(DecompositionRequest::default()).unwrap();
        let fast = runner.start(path_request()).unwrap();
        assert_ne!(slow, fast);

        match runner.block_on() {
            Some(RunOutcome::Completed { run, response }) => {
                assert_eq!(run, fast);
                assert!(!response.bags.iter().flatten().any(|v| *v == VertexId(99)));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        thread::sleep(Duration::from_millis(300));
        assert!(runner.poll().is_none());
    }

    #[test]
    fn cancel_forgets_the_run() {
        let engine = InProcessEngine::new(|request| {
            thread::sleep(Duration::from_millis(100));
            path_engine(request)
        });
        let mut runner = Runner::new(Box::new(engine));
        let run = runner.start(path_request()).unwrap();
        runner.cancel();
        assert!(matches!(runner.state(), RunState::Cancelled { run: cancelled } if *cancelled == run));
        thread::sleep(Duration::from_millis(200));
        assert!(runner.poll().is_none());
        assert!(runner.block_on().is_none());
    }

    #[cfg(unix)]
    mod process {
        use std::time::{Duration, Instant};

        use rstest::rstest;

        use super::path_request;
        use crate::engine::{EngineError, ProcessEngine, RunOutcome, RunState, Runner};

        fn shell(script: &str) -> Runner {
            Runner::new(Box::new(ProcessEngine::new(
                "sh",
                ["-c".to_owned(), script.to_owned()],
            )))
        }

        #[test]
        fn child_answers_over_stdio() {
            let mut runner = shell(
                r#"cat > /dev/null; echo '{"bags":[[1,2],[2,3]],"treeEdges":[[0,1]]}'"#,
            );
            runner.start(path_request()).unwrap();
            match runner.block_on() {
                Some(RunOutcome::Completed { response, .. }) => {
                    assert_eq!(response.bags.len(), 2);
                    assert_eq!(response.tree_edges, vec![(0, 1)]);
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        #[rstest]
        #[case::exit_code("echo broken >&2; exit 3", "engine exited with")]
        #[case::reported(r#"cat > /dev/null; echo '{"error":"too big"}'"#, "engine reported: too big")]
        #[case::garbage("echo nonsense", "engine output is not a decomposition")]
        fn failures_are_reported(#[case] script: &str, #[case] message: &str) {
            let mut runner = shell(script);
            runner.start(path_request()).unwrap();
            match runner.block_on() {
                Some(RunOutcome::Failed { error, .. }) => {
                    assert!(error.to_string().starts_with(message), "{error}");
                }
                other => panic!("unexpected outcome {other:?}"),
            }
            assert!(matches!(runner.state(), RunState::Idle));
        }

        #[test]
        fn missing_program_fails_to_start() {
            let mut runner = Runner::new(Box::new(ProcessEngine::new(
                "/nonexistent/td-engine",
                [],
            )));
            assert!(matches!(
                runner.start(path_request()),
                Err(EngineError::Spawn { .. })
            ));
            assert!(!runner.is_running());
        }

        #[test]
        fn cancel_kills_the_child() {
            let mut runner = shell("sleep 30");
            let started = Instant::now();
            runner.start(path_request()).unwrap();
            std::thread::sleep(Duration::from_millis(100));
            runner.cancel();
            assert!(runner.poll().is_none());
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[cfg(target_os = "linux")]
        fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
            let deadline = Instant::now() + Duration::from_secs(5);
            while Instant::now() < deadline {
                if condition() {
                    return true;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            false
        }

        #[cfg(target_os = "linux")]
        #[test]
        fn cancelled_child_is_gone() {
            let pid_file =
                std::env::temp_dir().join(format!("td-engine-{}.pid", std::process::id()));
            let _ = std::fs::remove_file(&pid_file);
            let mut runner = shell(&format!(
                "echo $$ > '{}'; exec sleep 30",
                pid_file.display()
            ));
            runner.start(path_request()).unwrap();

            let mut pid = String::new();
            assert!(wait_for(|| {
                pid = std::fs::read_to_string(&pid_file).unwrap_or_default();
                pid.ends_with('\n')
            }));
            let proc_dir = std::path::PathBuf::from(format!("/proc/{}", pid.trim()));
            assert!(proc_dir.exists());

            runner.cancel();
            assert!(matches!(runner.state(), RunState::Cancelled { .. }));
            assert!(wait_for(|| !proc_dir.exists()), "engine still running");
            assert!(runner.poll().is_none());
            let _ = std::fs::remove_file(&pid_file);
        }
    }

    #[rstest]
    #[case(EngineError::Reported("no".to_owned()), "engine reported: no")]
    #[case(EngineError::Crashed, "engine worker stopped unexpectedly")]
    fn error_messages(#[case] error: EngineError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }
}
