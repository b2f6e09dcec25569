//! Bounded pool of ONNX Runtime sessions.
//!
//! ONNX sessions are run through `&mut Session`, so each one is guarded by its
//! own mutex. The pool size caps how many inferences run at once for a model.

use crate::config::InferenceDevice;
use crate::constants::APP_NAME;
use crate::error::{Error, Result, panic_message};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider,
    DirectMLExecutionProvider, ExecutionProviderDispatch,
};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use tracing::{debug, info};

/// Initialize the ONNX Runtime environment.
///
/// Safe to call more than once; later calls are no-ops inside ort. With
/// `load-dynamic`, ort panics when the runtime library cannot be loaded, so
/// that panic is reported as [`Error::RuntimeInitialization`] too.
pub fn init_runtime() -> Result<()> {
    let committed = panic::catch_unwind(|| ort::init().with_name(APP_NAME).commit())
        .map_err(|payload| runtime_error(panic_message(payload.as_ref())))?;
    committed.into_outcome().map_err(runtime_error)?;
    debug!("ONNX Runtime environment ready");
    Ok(())
}

fn runtime_error(reason: String) -> Error {
    Error::RuntimeInitialization { reason }
}

/// Outcome of committing an ort environment.
trait CommitOutcome {
    fn into_outcome(self) -> std::result::Result<(), String>;
}

// `false` means an environment already exists.
impl CommitOutcome for bool {
    fn into_outcome(self) -> std::result::Result<(), String> {
        Ok(())
    }
}

impl<T> CommitOutcome for ort::Result<T> {
    fn into_outcome(self) -> std::result::Result<(), String> {
        self.map(|_| ()).map_err(|e| e.to_string())
    }
}

/// Execution providers to register for a device, in priority order.
///
/// ort falls back to the next provider (and finally CPU) when one cannot be
/// registered, so `auto` lists every accelerator we know about.
pub fn execution_providers(device: InferenceDevice) -> Vec<ExecutionProviderDispatch> {
    match device {
        InferenceDevice::Auto => vec![
            CUDAExecutionProvider::default().build(),
            CoreMLExecutionProvider::default().build(),
            DirectMLExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
        InferenceDevice::Cpu => vec![CPUExecutionProvider::default().build()],
        InferenceDevice::Cuda => vec![
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
        InferenceDevice::CoreMl => vec![
            CoreMLExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
        InferenceDevice::DirectMl => vec![
            DirectMLExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
    }
}

/// A fixed set of sessions for one model file.
///
/// Generic over the session type so the locking can be exercised without a
/// runtime; production pools hold [`Session`]s.
pub struct SessionPool<S = Session> {
    path: PathBuf,
    slots: Vec<Mutex<S>>,
    next: AtomicUsize,
}

impl<S> std::fmt::Debug for SessionPool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("path", &self.path)
            .field("sessions", &self.slots.len())
            .finish_non_exhaustive()
    }
}

impl SessionPool {
    /// Build `size` sessions for the model at `path`.
    pub fn load(path: &Path, device: InferenceDevice, size: usize) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ModelFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let size = size.max(1);
        let intra_threads = intra_threads_per_session(size);
        let sessions = (0..size)
            .map(|_| build_session(path, device, intra_threads))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Loaded {} ({size} session(s), device={device}, {intra_threads} thread(s) each)",
            path.display()
        );

        Ok(Self::from_sessions(path, sessions))
    }
}

impl<S> SessionPool<S> {
    /// Wrap already-built sessions.
    pub fn from_sessions(path: &Path, sessions: Vec<S>) -> Self {
        Self {
            path: path.to_path_buf(),
            slots: sessions.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        }
    }

    /// Model file backing this pool.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of sessions in the pool.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Run `f` with exclusive access to one session.
    ///
    /// Takes the first idle session; if all are busy, waits on one chosen
    /// round-robin.
    pub fn with_session<T>(&self, f: impl FnOnce(&mut S) -> Result<T>) -> Result<T> {
        let mut guard = self.acquire();
        f(&mut guard)
    }

    fn acquire(&self) -> MutexGuard<'_, S> {
        for slot in &self.slots {
            match slot.try_lock() {
                Ok(guard) => return guard,
                Err(TryLockError::Poisoned(poisoned)) => return poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {}
            }
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.size();
        debug!(
            "All {} session(s) for {} busy, waiting on slot {index}",
            self.size(),
            self.path().display()
        );
        self.slots[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn build_session(path: &Path, device: InferenceDevice, intra_threads: usize) -> Result<Session> {
    Session::builder()
        .map_err(build_error(path))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(build_error(path))?
        .with_intra_threads(intra_threads)
        .map_err(build_error(path))?
        .with_execution_providers(execution_providers(device))
        .map_err(build_error(path))?
        .commit_from_file(path)
        .map_err(build_error(path))
}

fn build_error<E: std::fmt::Display>(path: &Path) -> impl Fn(E) -> Error + '_ {
    move |e| Error::ClassifierBuild {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Split the available cores between the sessions of one pool.
fn intra_threads_per_session(sessions: usize) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    (cores / sessions.max(1)).max(1)
}

/// Run a single-input session and return the first output as `(shape, data)`.
pub fn run_single(
    session: &mut Session,
    shape: [usize; 4],
    data: Vec<f32>,
) -> Result<(Vec<i64>, Vec<f32>)> {
    let tensor = ort::value::Tensor::from_array((shape, data)).map_err(|e| Error::Tensor {
        reason: e.to_string(),
    })?;

    let outputs = session
        .run(ort::inputs![tensor])
        .map_err(|e| Error::Inference {
            reason: e.to_string(),
        })?;

    let output = outputs.values().next().ok_or_else(|| Error::Inference {
        reason: "model produced no outputs".to_string(),
    })?;

    let (out_shape, values) = output
        .try_extract_tensor::<f32>()
        .map_err(|e| Error::Inference {
            reason: format!("failed to extract output tensor: {e}"),
        })?;

    Ok((out_shape.iter().copied().collect(), values.to_vec()))
}
