//! Concurrency primitives for the sync loops
//!
//! A coalescing single-slot change signal, jittered periodic scheduling, and
//! panic supervision for long-running tasks.

use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::error;

/// Coalescing, non-blocking pending-change signal.
///
/// A single-slot flag with test-and-set / test-and-clear semantics: any
/// number of raises before a consume collapse into one pending state, and a
/// raise never blocks the caller.
pub struct ChangeSignal {
    pending: AtomicBool,
}

impl ChangeSignal {
    pub fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Raise the signal. Redundant raises are dropped silently.
    ///
    /// Returns true when this call set the slot, false when it was already
    /// pending.
    pub fn raise(&self) -> bool {
        !self.pending.swap(true, Ordering::AcqRel)
    }

    /// Consume the signal, leaving the slot empty.
    ///
    /// Returns true when a change was pending.
    pub fn consume(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Whether a change is pending, without consuming it.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl Default for ChangeSignal {
    fn default() -> Self {
        Self::new()
    }
}

type PanicHook = Box<dyn Fn(&str, &str) + Send + Sync>;

static PANIC_HOOKS: RwLock<Vec<PanicHook>> = RwLock::new(Vec::new());

/// Register a diagnostic hook to run before the process aborts on a loop
/// panic. Hooks receive the task name and the panic payload.
pub fn register_panic_hook(hook: impl Fn(&str, &str) + Send + Sync + 'static) {
    PANIC_HOOKS.write().push(Box::new(hook));
}

fn run_panic_hooks(task: &str, payload: &str) {
    for hook in PANIC_HOOKS.read().iter() {
        hook(task, payload);
    }
}

/// Spawn a named task under panic supervision.
///
/// A panic inside the task runs the registered diagnostic hooks and then
/// terminates the process. A broken invariant inside a sync loop must not
/// leave the agent running half-initialized; the supervisor restarts it.
pub fn spawn_supervised<F>(name: &'static str, future: F) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let inner = tokio::spawn(future);
    tokio::spawn(async move {
        if let Err(err) = inner.await {
            if err.is_panic() {
                let payload = err.into_panic();
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(task = name, panic = %message, "sync loop panicked, aborting process");
                run_panic_hooks(name, &message);
                std::process::abort();
            }
        }
    })
}

/// Run `operation` forever on a jittered period.
///
/// Each iteration sleeps `period * (1 ± jitter)` before the next run; with
/// `immediate` the first run happens before the first sleep.
pub async fn jitter_until<F, Fut>(period: Duration, jitter: f64, immediate: bool, mut operation: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    if immediate {
        operation().await;
    }
    loop {
        tokio::time::sleep(jittered(period, jitter)).await;
        operation().await;
    }
}

fn jittered(period: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return period;
    }
    // uniform in [1 - jitter, 1 + jitter]
    let factor = 1.0 - jitter + rand::random::<f64>() * jitter * 2.0;
    period.mul_f64(factor)
}
