//! Once-per-root side-effect hook.
//!
//! A [`Hook`] is a caller-supplied callback (plus whatever context it
//! captures) that receives the root handle. It fires lazily, right before the
//! first attempt of the hierarchy is entered, or at the root's own exit when
//! no attempt ever ran. Its return value is retained on the root.
//!
//! Blocking entry points cannot await a suspending hook. They run it on a
//! detached thread with its own runtime and wait at most
//! [`HOOK_BLOCKING_TIMEOUT`]; past that bound the caller continues and the
//! hook finishes (and stores its result) whenever it completes.

use std::fmt;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::frame::Frame;
use crate::timeframe::TimeFrame;

/// Bounded wait applied to a suspending hook started from blocking code.
pub const HOOK_BLOCKING_TIMEOUT: Duration = Duration::from_millis(200);

type BlockingFn = dyn Fn(TimeFrame) -> Value + Send + Sync;
type SuspendingFn = dyn Fn(TimeFrame) -> BoxFuture<'static, Value> + Send + Sync;

/// Callback fired at most once per root.
#[derive(Clone)]
pub enum Hook {
    Blocking(Arc<BlockingFn>),
    Suspending(Arc<SuspendingFn>),
}

impl Hook {
    pub fn blocking<F>(hook: F) -> Self
    where
        F: Fn(TimeFrame) -> Value + Send + Sync + 'static,
    {
        Hook::Blocking(Arc::new(hook))
    }

    pub fn suspending<F, Fut>(hook: F) -> Self
    where
        F: Fn(TimeFrame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        Hook::Suspending(Arc::new(move |root| hook(root).boxed()))
    }

    /// Blocking hook invoked with an explicit captured context.
    pub fn blocking_with<C, F>(context: C, hook: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(TimeFrame, &C) -> Value + Send + Sync + 'static,
    {
        Hook::blocking(move |root| hook(root, &context))
    }

    /// Suspending hook invoked with an explicit captured context.
    pub fn suspending_with<C, F, Fut>(context: C, hook: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(TimeFrame, Arc<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        let context = Arc::new(context);
        Hook::suspending(move |root| hook(root, Arc::clone(&context)))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Hook::Suspending(_))
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Blocking(_) => f.write_str("Hook::Blocking"),
            Hook::Suspending(_) => f.write_str("Hook::Suspending"),
        }
    }
}

/// Take the hook out of the root. Only the first caller ever gets it.
fn take_hook(root: &TimeFrame) -> Option<Hook> {
    let shared = &root.frame_ref().shared;
    let hook = shared.hook.lock().take()?;
    shared.hook_fired.store(true, Ordering::SeqCst);
    Some(hook)
}

fn store_result(root: &TimeFrame, value: Value) {
    *root.frame_ref().shared.hook_result.lock() = Some(value);
}

/// Fire the hook from a blocking context, if it has not fired yet.
pub(crate) fn fire_blocking(root: &TimeFrame) {
    let Some(hook) = take_hook(root) else {
        return;
    };
    info!(root = %root.name(), suspending = hook.is_suspending(), "firing hook");
    match hook {
        Hook::Blocking(hook) => {
            let value = hook(root.clone());
            store_result(root, value);
        }
        Hook::Suspending(hook) => run_detached(root, hook),
    }
}

fn run_detached(root: &TimeFrame, hook: Arc<SuspendingFn>) {
    let (done_tx, done_rx) = mpsc::channel();
    let detached_root = root.clone();
    let spawned = std::thread::Builder::new()
        .name("timeframe-hook".to_string())
        .spawn(move || {
            match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => {
                    let value = runtime.block_on(hook(detached_root.clone()));
                    store_result(&detached_root, value);
                }
                Err(err) => {
                    warn!(error = %err, "failed to build runtime for hook");
                }
            }
            let _ = done_tx.send(());
        });

    if let Err(err) = spawned {
        warn!(error = %err, "failed to spawn hook thread");
        return;
    }

    match done_rx.recv_timeout(HOOK_BLOCKING_TIMEOUT) {
        Ok(()) => debug!("hook completed within bound"),
        Err(_) => debug!(
            timeout_ms = HOOK_BLOCKING_TIMEOUT.as_millis() as u64,
            "hook still running; continuing without it"
        ),
    }
}

/// Fire the hook from an async context, if it has not fired yet. Awaited
/// without a timeout.
pub(crate) async fn fire_async(root: &TimeFrame) {
    let Some(hook) = take_hook(root) else {
        return;
    };
    info!(root = %root.name(), suspending = hook.is_suspending(), "firing hook");
    match hook {
        Hook::Suspending(hook) => {
            let value = hook(root.clone()).await;
            store_result(root, value);
        }
        Hook::Blocking(hook) => match offload(root, hook).await {
            Ok(value) => store_result(root, value),
            Err(err) => warn!(error = %err, "hook task failed"),
        },
    }
}

/// Run a blocking hook off the polling thread: on tokio's blocking pool when
/// a runtime is current, otherwise on a dedicated thread.
async fn offload(root: &TimeFrame, hook: Arc<BlockingFn>) -> Result<Value, String> {
    let blocking_root = root.clone();
    if tokio::runtime::Handle::try_current().is_ok() {
        return tokio::task::spawn_blocking(move || hook(blocking_root))
            .await
            .map_err(|err| err.to_string());
    }

    let (value_tx, value_rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("timeframe-hook".to_string())
        .spawn(move || {
            let _ = value_tx.send(hook(blocking_root));
        })
        .map_err(|err| err.to_string())?;
    value_rx.await.map_err(|err| err.to_string())
}
