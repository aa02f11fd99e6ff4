//! Shared test utilities for integration tests

use std::sync::{Mutex, MutexGuard};

use timeframe::{Frame, Scoped, TimeFrame};

/// Serializes access to `TIMEFRAME_*` environment variables across tests.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Sets environment variables for the lifetime of the guard and restores the
/// previous values on drop.
pub struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    pub fn set(vars: &[(&str, &str)]) -> Self {
        let lock = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let saved = vars
            .iter()
            .map(|(key, value)| {
                let previous = std::env::var(key).ok();
                std::env::set_var(key, value);
                (key.to_string(), previous)
            })
            .collect();
        Self { saved, _lock: lock }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..) {
            match previous {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// Job > Stage > Call where the first attempt fails and the second succeeds.
pub fn recovered_job() -> TimeFrame {
    let root = TimeFrame::new("Job");
    root.enter();
    let stage = root.create_event("Stage");
    stage.enter();
    let call = stage.create_action_with("Call", timeframe::RetryPolicy::new(3));
    let mut calls = 0;
    call.run(|_| {
        calls += 1;
        if calls == 1 {
            Err(anyhow::anyhow!("connection reset"))
        } else {
            Ok(())
        }
    });
    stage.exit(None);
    root.exit(None);
    assert_eq!(root.frame_count(), 5);
    root
}
