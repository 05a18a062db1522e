//! Per-`transaction_id` async locks for the HITL resume sequence. `/review`
//! must run `{load state, patch, invoke, persist}` atomically with respect to
//! concurrent resumes of the same case; this hands out one `tokio::sync::Mutex`
//! per case id so two resumes of *different* cases never block each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
pub struct CaseLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CaseLocks {
    pub fn new() -> Self {
        CaseLocks::default()
    }

    /// Acquire the lock for `case_id`, creating its entry if this is the
    /// first resume ever seen for it. Holding the returned guard for the
    /// duration of a resume serializes it against any other in-flight resume
    /// of the same case; unrelated cases proceed concurrently.
    pub async fn acquire(&self, case_id: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry(case_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }
}
