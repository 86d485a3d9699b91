use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::debug;

/// Identity of a quote subscription: the sorted, comma-joined symbol list.
/// Symbol order at the call site does not create a distinct subscription.
pub fn subscription_key(symbols: &[String]) -> String {
    let mut sorted: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
    sorted.sort_unstable();
    sorted.join(",")
}

/// Maps subscription keys to their push-task handles.
///
/// Owned exclusively by one adapter instance. Invariant: at most one live
/// task per key; inserting an existing key aborts the prior task first
/// (replace-semantics for duplicate subscriptions).
#[derive(Default)]
pub struct SubscriptionRegistry {
    handles: HashMap<String, JoinHandle<()>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a push task under `key`, aborting any task already there.
    pub fn insert(&mut self, key: String, handle: JoinHandle<()>) {
        if let Some(prior) = self.handles.insert(key.clone(), handle) {
            debug!(key = %key, "replacing existing quote subscription");
            prior.abort();
        }
    }

    /// Abort and remove the task for `key`. Returns false when the key was
    /// never subscribed (a no-op, not an error).
    pub fn remove(&mut self, key: &str) -> bool {
        match self.handles.remove(key) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handles.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Abort every task. Called on disconnect.
    pub fn clear(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
