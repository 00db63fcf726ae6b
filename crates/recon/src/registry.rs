//! Isolated sessions for a multi-session host.
//!
//! Each session sits behind its own lock: `run_matching`, `assign` and
//! `reconcile` on one session are serialized, other sessions are not
//! blocked. Nothing is shared between sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::session::Session;

pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` under `id`, returning the session it replaced.
    pub fn insert(&self, id: impl Into<String>, session: Session) -> Option<SharedSession> {
        self.map().insert(id.into(), Arc::new(Mutex::new(session)))
    }

    pub fn get(&self, id: &str) -> Option<SharedSession> {
        self.map().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<SharedSession> {
        self.map().remove(id)
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Run `f` while holding the session's exclusive lock.
    /// Returns `None` if no session is registered under `id`.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let shared = self.get(id)?;
        let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut guard))
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, SharedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::SalesBatch;
    use crate::matcher::Matcher;
    use crate::model::{Catalog, MasterRecord, SalesRecord};

    fn session(qty: u64) -> Session {
        let catalog = Catalog::from_records(vec![MasterRecord::new("APPLE_GOLD", qty, "FBA")]).unwrap();
        Session::new(catalog, Matcher::default())
    }

    #[test]
    fn sessions_are_isolated() {
        let registry = SessionRegistry::new();
        registry.insert("a", session(100));
        registry.insert("b", session(100));

        registry
            .with_session("a", |s| {
                s.assign("GLD", "APPLE_GOLD").unwrap();
                let batch = SalesBatch::new("x.csv", vec![SalesRecord::new("GLD", 10, "x.csv")]);
                s.reconcile(&[batch]);
            })
            .unwrap();

        let qty = |id: &str| {
            registry
                .with_session(id, |s| s.catalog().get("APPLE_GOLD").unwrap().quantity)
                .unwrap()
        };
        assert_eq!(qty("a"), 90);
        assert_eq!(qty("b"), 100);
        assert!(registry.with_session("b", |s| s.mappings().is_empty()).unwrap());
    }

    #[test]
    fn missing_session_is_none() {
        let registry = SessionRegistry::new();
        assert!(registry.with_session("nope", |_| ()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_reconciles_apply_each_batch_once() {
        let registry = Arc::new(SessionRegistry::new());
        registry.insert("shared", session(1_000));
        registry
            .with_session("shared", |s| s.assign("GLD", "APPLE_GOLD").map(|_| ()))
            .unwrap()
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let batch = SalesBatch::new("dup.csv", vec![SalesRecord::new("GLD", 5, "dup.csv")]);
                    registry.with_session("shared", |s| {
                        s.reconcile(&[batch]);
                    });
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let qty = registry
            .with_session("shared", |s| s.catalog().get("APPLE_GOLD").unwrap().quantity)
            .unwrap();
        assert_eq!(qty, 995);
    }
}
