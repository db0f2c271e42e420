//! Cyclic driver detection.
//!
//! A tenant's stored config can say "use driver X" while X's own config
//! points back at X, directly or through a chain. Every driver creator
//! enters the guard before constructing, so a cycle is caught as a
//! [`BudError::CyclicOverride`] instead of unbounded recursion. The scope is
//! RAII: it releases on success and on every error path.

use crate::error::{BudError, BudResult};
use parking_lot::Mutex;
use std::collections::HashSet;

/// In-flight set of (term, name) pairs currently being constructed.
#[derive(Debug, Default)]
pub struct DriverGuard {
    in_flight: Mutex<HashSet<(String, String)>>,
}

impl DriverGuard {
    /// Create an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a (term, name) pair as being constructed.
    ///
    /// Errors with [`BudError::CyclicOverride`] when the pair is already in
    /// flight, which means construction has looped back on itself.
    pub fn enter(&self, term: &str, name: &str) -> BudResult<DriverGuardScope<'_>> {
        let pair = (term.to_string(), name.to_string());

        if !self.in_flight.lock().insert(pair.clone()) {
            return Err(BudError::cyclic(term, name));
        }

        Ok(DriverGuardScope { guard: self, pair })
    }

    /// Whether a pair is currently being constructed.
    pub fn is_in_flight(&self, term: &str, name: &str) -> bool {
        self.in_flight
            .lock()
            .contains(&(term.to_string(), name.to_string()))
    }
}

/// Releases the in-flight marker when dropped.
#[derive(Debug)]
pub struct DriverGuardScope<'g> {
    guard: &'g DriverGuard,
    pair: (String, String),
}

impl Drop for DriverGuardScope<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.lock().remove(&self.pair);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_reentry_is_cyclic() {
        let guard = DriverGuard::new();
        let _scope = guard.enter("database connection", "a").unwrap();

        let err = guard.enter("database connection", "a").unwrap_err();
        assert!(matches!(err, BudError::CyclicOverride { .. }));
    }

    #[test]
    fn test_chain_reentry_is_cyclic() {
        let guard = DriverGuard::new();

        // A -> B -> A: the second entry for "a" is caught while both are in
        // flight, with no recursion.
        let _a = guard.enter("database connection", "a").unwrap();
        let _b = guard.enter("database connection", "b").unwrap();
        assert!(guard.enter("database connection", "a").is_err());
    }

    #[test]
    fn test_scope_releases_on_drop() {
        let guard = DriverGuard::new();

        {
            let _scope = guard.enter("cache store", "tenant").unwrap();
            assert!(guard.is_in_flight("cache store", "tenant"));
        }

        assert!(!guard.is_in_flight("cache store", "tenant"));
        assert!(guard.enter("cache store", "tenant").is_ok());
    }

    #[test]
    fn test_terms_do_not_collide() {
        let guard = DriverGuard::new();
        let _db = guard.enter("database connection", "tenant").unwrap();

        // The same name under a different term is a different driver.
        assert!(guard.enter("cache store", "tenant").is_ok());
    }
}
