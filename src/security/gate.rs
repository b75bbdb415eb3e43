//! Concurrent query gate.
//!
//! Bounds the number of statements in flight against the database at once.
//! A permit is held for the duration of one statement and released on drop.

use crate::error::{SecurityError, SecurityResult};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

pub struct QueryGate {
    in_flight: AtomicU32,
    max_concurrent: u32,
}

impl QueryGate {
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            in_flight: AtomicU32::new(0),
            max_concurrent,
        }
    }

    /// Try to acquire a permit for one statement.
    pub fn try_acquire(&self) -> SecurityResult<QueryPermit<'_>> {
        let mut current = self.in_flight.load(Ordering::SeqCst);
        loop {
            if current >= self.max_concurrent {
                warn!(
                    "Concurrent query limit exceeded: {}/{}",
                    current, self.max_concurrent
                );
                return Err(SecurityError::ConcurrentLimitExceeded(self.max_concurrent));
            }
            match self.in_flight.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        debug!(
            "Query permit acquired: {} in flight",
            self.in_flight.load(Ordering::SeqCst)
        );
        Ok(QueryPermit { gate: self })
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn release(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard that releases the permit on drop.
pub struct QueryPermit<'a> {
    gate: &'a QueryGate,
}

impl Drop for QueryPermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let gate = QueryGate::new(5);
        let permit = gate.try_acquire().unwrap();
        assert_eq!(gate.in_flight(), 1);
        drop(permit);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn test_concurrent_limit() {
        let gate = QueryGate::new(2);
        let _p1 = gate.try_acquire().unwrap();
        let _p2 = gate.try_acquire().unwrap();
        assert!(gate.try_acquire().is_err());
    }
}
