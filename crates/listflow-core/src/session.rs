//! Guardas de sesión: timeout, presupuesto de actualizaciones y
//! single-flight.
//!
//! El flag IDLE/WORKING se toma con compare-and-swap en `try_begin`; el
//! guard devuelto lo libera en `Drop`, incluso si el handler hace panic.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_UPDATES, DEFAULT_TIMEOUT_SECONDS};
use crate::errors::CoreEngineError;

const IDLE: u8 = 0;
const WORKING: u8 = 1;

/// Cuándo se reinicia el presupuesto (reloj y contador).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetScope {
    /// En cada entrada a `run()`.
    #[default]
    PerRun,
    /// Una sola vez, al construir el guard.
    Instance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPolicy {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_updates")]
    pub max_updates: u64,
    #[serde(default)]
    pub budget_scope: BudgetScope,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_max_updates() -> u64 {
    DEFAULT_MAX_UPDATES
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self { timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
               max_updates:     DEFAULT_MAX_UPDATES,
               budget_scope:    BudgetScope::PerRun }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Ok,
    Timeout,
    MaxUpdates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunFlag {
    Idle,
    Working,
}

#[derive(Debug)]
pub struct SessionGuard {
    policy: SessionPolicy,
    flag: AtomicU8,
    started: Mutex<Instant>,
    updates: AtomicU64,
}

impl SessionGuard {
    pub fn new(policy: SessionPolicy) -> Self {
        Self { policy,
               flag: AtomicU8::new(IDLE),
               started: Mutex::new(Instant::now()),
               updates: AtomicU64::new(0) }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// IDLE → WORKING atómico. Si ya hay una corrida, devuelve `Busy` sin
    /// tocar el estado.
    pub fn try_begin(&self) -> Result<WorkingGuard<'_>, CoreEngineError> {
        self.flag
            .compare_exchange(IDLE, WORKING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CoreEngineError::Busy)?;
        if self.policy.budget_scope == BudgetScope::PerRun {
            self.reset();
        }
        Ok(WorkingGuard { session: self })
    }

    pub fn run_flag(&self) -> RunFlag {
        match self.flag.load(Ordering::Acquire) {
            WORKING => RunFlag::Working,
            _ => RunFlag::Idle,
        }
    }

    /// Comparaciones estrictas: `elapsed > timeout`, `updates > max_updates`.
    pub fn check_status(&self) -> SessionStatus {
        if self.elapsed() > Duration::from_secs(self.policy.timeout_seconds) {
            return SessionStatus::Timeout;
        }
        if self.updates.load(Ordering::Acquire) > self.policy.max_updates {
            return SessionStatus::MaxUpdates;
        }
        SessionStatus::Ok
    }

    pub fn log_update(&self) {
        let n = self.updates.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!("session update #{n}");
    }

    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }

    pub fn elapsed(&self) -> Duration {
        let started = self.started.lock().unwrap_or_else(|p| p.into_inner());
        started.elapsed()
    }

    /// Reinicia reloj y contador.
    pub fn reset(&self) {
        let mut started = self.started.lock().unwrap_or_else(|p| p.into_inner());
        *started = Instant::now();
        self.updates.store(0, Ordering::Release);
    }
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new(SessionPolicy::default())
    }
}

/// Mientras vive, el guard mantiene el flag en WORKING.
#[derive(Debug)]
pub struct WorkingGuard<'a> {
    session: &'a SessionGuard,
}

impl Drop for WorkingGuard<'_> {
    fn drop(&mut self) {
        self.session.flag.store(IDLE, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn single_flight_cas() {
        let s = SessionGuard::default();
        let g = s.try_begin().unwrap();
        assert_eq!(s.run_flag(), RunFlag::Working);
        assert_eq!(s.try_begin().unwrap_err(), CoreEngineError::Busy);
        drop(g);
        assert_eq!(s.run_flag(), RunFlag::Idle);
        assert!(s.try_begin().is_ok());
    }

    #[test]
    fn flag_released_on_panic() {
        let s = SessionGuard::default();
        let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g = s.try_begin().unwrap();
            panic!("handler exploded");
        }));
        assert!(r.is_err());
        assert_eq!(s.run_flag(), RunFlag::Idle);
    }

    #[test]
    fn max_updates_is_strict() {
        let s = SessionGuard::new(SessionPolicy { max_updates: 2,
                                                  ..SessionPolicy::default() });
        s.log_update();
        s.log_update();
        assert_eq!(s.check_status(), SessionStatus::Ok);
        s.log_update();
        assert_eq!(s.check_status(), SessionStatus::MaxUpdates);
    }

    #[test]
    fn timeout_detected() {
        let s = SessionGuard::new(SessionPolicy { timeout_seconds: 0,
                                                  ..SessionPolicy::default() });
        thread::sleep(Duration::from_millis(5));
        assert_eq!(s.check_status(), SessionStatus::Timeout);
    }

    #[test]
    fn budget_scope_controls_reset() {
        let per_run = SessionGuard::default();
        per_run.log_update();
        drop(per_run.try_begin().unwrap());
        assert_eq!(per_run.update_count(), 0);

        let instance = SessionGuard::new(SessionPolicy { budget_scope: BudgetScope::Instance,
                                                         ..SessionPolicy::default() });
        instance.log_update();
        drop(instance.try_begin().unwrap());
        assert_eq!(instance.update_count(), 1);
    }

    #[test]
    fn policy_defaults_from_partial_json() {
        let p: SessionPolicy = serde_json::from_str(r#"{"max_updates": 5}"#).unwrap();
        assert_eq!(p.timeout_seconds, 3600);
        assert_eq!(p.max_updates, 5);
        assert_eq!(p.budget_scope, BudgetScope::PerRun);
    }
}
