//! Process-wide runtime environment shared by every session.
//!
//! The environment is initialized by the first lease and marked destroyed when
//! the last lease is dropped. Sessions must be dropped before the lease that
//! was taken for them. A destroyed environment is initialized again by the
//! next lease, so adapters may be opened and closed one after another.
//!
//! `Destroyed` is a logical phase. ONNX Runtime keeps its native environment
//! until the process exits and `ort` offers no way to tear it down, so a new
//! lease after destruction reuses it.
//! Closing one adapter never tears the environment down under another.

use std::sync::{Mutex, MutexGuard};

use ort::session::Session;
use tracing::{debug, info};

use crate::error::InferenceError;
use crate::platform::{library_for, NativeLibrary};
use crate::Result;

/// Lifecycle of the runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentPhase {
    Uninitialized,
    Initialized,
    Destroyed,
}

#[derive(Debug)]
struct EnvironmentState {
    phase: EnvironmentPhase,
    leases: usize,
    library: Option<&'static NativeLibrary>,
}

/// Reference-counted runtime environment.
#[derive(Debug)]
pub struct RuntimeEnvironment {
    os: &'static str,
    arch: &'static str,
    state: Mutex<EnvironmentState>,
}

static GLOBAL: RuntimeEnvironment = RuntimeEnvironment::new();

impl RuntimeEnvironment {
    /// Environment for the platform this binary was built for.
    pub const fn new() -> Self {
        Self::for_platform(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Environment that resolves its library for the given platform.
    pub const fn for_platform(os: &'static str, arch: &'static str) -> Self {
        Self {
            os,
            arch,
            state: Mutex::new(EnvironmentState {
                phase: EnvironmentPhase::Uninitialized,
                leases: 0,
                library: None,
            }),
        }
    }

    /// The process-wide environment.
    pub fn global() -> &'static RuntimeEnvironment {
        &GLOBAL
    }

    fn lock(&self) -> MutexGuard<'_, EnvironmentState> {
        // The state is a plain counter and phase, always left consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Initialize the environment if it is not already. Calling this on an
    /// initialized environment does nothing.
    pub fn initialize(&self) -> Result<()> {
        let mut state = self.lock();
        self.initialize_locked(&mut state)
    }

    fn initialize_locked(&self, state: &mut EnvironmentState) -> Result<()> {
        if state.phase == EnvironmentPhase::Initialized {
            return Ok(());
        }

        let library = library_for(self.os, self.arch)?;
        debug!(
            "Using onnxruntime library {} for {} {}",
            library.default_path().display(),
            library.os,
            library.arch
        );

        // Only the first commit in a process takes effect.
        let _ = ort::init().with_name("onnxcpu").commit();
        // A builder can only be created once the environment exists.
        Session::builder()
            .map(drop)
            .map_err(|e| InferenceError::Environment(e.to_string()))?;

        state.library = Some(library);
        state.phase = EnvironmentPhase::Initialized;
        info!("Runtime environment initialized");
        Ok(())
    }

    /// Take a lease on the environment, initializing it if needed.
    pub fn acquire(&'static self) -> Result<EnvironmentLease> {
        let mut state = self.lock();
        self.initialize_locked(&mut state)?;
        state.leases += 1;
        debug!("Runtime environment leases: {}", state.leases);
        Ok(EnvironmentLease { env: self })
    }

    fn release(&self) {
        let mut state = self.lock();
        state.leases = state.leases.saturating_sub(1);
        debug!("Runtime environment leases: {}", state.leases);

        if state.leases == 0 && state.phase == EnvironmentPhase::Initialized {
            state.phase = EnvironmentPhase::Destroyed;
            info!("Runtime environment destroyed");
        }
    }

    pub fn phase(&self) -> EnvironmentPhase {
        self.lock().phase
    }

    /// Number of live leases.
    pub fn leases(&self) -> usize {
        self.lock().leases
    }

    /// Library resolved by the last initialization.
    pub fn library(&self) -> Option<&'static NativeLibrary> {
        self.lock().library
    }
}

impl Default for RuntimeEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the environment initialized while held.
#[derive(Debug)]
pub struct EnvironmentLease {
    env: &'static RuntimeEnvironment,
}

impl EnvironmentLease {
    pub fn environment(&self) -> &'static RuntimeEnvironment {
        self.env
    }
}

impl Drop for EnvironmentLease {
    fn drop(&mut self) {
        self.env.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        static ENV: RuntimeEnvironment = RuntimeEnvironment::new();
        assert_eq!(ENV.phase(), EnvironmentPhase::Uninitialized);

        let first = ENV.acquire().unwrap();
        let second = ENV.acquire().unwrap();
        assert_eq!(ENV.phase(), EnvironmentPhase::Initialized);
        assert_eq!(ENV.leases(), 2);
        assert!(ENV.library().is_some());

        drop(first);
        assert_eq!(ENV.phase(), EnvironmentPhase::Initialized);

        drop(second);
        assert_eq!(ENV.phase(), EnvironmentPhase::Destroyed);
        assert_eq!(ENV.leases(), 0);

        let again = ENV.acquire().unwrap();
        assert_eq!(ENV.phase(), EnvironmentPhase::Initialized);
        drop(again);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        static ENV: RuntimeEnvironment = RuntimeEnvironment::new();
        ENV.initialize().unwrap();
        ENV.initialize().unwrap();
        assert_eq!(ENV.phase(), EnvironmentPhase::Initialized);
        assert_eq!(ENV.leases(), 0);
    }

    #[test]
    fn test_unsupported_platform() {
        static ENV: RuntimeEnvironment = RuntimeEnvironment::for_platform("plan9", "mips");

        let err = ENV.acquire().unwrap_err();
        assert!(matches!(err, InferenceError::UnsupportedPlatform { .. }));
        assert_eq!(ENV.phase(), EnvironmentPhase::Uninitialized);
        assert_eq!(ENV.leases(), 0);
    }

    #[test]
    fn test_concurrent_acquire() {
        static ENV: RuntimeEnvironment = RuntimeEnvironment::new();

        let workers: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| ENV.acquire().unwrap()))
            .collect();
        let leases: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        assert_eq!(ENV.leases(), 8);
        drop(leases);
        assert_eq!(ENV.phase(), EnvironmentPhase::Destroyed);
    }
}
