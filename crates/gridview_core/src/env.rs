//! Process-global environment mutation helpers.
//!
//! Configuration is read from the process environment, so tests that set
//! variables must hold [`env_lock`] and restore what they touched.

use std::sync::{Mutex, OnceLock};

/// Return the process-wide lock serializing environment mutation in tests.
pub fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

#[allow(unused_unsafe)]
fn write_var(key: &str, value: Option<&str>) {
    // SAFETY: callers hold `env_lock` while tests may run in parallel.
    unsafe {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

/// A batch of environment overrides restored in reverse order on drop.
pub struct EnvOverride {
    saved: Vec<(String, Option<String>)>,
}

impl EnvOverride {
    /// Apply `vars`, where `None` removes the variable.
    ///
    /// # Returns
    /// Guard restoring every touched variable to its previous value.
    pub fn apply(vars: &[(&str, Option<&str>)]) -> Self {
        let mut saved = Vec::with_capacity(vars.len());
        for (key, value) in vars {
            saved.push((key.to_string(), std::env::var(key).ok()));
            write_var(key, *value);
        }
        Self { saved }
    }

    /// Shorthand for a single `key=value` override.
    pub fn set(key: &str, value: &str) -> Self {
        Self::apply(&[(key, Some(value))])
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..).rev() {
            write_var(&key, previous.as_deref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{env_lock, EnvOverride};

    #[test]
    fn override_restores_previous_and_missing_values() {
        let _lock = env_lock().lock().expect("env lock");
        let present = "GRIDVIEW_TEST_ENV_PRESENT";
        let missing = "GRIDVIEW_TEST_ENV_MISSING";
        let _baseline = EnvOverride::apply(&[(present, Some("before")), (missing, None)]);
        {
            let _inner = EnvOverride::apply(&[(present, Some("after")), (missing, Some("x"))]);
            assert_eq!(std::env::var(present).ok().as_deref(), Some("after"));
            assert_eq!(std::env::var(missing).ok().as_deref(), Some("x"));
        }
        assert_eq!(std::env::var(present).ok().as_deref(), Some("before"));
        assert!(std::env::var(missing).is_err());
    }
}
