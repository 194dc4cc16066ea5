#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! [`EngineConfig`] is plain data with builder-style setters. It can also be
//! read from the environment:
//!
//! | Variable                  | Field                | Default |
//! |---------------------------|----------------------|---------|
//! | `RVM_MAX_REENTRANT_RUNS`  | `max_reentrant_runs` | 32      |
//! | `RVM_CATCH_PANICS`        | `catch_panics`       | true    |

use crate::error::{ReactiveError, Result};

pub const ENV_MAX_REENTRANT_RUNS: &str = "RVM_MAX_REENTRANT_RUNS";
pub const ENV_CATCH_PANICS: &str = "RVM_CATCH_PANICS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How many times one `update()` may re-run a consumer that was notified
    /// again while it was already running. Exceeding it fails the update with
    /// [`ReactiveError::ReentrancyLimit`].
    pub max_reentrant_runs: u32,
    /// Convert a panicking callback into a contained
    /// [`ReactiveError::CallbackPanicked`] instead of unwinding through the
    /// write that triggered it.
    pub catch_panics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_reentrant_runs: 32,
            catch_panics: true,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_max_reentrant_runs(mut self, runs: u32) -> Self {
        self.max_reentrant_runs = runs.max(1);
        self
    }

    #[must_use]
    pub fn with_catch_panics(mut self, catch: bool) -> Self {
        self.catch_panics = catch;
        self
    }

    /// Defaults overridden by any `RVM_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but with an injectable lookup, so
    /// tests do not have to mutate the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_REENTRANT_RUNS) {
            let runs: u32 = raw.trim().parse().map_err(|_| ReactiveError::Config {
                message: format!("{ENV_MAX_REENTRANT_RUNS}={raw:?} is not a positive integer"),
            })?;
            if runs == 0 {
                return Err(ReactiveError::Config {
                    message: format!("{ENV_MAX_REENTRANT_RUNS} must be at least 1"),
                });
            }
            config.max_reentrant_runs = runs;
        }

        if let Some(raw) = lookup(ENV_CATCH_PANICS) {
            config.catch_panics = parse_bool(&raw).ok_or_else(|| ReactiveError::Config {
                message: format!("{ENV_CATCH_PANICS}={raw:?} is not a boolean"),
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_reentrant_runs, 32);
        assert!(config.catch_panics);
    }

    #[test]
    fn env_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_MAX_REENTRANT_RUNS, " 4 "),
            (ENV_CATCH_PANICS, "off"),
        ]))
        .unwrap();
        assert_eq!(config.max_reentrant_runs, 4);
        assert!(!config.catch_panics);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[(ENV_MAX_REENTRANT_RUNS, "lots")])),
            Err(ReactiveError::Config { .. })
        ));
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[(ENV_MAX_REENTRANT_RUNS, "0")])),
            Err(ReactiveError::Config { .. })
        ));
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[(ENV_CATCH_PANICS, "maybe")])),
            Err(ReactiveError::Config { .. })
        ));
    }

    #[test]
    fn builder_clamps_runs() {
        let config = EngineConfig::default().with_max_reentrant_runs(0);
        assert_eq!(config.max_reentrant_runs, 1);
    }
}
