//! # Request bus configuration.
//!
//! Provides [`Config`] centralized defaults for the [`RequestBus`](crate::RequestBus).
//!
//! Config is used in two ways:
//! 1. **Bus creation**: `RequestBus::with_config(config)`
//! 2. **Per-call defaults**: `RequestBus::options()` seeds a [`RequestOptions`](crate::RequestOptions)
//!
//! ## Sentinel values
//! - `timeout = 0s` → no timeout (treated as `None` by [`Config::default_timeout`])

use std::time::Duration;

/// Default settings applied to requests that do not override them.
///
/// ## Field semantics
/// - `timeout`: Default per-request timeout (`0s` = wait until the handler completes)
/// - `accept_null`: Whether a null handler result is accepted by default
#[derive(Clone, Debug)]
pub struct Config {
    /// Default request timeout.
    ///
    /// - `Duration::ZERO` = no timeout
    /// - `> 0` = the handler is raced against a timer of this duration
    pub timeout: Duration,

    /// Default null acceptance for [`RequestBus::request_with`](crate::RequestBus::request_with).
    ///
    /// [`RequestBus::request`](crate::RequestBus::request) always rejects null.
    pub accept_null: bool,
}

impl Config {
    /// Returns the default request timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → timeout applied per request
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `timeout = 0s` (no timeout)
    /// - `accept_null = false`
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            accept_null: false,
        }
    }
}
