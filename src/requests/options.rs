//! # Per-call request options.
//!
//! [`RequestOptions`] overrides the bus [`Config`](crate::Config) for one call.
//! Start from [`RequestBus::options`](crate::RequestBus::options) to inherit the
//! configured defaults, or from [`RequestOptions::new`] for plain defaults.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Timeout, null acceptance and cancellation of one request.
///
/// ## Field semantics
/// - `timeout`: `None` waits until the handler completes
/// - `accept_null`: whether a null handler result resolves the request
/// - `cancel`: caller-side cancellation; wins over the timeout
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub(crate) timeout: Option<Duration>,
    pub(crate) accept_null: bool,
    pub(crate) cancel: Option<CancellationToken>,
}

impl RequestOptions {
    /// No timeout, null rejected, no cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_config(cfg: &Config) -> Self {
        Self {
            timeout: cfg.default_timeout(),
            accept_null: cfg.accept_null,
            cancel: None,
        }
    }

    /// Races the handler against a timer of `timeout`.
    ///
    /// A zero timeout is rejected by the bus with
    /// [`RequestError::InvalidTimeout`](crate::RequestError::InvalidTimeout).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Removes any timeout.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Accepts a null handler result.
    pub fn accept_null(mut self, accept: bool) -> Self {
        self.accept_null = accept;
        self
    }

    /// Attaches a caller-side cancellation token.
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Configured timeout, if any.
    #[inline]
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_maps_zero_timeout_to_none() {
        let opts = RequestOptions::from_config(&Config::default());
        assert_eq!(opts.get_timeout(), None);
        assert!(!opts.accept_null);

        let cfg = Config {
            timeout: Duration::from_millis(50),
            accept_null: true,
        };
        let opts = RequestOptions::from_config(&cfg);
        assert_eq!(opts.get_timeout(), Some(Duration::from_millis(50)));
        assert!(opts.accept_null);
    }

    #[test]
    fn test_builder_overrides() {
        let opts = RequestOptions::new()
            .timeout(Duration::from_secs(1))
            .accept_null(true)
            .no_timeout();
        assert_eq!(opts.get_timeout(), None);
        assert!(opts.accept_null);
        assert!(opts.cancel.is_none());
    }
}
