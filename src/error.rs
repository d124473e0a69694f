//! Error types used by the event bus and the request bus.
//!
//! This module defines the failure taxonomy of the crate:
//!
//! - [`BusError`]: invalid subscribe/unsubscribe calls on the [`EventBus`](crate::EventBus).
//! - [`PublishError`]: one or more subscribers failed during a publish (aggregate).
//! - [`InvokeError`]: a compiled handler could not bind its target or arguments.
//! - [`RequestError`]: failures of a single [`RequestBus`](crate::RequestBus) call.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! Registration conflicts on the request bus are reported as `bool`, not as errors.

use std::any::Any;
use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by request handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by invalid subscribe/unsubscribe calls.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// No handler to subscribe, or neither owner nor handler to unsubscribe.
    #[error("nothing to subscribe or unsubscribe")]
    NoTarget,

    /// A handler bound to an owner type was given without an owner.
    #[error("handler {method} is bound to an owner but no owner was given")]
    MissingOwner {
        /// Type name of the handler method.
        method: &'static str,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use switchboard::BusError;
    ///
    /// assert_eq!(BusError::NoTarget.as_label(), "bus_no_target");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::NoTarget => "bus_no_target",
            BusError::MissingOwner { .. } => "bus_missing_owner",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::NoTarget => "nothing to (un)subscribe".to_string(),
            BusError::MissingOwner { method } => format!("missing owner for {method}"),
        }
    }
}

/// # Errors produced while invoking a compiled handler.
///
/// Matching runs before invocation, so argument errors only surface when a
/// handler was registered with a shape that cannot be bound.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// The owner was dropped between matching and invocation.
    #[error("handler target is no longer alive")]
    TargetGone,

    /// The target could not be cast to the owner type.
    #[error("handler target is not a {expected}")]
    Target {
        /// Expected owner type name.
        expected: &'static str,
    },

    /// Argument count differs from the handler's parameter count.
    #[error("expected {expected} argument(s), got {actual}")]
    Arity {
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },

    /// An argument could not be cast to the declared parameter type.
    #[error("argument {index}: expected {expected}, got {actual}")]
    Argument {
        /// Zero-based argument position.
        index: usize,
        /// Declared parameter type name.
        expected: &'static str,
        /// Runtime type name of the argument (`"null"` when absent).
        actual: &'static str,
    },
}

/// A single failed subscriber invocation inside a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Type name of the failed handler method.
    pub method: &'static str,
    /// Panic message or invocation error.
    pub reason: String,
}

/// # Aggregate failure of a publish call.
///
/// Every matching subscriber is invoked even if some fail; all failures of one
/// publish are collected here instead of reporting only the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} subscriber(s) failed during publish", .failures.len())]
pub struct PublishError {
    /// Failures in subscription order.
    pub failures: Vec<HandlerFailure>,
}

impl PublishError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        "publish_failed"
    }

    /// Returns a human-readable message listing every failure.
    pub fn as_message(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("{}: {}", f.method, f.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// # Errors produced by a request call.
///
/// Exactly one terminal outcome is reached per request: a response, or one of
/// these errors.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RequestError {
    /// No handler is registered for the request type.
    #[error("no handler registered for request type {request}")]
    NoHandler {
        /// Request type name.
        request: &'static str,
    },

    /// The handler panicked while accepting the request (before returning its future).
    #[error("handler for {request} failed while accepting the request: {reason}")]
    Rejected {
        /// Request type name.
        request: &'static str,
        /// Panic message.
        reason: String,
    },

    /// The handler completed with an error.
    #[error("handler for {request} failed: {source}")]
    Handler {
        /// Request type name.
        request: &'static str,
        /// Error returned by the handler.
        #[source]
        source: BoxError,
    },

    /// The handler panicked while running.
    #[error("handler for {request} panicked: {reason}")]
    Panicked {
        /// Request type name.
        request: &'static str,
        /// Panic message.
        reason: String,
    },

    /// The requested timeout elapsed before the handler completed.
    #[error("request of type {request} timed out after {timeout:?}")]
    Timeout {
        /// Request type name.
        request: &'static str,
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The caller's cancellation fired before the handler completed.
    #[error("request of type {request} was canceled")]
    Canceled {
        /// Request type name.
        request: &'static str,
    },

    /// The handler returned null (not accepted) or a value of the wrong type.
    #[error("handler for {request} returned {actual}, expected {expected}")]
    TypeMismatch {
        /// Request type name.
        request: &'static str,
        /// Declared response type name.
        expected: &'static str,
        /// Actual response type name (`"null"` when absent).
        actual: &'static str,
    },

    /// A zero timeout was requested.
    #[error("timeout must be greater than zero")]
    InvalidTimeout,
}

impl RequestError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use switchboard::RequestError;
    /// use std::time::Duration;
    ///
    /// let err = RequestError::Timeout { request: "Greet", timeout: Duration::from_millis(1) };
    /// assert_eq!(err.as_label(), "request_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RequestError::NoHandler { .. } => "request_no_handler",
            RequestError::Rejected { .. } => "request_rejected",
            RequestError::Handler { .. } => "request_handler_failed",
            RequestError::Panicked { .. } => "request_handler_panicked",
            RequestError::Timeout { .. } => "request_timeout",
            RequestError::Canceled { .. } => "request_canceled",
            RequestError::TypeMismatch { .. } => "request_type_mismatch",
            RequestError::InvalidTimeout => "request_invalid_timeout",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RequestError::NoHandler { request } => format!("no handler: {request}"),
            RequestError::Rejected { request, reason } => format!("rejected {request}: {reason}"),
            RequestError::Handler { request, source } => format!("error in {request}: {source}"),
            RequestError::Panicked { request, reason } => format!("panic in {request}: {reason}"),
            RequestError::Timeout { request, timeout } => format!("timeout: {request} after {timeout:?}"),
            RequestError::Canceled { request } => format!("canceled: {request}"),
            RequestError::TypeMismatch {
                request,
                expected,
                actual,
            } => format!("mismatch in {request}: expected={expected} actual={actual}"),
            RequestError::InvalidTimeout => "zero timeout".to_string(),
        }
    }

    /// Indicates whether the caller gave up waiting (timeout or cancellation)
    /// while the handler may still be running.
    pub fn is_abandoned(&self) -> bool {
        matches!(self, RequestError::Timeout { .. } | RequestError::Canceled { .. })
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_error_lists_all_failures() {
        let err = PublishError {
            failures: vec![
                HandlerFailure {
                    method: "a",
                    reason: "boom".into(),
                },
                HandlerFailure {
                    method: "b",
                    reason: "bang".into(),
                },
            ],
        };
        assert_eq!(err.to_string(), "2 subscriber(s) failed during publish");
        assert_eq!(err.as_message(), "a: boom; b: bang");
    }

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*s), "static");
        assert_eq!(panic_message(&*owned), "owned");
        assert_eq!(panic_message(&*other), "unknown panic");
    }

    #[test]
    fn test_abandoned_errors() {
        assert!(RequestError::Canceled { request: "x" }.is_abandoned());
        assert!(!RequestError::NoHandler { request: "x" }.is_abandoned());
    }
}
