//! # Request kinds.
//!
//! Every request type is exactly one of:
//! - a [`Request`] with a declared [`Request::Response`], answered by one handler;
//! - a [`Command`], fire-and-forget: its handler answers with [`Ignore`].
//!
//! Commands get their `Request` impl from a blanket implementation, so a type
//! cannot be both.

/// A request answered by exactly one handler with a `Response`.
///
/// # Example
/// ```
/// use switchboard::Request;
///
/// struct GetName(u32);
///
/// impl Request for GetName {
///     type Response = String;
/// }
/// ```
pub trait Request: Send + 'static {
    /// Value produced by the handler.
    type Response: Send + 'static;
}

/// A request without a response.
///
/// # Example
/// ```
/// use switchboard::Command;
///
/// struct Refresh;
///
/// impl Command for Refresh {}
/// ```
pub trait Command: Send + 'static {}

impl<C: Command> Request for C {
    type Response = Ignore;
}

/// Response of a [`Command`] handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Ignore;
