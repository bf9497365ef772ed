//! Hooks the embedding application provides to the transport layer.
//!
//! The transport only needs two things from its host: a way to force the user
//! back to the login screen when a session cannot be recovered, and a way to
//! tell the user why. Both are late-bindable - on mobile the navigation stack
//! is not available until the UI has mounted, so the transport must tolerate
//! an unset handle and simply skip the step.

/// Route name the navigation handle is reset to on unrecoverable auth failure.
pub const LOGIN_ROUTE: &str = "Login";

/// Resettable navigation reference.
///
/// Implemented by the host UI; `reset_to` must replace the whole navigation
/// stack with the named route as its sole entry.
pub trait NavigationHandle: Send + Sync {
    fn reset_to(&self, route: &str);
}

/// User-facing notification sink (toast/alert style).
///
/// Fire-and-forget: the transport never consumes a return value.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str);
}
