//! Seams to the world outside the close-account screen.
//!
//! The flow only ever reads the session and fires actions; it never waits on them.

use std::rc::Rc;
use std::sync::Arc;

/// Read-only view of who is signed in. Queried on every submit, never cached.
pub trait SessionSource {
    /// Raw contact identifier (email, or phone login) of the signed-in user.
    fn identity(&self) -> Option<String>;
}

/// Outbound account-closure actions owned by another component.
pub trait ClosureActions {
    /// Fire-and-forget. Success and failure handling (session teardown, error
    /// reporting) belong to the implementor.
    fn close_account(&self, reason_for_leaving: &str);

    /// Drop any closure error left over from an earlier attempt.
    fn clear_closure_error(&self);
}

/// Header back control. Not part of the state machine.
pub trait Navigator {
    fn navigate_back(&self);
}

/// A fixed identity, handy when the caller already resolved the session.
impl SessionSource for Option<String> {
    fn identity(&self) -> Option<String> {
        self.clone()
    }
}

impl<T: SessionSource + ?Sized> SessionSource for Arc<T> {
    fn identity(&self) -> Option<String> {
        (**self).identity()
    }
}

impl<T: SessionSource + ?Sized> SessionSource for Rc<T> {
    fn identity(&self) -> Option<String> {
        (**self).identity()
    }
}

impl<T: ClosureActions + ?Sized> ClosureActions for Arc<T> {
    fn close_account(&self, reason_for_leaving: &str) {
        (**self).close_account(reason_for_leaving)
    }

    fn clear_closure_error(&self) {
        (**self).clear_closure_error()
    }
}

impl<T: ClosureActions + ?Sized> ClosureActions for Rc<T> {
    fn close_account(&self, reason_for_leaving: &str) {
        (**self).close_account(reason_for_leaving)
    }

    fn clear_closure_error(&self) {
        (**self).clear_closure_error()
    }
}

impl<T: Navigator + ?Sized> Navigator for Arc<T> {
    fn navigate_back(&self) {
        (**self).navigate_back()
    }
}
