//! Resolved-at-call-time interface slots.
//!
//! A service declares a [`Slot`] field; the plugin owning the actual
//! implementation binds it during init, and any consumer invokes it
//! thereafter. This is manual virtual dispatch across plugin boundaries
//! without a shared base type: the UI plugin can call build-output
//! formatting that a different plugin contributed after the UI plugin was
//! compiled.

use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("interface slot is not bound")]
    Unbound,
    #[error("interface slot is already bound")]
    AlreadyBound,
}

type SlotFn<A, R> = Box<dyn Fn(A) -> R + Send + Sync>;

/// A named function-pointer field, bound once during initialization and
/// invoked directly thereafter.
pub struct Slot<A, R = ()> {
    inner: RwLock<Option<SlotFn<A, R>>>,
}

impl<A, R> Default for Slot<A, R> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }
}

impl<A, R> Slot<A, R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the implementation. One-shot: rebinding is rejected so a
    /// later-loaded plugin cannot hijack an already wired interface.
    pub fn bind<F>(&self, f: F) -> Result<(), SlotError>
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let mut inner = self.inner.write();
        if inner.is_some() {
            return Err(SlotError::AlreadyBound);
        }
        *inner = Some(Box::new(f));
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Forward a call to whichever implementation was registered; absence
    /// is reported, never a crash.
    pub fn invoke(&self, args: A) -> Result<R, SlotError> {
        let inner = self.inner.read();
        let f = inner.as_ref().ok_or(SlotError::Unbound)?;
        Ok(f(args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_slot_reports_absence() {
        let slot: Slot<i32, i32> = Slot::new();
        assert!(!slot.is_bound());
        assert_eq!(slot.invoke(1), Err(SlotError::Unbound));
    }

    #[test]
    fn bound_slot_forwards_calls() {
        let slot: Slot<(i32, i32), i32> = Slot::new();
        slot.bind(|(a, b)| a + b).unwrap();
        assert_eq!(slot.invoke((2, 3)), Ok(5));
    }

    #[test]
    fn rebinding_is_rejected() {
        let slot: Slot<(), &'static str> = Slot::new();
        slot.bind(|_| "first").unwrap();
        assert_eq!(slot.bind(|_| "second"), Err(SlotError::AlreadyBound));
        assert_eq!(slot.invoke(()), Ok("first"));
    }
}
