use std::fmt;

use crate::callback::{CONTINUE, Callback};
use crate::event::{EventKind, Shape};
use crate::instance::Instance;

/// Returned when a callback's shape does not fit the event it is registered
/// for (a data handler for `message_begin`, a signal handler for `url`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub event: EventKind,
    pub expected: Shape,
    pub found: Shape,
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} expects a {} handler, got a {} handler",
            self.event.callback_name(),
            self.expected,
            self.found
        )
    }
}

impl std::error::Error for ShapeMismatch {}

/// Table of optional callbacks, one slot per [`EventKind`].
///
/// Events without a registered callback are treated as "continue".
#[derive(Debug, Default)]
pub struct Settings<'a> {
    slots: [Option<Callback<'a>>; EventKind::COUNT],
}

impl<'a> Settings<'a> {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `callback` under `event`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeMismatch`] if the callback's shape differs from the
    /// event's; the table is left unchanged.
    pub fn register(&mut self, event: EventKind, callback: Callback<'a>) -> Result<(), ShapeMismatch> {
        if callback.shape() != event.shape() {
            return Err(ShapeMismatch {
                event,
                expected: event.shape(),
                found: callback.shape(),
            });
        }
        self.slots[event.index()] = Some(callback);
        Ok(())
    }

    /// The callback registered for `event`, if any.
    pub fn lookup(&self, event: EventKind) -> Option<&Callback<'a>> {
        self.slots[event.index()].as_ref()
    }

    /// Whether `event` has a callback.
    pub fn is_registered(&self, event: EventKind) -> bool {
        self.slots[event.index()].is_some()
    }

    /// Remove the callback for `event`, returning it.
    pub fn clear(&mut self, event: EventKind) -> Option<Callback<'a>> {
        self.slots[event.index()].take()
    }

    /// Dispatch a signal event; `0` when nothing is registered.
    pub fn signal(&self, event: EventKind, inst: &mut Instance) -> i32 {
        match self.lookup(event) {
            Some(callback) => {
                tracing::trace!(event = event.as_str(), "dispatch");
                callback.call_signal(event, inst)
            }
            None => CONTINUE,
        }
    }

    /// Dispatch a data event; `0` when nothing is registered.
    pub fn data(&self, event: EventKind, inst: &mut Instance, bytes: &[u8]) -> i32 {
        match self.lookup(event) {
            Some(callback) => {
                tracing::trace!(event = event.as_str(), len = bytes.len(), "dispatch");
                callback.call_data(event, inst, bytes)
            }
            None => CONTINUE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::STOP;
    use std::cell::Cell;

    #[test]
    fn unregistered_events_continue() {
        let settings = Settings::new();
        let mut inst = Instance::new();
        for event in EventKind::ALL {
            assert!(!settings.is_registered(event));
        }
        assert_eq!(settings.signal(EventKind::MessageBegin, &mut inst), CONTINUE);
        assert_eq!(settings.data(EventKind::Url, &mut inst, b"/"), CONTINUE);
    }

    #[test]
    fn registration_overwrites() {
        let calls = Cell::new(0);
        let mut settings = Settings::new();
        settings
            .register(EventKind::MessageBegin, Callback::signal(|_| Ok(())))
            .unwrap();
        settings
            .register(
                EventKind::MessageBegin,
                Callback::signal(|inst| {
                    calls.set(calls.get() + 1);
                    inst.stop()
                }),
            )
            .unwrap();

        let mut inst = Instance::new();
        assert_eq!(settings.signal(EventKind::MessageBegin, &mut inst), STOP);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn shape_mismatch_fails_fast() {
        let mut settings = Settings::new();
        let err = settings
            .register(EventKind::Url, Callback::signal(|_| Ok(())))
            .unwrap_err();
        assert_eq!(err.expected, Shape::Data);
        assert_eq!(err.found, Shape::Signal);
        assert!(!settings.is_registered(EventKind::Url));
        assert_eq!(err.to_string(), "on_url expects a data handler, got a signal handler");

        assert!(
            settings
                .register(EventKind::HeadersComplete, Callback::data(|_, _| Ok(())))
                .is_err()
        );
    }

    #[test]
    fn clear_removes_the_slot() {
        let mut settings = Settings::new();
        settings
            .register(EventKind::Body, Callback::data(|_, _| Ok(())))
            .unwrap();
        assert!(settings.clear(EventKind::Body).is_some());
        assert!(settings.lookup(EventKind::Body).is_none());
    }
}
