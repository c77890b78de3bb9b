//! Adapter between user handlers and the engine's control-code protocol.
//!
//! The engine expects every callback to answer with an integer:
//!
//! | code | meaning                                   |
//! |------|-------------------------------------------|
//! | `0`  | continue parsing                          |
//! | `1`  | stop gracefully (no error recorded)       |
//! | `-1` | abort; the instance carries the reason    |
//!
//! Handlers never see those integers. They return an [`Outcome`] and the
//! adapter translates it, catching panics on the way so that nothing a
//! handler does can unwind into the engine.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::error::Error;
use crate::event::{EventKind, Shape};
use crate::instance::Instance;

/// Control code: keep going.
pub const CONTINUE: i32 = 0;
/// Control code: stop without error.
pub const STOP: i32 = 1;
/// Control code: abort with an error on the instance.
pub const ABORT: i32 = -1;

// ---------------------------------------------------------------------------
// Halt / Outcome
// ---------------------------------------------------------------------------

/// Early exit requested by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// Stop gracefully. From `headers_complete` this means "no body".
    Stop,
    /// Abort the parse. `None` records a plain `Callback` error.
    Abort(Option<Error>),
}

/// What a handler returns: `Ok(())` to continue, `Err(Halt)` to exit early.
pub type Outcome = Result<(), Halt>;

/// Any error bubbled out of a handler with `?` aborts the parse.
impl<E: std::error::Error> From<E> for Halt {
    fn from(err: E) -> Self {
        Halt::Abort(Some(
            Error::new(crate::ErrorKind::Callback).with_detail(err.to_string()),
        ))
    }
}

// ---------------------------------------------------------------------------
// Callback
// ---------------------------------------------------------------------------

type SignalFn<'a> = dyn Fn(&mut Instance) -> Outcome + 'a;
type DataFn<'a> = dyn Fn(&mut Instance, &[u8]) -> Outcome + 'a;

/// A handler wrapped for the engine.
pub enum Callback<'a> {
    Signal(Box<SignalFn<'a>>),
    Data(Box<DataFn<'a>>),
}

impl<'a> Callback<'a> {
    /// Wrap a handler for a payload-less event.
    pub fn signal<F>(handler: F) -> Self
    where
        F: Fn(&mut Instance) -> Outcome + 'a,
    {
        Self::Signal(Box::new(handler))
    }

    /// Wrap a handler for an event carrying bytes.
    pub fn data<F>(handler: F) -> Self
    where
        F: Fn(&mut Instance, &[u8]) -> Outcome + 'a,
    {
        Self::Data(Box::new(handler))
    }

    /// Signal or data, by how the handler was wrapped.
    pub fn shape(&self) -> Shape {
        match self {
            Self::Signal(_) => Shape::Signal,
            Self::Data(_) => Shape::Data,
        }
    }

    /// Run the handler for a signal event and produce a control code.
    pub fn call_signal(&self, event: EventKind, inst: &mut Instance) -> i32 {
        match self {
            Self::Signal(handler) => guard(event, inst, |inst| handler(inst)),
            Self::Data(_) => CONTINUE,
        }
    }

    /// Run the handler for a data event and produce a control code.
    ///
    /// `data` is one fragment; a value split across input chunks arrives as
    /// several calls.
    pub fn call_data(&self, event: EventKind, inst: &mut Instance, data: &[u8]) -> i32 {
        match self {
            Self::Data(handler) => guard(event, inst, |inst| handler(inst, data)),
            Self::Signal(_) => CONTINUE,
        }
    }
}

impl fmt::Debug for Callback<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").field(&self.shape()).finish()
    }
}

/// Invoke `run`, catch anything it throws, and fold the result into a code.
fn guard<F>(event: EventKind, inst: &mut Instance, run: F) -> i32
where
    F: FnOnce(&mut Instance) -> Outcome,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(&mut *inst)));

    match outcome {
        Ok(Ok(())) => CONTINUE,
        Ok(Err(Halt::Stop)) => STOP,
        Ok(Err(Halt::Abort(reason))) => {
            let error = match reason {
                Some(error) if error.event().is_none() && error.is_callback() => {
                    error.with_event(event)
                }
                Some(error) => error,
                None => Error::callback(event),
            };
            tracing::debug!(event = event.as_str(), %error, "handler aborted");
            inst.record_error(error);
            ABORT
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::debug!(event = event.as_str(), panic = message.as_str(), "handler panicked");
            inst.record_error(Error::callback(event).with_detail(message));
            ABORT
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn normal_return_continues() {
        let mut inst = Instance::new();
        let cb = Callback::signal(|_| Ok(()));
        assert_eq!(cb.call_signal(EventKind::MessageBegin, &mut inst), CONTINUE);
        assert!(!inst.has_error());
    }

    #[test]
    fn stop_maps_to_one_without_error() {
        let mut inst = Instance::new();
        let cb = Callback::signal(|inst| inst.stop());
        assert_eq!(cb.call_signal(EventKind::HeadersComplete, &mut inst), STOP);
        assert!(!inst.has_error());
    }

    #[test]
    fn abort_records_callback_error() {
        let mut inst = Instance::new();
        let cb = Callback::data(|inst, _| inst.abort());
        assert_eq!(cb.call_data(EventKind::Url, &mut inst, b"/"), ABORT);
        let error = inst.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::Callback);
        assert_eq!(error.event(), Some(EventKind::Url));
    }

    #[test]
    fn specific_abort_reason_wins() {
        let mut inst = Instance::new();
        let cb = Callback::data(|inst, _| inst.abort_with(ErrorKind::InvalidUrl.into()));
        assert_eq!(cb.call_data(EventKind::Url, &mut inst, b"x"), ABORT);
        assert_eq!(inst.error().unwrap().kind(), ErrorKind::InvalidUrl);
    }

    #[test]
    fn panic_is_contained() {
        let mut inst = Instance::new();
        let cb = Callback::data(|_, _| panic!("unhandled"));
        assert_eq!(cb.call_data(EventKind::Url, &mut inst, b"/"), ABORT);
        let error = inst.error().unwrap();
        assert!(error.is_callback());
        assert_eq!(error.detail(), Some("unhandled"));
    }

    #[test]
    fn question_mark_errors_abort() {
        let mut inst = Instance::new();
        let cb = Callback::data(|_, data| {
            let text = std::str::from_utf8(data)?;
            let _: u32 = text.parse()?;
            Ok(())
        });
        assert_eq!(cb.call_data(EventKind::Body, &mut inst, b"12"), CONTINUE);
        assert_eq!(cb.call_data(EventKind::Body, &mut inst, b"twelve"), ABORT);
        let error = inst.error().unwrap();
        assert_eq!(error.event(), Some(EventKind::Body));
        assert!(error.detail().is_some());
    }

    #[test]
    fn shape_mismatched_call_is_a_no_op() {
        let mut inst = Instance::new();
        let cb = Callback::signal(|inst| inst.abort());
        assert_eq!(cb.call_data(EventKind::Url, &mut inst, b"/"), CONTINUE);
        assert!(!inst.has_error());
    }
}
