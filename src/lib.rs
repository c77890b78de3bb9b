//! # hookwire
//!
//! A **callback-dispatch layer over an incremental HTTP/1.x parser**.
//!
//! Register handlers for the eight parse events on a [`Parser`], create an
//! [`Instance`] per connection, and feed it bytes in whatever pieces they
//! arrive. Handlers answer each event with an [`Outcome`]: continue, stop
//! gracefully, or abort with an error. Panics and `?`-propagated errors in a
//! handler are contained and recorded on the instance; nothing unwinds out
//! of [`Parser::parse`].
//!
//! ## Quick start: closures
//!
//! ```rust
//! use std::cell::RefCell;
//! use hookwire::{Instance, Parser};
//!
//! let headers = RefCell::new(Vec::new());
//! let mut parser = Parser::new();
//! parser
//!     .on_header_field(|_, name| {
//!         headers.borrow_mut().push(String::from_utf8_lossy(name).into_owned());
//!         Ok(())
//!     })
//!     .on_headers_complete(|inst| {
//!         assert_eq!(inst.http_version(), "1.1");
//!         Ok(())
//!     });
//!
//! let mut inst = Instance::new();
//! assert!(parser.parse(&mut inst, b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n"));
//! assert_eq!(*headers.borrow(), ["Host"]);
//! ```
//!
//! ## Quick start: a handler object
//!
//! ```rust
//! use std::cell::Cell;
//! use hookwire::{Handler, Instance, MessageType, Outcome, Parser};
//!
//! #[derive(Default)]
//! struct Status(Cell<u16>);
//!
//! impl Handler for Status {
//!     fn on_headers_complete(&self, inst: &mut Instance) -> Outcome {
//!         self.0.set(inst.http_status());
//!         inst.stop() // no body wanted
//!     }
//! }
//!
//! let status = Status::default();
//! let parser = Parser::with_handler(&status);
//! let mut inst = Instance::with_type(MessageType::Response);
//! assert!(parser.parse(&mut inst, b"HTTP/1.1 404 Not Found\r\nContent-Length: 3\r\n\r\n"));
//! assert_eq!(status.0.get(), 404);
//! ```

mod callback;
mod engine;
mod error;
mod event;
mod instance;
mod output;
mod parser;
mod settings;
mod types;

// Re-export public API.
pub use callback::{ABORT, CONTINUE, Callback, Halt, Outcome, STOP};
pub use engine::{Engine, EngineConfig, HeaderState, Http1Engine, State};
pub use error::{Errno, Error, ErrorKind};
pub use event::{EventKind, Shape};
pub use instance::{Instance, RawInstance, flags};
pub use output::{
    Entry, MessageSummary, Recorder, Report, format_debug, format_events, format_json, record,
};
pub use parser::{Handler, Parser};
pub use settings::{Settings, ShapeMismatch};
pub use types::{HttpMethod, MessageType};
