use crate::callback::{Callback, Outcome};
use crate::engine::{Engine, Http1Engine};
use crate::error::Error;
use crate::event::EventKind;
use crate::instance::Instance;
use crate::settings::{Settings, ShapeMismatch};

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// An object answering some of the parser events by method.
///
/// Every method defaults to "continue", so implementors only write the ones
/// they care about. Methods take `&self`; keep mutable state in `Cell` or
/// `RefCell` fields.
#[allow(unused_variables)]
pub trait Handler {
    /// A new message starts.
    fn on_message_begin(&self, inst: &mut Instance) -> Outcome {
        Ok(())
    }

    /// A fragment of the request target.
    fn on_url(&self, inst: &mut Instance, data: &[u8]) -> Outcome {
        Ok(())
    }

    /// The status line of a response has been read.
    fn on_status_complete(&self, inst: &mut Instance) -> Outcome {
        Ok(())
    }

    /// A fragment of a header name.
    fn on_header_field(&self, inst: &mut Instance, data: &[u8]) -> Outcome {
        Ok(())
    }

    /// A fragment of a header value.
    fn on_header_value(&self, inst: &mut Instance, data: &[u8]) -> Outcome {
        Ok(())
    }

    /// The header section ended. [`Instance::stop`] here means "no body".
    fn on_headers_complete(&self, inst: &mut Instance) -> Outcome {
        Ok(())
    }

    /// A fragment of the (de-chunked) body.
    fn on_body(&self, inst: &mut Instance, data: &[u8]) -> Outcome {
        Ok(())
    }

    /// The message ended.
    fn on_message_complete(&self, inst: &mut Instance) -> Outcome {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Callback table plus the engine that drives it.
///
/// A parser holds no session state; every call takes the [`Instance`] to
/// work on.
///
/// ```rust
/// use std::cell::RefCell;
/// use hookwire::{Instance, Parser};
///
/// let url = RefCell::new(Vec::new());
/// let parser = Parser::build(|p| {
///     p.on_url(|_, data| {
///         url.borrow_mut().extend_from_slice(data);
///         Ok(())
///     });
/// });
///
/// let mut inst = Instance::new();
/// assert!(parser.parse(&mut inst, b"GET /fo"));
/// assert!(parser.parse(&mut inst, b"o?q=1 HTTP/1.1\r\n\r\n"));
/// assert_eq!(url.borrow().as_slice(), b"/foo?q=1");
/// ```
pub struct Parser<'a, E = Http1Engine> {
    settings: Settings<'a>,
    engine: E,
}

impl<'a> Parser<'a> {
    /// A parser with no callbacks and the default engine.
    pub fn new() -> Self {
        Self::with_engine(Http1Engine::new())
    }

    /// Create a parser and hand it to `configure` to register callbacks.
    pub fn build<F>(configure: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut parser = Self::new();
        configure(&mut parser);
        parser
    }

    /// A parser whose callbacks are the methods of `handler`.
    pub fn with_handler<H>(handler: &'a H) -> Self
    where
        H: Handler + ?Sized,
    {
        let mut parser = Self::new();
        parser.attach(handler);
        parser
    }

    /// A fresh session for use with any parser.
    pub fn new_instance() -> Instance {
        Instance::new()
    }
}

impl Default for Parser<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, E: Engine> Parser<'a, E> {
    /// A parser with no callbacks driving `engine`.
    pub fn with_engine(engine: E) -> Self {
        Self {
            settings: Settings::new(),
            engine,
        }
    }

    /// The callback table.
    pub fn settings(&self) -> &Settings<'a> {
        &self.settings
    }

    /// The engine this parser drives.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Register every method of `handler`, replacing existing callbacks.
    pub fn attach<H>(&mut self, handler: &'a H) -> &mut Self
    where
        H: Handler + ?Sized,
    {
        self.on_message_begin(move |inst| handler.on_message_begin(inst))
            .on_url(move |inst, data| handler.on_url(inst, data))
            .on_status_complete(move |inst| handler.on_status_complete(inst))
            .on_header_field(move |inst, data| handler.on_header_field(inst, data))
            .on_header_value(move |inst, data| handler.on_header_value(inst, data))
            .on_headers_complete(move |inst| handler.on_headers_complete(inst))
            .on_body(move |inst, data| handler.on_body(inst, data))
            .on_message_complete(move |inst| handler.on_message_complete(inst))
    }

    /// Register a callback for `event`.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeMismatch`] when a signal callback is given for a data
    /// event or the other way around.
    pub fn register(&mut self, event: EventKind, callback: Callback<'a>) -> Result<(), ShapeMismatch> {
        self.settings.register(event, callback)
    }

    /// Unregister the callback for `event`, returning it. The event is
    /// treated as "continue" afterwards.
    pub fn clear(&mut self, event: EventKind) -> Option<Callback<'a>> {
        self.settings.clear(event)
    }

    fn set_signal<F>(&mut self, event: EventKind, handler: F) -> &mut Self
    where
        F: Fn(&mut Instance) -> Outcome + 'a,
    {
        // Shapes agree by construction.
        let _ = self.settings.register(event, Callback::signal(handler));
        self
    }

    fn set_data<F>(&mut self, event: EventKind, handler: F) -> &mut Self
    where
        F: Fn(&mut Instance, &[u8]) -> Outcome + 'a,
    {
        let _ = self.settings.register(event, Callback::data(handler));
        self
    }

    /// Called when a message begins.
    pub fn on_message_begin<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Instance) -> Outcome + 'a,
    {
        self.set_signal(EventKind::MessageBegin, handler)
    }

    /// Called with each fragment of the request target.
    pub fn on_url<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Instance, &[u8]) -> Outcome + 'a,
    {
        self.set_data(EventKind::Url, handler)
    }

    /// Called when a response status line has been read.
    pub fn on_status_complete<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Instance) -> Outcome + 'a,
    {
        self.set_signal(EventKind::StatusComplete, handler)
    }

    /// Called with each fragment of a header name.
    pub fn on_header_field<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Instance, &[u8]) -> Outcome + 'a,
    {
        self.set_data(EventKind::HeaderField, handler)
    }

    /// Called with each fragment of a header value.
    pub fn on_header_value<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Instance, &[u8]) -> Outcome + 'a,
    {
        self.set_data(EventKind::HeaderValue, handler)
    }

    /// Called at the end of the header section. Stopping here skips the
    /// body of the current message.
    pub fn on_headers_complete<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Instance) -> Outcome + 'a,
    {
        self.set_signal(EventKind::HeadersComplete, handler)
    }

    /// Called with each fragment of the body. Chunked bodies arrive
    /// de-chunked.
    pub fn on_body<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Instance, &[u8]) -> Outcome + 'a,
    {
        self.set_data(EventKind::Body, handler)
    }

    /// Called when a message ends.
    pub fn on_message_complete<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Instance) -> Outcome + 'a,
    {
        self.set_signal(EventKind::MessageComplete, handler)
    }

    // ----- parsing --------------------------------------------------------

    /// Feed `data` to the engine and return how many bytes were consumed.
    ///
    /// Fewer bytes than offered are consumed when a callback stops the
    /// parse, when an upgraded message hands the rest of the stream to
    /// another protocol, or on error. Engine errors are classified into
    /// [`Instance::error`].
    pub fn execute(&self, inst: &mut Instance, data: &[u8]) -> usize {
        if let Some(error) = inst.error() {
            tracing::warn!(%error, "parse called on a failed instance; reset it first");
            return 0;
        }

        let consumed = self.engine.execute(inst, &self.settings, data);

        let raw = inst.raw();
        if let Some(error) = Error::from_errno(raw.errno) {
            let error = match &raw.error_detail {
                Some(detail) if error.detail().is_none() => error.with_detail(detail.clone()),
                _ => error,
            };
            tracing::debug!(%error, consumed, offered = data.len(), "parse failed");
            inst.record_error(error);
        }
        consumed
    }

    /// Parse the next chunk of a stream. Returns `true` if the instance is
    /// still error-free afterwards.
    pub fn parse(&self, inst: &mut Instance, data: &[u8]) -> bool {
        self.execute(inst, data);
        !inst.has_error()
    }

    /// Signal end of stream.
    ///
    /// Completes a response whose body runs until the connection closes;
    /// fails with [`InvalidEofState`](crate::ErrorKind::InvalidEofState)
    /// when the stream ends inside a message.
    pub fn finish(&self, inst: &mut Instance) -> bool {
        self.parse(inst, &[])
    }
}
