//! Reporting of problems found while rendering.
//!
//! Rendering never fails. Missing attributes, bad arguments and other
//! template defects are reported to the group's [`ErrorListener`] as a
//! [`RenderMessage`] and rendering continues with a safe default. The default
//! listener, [`LogListener`], forwards messages to [`tracing`].

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::fmt_pretty;
use crate::types::span::Span;

/// The kind of a [`RenderMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoSuchTemplate,
    NoImportedTemplate,
    NoSuchAttribute,
    NoSuchAttributePassThrough,
    NoSuchProperty,
    ArgumentCountMismatch,
    MapArgumentCountMismatch,
    MissingFormalArguments,
    InvalidOptionValue,
    TypeMismatch,
    StackOverflow,
    InternalError,
    IoError,
}

/// A problem found while rendering.
#[derive(Clone)]
pub struct RenderMessage {
    kind: ErrorKind,
    args: Vec<String>,
    call_stack: Vec<String>,
    ip: Option<usize>,
    location: Option<(String, Span)>,
}

/// Receives the problems found while rendering.
///
/// Implementations must not panic; the interpreter carries on after every
/// call.
pub trait ErrorListener: Send + Sync {
    /// A recoverable template defect, such as a missing attribute.
    fn runtime_error(&self, msg: &RenderMessage);

    /// The output sink failed.
    fn io_error(&self, msg: &RenderMessage);

    /// The template program is corrupt or the interpreter hit an invariant
    /// violation. The current template was abandoned.
    fn internal_error(&self, msg: &RenderMessage);
}

/// The default listener, which logs messages using [`tracing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

/// A listener that collects messages, useful for testing.
#[derive(Debug, Clone, Default)]
pub struct ErrorBuffer {
    messages: Arc<Mutex<Vec<RenderMessage>>>,
}

impl ErrorKind {
    fn template(self) -> &'static str {
        match self {
            ErrorKind::NoSuchTemplate => "no such template: {}",
            ErrorKind::NoImportedTemplate => "no such template: super.{}",
            ErrorKind::NoSuchAttribute => "attribute {} isn't defined",
            ErrorKind::NoSuchAttributePassThrough => {
                "could not pass through undefined attribute {}"
            }
            ErrorKind::NoSuchProperty => "no such property or can't access: {}",
            ErrorKind::ArgumentCountMismatch => {
                "passed {} arg(s) to template {} with {} declared arg(s)"
            }
            ErrorKind::MapArgumentCountMismatch => {
                "iterating through {} values in zip map but template has {} declared arguments"
            }
            ErrorKind::MissingFormalArguments => "missing argument definitions",
            ErrorKind::InvalidOptionValue => "invalid option value: {}",
            ErrorKind::TypeMismatch => "function {} expects a string not {}",
            ErrorKind::StackOverflow => "template recursion depth exceeded {} levels",
            ErrorKind::InternalError => "internal error: {}",
            ErrorKind::IoError => "error writing output: {}",
        }
    }
}

impl RenderMessage {
    pub(crate) fn new(kind: ErrorKind, args: Vec<String>) -> Self {
        Self {
            kind,
            args,
            call_stack: Vec::new(),
            ip: None,
            location: None,
        }
    }

    pub(crate) fn with_call_stack(mut self, call_stack: Vec<String>, ip: usize) -> Self {
        self.call_stack = call_stack;
        self.ip = Some(ip);
        self
    }

    pub(crate) fn with_location(mut self, source: &str, span: Span) -> Self {
        self.location = Some((source.to_owned(), span));
        self
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The formatted arguments of the message, such as the attribute name.
    #[inline]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The names of the templates being rendered, outermost first.
    #[inline]
    pub fn call_stack(&self) -> &[String] {
        &self.call_stack
    }

    /// The index of the instruction that produced this message.
    #[inline]
    pub fn ip(&self) -> Option<usize> {
        self.ip
    }

    /// The one-based line and zero-based column in the template source.
    pub fn line_col(&self) -> Option<(usize, usize)> {
        self.location.as_ref().map(|(source, span)| {
            let (line, col) = span.line_col(source);
            (line + 1, col)
        })
    }

    /// The message without any context.
    pub fn message(&self) -> String {
        let mut args = self.args.iter();
        let mut buf = String::new();
        let mut parts = self.kind.template().split("{}").peekable();
        while let Some(part) = parts.next() {
            buf.push_str(part);
            if parts.peek().is_some() {
                buf.push_str(args.next().map_or("", String::as_str));
            }
        }
        buf
    }
}

impl fmt::Display for RenderMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.call_stack.is_empty() {
            write!(f, "context [{}] ", self.call_stack.join(" "))?;
        }
        if let Some((line, col)) = self.line_col() {
            write!(f, "{line}:{col} ")?;
        }
        f.write_str(&self.message())?;
        if f.alternate() {
            if let Some((source, span)) = &self.location {
                fmt_pretty("", source, *span, f)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for RenderMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderMessage")
            .field("kind", &self.kind)
            .field("message", &self.to_string())
            .finish()
    }
}

impl ErrorListener for LogListener {
    fn runtime_error(&self, msg: &RenderMessage) {
        tracing::warn!(kind = ?msg.kind(), "{msg}");
    }

    fn io_error(&self, msg: &RenderMessage) {
        tracing::error!(kind = ?msg.kind(), "{msg}");
    }

    fn internal_error(&self, msg: &RenderMessage) {
        tracing::error!(kind = ?msg.kind(), "{msg}");
    }
}

impl ErrorBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the collected messages.
    pub fn messages(&self) -> Vec<RenderMessage> {
        self.lock().clone()
    }

    /// Returns the collected messages formatted with [`Display`][fmt::Display].
    pub fn to_strings(&self) -> Vec<String> {
        self.lock().iter().map(ToString::to_string).collect()
    }

    /// Returns the kinds of the collected messages.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.lock().iter().map(RenderMessage::kind).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn push(&self, msg: &RenderMessage) {
        self.lock().push(msg.clone());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RenderMessage>> {
        // a panic while holding the lock leaves the vector intact
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ErrorListener for ErrorBuffer {
    fn runtime_error(&self, msg: &RenderMessage) {
        self.push(msg)
    }

    fn io_error(&self, msg: &RenderMessage) {
        self.push(msg)
    }

    fn internal_error(&self, msg: &RenderMessage) {
        self.push(msg)
    }
}
