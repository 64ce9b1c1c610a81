#![allow(clippy::wrong_self_convention)]

mod core;
mod frame;
mod iter;
mod stack;

use std::fmt;
use std::io;

use crate::render::core::Interpreter;
use crate::render::frame::Frame;
use crate::write::{AutoIndentWriter, IoWriter, NoIndentWriter, TemplateWriter};
use crate::{Error, Instance, Result};

/// A renderer that interprets a template [`Instance`].
///
/// This struct is created by [`Instance::render`]. Rendering itself never
/// fails: problems are reported to the group's
/// [`ErrorListener`][crate::ErrorListener] and rendering carries on.
#[must_use = "must call `.to_string()` or `.to_writer(..)` on the renderer"]
pub struct Renderer<'render> {
    instance: &'render Instance,
    line_width: Option<usize>,
    locale: String,
    newline: String,
    max_depth: Option<usize>,
    indent: bool,
}

/// An interval of output produced while rendering.
///
/// Returned by [`Renderer::to_string_with_events`]. Positions are character
/// indexes into the rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderEvent {
    pub kind: EventKind,
    /// The name of the template that produced the output.
    pub template: String,
    pub start: usize,
    pub stop: usize,
}

/// What produced a [`RenderEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A whole template invocation.
    Template,
    /// A single expression write.
    Expr,
}

/// A condition that abandons the current template, such as a corrupt program
/// or misuse of the writer's indentation stack.
#[derive(Debug)]
pub(crate) struct Fault(String);

impl Fault {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'render> Renderer<'render> {
    pub(crate) fn new(instance: &'render Instance) -> Self {
        Self {
            instance,
            line_width: None,
            locale: String::from("en"),
            newline: String::from("\n"),
            max_depth: None,
            indent: true,
        }
    }

    /// Wrap lines at this width where the template sets a `wrap` option.
    ///
    /// By default lines are never wrapped.
    pub fn with_line_width(mut self, width: usize) -> Self {
        self.line_width = Some(width);
        self
    }

    /// Set the locale handed to attribute renderers.
    ///
    /// Defaults to `en`.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Set the text written for each newline.
    ///
    /// Defaults to `\n`.
    pub fn with_newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }

    /// Set the maximum depth of nested template invocations.
    ///
    /// Defaults to the group setting.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Whether to apply indentation, anchors and wrapping.
    ///
    /// When disabled the output is written verbatim. Defaults to `true`.
    pub fn with_indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Render the template to a string.
    #[allow(clippy::inherent_to_string)]
    pub fn to_string(self) -> String {
        let mut s = String::new();
        self.render(&mut s, None);
        s
    }

    /// Render the template to a string, also returning the output interval
    /// of every template invocation and expression.
    ///
    /// Template events are recorded when the template finishes, so an
    /// enclosing template follows the templates it invoked.
    pub fn to_string_with_events(self) -> (String, Vec<RenderEvent>) {
        let mut s = String::new();
        let events = self.render(&mut s, Some(Vec::new()));
        (s, events.unwrap_or_default())
    }

    /// Render the template to the given writer.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if writing failed. The error is also reported to
    /// the error listener when it happens.
    pub fn to_writer<W>(self, w: W) -> Result<()>
    where
        W: io::Write,
    {
        let mut w = IoWriter::new(w);
        self.render(&mut w, None);
        match w.take_err() {
            Some(err) => Err(Error::from(err)),
            None => Ok(()),
        }
    }

    fn render<W>(&self, out: W, events: Option<Vec<RenderEvent>>) -> Option<Vec<RenderEvent>>
    where
        W: fmt::Write,
    {
        let group = self.instance.group();
        let mut interp = Interpreter {
            listener: group.listener(),
            locale: &self.locale,
            max_depth: self.max_depth.unwrap_or_else(|| group.max_depth()),
            events,
        };
        let mut frame = Frame::root(self.instance.clone());
        if self.indent {
            let mut out = AutoIndentWriter::with_newline(out, &self.newline);
            out.set_line_width(self.line_width);
            interp.exec(&mut out, &mut frame);
        } else {
            let mut out = NoIndentWriter::new(out);
            interp.exec(&mut out, &mut frame);
        }
        interp.events
    }
}
