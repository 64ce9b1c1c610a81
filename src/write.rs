//! Output writers.
//!
//! The interpreter writes through a [`TemplateWriter`], which tracks the
//! absolute number of characters written and applies indentation, anchors
//! and line wrapping on the way to the underlying [`fmt::Write`] sink.

use std::fmt;
use std::io;

use crate::{Error, Result};

/// The sink the interpreter writes to.
///
/// All counts are in characters.
pub trait TemplateWriter {
    /// Write text, applying indentation at the start of each line.
    fn write(&mut self, s: &str) -> Result<usize>;

    /// Write text, first wrapping the line if it has reached the line width.
    fn write_wrapped(&mut self, s: &str, wrap: Option<&str>) -> Result<usize> {
        let n = self.write_wrap(wrap)?;
        Ok(n + self.write(s)?)
    }

    /// Write the wrap text if the current line has reached the line width.
    fn write_wrap(&mut self, wrap: Option<&str>) -> Result<usize>;

    /// Write a separator between the elements of a multi-valued attribute.
    fn write_separator(&mut self, s: &str) -> Result<usize> {
        self.write(s)
    }

    fn push_indentation(&mut self, indent: &str);

    /// Fails if no indentation was pushed.
    fn pop_indentation(&mut self) -> Result<String>;

    /// Record the current column as the alignment for wrapped lines.
    fn push_anchor_point(&mut self);

    /// Fails if no anchor was pushed.
    fn pop_anchor_point(&mut self) -> Result<usize>;

    /// Set the line width, `None` disables wrapping.
    fn set_line_width(&mut self, width: Option<usize>);

    /// The total number of characters written.
    fn index(&self) -> usize;

    /// Create a writer of the same kind that writes to `buf`.
    ///
    /// Used to render option values and eager defaults to text. The new writer
    /// does not wrap.
    fn fork<'b>(&self, buf: &'b mut String) -> Box<dyn TemplateWriter + 'b>;
}

/// A writer that indents every line by the current indentation and aligns
/// wrapped lines under the current anchor.
///
/// # Examples
///
/// ```
/// use stencil::{AutoIndentWriter, TemplateWriter};
///
/// let mut buf = String::new();
/// let mut w = AutoIndentWriter::new(&mut buf);
/// w.write("a\n")?;
/// w.push_indentation("  ");
/// w.write("b\nc")?;
/// drop(w);
/// assert_eq!(buf, "a\n  b\n  c");
/// # Ok::<(), stencil::Error>(())
/// ```
#[derive(Debug)]
pub struct AutoIndentWriter<W> {
    out: W,
    indents: Vec<String>,
    anchors: Vec<usize>,
    newline: String,
    line_width: Option<usize>,
    index: usize,
    column: usize,
    at_start_of_line: bool,
}

/// A writer that writes text verbatim, ignoring indentation and wrapping.
#[derive(Debug)]
pub struct NoIndentWriter<W> {
    out: W,
    indents: usize,
    anchors: usize,
    index: usize,
}

impl<W> AutoIndentWriter<W>
where
    W: fmt::Write,
{
    pub fn new(out: W) -> Self {
        Self::with_newline(out, "\n")
    }

    /// Create a writer that writes `newline` for every `\n`.
    pub fn with_newline(out: W, newline: &str) -> Self {
        Self {
            out,
            indents: Vec::new(),
            anchors: Vec::new(),
            newline: newline.to_owned(),
            line_width: None,
            index: 0,
            column: 0,
            at_start_of_line: true,
        }
    }

    /// Consume the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn put_str(&mut self, s: &str) -> Result<usize> {
        self.out.write_str(s).map_err(write_err)?;
        let n = s.chars().count();
        self.index += n;
        self.column += n;
        Ok(n)
    }

    fn put_newline(&mut self) -> Result<usize> {
        self.out.write_str(&self.newline).map_err(write_err)?;
        let n = self.newline.chars().count();
        self.index += n;
        self.column = 0;
        Ok(n)
    }

    /// Write every indentation string, then pad to the anchor if it lies
    /// beyond the indentation.
    fn indent(&mut self) -> Result<usize> {
        let mut n = 0;
        for i in 0..self.indents.len() {
            let indent = std::mem::take(&mut self.indents[i]);
            let r = self.put_str(&indent);
            self.indents[i] = indent;
            n += r?;
        }
        if let Some(&anchor) = self.anchors.last() {
            if anchor > n {
                let pad = " ".repeat(anchor - n);
                n += self.put_str(&pad)?;
            }
        }
        Ok(n)
    }
}

impl<W> TemplateWriter for AutoIndentWriter<W>
where
    W: fmt::Write,
{
    fn write(&mut self, s: &str) -> Result<usize> {
        let mut n = 0;
        let mut buf = [0; 4];
        for c in s.chars() {
            match c {
                '\r' => {}
                '\n' => {
                    n += self.put_newline()?;
                    self.at_start_of_line = true;
                }
                c => {
                    if self.at_start_of_line {
                        n += self.indent()?;
                        self.at_start_of_line = false;
                    }
                    n += self.put_str(c.encode_utf8(&mut buf))?;
                }
            }
        }
        Ok(n)
    }

    fn write_wrap(&mut self, wrap: Option<&str>) -> Result<usize> {
        let (width, wrap) = match (self.line_width, wrap) {
            (Some(width), Some(wrap)) => (width, wrap),
            _ => return Ok(0),
        };
        if self.at_start_of_line || self.column < width {
            return Ok(0);
        }
        let mut n = 0;
        let mut buf = [0; 4];
        for c in wrap.chars() {
            match c {
                '\r' => {}
                '\n' => {
                    n += self.put_newline()?;
                    n += self.indent()?;
                }
                c => n += self.put_str(c.encode_utf8(&mut buf))?,
            }
        }
        Ok(n)
    }

    fn push_indentation(&mut self, indent: &str) {
        self.indents.push(indent.to_owned());
    }

    fn pop_indentation(&mut self) -> Result<String> {
        self.indents
            .pop()
            .ok_or_else(|| Error::new("pop of empty indentation stack"))
    }

    fn push_anchor_point(&mut self) {
        self.anchors.push(self.column);
    }

    fn pop_anchor_point(&mut self) -> Result<usize> {
        self.anchors
            .pop()
            .ok_or_else(|| Error::new("pop of empty anchor stack"))
    }

    fn set_line_width(&mut self, width: Option<usize>) {
        self.line_width = width;
    }

    #[inline]
    fn index(&self) -> usize {
        self.index
    }

    fn fork<'b>(&self, buf: &'b mut String) -> Box<dyn TemplateWriter + 'b> {
        Box::new(AutoIndentWriter::with_newline(buf, &self.newline))
    }
}

impl<W> NoIndentWriter<W>
where
    W: fmt::Write,
{
    pub fn new(out: W) -> Self {
        Self {
            out,
            indents: 0,
            anchors: 0,
            index: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W> TemplateWriter for NoIndentWriter<W>
where
    W: fmt::Write,
{
    fn write(&mut self, s: &str) -> Result<usize> {
        self.out.write_str(s).map_err(write_err)?;
        let n = s.chars().count();
        self.index += n;
        Ok(n)
    }

    fn write_wrap(&mut self, _: Option<&str>) -> Result<usize> {
        Ok(0)
    }

    fn push_indentation(&mut self, _: &str) {
        self.indents += 1;
    }

    fn pop_indentation(&mut self) -> Result<String> {
        match self.indents.checked_sub(1) {
            Some(n) => {
                self.indents = n;
                Ok(String::new())
            }
            None => Err(Error::new("pop of empty indentation stack")),
        }
    }

    fn push_anchor_point(&mut self) {
        self.anchors += 1;
    }

    fn pop_anchor_point(&mut self) -> Result<usize> {
        match self.anchors.checked_sub(1) {
            Some(n) => {
                self.anchors = n;
                Ok(0)
            }
            None => Err(Error::new("pop of empty anchor stack")),
        }
    }

    fn set_line_width(&mut self, _: Option<usize>) {}

    #[inline]
    fn index(&self) -> usize {
        self.index
    }

    fn fork<'b>(&self, buf: &'b mut String) -> Box<dyn TemplateWriter + 'b> {
        Box::new(NoIndentWriter::new(buf))
    }
}

fn write_err(_: fmt::Error) -> Error {
    Error::new("failed to write output")
}

/// Adapts an [`io::Write`] into a [`fmt::Write`], holding on to the
/// underlying error.
pub(crate) struct IoWriter<W> {
    writer: W,
    err: Option<io::Error>,
}

impl<W> IoWriter<W>
where
    W: io::Write,
{
    pub fn new(writer: W) -> Self {
        Self { writer, err: None }
    }

    pub fn take_err(&mut self) -> Option<io::Error> {
        self.err.take()
    }
}

impl<W> fmt::Write for IoWriter<W>
where
    W: io::Write,
{
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.writer.write_all(s.as_bytes()).map_err(|e| {
            self.err = Some(e);
            fmt::Error
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn auto(f: impl FnOnce(&mut AutoIndentWriter<&mut String>)) -> String {
        let mut buf = String::new();
        f(&mut AutoIndentWriter::new(&mut buf));
        buf
    }

    #[test]
    fn auto_indent_drops_carriage_returns() {
        let s = auto(|w| {
            assert_eq!(w.write("a\r\nb").unwrap(), 3);
            assert_eq!(w.index(), 3);
        });
        assert_eq!(s, "a\nb");
    }

    #[test]
    fn auto_indent_nested() {
        let s = auto(|w| {
            w.push_indentation("  ");
            w.push_indentation("\t");
            w.write("a\nb").unwrap();
            w.pop_indentation().unwrap();
            w.write("\nc").unwrap();
        });
        assert_eq!(s, "  \ta\n  \tb\n  c");
    }

    #[test]
    fn auto_indent_anchor_beyond_indent() {
        let s = auto(|w| {
            w.write("abc: ").unwrap();
            w.push_anchor_point();
            w.write("x\ny").unwrap();
            w.pop_anchor_point().unwrap();
            w.write("\nz").unwrap();
        });
        assert_eq!(s, "abc: x\n     y\nz");
    }

    #[test]
    fn auto_indent_custom_newline() {
        let mut buf = String::new();
        let mut w = AutoIndentWriter::with_newline(&mut buf, "\r\n");
        assert_eq!(w.write("a\nb").unwrap(), 4);
        assert_eq!(buf, "a\r\nb");
    }

    #[test]
    fn auto_indent_wrap() {
        let s = auto(|w| {
            w.set_line_width(Some(10));
            for word in ["aaaa", "bbbb", "cccc", "dddd"] {
                w.write_wrapped(word, Some("\n")).unwrap();
                w.write_separator(",").unwrap();
            }
        });
        assert_eq!(s, "aaaa,bbbb,\ncccc,dddd,");
    }

    #[test]
    fn auto_indent_wrap_at_start_of_line() {
        let s = auto(|w| {
            w.set_line_width(Some(0));
            assert_eq!(w.write_wrap(Some("\n")).unwrap(), 0);
            w.write("a").unwrap();
            assert_eq!(w.write_wrap(None).unwrap(), 0);
        });
        assert_eq!(s, "a");
    }

    #[test]
    fn auto_indent_err_pop_empty() {
        auto(|w| {
            assert_eq!(
                w.pop_indentation().unwrap_err().to_string(),
                "pop of empty indentation stack"
            );
            assert_eq!(
                w.pop_anchor_point().unwrap_err().to_string(),
                "pop of empty anchor stack"
            );
        });
    }

    #[test]
    fn no_indent_verbatim() {
        let mut buf = String::new();
        let mut w = NoIndentWriter::new(&mut buf);
        w.push_indentation("    ");
        w.set_line_width(Some(1));
        w.write_wrapped("a\nb", Some("\n")).unwrap();
        w.write_wrapped("c", Some("\n")).unwrap();
        w.pop_indentation().unwrap();
        assert!(w.pop_indentation().is_err());
        assert_eq!(w.index(), 4);
        assert_eq!(buf, "a\nbc");
    }
}
