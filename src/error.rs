use std::cmp::max;
use std::fmt;
use std::io;

use crate::types::span::Span;

/// An error returned by the fallible API of this crate.
///
/// Rendering itself never fails: problems found while interpreting a template
/// are reported to the group's [`ErrorListener`][crate::ErrorListener]
/// instead. This error is returned when building templates and groups,
/// decoding bytecode, converting values, setting attributes, or when the
/// underlying [`io::Write`] fails.
#[derive(Clone)]
pub struct Error {
    msg: String,
    span: Option<(String, Span)>,
}

impl Error {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            span: None,
        }
    }

    pub(crate) fn span(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        assert!(!source.is_empty(), "source must be populated");
        Self {
            msg: msg.into(),
            span: Some((source.to_string(), span.into())),
        }
    }

    /// Returns the error message without any source location.
    pub fn message(&self) -> &str {
        &self.msg
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self::new(msg.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::new(format!("io error: {err}"))
    }
}

impl std::error::Error for Error {}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some((source, span)) => fmt_pretty(&self.msg, source, *span, f),
            None => write!(f, "{}", self.msg),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some((source, span)) => {
                if f.alternate() {
                    fmt_pretty(&self.msg, source, *span, f)
                } else {
                    write!(f, "{} between bytes {} and {}", self.msg, span.m, span.n)
                }
            }
            None => write!(f, "{}", self.msg),
        }
    }
}

/// Formats a message underneath the line of `source` that `span` points at.
pub(crate) fn fmt_pretty(
    msg: &str,
    source: &str,
    span: Span,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let lines: Vec<_> = source.split_terminator('\n').collect();
    let (line, col) = to_line_col(&lines, span.m);
    let width = max(1, width(source.get(span.m..span.n).unwrap_or_default()));
    let code = lines
        .get(line)
        .or_else(|| lines.last())
        .copied()
        .unwrap_or_default();

    let num = (line + 1).to_string();
    let pad = num.len();
    let pipe = "|";
    let underline = "^".repeat(width);

    write!(
        f,
        "\n \
        {0:pad$} {pipe}\n \
        {num:>} {pipe} {code}\n \
        {0:pad$} {pipe} {underline:>width$} {msg}\n",
        "",
        pad = pad,
        pipe = pipe,
        num = num,
        code = code,
        underline = underline,
        width = col + width,
        msg = msg
    )
}

fn to_line_col(lines: &[&str], offset: usize) -> (usize, usize) {
    let mut n = 0;
    for (i, line) in lines.iter().enumerate() {
        let len = line.len() + 1;
        if n + len > offset {
            let col = line.get(..offset - n).map(width).unwrap_or(offset - n);
            return (i, col);
        }
        n += len;
    }
    (lines.len(), lines.last().map(|l| width(l)).unwrap_or(0))
}

#[cfg(feature = "unicode")]
fn width(s: &str) -> usize {
    unicode_width::UnicodeWidthStr::width(s)
}

#[cfg(not(feature = "unicode"))]
fn width(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn error_display_plain() {
        let err = Error::new("bad opcode 99");
        assert_eq!(err.to_string(), "bad opcode 99");
        assert_eq!(format!("{err:#}"), "bad opcode 99");
    }

    #[test]
    fn error_display_span() {
        let err = Error::span("not an identifier", "hello <1x>", 7..9);
        assert_eq!(err.to_string(), "not an identifier between bytes 7 and 9");
        assert_eq!(
            format!("{err:#}"),
            "
   |
 1 | hello <1x>
   |        ^^ not an identifier
"
        );
    }
}
