//! Attribute renderers.
//!
//! An attribute renderer converts scalar values of a particular
//! [`ValueKind`][crate::ValueKind] to text. Renderers are registered on a
//! group using [`GroupBuilder::renderer`][crate::GroupBuilder::renderer] and
//! receive the `format` option of the write and the locale of the render.
//!
//! Any closure with the signature
//! `Fn(&Value, Option<&str>, &str) -> String` is a renderer.
//!
//! # Examples
//!
//! ```
//! use stencil::{Group, Value, ValueKind};
//!
//! let group = Group::builder()
//!     .renderer(ValueKind::Bool, |value: &Value, _: Option<&str>, _: &str| {
//!         match value {
//!             Value::Bool(true) => "yes".to_owned(),
//!             _ => "no".to_owned(),
//!         }
//!     })
//!     .build()?;
//! # Ok::<(), stencil::Error>(())
//! ```

use crate::Value;

/// Converts a value to text.
pub trait AttributeRenderer: Send + Sync {
    fn render(&self, value: &Value, format: Option<&str>, locale: &str) -> String;
}

impl<F> AttributeRenderer for F
where
    F: Fn(&Value, Option<&str>, &str) -> String + Send + Sync,
{
    fn render(&self, value: &Value, format: Option<&str>, locale: &str) -> String {
        self(value, format, locale)
    }
}

/// Formats a scalar value without a renderer.
///
/// - [`Value::None`]: empty string
/// - [`Value::Bool`]: `true` or `false`
/// - [`Value::Integer`] and [`Value::Float`]: using [`Display`][std::fmt::Display]
/// - [`Value::String`]: the string, unescaped
pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::None => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::List(list) => list.iter().map(display).collect(),
        Value::Map(map) => map.keys().map(String::as_str).collect(),
        Value::Template(st) => format!("<{}>", st.name()),
    }
}

/// Renders strings using a named format.
///
/// Formats:
/// - `upper`: uppercase
/// - `lower`: lowercase
/// - `cap`: uppercase the first character
/// - `xml-encode`: escape `&`, `<`, `>`, `"` and `'`
/// - `url-encode`: percent-encode everything except unreserved characters
///
/// Unknown formats and non-string values are displayed unchanged.
#[cfg(feature = "builtins")]
#[cfg_attr(docsrs, doc(cfg(feature = "builtins")))]
#[derive(Debug, Clone, Copy, Default)]
pub struct StringRenderer;

#[cfg(feature = "builtins")]
impl AttributeRenderer for StringRenderer {
    fn render(&self, value: &Value, format: Option<&str>, _locale: &str) -> String {
        let s = display(value);
        match format {
            Some("upper") => s.to_uppercase(),
            Some("lower") => s.to_lowercase(),
            Some("cap") => {
                let mut chars = s.chars();
                match chars.next() {
                    Some(c) => c.to_uppercase().chain(chars).collect(),
                    None => s,
                }
            }
            Some("xml-encode") => xml_encode(&s),
            Some("url-encode") => url_encode(&s),
            _ => s,
        }
    }
}

#[cfg(feature = "builtins")]
fn xml_encode(s: &str) -> String {
    let mut buf = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            '\'' => buf.push_str("&#39;"),
            c => buf.push(c),
        }
    }
    buf
}

#[cfg(feature = "builtins")]
fn url_encode(s: &str) -> String {
    let mut buf = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                buf.push(char::from(b))
            }
            b' ' => buf.push('+'),
            b => buf.push_str(&format!("%{b:02X}")),
        }
    }
    buf
}

/// Renders numbers using a printf-like format.
///
/// The format may contain text around a single conversion of the form
/// `%[-][0][width][.precision]conv` where `conv` is one of:
/// - `d`: integer
/// - `x`, `X`: lower or upper case hexadecimal
/// - `o`: octal
/// - `f`: fixed point, six decimals unless a precision is given
/// - `e`: scientific notation
/// - `s`: displayed as is
///
/// Non-numeric values and unparseable formats are displayed unchanged.
#[cfg(feature = "builtins")]
#[cfg_attr(docsrs, doc(cfg(feature = "builtins")))]
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberRenderer;

#[cfg(feature = "builtins")]
impl AttributeRenderer for NumberRenderer {
    fn render(&self, value: &Value, format: Option<&str>, _locale: &str) -> String {
        let spec = match format.and_then(Spec::parse) {
            Some(spec) => spec,
            None => return display(value),
        };
        let body = match (spec.conv, value) {
            ('d', Value::Integer(n)) => n.to_string(),
            ('d', Value::Float(n)) => format!("{:.0}", n.trunc()),
            ('x', Value::Integer(n)) => format!("{n:x}"),
            ('X', Value::Integer(n)) => format!("{n:X}"),
            ('o', Value::Integer(n)) => format!("{n:o}"),
            ('f', v) => match as_f64(v) {
                Some(n) => format!("{:.*}", spec.precision.unwrap_or(6), n),
                None => return display(value),
            },
            ('e', v) => match as_f64(v) {
                Some(n) => match spec.precision {
                    Some(p) => format!("{:.*e}", p, n),
                    None => format!("{n:e}"),
                },
                None => return display(value),
            },
            ('s', v) => display(v),
            _ => return display(value),
        };
        let body = spec.pad(body);
        format!("{}{}{}", spec.prefix, body, spec.suffix)
    }
}

#[cfg(feature = "builtins")]
fn as_f64(value: &Value) -> Option<f64> {
    match *value {
        Value::Integer(n) => Some(n as f64),
        Value::Float(n) => Some(n),
        _ => None,
    }
}

/// A parsed printf-like conversion.
#[cfg(feature = "builtins")]
struct Spec<'a> {
    prefix: &'a str,
    suffix: &'a str,
    left: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    conv: char,
}

#[cfg(feature = "builtins")]
impl<'a> Spec<'a> {
    fn parse(format: &'a str) -> Option<Self> {
        let start = format.find('%')?;
        let prefix = &format[..start];
        let rest = &format[start + 1..];

        let mut chars = rest.char_indices().peekable();
        let mut left = false;
        let mut zero = false;
        while let Some(&(_, c)) = chars.peek() {
            match c {
                '-' => left = true,
                '0' => zero = true,
                _ => break,
            }
            chars.next();
        }

        let mut width = 0;
        while let Some(d) = chars.peek().and_then(|&(_, c)| c.to_digit(10)) {
            width = width * 10 + d as usize;
            chars.next();
        }

        let mut precision = None;
        if let Some(&(_, '.')) = chars.peek() {
            chars.next();
            let mut p = 0;
            while let Some(d) = chars.peek().and_then(|&(_, c)| c.to_digit(10)) {
                p = p * 10 + d as usize;
                chars.next();
            }
            precision = Some(p);
        }

        let (i, conv) = chars.next()?;
        if !matches!(conv, 'd' | 'x' | 'X' | 'o' | 'f' | 'e' | 's') {
            return None;
        }
        let suffix = &rest[i + conv.len_utf8()..];
        Some(Self {
            prefix,
            suffix,
            left,
            zero,
            width,
            precision,
            conv,
        })
    }

    fn pad(&self, body: String) -> String {
        let len = body.chars().count();
        if len >= self.width {
            return body;
        }
        let fill = self.width - len;
        if self.left {
            format!("{body}{}", " ".repeat(fill))
        } else if self.zero && self.conv != 's' {
            match body.strip_prefix('-') {
                Some(digits) => format!("-{}{digits}", "0".repeat(fill)),
                None => format!("{}{body}", "0".repeat(fill)),
            }
        } else {
            format!("{}{body}", " ".repeat(fill))
        }
    }
}
