//! Defines the [`Value`] enum, representing any data a template can load,
//! iterate or render.

mod from;
#[cfg(feature = "serde")]
mod ser;

pub use std::collections::btree_map;
pub use std::collections::BTreeMap as Map;
use std::fmt;
use std::mem;
pub use std::vec::Vec as List;

#[cfg(feature = "serde")]
pub use crate::value::ser::to_value;
use crate::Instance;

/// Attribute data represented as a recursive enum.
///
/// A [`Value::List`] (or a [`Value::Map`], which iterates over its keys or
/// values) is a *multi-valued* attribute. Everything else is a scalar,
/// including strings which are never iterated character by character.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(List<Value>),
    Map(Map<String, Value>),
    Template(Instance),
}

/// The runtime type of a [`Value`].
///
/// Attribute renderers, model adaptors and type proxies are registered on a
/// group per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    None,
    Bool,
    Integer,
    Float,
    String,
    List,
    Map,
    Template,
}

impl Value {
    /// Returns the runtime type of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::Bool(_) => ValueKind::Bool,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Template(_) => ValueKind::Template,
        }
    }

    pub(crate) fn human(&self) -> &'static str {
        self.kind().human()
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Returns the string if this value is a [`Value::String`].
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Tests the value the way a conditional does.
    ///
    /// - [`Value::None`] is false
    /// - [`Value::Bool`] is itself
    /// - [`Value::List`] and [`Value::Map`] are true if non-empty
    /// - everything else is true, including the empty string
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::List(list) => !list.is_empty(),
            Value::Map(map) => !map.is_empty(),
            _ => true,
        }
    }
}

impl ValueKind {
    pub(crate) fn human(self) -> &'static str {
        match self {
            ValueKind::None => "none",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Template => "template",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.human())
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::None
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(s), Self::Bool(o)) => s == o,
            (Self::Integer(s), Self::Integer(o)) => s == o,
            (Self::Float(s), Self::Float(o)) => s == o,
            (Self::String(s), Self::String(o)) => s == o,
            (Self::List(s), Self::List(o)) => s == o,
            (Self::Map(s), Self::Map(o)) => s == o,
            (Self::Template(s), Self::Template(o)) => s == o,
            _ => mem::discriminant(self) == mem::discriminant(other),
        }
    }
}
