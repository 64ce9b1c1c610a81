//! Property resolution and type proxies.
//!
//! A [`ModelAdaptor`] resolves `owner.property` expressions for values of a
//! particular [`ValueKind`][crate::ValueKind]. A group consults the adaptor
//! registered for the owner's kind and falls back to the defaults in this
//! module: [`MapAdaptor`] for maps, [`InstanceAdaptor`] for template
//! instances, and no properties at all for everything else.

use crate::Value;

/// The name of the dictionary entry used when a key is missing.
pub const DEFAULT_KEY: &str = "default";

/// A dictionary value that evaluates to the requested key.
pub const DICT_KEY: &str = "key";

/// Resolves properties of values.
pub trait ModelAdaptor: Send + Sync {
    /// Returns the named property of `owner`.
    ///
    /// Returns `None` if the owner has no such property, which is reported as
    /// a `NoSuchProperty` error. Return `Some(Value::None)` for a property
    /// that exists but has no value.
    fn property(&self, owner: &Value, name: &str) -> Option<Value>;
}

impl<F> ModelAdaptor for F
where
    F: Fn(&Value, &str) -> Option<Value> + Send + Sync,
{
    fn property(&self, owner: &Value, name: &str) -> Option<Value> {
        self(owner, name)
    }
}

/// Substitutes a value before it is written.
pub trait TypeProxy: Send + Sync {
    fn proxy(&self, value: &Value) -> Value;
}

impl<F> TypeProxy for F
where
    F: Fn(&Value) -> Value + Send + Sync,
{
    fn proxy(&self, value: &Value) -> Value {
        self(value)
    }
}

/// Resolves properties of [`Value::Map`]s.
///
/// Lookup order:
/// - the entry with the property name
/// - `keys` and `values` evaluate to the list of keys or values
/// - the `default` entry
/// - otherwise the property exists but has no value
///
/// A found entry whose value is [`DICT_KEY`] evaluates to the property name
/// itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapAdaptor;

impl ModelAdaptor for MapAdaptor {
    fn property(&self, owner: &Value, name: &str) -> Option<Value> {
        let map = match owner {
            Value::Map(map) => map,
            _ => return None,
        };
        let entry = match map.get(name) {
            Some(value) => value,
            None if name == "keys" => return Some(map.keys().map(String::as_str).collect()),
            None if name == "values" => return Some(map.values().cloned().collect()),
            None => match map.get(DEFAULT_KEY) {
                Some(value) => value,
                None => return Some(Value::None),
            },
        };
        let value = match entry {
            Value::String(s) if s == DICT_KEY => Value::from(name),
            value => value.clone(),
        };
        Some(value)
    }
}

/// Resolves properties of template instances as their attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceAdaptor;

impl ModelAdaptor for InstanceAdaptor {
    fn property(&self, owner: &Value, name: &str) -> Option<Value> {
        match owner {
            Value::Template(st) => Some(st.attribute(name).cloned().unwrap_or_default()),
            _ => None,
        }
    }
}

/// The adaptor used when none is registered for a value kind.
pub(crate) fn default_property(owner: &Value, name: &str) -> Option<Value> {
    match owner {
        Value::Map(_) => MapAdaptor.property(owner, name),
        Value::Template(_) => InstanceAdaptor.property(owner, name),
        _ => None,
    }
}
