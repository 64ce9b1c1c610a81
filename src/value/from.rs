//! Conversions used when adding attributes to an [`Instance`].

use crate::value::{List, Map};
use crate::{Instance, Value};

macro_rules! impl_from {
    ($($ty:ty => |$v:ident| $conv:expr,)+) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from($v: $ty) -> Self {
                    $conv
                }
            }
        )+
    };
}

impl_from! {
    bool => |b| Value::Bool(b),
    i8 => |i| Value::Integer(i64::from(i)),
    i16 => |i| Value::Integer(i64::from(i)),
    i32 => |i| Value::Integer(i64::from(i)),
    i64 => |i| Value::Integer(i),
    u8 => |i| Value::Integer(i64::from(i)),
    u16 => |i| Value::Integer(i64::from(i)),
    u32 => |i| Value::Integer(i64::from(i)),
    // lengths and loop indices
    usize => |n| Value::Integer(i64::try_from(n).unwrap_or(i64::MAX)),
    f32 => |f| Value::Float(f64::from(f)),
    f64 => |f| Value::Float(f),
    char => |c| Value::String(String::from(c)),
    String => |s| Value::String(s),
    &str => |s| Value::String(s.to_owned()),
    Instance => |st| Value::Template(st),
    Map<String, Value> => |map| Value::Map(map),
}

/// An unset attribute.
impl<V> From<Option<V>> for Value
where
    V: Into<Value>,
{
    fn from(opt: Option<V>) -> Self {
        opt.map_or(Value::None, Into::into)
    }
}

/// A multi-valued attribute.
impl<V> From<Vec<V>> for Value
where
    V: Into<Value>,
{
    fn from(list: Vec<V>) -> Self {
        list.into_iter().collect()
    }
}

/// A multi-valued attribute.
impl<V, const N: usize> From<[V; N]> for Value
where
    V: Into<Value>,
{
    fn from(list: [V; N]) -> Self {
        list.into_iter().collect()
    }
}

/// A map of properties, for example a dictionary.
impl<K, V, const N: usize> From<[(K, V); N]> for Value
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(entries: [(K, V); N]) -> Self {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<V> FromIterator<V> for Value
where
    V: Into<Value>,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = V>,
    {
        Value::List(iter.into_iter().map(Into::into).collect::<List<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_option_is_unset() {
        assert_eq!(Value::from(None::<i32>), Value::None);
        assert_eq!(Value::from(Some("a")), Value::from("a"));
    }

    #[test]
    fn from_usize_saturates() {
        assert_eq!(Value::from(usize::MAX), Value::Integer(i64::MAX));
    }

    #[test]
    fn from_entries_is_map() {
        let v = Value::from([("b", 2), ("a", 1)]);
        let keys: Vec<_> = match &v {
            Value::Map(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        };
        assert_eq!(keys, ["a", "b"]);
    }
}
