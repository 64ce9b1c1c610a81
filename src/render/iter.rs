//! Coercion of attributes to sequences and the sequence functions built on
//! it.
//!
//! Lists are sequences of their elements and maps are sequences of their keys,
//! or of their values when the group iterates map values. Everything else,
//! strings included, is a single value.

use crate::value::List;
use crate::Value;

/// An attribute coerced for iteration.
#[derive(Debug, PartialEq)]
pub enum Coerced {
    Seq(List<Value>),
    Scalar(Value),
}

pub fn coerce(value: Value, map_values: bool) -> Coerced {
    match value {
        Value::List(list) => Coerced::Seq(list),
        Value::Map(map) if map_values => Coerced::Seq(map.into_values().collect()),
        Value::Map(map) => Coerced::Seq(map.into_keys().map(Value::String).collect()),
        value => Coerced::Scalar(value),
    }
}

/// Coerce a value to a sequence, wrapping scalars in a one element sequence.
/// `None` is an empty sequence.
pub fn to_seq(value: Value, map_values: bool) -> List<Value> {
    match coerce(value, map_values) {
        Coerced::Seq(seq) => seq,
        Coerced::Scalar(Value::None) => List::new(),
        Coerced::Scalar(value) => vec![value],
    }
}

/// Add a value to a list, flattening sequences.
pub fn add_to_list(list: &mut List<Value>, value: Value, map_values: bool) {
    match coerce(value, map_values) {
        Coerced::Seq(seq) => list.extend(seq),
        Coerced::Scalar(value) => list.push(value),
    }
}

/// The first element of a sequence, or a scalar itself.
pub fn first(value: Value, map_values: bool) -> Value {
    match coerce(value, map_values) {
        Coerced::Seq(seq) => seq.into_iter().next().unwrap_or_default(),
        Coerced::Scalar(value) => value,
    }
}

/// The last element of a sequence, or a scalar itself.
pub fn last(value: Value, map_values: bool) -> Value {
    match coerce(value, map_values) {
        Coerced::Seq(seq) => seq.into_iter().last().unwrap_or_default(),
        Coerced::Scalar(value) => value,
    }
}

/// All but the first element. `None` for a scalar or a sequence with fewer
/// than two elements.
pub fn rest(value: Value, map_values: bool) -> Value {
    match coerce(value, map_values) {
        Coerced::Seq(mut seq) if seq.len() > 1 => {
            seq.remove(0);
            Value::List(seq)
        }
        _ => Value::None,
    }
}

/// All but the last element. `None` for a scalar or a sequence with fewer
/// than two elements.
pub fn trunc(value: Value, map_values: bool) -> Value {
    match coerce(value, map_values) {
        Coerced::Seq(mut seq) if seq.len() > 1 => {
            seq.pop();
            Value::List(seq)
        }
        _ => Value::None,
    }
}

/// Remove `None` elements from a sequence. Scalars are unchanged.
pub fn strip(value: Value, map_values: bool) -> Value {
    match coerce(value, map_values) {
        Coerced::Seq(seq) => Value::List(seq.into_iter().filter(|v| !v.is_none()).collect()),
        Coerced::Scalar(value) => value,
    }
}

/// Reverse a sequence. Scalars are unchanged.
pub fn reverse(value: Value, map_values: bool) -> Value {
    match coerce(value, map_values) {
        Coerced::Seq(mut seq) => {
            seq.reverse();
            Value::List(seq)
        }
        Coerced::Scalar(value) => value,
    }
}

/// The number of elements in a sequence. `None` has none and any other
/// scalar, strings included, is one.
pub fn length(value: &Value) -> usize {
    match value {
        Value::None => 0,
        Value::List(list) => list.len(),
        Value::Map(map) => map.len(),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::value;

    fn abc() -> Value {
        Value::from(["a", "b", "c"])
    }

    #[test]
    fn sequence_first_last() {
        assert_eq!(first(abc(), false), Value::from("a"));
        assert_eq!(last(abc(), false), Value::from("c"));
        assert_eq!(first(Value::from("x"), false), Value::from("x"));
        assert_eq!(first(Value::List(List::new()), false), Value::None);
        assert_eq!(last(Value::List(List::new()), false), Value::None);
        assert_eq!(first(Value::None, false), Value::None);
    }

    #[test]
    fn sequence_rest_trunc() {
        assert_eq!(rest(abc(), false), Value::from(["b", "c"]));
        assert_eq!(trunc(abc(), false), Value::from(["a", "b"]));
        assert_eq!(rest(Value::from("x"), false), Value::None);
        assert_eq!(trunc(Value::from(1), false), Value::None);
        assert_eq!(rest(Value::from(["a"]), false), Value::None);
        assert_eq!(trunc(Value::None, false), Value::None);
    }

    #[test]
    fn sequence_strip_reverse() {
        let v = Value::from([Value::from("a"), Value::None, Value::from("b")]);
        assert_eq!(strip(v, false), Value::from(["a", "b"]));
        assert_eq!(reverse(abc(), false), Value::from(["c", "b", "a"]));
        assert_eq!(reverse(Value::from("abc"), false), Value::from("abc"));
        assert_eq!(strip(Value::from(1), false), Value::from(1));
    }

    #[test]
    fn sequence_length() {
        assert_eq!(length(&Value::None), 0);
        assert_eq!(length(&Value::from("anything")), 1);
        assert_eq!(length(&abc()), 3);
        assert_eq!(length(&value! { a: 1, b: 2 }), 2);
        assert_eq!(length(&Value::from(1.5)), 1);
    }

    #[test]
    fn coerce_map_keys_or_values() {
        let map = value! { a: 1, b: 2 };
        assert_eq!(
            coerce(map.clone(), false),
            Coerced::Seq(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(
            coerce(map, true),
            Coerced::Seq(vec![Value::from(1), Value::from(2)])
        );
    }

    #[test]
    fn add_flattens() {
        let mut list = List::new();
        add_to_list(&mut list, abc(), false);
        add_to_list(&mut list, Value::None, false);
        add_to_list(&mut list, Value::from("d"), false);
        assert_eq!(list.len(), 5);
        assert_eq!(list[3], Value::None);
    }
}
