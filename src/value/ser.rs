//! Converts any `T: Serialize` into a [`Value`].

use serde::ser::{Error as _, Serialize};

use crate::value::{List, Map};
use crate::{Error, Result, Value};

/// Convert a `T` to a `Value`.
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub fn to_value<T>(value: T) -> Result<Value>
where
    T: Serialize,
{
    value.serialize(Serializer)
}

/// Serializer whose output is a `Value`.
struct Serializer;

/// The state of a list, map or enum variant being serialized.
enum Compound {
    List(List<Value>),
    Map {
        map: Map<String, Value>,
        next_key: Option<String>,
    },
    Variant {
        name: &'static str,
        inner: Box<Compound>,
    },
}

impl Compound {
    fn list(len: Option<usize>) -> Self {
        Self::List(List::with_capacity(len.unwrap_or(0)))
    }

    fn map() -> Self {
        Self::Map {
            map: Map::new(),
            next_key: None,
        }
    }

    fn variant(name: &'static str, inner: Compound) -> Self {
        Self::Variant {
            name,
            inner: Box::new(inner),
        }
    }

    fn push<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match self {
            Self::List(list) => list.push(to_value(value)?),
            Self::Variant { inner, .. } => inner.push(value)?,
            Self::Map { .. } => return Err(Error::custom("expected map entry")),
        }
        Ok(())
    }

    fn key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match self {
            Self::Map { next_key, .. } => {
                *next_key = Some(map_key(to_value(key)?)?);
                Ok(())
            }
            Self::Variant { inner, .. } => inner.key(key),
            Self::List(_) => Err(Error::custom("expected list element")),
        }
    }

    fn value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match self {
            Self::Map { map, next_key } => {
                let key = next_key
                    .take()
                    .ok_or_else(|| Error::custom("map value serialized before key"))?;
                map.insert(key, to_value(value)?);
                Ok(())
            }
            Self::Variant { inner, .. } => inner.value(value),
            Self::List(_) => Err(Error::custom("expected list element")),
        }
    }

    fn field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.key(key)?;
        self.value(value)
    }

    fn finish(self) -> Value {
        match self {
            Self::List(list) => Value::List(list),
            Self::Map { map, .. } => Value::Map(map),
            Self::Variant { name, inner } => {
                let mut map = Map::new();
                map.insert(String::from(name), inner.finish());
                Value::Map(map)
            }
        }
    }
}

fn map_key(key: Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Integer(i) => Ok(i.to_string()),
        _ => Err(Error::custom("map key must be a string")),
    }
}

impl serde::Serializer for Serializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = Compound;
    type SerializeTuple = Compound;
    type SerializeTupleStruct = Compound;
    type SerializeTupleVariant = Compound;
    type SerializeMap = Compound;
    type SerializeStruct = Compound;
    type SerializeStructVariant = Compound;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok> {
        Ok(Value::Integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok> {
        let v = i64::try_from(v)
            .map_err(|_| Error::custom("out of range integral type conversion attempted"))?;
        Ok(Value::Integer(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok> {
        Ok(Value::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok> {
        Ok(Value::String(String::from(v)))
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok> {
        Ok(Value::from(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok> {
        Ok(v.iter().copied().map(Value::from).collect())
    }

    fn serialize_none(self) -> Result<Self::Ok> {
        Ok(Value::None)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok> {
        Ok(Value::None)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok> {
        Ok(Value::None)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok> {
        Ok(Value::from(variant))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Self::Ok>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok>
    where
        T: ?Sized + Serialize,
    {
        let mut map = Map::new();
        map.insert(String::from(variant), to_value(value)?);
        Ok(Value::Map(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(Compound::list(len))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        Ok(Compound::list(Some(len)))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Ok(Compound::list(Some(len)))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Ok(Compound::variant(variant, Compound::list(Some(len))))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(Compound::map())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(Compound::map())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Ok(Compound::variant(variant, Compound::map()))
    }
}

macro_rules! impl_seq {
    ($($trait:ident::$method:ident),+) => {
        $(
            impl serde::ser::$trait for Compound {
                type Ok = Value;
                type Error = Error;

                fn $method<T>(&mut self, value: &T) -> Result<()>
                where
                    T: ?Sized + Serialize,
                {
                    self.push(value)
                }

                fn end(self) -> Result<Value> {
                    Ok(self.finish())
                }
            }
        )+
    };
}

impl_seq! {
    SerializeSeq::serialize_element,
    SerializeTuple::serialize_element,
    SerializeTupleStruct::serialize_field,
    SerializeTupleVariant::serialize_field
}

macro_rules! impl_struct {
    ($($trait:ident),+) => {
        $(
            impl serde::ser::$trait for Compound {
                type Ok = Value;
                type Error = Error;

                fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
                where
                    T: ?Sized + Serialize,
                {
                    self.field(key, value)
                }

                fn end(self) -> Result<Value> {
                    Ok(self.finish())
                }
            }
        )+
    };
}

impl_struct! { SerializeStruct, SerializeStructVariant }

impl serde::ser::SerializeMap for Compound {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.key(key)
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.value(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}
