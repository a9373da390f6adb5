//! JSON request body encoding.
//!
//! Bodies are encoded through a serializer that can drop `null` members and
//! refuse runaway nesting. Serde has no notion of object identity, so a
//! reference loop (for example an `Rc<RefCell<_>>` graph whose `Serialize`
//! impl walks back into its parent) shows up as unbounded nesting; when loops
//! are not allowed, nesting deeper than [`JsonOptions::max_depth`] is reported
//! as a loop instead of exhausting the stack.

use crate::{HttpClientError, Result};
use serde::Serialize;
use serde::ser::{self, Error as _};
use serde_json::{Map, Value};

/// Default nesting limit used when reference loops are not allowed.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Options controlling JSON body encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonOptions {
    /// Emit object members whose value is `null`.
    pub serialize_nulls: bool,
    /// Serialize self-referencing graphs without a nesting check.
    pub allow_reference_loops: bool,
    /// Nesting limit enforced when `allow_reference_loops` is false.
    pub max_depth: usize,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            serialize_nulls: false,
            allow_reference_loops: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl JsonOptions {
    /// Set whether `null` members are emitted.
    pub fn serialize_nulls(mut self, enable: bool) -> Self {
        self.serialize_nulls = enable;
        self
    }

    /// Set whether reference loops are serialized or rejected.
    pub fn allow_reference_loops(mut self, enable: bool) -> Self {
        self.allow_reference_loops = enable;
        self
    }

    /// Set the nesting limit used for loop detection.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Encode `value` as a JSON string according to `options`.
///
/// When nulls are kept and loops are allowed the value is written directly.
/// Otherwise it goes through an intermediate [`Value`]. Either way object
/// members keep their declaration order.
pub fn to_json_string<T>(value: &T, options: &JsonOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    let encoded = if options.serialize_nulls && options.allow_reference_loops {
        serde_json::to_string(value)
    } else {
        to_json_value(value, options).and_then(|v| serde_json::to_string(&v))
    };
    encoded.map_err(|e| HttpClientError::Serialization(e.to_string()))
}

/// Encode `value` as a [`Value`] according to `options`.
pub fn to_json_value<T>(value: &T, options: &JsonOptions) -> serde_json::Result<Value>
where
    T: ?Sized + Serialize,
{
    value.serialize(ValueSerializer { options, depth: 0 })
}

#[derive(Clone, Copy)]
struct ValueSerializer<'a> {
    options: &'a JsonOptions,
    depth: usize,
}

impl<'a> ValueSerializer<'a> {
    fn descend(self) -> serde_json::Result<Self> {
        let depth = self.depth + 1;
        if !self.options.allow_reference_loops && depth > self.options.max_depth {
            return Err(serde_json::Error::custom(format!(
                "Self referencing loop detected: nesting exceeds {} levels",
                self.options.max_depth
            )));
        }
        Ok(Self { depth, ..self })
    }

    fn keeps(&self, value: &Value) -> bool {
        self.options.serialize_nulls || !value.is_null()
    }
}

impl<'a> ser::Serializer for ValueSerializer<'a> {
    type Ok = Value;
    type Error = serde_json::Error;

    type SerializeSeq = SeqBuilder<'a>;
    type SerializeTuple = SeqBuilder<'a>;
    type SerializeTupleStruct = SeqBuilder<'a>;
    type SerializeTupleVariant = SeqBuilder<'a>;
    type SerializeMap = MapBuilder<'a>;
    type SerializeStruct = MapBuilder<'a>;
    type SerializeStructVariant = MapBuilder<'a>;

    fn serialize_bool(self, v: bool) -> serde_json::Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> serde_json::Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> serde_json::Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> serde_json::Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> serde_json::Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i128(self, v: i128) -> serde_json::Result<Value> {
        ser::Serializer::serialize_i128(serde_json::value::Serializer, v)
    }

    fn serialize_u8(self, v: u8) -> serde_json::Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> serde_json::Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> serde_json::Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> serde_json::Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u128(self, v: u128) -> serde_json::Result<Value> {
        ser::Serializer::serialize_u128(serde_json::value::Serializer, v)
    }

    fn serialize_f32(self, v: f32) -> serde_json::Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_f64(self, v: f64) -> serde_json::Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_char(self, v: char) -> serde_json::Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> serde_json::Result<Value> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> serde_json::Result<Value> {
        Ok(Value::Array(v.iter().map(|b| Value::from(*b)).collect()))
    }

    fn serialize_none(self) -> serde_json::Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> serde_json::Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> serde_json::Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> serde_json::Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> serde_json::Result<Value> {
        Ok(Value::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> serde_json::Result<Value>
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
    ) -> serde_json::Result<Value>
    where
        T: ?Sized + Serialize,
    {
        let inner = value.serialize(self.descend()?)?;
        let mut map = Map::new();
        map.insert(variant.to_owned(), inner);
        Ok(Value::Object(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> serde_json::Result<SeqBuilder<'a>> {
        Ok(SeqBuilder {
            ser: self.descend()?,
            variant: None,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> serde_json::Result<SeqBuilder<'a>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> serde_json::Result<SeqBuilder<'a>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> serde_json::Result<SeqBuilder<'a>> {
        Ok(SeqBuilder {
            ser: self.descend()?,
            variant: Some(variant),
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> serde_json::Result<MapBuilder<'a>> {
        Ok(MapBuilder {
            ser: self.descend()?,
            variant: None,
            map: Map::new(),
            next_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> serde_json::Result<MapBuilder<'a>> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> serde_json::Result<MapBuilder<'a>> {
        Ok(MapBuilder {
            ser: self.descend()?,
            variant: Some(variant),
            map: Map::new(),
            next_key: None,
        })
    }
}

/// Wraps `value` as `{ variant: value }` for enum variants.
fn tag(variant: Option<&'static str>, value: Value) -> Value {
    match variant {
        Some(name) => {
            let mut map = Map::new();
            map.insert(name.to_owned(), value);
            Value::Object(map)
        }
        None => value,
    }
}

struct SeqBuilder<'a> {
    ser: ValueSerializer<'a>,
    variant: Option<&'static str>,
    items: Vec<Value>,
}

impl SeqBuilder<'_> {
    fn push<T>(&mut self, value: &T) -> serde_json::Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.items.push(value.serialize(self.ser)?);
        Ok(())
    }

    fn finish(self) -> Value {
        tag(self.variant, Value::Array(self.items))
    }
}

impl ser::SerializeSeq for SeqBuilder<'_> {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_element<T>(&mut self, value: &T) -> serde_json::Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> serde_json::Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqBuilder<'_> {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_element<T>(&mut self, value: &T) -> serde_json::Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> serde_json::Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqBuilder<'_> {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_field<T>(&mut self, value: &T) -> serde_json::Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> serde_json::Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for SeqBuilder<'_> {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_field<T>(&mut self, value: &T) -> serde_json::Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> serde_json::Result<Value> {
        Ok(self.finish())
    }
}

struct MapBuilder<'a> {
    ser: ValueSerializer<'a>,
    variant: Option<&'static str>,
    map: Map<String, Value>,
    next_key: Option<String>,
}

impl MapBuilder<'_> {
    fn insert<T>(&mut self, key: String, value: &T) -> serde_json::Result<()>
    where
        T: ?Sized + Serialize,
    {
        let value = value.serialize(self.ser)?;
        if self.ser.keeps(&value) {
            self.map.insert(key, value);
        }
        Ok(())
    }

    fn finish(self) -> Value {
        tag(self.variant, Value::Object(self.map))
    }
}

impl ser::SerializeMap for MapBuilder<'_> {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_key<T>(&mut self, key: &T) -> serde_json::Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = match key.serialize(self.ser)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return Err(serde_json::Error::custom("key must be a string")),
        };
        self.next_key = Some(key);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> serde_json::Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| serde_json::Error::custom("map value serialized before its key"))?;
        self.insert(key, value)
    }

    fn end(self) -> serde_json::Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for MapBuilder<'_> {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> serde_json::Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.insert(key.to_owned(), value)
    }

    fn end(self) -> serde_json::Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for MapBuilder<'_> {
    type Ok = Value;
    type Error = serde_json::Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> serde_json::Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.insert(key.to_owned(), value)
    }

    fn end(self) -> serde_json::Result<Value> {
        Ok(self.finish())
    }
}
