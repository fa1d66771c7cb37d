//! YAML documents whose float-looking scalars keep their written text.
//!
//! `version: 1.10` resolves to the float `1.1`, which would then render as
//! `1.1`. A second pass over the same text reads such scalars as strings and
//! keeps `"1.10"` wherever the float would not print back identically.

use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// Parses `content`, keeping float scalars as written when needed.
///
/// # Errors
///
/// Returns the YAML error if `content` is not a single valid document.
pub fn parse_document(content: &str) -> Result<Value, serde_yaml::Error> {
    let shape: Value = serde_yaml::from_str(content)?;
    if !has_float(&shape) {
        return Ok(shape);
    }
    Shaped(&shape).deserialize(serde_yaml::Deserializer::from_str(content))
}

fn has_float(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_f64(),
        Value::Sequence(items) => items.iter().any(has_float),
        Value::Mapping(map) => map.values().any(has_float),
        _ => false,
    }
}

/// Re-reads a node whose structure is already known from a first pass.
struct Shaped<'v>(&'v Value);

impl<'de> DeserializeSeed<'de> for Shaped<'_> {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        match self.0 {
            Value::Mapping(map) if map.values().any(has_float) => deserializer.deserialize_map(ShapedMap(map)),
            Value::Sequence(items) if items.iter().any(has_float) => {
                deserializer.deserialize_seq(ShapedSeq(items))
            }
            Value::Number(n) if n.is_f64() => {
                let written = String::deserialize(deserializer)?;
                if n.to_string() == written {
                    Ok(Value::Number(n.clone()))
                } else {
                    Ok(Value::String(written))
                }
            }
            other => {
                IgnoredAny::deserialize(deserializer)?;
                Ok(other.clone())
            }
        }
    }
}

struct ShapedMap<'v>(&'v Mapping);

impl<'de> Visitor<'de> for ShapedMap<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut out = Mapping::with_capacity(self.0.len());
        for (key, value) in self.0 {
            if access.next_key::<IgnoredAny>()?.is_none() {
                return Err(de::Error::custom("mapping ended early on second read"));
            }
            out.insert(key.clone(), access.next_value_seed(Shaped(value))?);
        }
        Ok(Value::Mapping(out))
    }
}

struct ShapedSeq<'v>(&'v [Value]);

impl<'de> Visitor<'de> for ShapedSeq<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a sequence")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut out = Vec::with_capacity(self.0.len());
        for item in self.0 {
            match access.next_element_seed(Shaped(item))? {
                Some(value) => out.push(value),
                None => return Err(de::Error::custom("sequence ended early on second read")),
            }
        }
        Ok(Value::Sequence(out))
    }
}
