//! The instance model: a borrowed view over decoded JSON with an explicit
//! `Undefined` case for absent properties.

use serde_json::{Map, Number, Value};

/// A value being validated.
///
/// `Undefined` stands for "this property was not present" and is distinct
/// from `Null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instance<'a> {
    Undefined,
    Null,
    Bool(bool),
    Number(&'a Number),
    String(&'a str),
    Array(&'a [Value]),
    Object(&'a Map<String, Value>),
}

impl<'a> From<&'a Value> for Instance<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Instance::Null,
            Value::Bool(b) => Instance::Bool(*b),
            Value::Number(n) => Instance::Number(n),
            Value::String(s) => Instance::String(s),
            Value::Array(items) => Instance::Array(items),
            Value::Object(map) => Instance::Object(map),
        }
    }
}

impl<'a> Instance<'a> {
    /// Kind name used in type mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Instance::Undefined => "undefined",
            Instance::Null => "null",
            Instance::Bool(_) => "boolean",
            Instance::Number(n) if n.is_i64() || n.is_u64() => "integer",
            Instance::Number(_) => "number",
            Instance::String(_) => "string",
            Instance::Array(_) => "array",
            Instance::Object(_) => "object",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Instance::Undefined)
    }

    /// Property lookup; absent keys (and non-objects) give `Undefined`.
    pub fn property(&self, key: &str) -> Instance<'a> {
        match *self {
            Instance::Object(map) => map
                .get(key)
                .map(Instance::from)
                .unwrap_or(Instance::Undefined),
            _ => Instance::Undefined,
        }
    }

    pub fn has_property(&self, key: &str) -> bool {
        matches!(self, Instance::Object(map) if map.contains_key(key))
    }

    /// Owned JSON for the defined cases, `None` for `Undefined`.
    pub fn to_value(&self) -> Option<Value> {
        Some(match self {
            Instance::Undefined => return None,
            Instance::Null => Value::Null,
            Instance::Bool(b) => Value::Bool(*b),
            Instance::Number(n) => Value::Number((*n).clone()),
            Instance::String(s) => Value::String((*s).to_string()),
            Instance::Array(items) => Value::Array(items.to_vec()),
            Instance::Object(map) => Value::Object((*map).clone()),
        })
    }

    /// Equality by both runtime kind and value, as `enum` requires.
    ///
    /// Integers and non-integral numbers are different kinds, so `1` does not
    /// equal `1.0`. Object comparison ignores key order.
    pub fn same_as(&self, candidate: &Value) -> bool {
        match (*self, candidate) {
            (Instance::Undefined, _) => false,
            (Instance::Null, Value::Null) => true,
            (Instance::Bool(a), Value::Bool(b)) => a == *b,
            (Instance::Number(a), Value::Number(b)) => numbers_equal(a, b),
            (Instance::String(a), Value::String(b)) => a == b.as_str(),
            (Instance::Array(a), Value::Array(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b.iter())
                        .all(|(x, y)| Instance::from(x).same_as(y))
            }
            (Instance::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, x)| {
                        b.get(key)
                            .map(|y| Instance::from(x).same_as(y))
                            .unwrap_or(false)
                    })
            }
            _ => false,
        }
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    let a_integral = a.is_i64() || a.is_u64();
    let b_integral = b.is_i64() || b.is_u64();
    if a_integral != b_integral {
        return false;
    }
    if a_integral {
        return a.as_i64() == b.as_i64() && a.as_u64() == b.as_u64();
    }
    a.as_f64() == b.as_f64()
}

/// One step of an instance path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Same location (combinator branches, `extends`, type schemas).
    None,
    Key(&'a str),
    Index(usize),
}

impl std::fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::None => Ok(()),
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Extend `path` by one segment: indices as `[i]`, keys as `.key`, empty
/// segments elided, and no leading dot at the root.
pub fn increment_path(path: &str, segment: Segment<'_>) -> String {
    match segment {
        Segment::None | Segment::Key("") => path.to_string(),
        Segment::Index(index) => format!("{}[{}]", path, index),
        Segment::Key(key) if path.is_empty() => key.to_string(),
        Segment::Key(key) => format!("{}.{}", path, key),
    }
}
