//! Address-tagged messages with dynamically typed arguments
//!
//! A message is immutable once received. Arguments carry a runtime type tag
//! and must be checked, never assumed.

use std::fmt;

/// A single dynamically typed message argument
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    String(String),
    Blob(Vec<u8>),
    Long(i64),
    Double(f64),
    Bool(bool),
    Nil,
}

impl Value {
    /// OSC type tag character for this value
    pub fn type_tag(&self) -> char {
        match self {
            Value::Int(_) => 'i',
            Value::Float(_) => 'f',
            Value::String(_) => 's',
            Value::Blob(_) => 'b',
            Value::Long(_) => 'h',
            Value::Double(_) => 'd',
            Value::Bool(true) => 'T',
            Value::Bool(false) => 'F',
            Value::Nil => 'N',
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{:?}", v),
            Value::Blob(v) => write!(f, "<blob {} bytes>", v.len()),
            Value::Long(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Nil => write!(f, "nil"),
        }
    }
}

/// Address plus ordered argument list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    /// Address pattern, e.g. `/VMC/Ext/Bone/Pos`. Empty means absent.
    pub address: String,
    /// Arguments in wire order
    pub values: Vec<Value>,
}

impl Message {
    pub fn new(address: impl Into<String>, values: Vec<Value>) -> Self {
        Message {
            address: address.into(),
            values,
        }
    }

    /// A message with no address cannot be routed
    #[inline]
    pub fn is_malformed(&self) -> bool {
        self.address.is_empty()
    }

    /// Argument at `index`, if present
    #[inline]
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Type tag string without the leading comma
    pub fn type_tags(&self) -> String {
        self.values.iter().map(Value::type_tag).collect()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)?;
        for value in &self.values {
            write!(f, " {}", value)?;
        }
        Ok(())
    }
}
