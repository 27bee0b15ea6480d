//! Declarative argument binding.
//!
//! Each command declares exactly one [`ArgumentShape`]:
//!
//! - **words + sentences**: space-delimited words, then a tab-delimited
//!   sentence tail whose last sentence may contain spaces (and tabs);
//! - **named**: tab-delimited `key=value` pairs.
//!
//! Binding converts every token with its field's [`Conversion`] and produces
//! [`ParsedArguments`], or a [`ProtocolError`] naming the offending field.

mod field;
mod shape;

pub use field::{Conversion, Field, Value};
pub use shape::{ArgumentShape, NamedShape, WordShape};

use crate::error::{ConversionKind, ProtocolError, Result};
use std::collections::BTreeMap;
use std::net::IpAddr;

/// The bound result of an [`ArgumentShape`].
///
/// Word/sentence values and named values are mutually exclusive for any
/// single command; accessors look a field up by its declared name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArguments {
    words: Vec<(&'static str, Value)>,
    variadic: Vec<Value>,
    sentences: Vec<(&'static str, Value)>,
    named: BTreeMap<String, Value>,
}

impl ParsedArguments {
    /// Look a value up by field name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.words
            .iter()
            .chain(self.sentences.iter())
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .or_else(|| self.named.get(name))
    }

    fn missing(name: &'static str) -> ProtocolError {
        ProtocolError::ArgumentCount { field: name }
    }

    /// Required text value.
    pub fn text(&self, name: &'static str) -> Result<&str> {
        self.opt_text(name).ok_or_else(|| Self::missing(name))
    }

    /// Optional text value.
    pub fn opt_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }

    /// Required integer value.
    pub fn int(&self, name: &'static str) -> Result<i32> {
        match self.get(name) {
            Some(Value::Int(v)) => Ok(*v),
            Some(other) => Err(mismatch(name, other, ConversionKind::Integer)),
            None => Err(Self::missing(name)),
        }
    }

    /// Optional integer value.
    pub fn opt_int(&self, name: &str) -> Option<i32> {
        match self.get(name) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Required long value.
    pub fn long(&self, name: &'static str) -> Result<i64> {
        match self.get(name) {
            Some(Value::Long(v)) => Ok(*v),
            Some(Value::Int(v)) => Ok(i64::from(*v)),
            Some(other) => Err(mismatch(name, other, ConversionKind::Long)),
            None => Err(Self::missing(name)),
        }
    }

    /// Optional long value.
    pub fn opt_long(&self, name: &'static str) -> Option<i64> {
        self.long(name).ok()
    }

    /// Required 0/1 value.
    pub fn boolean(&self, name: &'static str) -> Result<bool> {
        match self.get(name) {
            Some(Value::Bool(v)) => Ok(*v),
            Some(other) => Err(mismatch(name, other, ConversionKind::Boolean)),
            None => Err(Self::missing(name)),
        }
    }

    /// Required colour value.
    pub fn color(&self, name: &'static str) -> Result<u32> {
        match self.get(name) {
            Some(Value::Color(v)) => Ok(*v),
            Some(other) => Err(mismatch(name, other, ConversionKind::Color)),
            None => Err(Self::missing(name)),
        }
    }

    /// Required IP address value.
    pub fn ip(&self, name: &'static str) -> Result<IpAddr> {
        match self.get(name) {
            Some(Value::Ip(v)) => Ok(*v),
            Some(other) => Err(mismatch(name, other, ConversionKind::IpAddress)),
            None => Err(Self::missing(name)),
        }
    }

    /// Positional word values, in order.
    pub fn words(&self) -> impl Iterator<Item = &Value> {
        self.words.iter().map(|(_, v)| v)
    }

    /// Values bound by an unbounded word list.
    pub fn variadic(&self) -> &[Value] {
        &self.variadic
    }

    /// Sentence values, in order.
    pub fn sentences(&self) -> Vec<&Value> {
        self.sentences.iter().map(|(_, v)| v).collect()
    }

    /// Named values (declared fields plus kept extra keys).
    pub fn named(&self) -> &BTreeMap<String, Value> {
        &self.named
    }
}

fn mismatch(name: &'static str, value: &Value, kind: ConversionKind) -> ProtocolError {
    ProtocolError::Conversion {
        field: name,
        value: format!("{value:?}"),
        kind,
    }
}
