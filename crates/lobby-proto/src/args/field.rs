//! Field declarations and typed conversions.

use crate::error::{ConversionKind, ProtocolError, Result};
use std::net::IpAddr;

/// How a raw token is turned into a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Keep the text as-is.
    Identity,
    /// ASCII upper-case the text.
    Uppercase,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    /// `0` or `1`.
    Boolean,
    /// Packed integer colour (`0x00BBGGRR`), negative values wrap.
    Color,
    /// IPv4 or IPv6 address.
    IpAddress,
}

/// A converted argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Int(i32),
    Long(i64),
    Bool(bool),
    Color(u32),
    Ip(IpAddr),
}

impl Value {
    /// Textual view, for fields declared with a text conversion.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl Conversion {
    /// Convert `raw` for the field named `field`.
    pub fn apply(self, field: &'static str, raw: &str) -> Result<Value> {
        let fail = |kind| ProtocolError::Conversion {
            field,
            value: raw.to_string(),
            kind,
        };
        Ok(match self {
            Self::Identity => Value::Text(raw.to_string()),
            Self::Uppercase => Value::Text(raw.to_ascii_uppercase()),
            Self::Integer => Value::Int(raw.parse().map_err(|_| fail(ConversionKind::Integer))?),
            Self::Long => Value::Long(raw.parse().map_err(|_| fail(ConversionKind::Long))?),
            Self::Boolean => match raw {
                "0" => Value::Bool(false),
                "1" => Value::Bool(true),
                _ => return Err(fail(ConversionKind::Boolean)),
            },
            Self::Color => {
                let packed = raw
                    .parse::<i64>()
                    .ok()
                    .filter(|v| *v >= i64::from(i32::MIN) && *v <= i64::from(u32::MAX))
                    .ok_or_else(|| fail(ConversionKind::Color))?;
                Value::Color(packed as u32)
            }
            Self::IpAddress => Value::Ip(raw.parse().map_err(|_| fail(ConversionKind::IpAddress))?),
        })
    }
}

/// A declared argument: name, conversion and whether it must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub conversion: Conversion,
    pub required: bool,
}

impl Field {
    /// A required text field.
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            conversion: Conversion::Identity,
            required: true,
        }
    }

    /// An optional text field.
    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            conversion: Conversion::Identity,
            required: false,
        }
    }

    /// Replace the conversion.
    pub const fn convert(mut self, conversion: Conversion) -> Self {
        self.conversion = conversion;
        self
    }

    pub const fn int(self) -> Self {
        self.convert(Conversion::Integer)
    }

    pub const fn long(self) -> Self {
        self.convert(Conversion::Long)
    }

    pub const fn boolean(self) -> Self {
        self.convert(Conversion::Boolean)
    }

    pub const fn color(self) -> Self {
        self.convert(Conversion::Color)
    }

    pub const fn ip(self) -> Self {
        self.convert(Conversion::IpAddress)
    }

    pub const fn upper(self) -> Self {
        self.convert(Conversion::Uppercase)
    }

    /// Convert a raw token for this field.
    pub fn bind(&self, raw: &str) -> Result<Value> {
        self.conversion.apply(self.name, raw)
    }
}
