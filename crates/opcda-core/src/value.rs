// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Property values and their type tags.
//!
//! Servers describe every property value with a 16-bit type tag
//! ([`VarType`]) and carry the value itself as a [`Variant`]. The array
//! flag (`0x2000`) may be combined with any scalar tag.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// VarType
// =============================================================================

/// 16-bit value type tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarType(u16);

impl VarType {
    /// No value.
    pub const EMPTY: Self = Self(0);
    /// SQL-style null.
    pub const NULL: Self = Self(1);
    /// Signed 16-bit integer.
    pub const I2: Self = Self(2);
    /// Signed 32-bit integer.
    pub const I4: Self = Self(3);
    /// 32-bit float.
    pub const R4: Self = Self(4);
    /// 64-bit float.
    pub const R8: Self = Self(5);
    /// Currency, fixed point scaled by 10 000.
    pub const CY: Self = Self(6);
    /// Date.
    pub const DATE: Self = Self(7);
    /// String.
    pub const BSTR: Self = Self(8);
    /// Status code.
    pub const ERROR: Self = Self(10);
    /// Boolean.
    pub const BOOL: Self = Self(11);
    /// Any type.
    pub const VARIANT: Self = Self(12);
    /// Signed 8-bit integer.
    pub const I1: Self = Self(16);
    /// Unsigned 8-bit integer.
    pub const UI1: Self = Self(17);
    /// Unsigned 16-bit integer.
    pub const UI2: Self = Self(18);
    /// Unsigned 32-bit integer.
    pub const UI4: Self = Self(19);
    /// Signed 64-bit integer.
    pub const I8: Self = Self(20);
    /// Unsigned 64-bit integer.
    pub const UI8: Self = Self(21);

    /// Array modifier flag.
    pub const ARRAY: u16 = 0x2000;

    /// Creates a type tag from its raw value.
    #[inline]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Returns `true` if the array flag is set.
    #[inline]
    pub const fn is_array(self) -> bool {
        self.0 & Self::ARRAY != 0
    }

    /// Returns the scalar type with the array flag cleared.
    #[inline]
    pub const fn element(self) -> Self {
        Self(self.0 & !Self::ARRAY)
    }

    /// Returns the array type of this scalar type.
    #[inline]
    pub const fn array_of(self) -> Self {
        Self(self.0 | Self::ARRAY)
    }

    /// Returns the short name of the scalar type.
    pub fn name(self) -> &'static str {
        match self.element() {
            Self::EMPTY => "VT_EMPTY",
            Self::NULL => "VT_NULL",
            Self::I2 => "VT_I2",
            Self::I4 => "VT_I4",
            Self::R4 => "VT_R4",
            Self::R8 => "VT_R8",
            Self::CY => "VT_CY",
            Self::DATE => "VT_DATE",
            Self::BSTR => "VT_BSTR",
            Self::ERROR => "VT_ERROR",
            Self::BOOL => "VT_BOOL",
            Self::VARIANT => "VT_VARIANT",
            Self::I1 => "VT_I1",
            Self::UI1 => "VT_UI1",
            Self::UI2 => "VT_UI2",
            Self::UI4 => "VT_UI4",
            Self::I8 => "VT_I8",
            Self::UI8 => "VT_UI8",
            _ => "VT_UNKNOWN",
        }
    }
}

impl fmt::Debug for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarType({}", self.name())?;
        if self.is_array() {
            write!(f, " | VT_ARRAY")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array() {
            write!(f, "{}[]", self.name())
        } else {
            f.write_str(self.name())
        }
    }
}

// =============================================================================
// Variant
// =============================================================================

/// A property or item value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Variant {
    /// No value.
    #[default]
    Empty,
    /// Boolean.
    Bool(bool),
    /// Signed 8-bit integer.
    I1(i8),
    /// Signed 16-bit integer.
    I2(i16),
    /// Signed 32-bit integer.
    I4(i32),
    /// Signed 64-bit integer.
    I8(i64),
    /// Unsigned 8-bit integer.
    UI1(u8),
    /// Unsigned 16-bit integer.
    UI2(u16),
    /// Unsigned 32-bit integer.
    UI4(u32),
    /// Unsigned 64-bit integer.
    UI8(u64),
    /// 32-bit float.
    R4(f32),
    /// 64-bit float.
    R8(f64),
    /// Currency in ten-thousandths.
    Currency(i64),
    /// Date.
    Date(DateTime<Utc>),
    /// String.
    String(String),
    /// Status code carried as a value.
    Error(i32),
    /// Homogeneous array.
    Array(Vec<Variant>),
}

impl Variant {
    /// Returns the type tag matching this value.
    ///
    /// Arrays report the tag of their first element with the array flag set,
    /// or `VT_VARIANT | VT_ARRAY` when empty.
    pub fn var_type(&self) -> VarType {
        match self {
            Self::Empty => VarType::EMPTY,
            Self::Bool(_) => VarType::BOOL,
            Self::I1(_) => VarType::I1,
            Self::I2(_) => VarType::I2,
            Self::I4(_) => VarType::I4,
            Self::I8(_) => VarType::I8,
            Self::UI1(_) => VarType::UI1,
            Self::UI2(_) => VarType::UI2,
            Self::UI4(_) => VarType::UI4,
            Self::UI8(_) => VarType::UI8,
            Self::R4(_) => VarType::R4,
            Self::R8(_) => VarType::R8,
            Self::Currency(_) => VarType::CY,
            Self::Date(_) => VarType::DATE,
            Self::String(_) => VarType::BSTR,
            Self::Error(_) => VarType::ERROR,
            Self::Array(items) => items
                .first()
                .map(|first| first.var_type().array_of())
                .unwrap_or_else(|| VarType::VARIANT.array_of()),
        }
    }

    /// Returns `true` for [`Variant::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the value as `f64` if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::I1(v) => Some(v as f64),
            Self::I2(v) => Some(v as f64),
            Self::I4(v) => Some(v as f64),
            Self::I8(v) => Some(v as f64),
            Self::UI1(v) => Some(v as f64),
            Self::UI2(v) => Some(v as f64),
            Self::UI4(v) => Some(v as f64),
            Self::UI8(v) => Some(v as f64),
            Self::R4(v) => Some(v as f64),
            Self::R8(v) => Some(v),
            Self::Currency(v) => Some(v as f64 / 10_000.0),
            _ => None,
        }
    }

    /// Returns the value as `i64` if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I1(v) => Some(v as i64),
            Self::I2(v) => Some(v as i64),
            Self::I4(v) => Some(v as i64),
            Self::I8(v) => Some(v),
            Self::UI1(v) => Some(v as i64),
            Self::UI2(v) => Some(v as i64),
            Self::UI4(v) => Some(v as i64),
            Self::UI8(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Returns the string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("<empty>"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::I1(v) => write!(f, "{v}"),
            Self::I2(v) => write!(f, "{v}"),
            Self::I4(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::UI1(v) => write!(f, "{v}"),
            Self::UI2(v) => write!(f, "{v}"),
            Self::UI4(v) => write!(f, "{v}"),
            Self::UI8(v) => write!(f, "{v}"),
            Self::R4(v) => write!(f, "{v}"),
            Self::R8(v) => write!(f, "{v}"),
            Self::Currency(v) => write!(f, "{}.{:04}", v / 10_000, (v % 10_000).abs()),
            Self::Date(v) => write!(f, "{}", v.to_rfc3339()),
            Self::String(v) => f.write_str(v),
            Self::Error(v) => write!(f, "0x{:08X}", *v as u32),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! impl_from_for_variant {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_variant! {
    bool => Bool,
    i8 => I1,
    i16 => I2,
    i32 => I4,
    i64 => I8,
    u8 => UI1,
    u16 => UI2,
    u32 => UI4,
    u64 => UI8,
    f32 => R4,
    f64 => R8,
    String => String,
    DateTime<Utc> => Date,
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
