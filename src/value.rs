//! Typed tag values.
//!
//! A [`TagKind`] fixes how a tag's buffer is interpreted and how large one
//! element is. [`TagValue`] carries a decoded value of that kind.
//!
//! | Kind | Element size | Accessor |
//! |------|-------------:|----------|
//! | [`TagKind::U8`] | 1 | `get_u8` / `set_u8` |
//! | [`TagKind::U16`] | 2 | `get_u16` / `set_u16` |
//! | [`TagKind::I16`] | 2 | `get_i16` / `set_i16` |
//! | [`TagKind::I32`] | 4 | `get_i32` / `set_i32` |
//! | [`TagKind::U32`] | 4 | `get_u32` / `set_u32` |
//! | [`TagKind::F32`] | 4 | `get_f32` / `set_f32` |
//! | [`TagKind::String`] | 88 | [`string`](crate::string) codec |

use crate::engine::{TagEngine, TagHandle};
use crate::error::{Result, TagError};
use crate::string::{self, STRING_ELEMENT_SIZE};

/// How a tag's buffer is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagKind {
    /// Unsigned byte (SINT/BOOL).
    U8,
    /// Unsigned 16-bit word.
    U16,
    /// Signed 16-bit integer (INT).
    I16,
    /// Signed 32-bit integer (DINT).
    I32,
    /// Unsigned 32-bit word.
    U32,
    /// IEEE-754 single (REAL).
    F32,
    /// Length-prefixed controller string.
    String,
}

impl TagKind {
    /// Size in bytes of one element of this kind.
    ///
    /// # Example
    ///
    /// ```
    /// use plctag_client::TagKind;
    ///
    /// assert_eq!(TagKind::U16.element_size(), 2);
    /// assert_eq!(TagKind::String.element_size(), 88);
    /// ```
    pub fn element_size(self) -> usize {
        match self {
            TagKind::U8 => 1,
            TagKind::U16 | TagKind::I16 => 2,
            TagKind::I32 | TagKind::U32 | TagKind::F32 => 4,
            TagKind::String => STRING_ELEMENT_SIZE,
        }
    }

    /// Decodes the value of this kind stored at byte `offset` of the tag buffer.
    ///
    /// Element `i` of an unpadded array lives at `i * self.element_size()`;
    /// padded arrays use their own stride.
    pub fn decode<E: TagEngine + ?Sized>(self, engine: &E, handle: &TagHandle, offset: usize) -> TagValue {
        match self {
            TagKind::U8 => TagValue::U8(engine.get_u8(handle, offset)),
            TagKind::U16 => TagValue::U16(engine.get_u16(handle, offset)),
            TagKind::I16 => TagValue::I16(engine.get_i16(handle, offset)),
            TagKind::I32 => TagValue::I32(engine.get_i32(handle, offset)),
            TagKind::U32 => TagValue::U32(engine.get_u32(handle, offset)),
            TagKind::F32 => TagValue::F32(engine.get_f32(handle, offset)),
            TagKind::String => TagValue::String(string::decode_from(engine, handle, offset)),
        }
    }
}

impl std::fmt::Display for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagKind::U8 => write!(f, "u8"),
            TagKind::U16 => write!(f, "u16"),
            TagKind::I16 => write!(f, "i16"),
            TagKind::I32 => write!(f, "i32"),
            TagKind::U32 => write!(f, "u32"),
            TagKind::F32 => write!(f, "f32"),
            TagKind::String => write!(f, "string"),
        }
    }
}

/// A decoded tag value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagValue {
    /// Unsigned byte.
    U8(u8),
    /// Unsigned 16-bit word.
    U16(u16),
    /// Signed 16-bit integer.
    I16(i16),
    /// Signed 32-bit integer.
    I32(i32),
    /// Unsigned 32-bit word.
    U32(u32),
    /// IEEE-754 single.
    F32(f32),
    /// Controller string.
    String(String),
}

impl TagValue {
    /// Returns the kind of this value.
    pub fn kind(&self) -> TagKind {
        match self {
            TagValue::U8(_) => TagKind::U8,
            TagValue::U16(_) => TagKind::U16,
            TagValue::I16(_) => TagKind::I16,
            TagValue::I32(_) => TagKind::I32,
            TagValue::U32(_) => TagKind::U32,
            TagValue::F32(_) => TagKind::F32,
            TagValue::String(_) => TagKind::String,
        }
    }

    /// Encodes this value at byte `offset` of a tag of kind `kind`.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidParameter` if the value's kind differs from `kind`.
    pub fn encode<E: TagEngine + ?Sized>(
        &self,
        engine: &mut E,
        handle: &TagHandle,
        kind: TagKind,
        offset: usize,
    ) -> Result<()> {
        if self.kind() != kind {
            return Err(TagError::invalid_parameter(
                "value",
                format!("expected {kind}, got {}", self.kind()),
            ));
        }

        match self {
            TagValue::U8(v) => engine.set_u8(handle, offset, *v),
            TagValue::U16(v) => engine.set_u16(handle, offset, *v),
            TagValue::I16(v) => engine.set_i16(handle, offset, *v),
            TagValue::I32(v) => engine.set_i32(handle, offset, *v),
            TagValue::U32(v) => engine.set_u32(handle, offset, *v),
            TagValue::F32(v) => engine.set_f32(handle, offset, *v),
            TagValue::String(text) => {
                string::encode_into(engine, handle, offset, text);
            }
        }
        Ok(())
    }

    /// Returns the value as `u16` if it is a `U16`.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            TagValue::U16(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text if the value is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::String(text) => Some(text),
            _ => None,
        }
    }
}

impl std::fmt::Display for TagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagValue::U8(v) => write!(f, "{v}"),
            TagValue::U16(v) => write!(f, "{v}"),
            TagValue::I16(v) => write!(f, "{v}"),
            TagValue::I32(v) => write!(f, "{v}"),
            TagValue::U32(v) => write!(f, "{v}"),
            TagValue::F32(v) => write!(f, "{v}"),
            TagValue::String(text) => write!(f, "{text}"),
        }
    }
}

impl From<&str> for TagValue {
    fn from(text: &str) -> Self {
        TagValue::String(text.to_string())
    }
}

impl From<String> for TagValue {
    fn from(text: String) -> Self {
        TagValue::String(text)
    }
}

impl From<u16> for TagValue {
    fn from(v: u16) -> Self {
        TagValue::U16(v)
    }
}

impl From<u8> for TagValue {
    fn from(v: u8) -> Self {
        TagValue::U8(v)
    }
}

impl From<i32> for TagValue {
    fn from(v: i32) -> Self {
        TagValue::I32(v)
    }
}
