//! Vendor string codec.
//!
//! Controller strings are fixed-size records inside the tag buffer:
//!
//! | Offset | Size | Content |
//! |--------|------|---------|
//! | 0 | 2 | payload length, unsigned 16-bit |
//! | 2 | 80 | character payload |
//! | 82 | 6 | padding up to the 88-byte element |
//!
//! The length field is authoritative: no NUL terminator is searched for.
//! On decode the length is clamped to [`DATA_CAPACITY`]; on encode the text is
//! truncated to at most [`DATA_CAPACITY`] bytes on a character boundary and
//! the unused payload is zero-filled, so nothing is left over from a previous,
//! longer value. Padding bytes are never read or written.
//!
//! Text is handled as bytes. Bytes that are not valid UTF-8 decode to U+FFFD.
//!
//! # Example
//!
//! ```
//! use plctag_client::{ConnectionConfig, SimulatedEngine, TagEngine};
//! use plctag_client::string::{self, STRING_ELEMENT_SIZE};
//! use std::time::Duration;
//!
//! let mut engine = SimulatedEngine::new();
//! let descriptor = ConnectionConfig::default().descriptor("FaultMessage", STRING_ELEMENT_SIZE, 1)?;
//! let tag = engine.create(&descriptor, Duration::from_secs(1)).unwrap();
//!
//! string::encode(&mut engine, &tag, "Fault: E01");
//! assert_eq!(string::decode(&engine, &tag), "Fault: E01");
//! # Ok::<(), plctag_client::TagError>(())
//! ```

use crate::engine::{TagEngine, TagHandle};

/// Maximum payload length in bytes.
pub const DATA_CAPACITY: usize = 80;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Declared element size of one string, including prefix and padding.
pub const STRING_ELEMENT_SIZE: usize = 88;

/// Decodes the string stored in the first element of the tag.
pub fn decode<E: TagEngine + ?Sized>(engine: &E, handle: &TagHandle) -> String {
    decode_at(engine, handle, 0)
}

/// Decodes the string stored in element `index` of a string array tag.
///
/// A length field larger than [`DATA_CAPACITY`] is clamped.
pub fn decode_at<E: TagEngine + ?Sized>(engine: &E, handle: &TagHandle, index: usize) -> String {
    decode_from(engine, handle, index * STRING_ELEMENT_SIZE)
}

/// Decodes the string record starting at byte `offset` of the tag buffer.
///
/// Use this for arrays whose elements are padded past [`STRING_ELEMENT_SIZE`].
pub fn decode_from<E: TagEngine + ?Sized>(engine: &E, handle: &TagHandle, offset: usize) -> String {
    let declared = engine.get_u16(handle, offset) as usize;
    let len = if declared > DATA_CAPACITY {
        log::warn!(
            "string length {} exceeds capacity {}, clamping",
            declared,
            DATA_CAPACITY
        );
        DATA_CAPACITY
    } else {
        declared
    };

    let bytes: Vec<u8> = (0..len)
        .map(|i| engine.get_u8(handle, offset + LENGTH_PREFIX_SIZE + i))
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Encodes `text` into the first element of the tag.
///
/// Returns the number of payload bytes written.
pub fn encode<E: TagEngine + ?Sized>(engine: &mut E, handle: &TagHandle, text: &str) -> usize {
    encode_at(engine, handle, 0, text)
}

/// Encodes `text` into element `index` of a string array tag.
///
/// Text longer than [`DATA_CAPACITY`] bytes is truncated. Returns the number
/// of payload bytes written.
pub fn encode_at<E: TagEngine + ?Sized>(
    engine: &mut E,
    handle: &TagHandle,
    index: usize,
    text: &str,
) -> usize {
    encode_into(engine, handle, index * STRING_ELEMENT_SIZE, text)
}

/// Encodes `text` as a string record starting at byte `offset` of the tag buffer.
///
/// Truncation keeps whole characters: a character that would straddle the
/// [`DATA_CAPACITY`] limit is dropped, so the stored payload is always valid
/// UTF-8 and decodes back to a prefix of `text`.
pub fn encode_into<E: TagEngine + ?Sized>(
    engine: &mut E,
    handle: &TagHandle,
    offset: usize,
    text: &str,
) -> usize {
    let bytes = truncate_to_capacity(text).as_bytes();
    let len = bytes.len();

    engine.set_u16(handle, offset, len as u16);
    for (i, byte) in bytes.iter().enumerate() {
        engine.set_u8(handle, offset + LENGTH_PREFIX_SIZE + i, *byte);
    }
    for i in len..DATA_CAPACITY {
        engine.set_u8(handle, offset + LENGTH_PREFIX_SIZE + i, 0);
    }
    len
}

fn truncate_to_capacity(text: &str) -> &str {
    if text.len() <= DATA_CAPACITY {
        return text;
    }
    let mut end = DATA_CAPACITY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
