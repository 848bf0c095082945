//! [`TagEngine`] backed by the libplctag C library.
//!
//! Enabled with the `libplctag` feature. The library must be installed where
//! the linker can find it (`libplctag.so`, `libplctag.dylib` or `plctag.lib`).
//!
//! Every call is synchronous: `create`, `read` and `write` pass the timeout
//! through to libplctag, which blocks until the operation completes or the
//! timeout elapses.

use std::ffi::{c_char, c_float, c_int, CStr, CString};
use std::time::Duration;

use crate::descriptor::TagDescriptor;
use crate::engine::{StatusCode, TagEngine, TagHandle};

#[link(name = "plctag")]
extern "C" {
    fn plc_tag_create(attrib_str: *const c_char, timeout: c_int) -> i32;
    fn plc_tag_destroy(tag: i32) -> c_int;
    fn plc_tag_status(tag: i32) -> c_int;
    fn plc_tag_read(tag: i32, timeout: c_int) -> c_int;
    fn plc_tag_write(tag: i32, timeout: c_int) -> c_int;
    fn plc_tag_decode_error(err: c_int) -> *const c_char;

    fn plc_tag_get_uint8(tag: i32, offset: c_int) -> u8;
    fn plc_tag_set_uint8(tag: i32, offset: c_int, val: u8) -> c_int;
    fn plc_tag_get_uint16(tag: i32, offset: c_int) -> u16;
    fn plc_tag_set_uint16(tag: i32, offset: c_int, val: u16) -> c_int;
    fn plc_tag_get_uint32(tag: i32, offset: c_int) -> u32;
    fn plc_tag_set_uint32(tag: i32, offset: c_int, val: u32) -> c_int;
    fn plc_tag_get_int16(tag: i32, offset: c_int) -> i16;
    fn plc_tag_set_int16(tag: i32, offset: c_int, val: i16) -> c_int;
    fn plc_tag_get_int32(tag: i32, offset: c_int) -> i32;
    fn plc_tag_set_int32(tag: i32, offset: c_int, val: i32) -> c_int;
    fn plc_tag_get_float32(tag: i32, offset: c_int) -> c_float;
    fn plc_tag_set_float32(tag: i32, offset: c_int, val: c_float) -> c_int;
}

/// Engine that forwards every call to libplctag.
///
/// Handles returned by [`create`](TagEngine::create) are libplctag tag ids.
/// Accessor failures (for example an offset past the buffer) are recorded by
/// libplctag in the tag status, which [`status`](TagEngine::status) returns.
///
/// # Example
///
/// ```no_run
/// use plctag_client::{ConnectionConfig, LibPlcTag, ModbotRule, TagRegistry};
///
/// let mut engine = LibPlcTag::new();
/// let config = ConnectionConfig::from_env()?;
/// let registry = TagRegistry::open_all(&mut engine, &config, &ModbotRule::tag_specs())?;
/// println!("{} tags ready", registry.len());
/// # Ok::<(), plctag_client::TagError>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct LibPlcTag;

impl LibPlcTag {
    /// Creates the engine. No library state is touched until the first call.
    pub fn new() -> Self {
        Self
    }
}

fn timeout_ms(timeout: Duration) -> c_int {
    c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX)
}

// Offsets past c_int::MAX are out of range for any tag buffer; -1 makes
// libplctag reject them with an out-of-bounds status.
fn offset(offset: usize) -> c_int {
    c_int::try_from(offset).unwrap_or(-1)
}

impl TagEngine for LibPlcTag {
    fn create(
        &mut self,
        descriptor: &TagDescriptor,
        timeout: Duration,
    ) -> std::result::Result<TagHandle, StatusCode> {
        let attributes =
            CString::new(descriptor.as_str()).map_err(|_| StatusCode::ERR_BAD_PARAM)?;
        // SAFETY: `attributes` is a valid NUL-terminated string that outlives
        // the call; libplctag copies what it needs.
        let id = unsafe { plc_tag_create(attributes.as_ptr(), timeout_ms(timeout)) };
        if id < 0 {
            Err(StatusCode(id))
        } else {
            Ok(TagHandle::from_raw(id))
        }
    }

    fn destroy(&mut self, handle: TagHandle) {
        // SAFETY: the handle is consumed, so the id is never used again.
        let rc = unsafe { plc_tag_destroy(handle.raw()) };
        if rc != StatusCode::OK.0 {
            log::warn!("destroying tag id {} returned {}", handle.raw(), rc);
        }
    }

    fn status(&self, handle: &TagHandle) -> StatusCode {
        // SAFETY: libplctag validates the id and reports unknown ids as errors.
        StatusCode(unsafe { plc_tag_status(handle.raw()) })
    }

    fn read(&mut self, handle: &TagHandle, timeout: Duration) -> StatusCode {
        // SAFETY: as for `status`.
        StatusCode(unsafe { plc_tag_read(handle.raw(), timeout_ms(timeout)) })
    }

    fn write(&mut self, handle: &TagHandle, timeout: Duration) -> StatusCode {
        // SAFETY: as for `status`.
        StatusCode(unsafe { plc_tag_write(handle.raw(), timeout_ms(timeout)) })
    }

    fn get_u8(&self, handle: &TagHandle, at: usize) -> u8 {
        // SAFETY: libplctag bounds-checks the offset against the tag buffer.
        unsafe { plc_tag_get_uint8(handle.raw(), offset(at)) }
    }

    fn set_u8(&mut self, handle: &TagHandle, at: usize, value: u8) {
        // SAFETY: bounds-checked by libplctag.
        unsafe { plc_tag_set_uint8(handle.raw(), offset(at), value) };
    }

    fn get_u16(&self, handle: &TagHandle, at: usize) -> u16 {
        // SAFETY: bounds-checked by libplctag.
        unsafe { plc_tag_get_uint16(handle.raw(), offset(at)) }
    }

    fn set_u16(&mut self, handle: &TagHandle, at: usize, value: u16) {
        // SAFETY: bounds-checked by libplctag.
        unsafe { plc_tag_set_uint16(handle.raw(), offset(at), value) };
    }

    fn get_u32(&self, handle: &TagHandle, at: usize) -> u32 {
        // SAFETY: bounds-checked by libplctag.
        unsafe { plc_tag_get_uint32(handle.raw(), offset(at)) }
    }

    fn set_u32(&mut self, handle: &TagHandle, at: usize, value: u32) {
        // SAFETY: bounds-checked by libplctag.
        unsafe { plc_tag_set_uint32(handle.raw(), offset(at), value) };
    }

    fn get_i16(&self, handle: &TagHandle, at: usize) -> i16 {
        // SAFETY: bounds-checked by libplctag.
        unsafe { plc_tag_get_int16(handle.raw(), offset(at)) }
    }

    fn set_i16(&mut self, handle: &TagHandle, at: usize, value: i16) {
        // SAFETY: bounds-checked by libplctag.
        unsafe { plc_tag_set_int16(handle.raw(), offset(at), value) };
    }

    fn get_i32(&self, handle: &TagHandle, at: usize) -> i32 {
        // SAFETY: bounds-checked by libplctag.
        unsafe { plc_tag_get_int32(handle.raw(), offset(at)) }
    }

    fn set_i32(&mut self, handle: &TagHandle, at: usize, value: i32) {
        // SAFETY: bounds-checked by libplctag.
        unsafe { plc_tag_set_int32(handle.raw(), offset(at), value) };
    }

    fn get_f32(&self, handle: &TagHandle, at: usize) -> f32 {
        // SAFETY: bounds-checked by libplctag.
        unsafe { plc_tag_get_float32(handle.raw(), offset(at)) }
    }

    fn set_f32(&mut self, handle: &TagHandle, at: usize, value: f32) {
        // SAFETY: bounds-checked by libplctag.
        unsafe { plc_tag_set_float32(handle.raw(), offset(at), value) };
    }

    fn decode_status(&self, status: StatusCode) -> String {
        // SAFETY: libplctag returns a pointer to a static NUL-terminated string.
        let text = unsafe { plc_tag_decode_error(status.0) };
        if text.is_null() {
            return status.description().to_string();
        }
        // SAFETY: non-null and static, checked above.
        unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
    }
}
