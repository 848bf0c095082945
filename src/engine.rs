//! Tag engine facade.
//!
//! The [`TagEngine`] trait is the boundary between this crate and whatever
//! actually talks to the controller. The core only ever needs the capability
//! set below; no protocol detail leaks through it, which is what lets
//! [`SimulatedEngine`](crate::SimulatedEngine) stand in for a real controller.
//!
//! | Operation | Result |
//! |-----------|--------|
//! | `create` | a [`TagHandle`] or the failing [`StatusCode`] |
//! | `destroy` | nothing observed; consumes the handle |
//! | `status` | current [`StatusCode`] of the tag |
//! | `read` / `write` | [`StatusCode`] of the blocking round-trip |
//! | `get_*` / `set_*` | primitive at a byte offset of the tag buffer |
//!
//! # Offsets
//!
//! Byte offsets are computed by the caller. An offset outside the tag buffer
//! is a precondition violation: engines report it through the tag status
//! ([`StatusCode::ERR_OUT_OF_BOUNDS`]) and return zero, they do not panic.
//! A successful access leaves the status at [`StatusCode::OK`], so callers
//! can check [`TagEngine::status`] right after a run of accessors.

use std::time::Duration;

use crate::descriptor::TagDescriptor;

/// Status code reported by a tag engine.
///
/// Zero means success, one means an operation is still in flight, and
/// negative values are errors. The constants follow the libplctag table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(pub i32);

impl StatusCode {
    /// Operation in progress.
    pub const PENDING: StatusCode = StatusCode(1);
    /// Operation succeeded.
    pub const OK: StatusCode = StatusCode(0);
}

// libplctag error codes, named after PLCTAG_ERR_*.
#[allow(missing_docs)]
impl StatusCode {
    pub const ERR_ABORT: StatusCode = StatusCode(-1);
    pub const ERR_BAD_CONFIG: StatusCode = StatusCode(-2);
    pub const ERR_BAD_CONNECTION: StatusCode = StatusCode(-3);
    pub const ERR_BAD_DATA: StatusCode = StatusCode(-4);
    pub const ERR_BAD_DEVICE: StatusCode = StatusCode(-5);
    pub const ERR_BAD_GATEWAY: StatusCode = StatusCode(-6);
    pub const ERR_BAD_PARAM: StatusCode = StatusCode(-7);
    pub const ERR_BAD_REPLY: StatusCode = StatusCode(-8);
    pub const ERR_BAD_STATUS: StatusCode = StatusCode(-9);
    pub const ERR_CLOSE: StatusCode = StatusCode(-10);
    pub const ERR_CREATE: StatusCode = StatusCode(-11);
    pub const ERR_DUPLICATE: StatusCode = StatusCode(-12);
    pub const ERR_ENCODE: StatusCode = StatusCode(-13);
    pub const ERR_MUTEX_DESTROY: StatusCode = StatusCode(-14);
    pub const ERR_MUTEX_INIT: StatusCode = StatusCode(-15);
    pub const ERR_MUTEX_LOCK: StatusCode = StatusCode(-16);
    pub const ERR_MUTEX_UNLOCK: StatusCode = StatusCode(-17);
    pub const ERR_NOT_ALLOWED: StatusCode = StatusCode(-18);
    pub const ERR_NOT_FOUND: StatusCode = StatusCode(-19);
    pub const ERR_NOT_IMPLEMENTED: StatusCode = StatusCode(-20);
    pub const ERR_NO_DATA: StatusCode = StatusCode(-21);
    pub const ERR_NO_MATCH: StatusCode = StatusCode(-22);
    pub const ERR_NO_MEM: StatusCode = StatusCode(-23);
    pub const ERR_NO_RESOURCES: StatusCode = StatusCode(-24);
    pub const ERR_NULL_PTR: StatusCode = StatusCode(-25);
    pub const ERR_OPEN: StatusCode = StatusCode(-26);
    pub const ERR_OUT_OF_BOUNDS: StatusCode = StatusCode(-27);
    pub const ERR_READ: StatusCode = StatusCode(-28);
    pub const ERR_REMOTE_ERR: StatusCode = StatusCode(-29);
    pub const ERR_THREAD_CREATE: StatusCode = StatusCode(-30);
    pub const ERR_THREAD_JOIN: StatusCode = StatusCode(-31);
    pub const ERR_TIMEOUT: StatusCode = StatusCode(-32);
    pub const ERR_TOO_LARGE: StatusCode = StatusCode(-33);
    pub const ERR_TOO_SMALL: StatusCode = StatusCode(-34);
    pub const ERR_UNSUPPORTED: StatusCode = StatusCode(-35);
    pub const ERR_WINSOCK: StatusCode = StatusCode(-36);
    pub const ERR_WRITE: StatusCode = StatusCode(-37);
    pub const ERR_PARTIAL: StatusCode = StatusCode(-38);
    pub const ERR_BUSY: StatusCode = StatusCode(-39);
}

impl StatusCode {
    /// Returns whether this is the success sentinel.
    ///
    /// # Example
    ///
    /// ```
    /// use plctag_client::StatusCode;
    ///
    /// assert!(StatusCode::OK.is_ok());
    /// assert!(!StatusCode::PENDING.is_ok());
    /// assert!(!StatusCode::ERR_TIMEOUT.is_ok());
    /// ```
    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// Returns whether this is the timeout error.
    pub fn is_timeout(self) -> bool {
        self == Self::ERR_TIMEOUT
    }

    /// Returns whether this is an error code.
    pub fn is_err(self) -> bool {
        self.0 < 0
    }

    /// Returns the static reason text for this code.
    ///
    /// # Example
    ///
    /// ```
    /// use plctag_client::StatusCode;
    ///
    /// assert_eq!(StatusCode::ERR_TIMEOUT.description(), "PLCTAG_ERR_TIMEOUT");
    /// assert_eq!(StatusCode(-1000).description(), "Unknown error.");
    /// ```
    pub fn description(self) -> &'static str {
        match self.0 {
            1 => "PLCTAG_STATUS_PENDING",
            0 => "PLCTAG_STATUS_OK",
            -1 => "PLCTAG_ERR_ABORT",
            -2 => "PLCTAG_ERR_BAD_CONFIG",
            -3 => "PLCTAG_ERR_BAD_CONNECTION",
            -4 => "PLCTAG_ERR_BAD_DATA",
            -5 => "PLCTAG_ERR_BAD_DEVICE",
            -6 => "PLCTAG_ERR_BAD_GATEWAY",
            -7 => "PLCTAG_ERR_BAD_PARAM",
            -8 => "PLCTAG_ERR_BAD_REPLY",
            -9 => "PLCTAG_ERR_BAD_STATUS",
            -10 => "PLCTAG_ERR_CLOSE",
            -11 => "PLCTAG_ERR_CREATE",
            -12 => "PLCTAG_ERR_DUPLICATE",
            -13 => "PLCTAG_ERR_ENCODE",
            -14 => "PLCTAG_ERR_MUTEX_DESTROY",
            -15 => "PLCTAG_ERR_MUTEX_INIT",
            -16 => "PLCTAG_ERR_MUTEX_LOCK",
            -17 => "PLCTAG_ERR_MUTEX_UNLOCK",
            -18 => "PLCTAG_ERR_NOT_ALLOWED",
            -19 => "PLCTAG_ERR_NOT_FOUND",
            -20 => "PLCTAG_ERR_NOT_IMPLEMENTED",
            -21 => "PLCTAG_ERR_NO_DATA",
            -22 => "PLCTAG_ERR_NO_MATCH",
            -23 => "PLCTAG_ERR_NO_MEM",
            -24 => "PLCTAG_ERR_NO_RESOURCES",
            -25 => "PLCTAG_ERR_NULL_PTR",
            -26 => "PLCTAG_ERR_OPEN",
            -27 => "PLCTAG_ERR_OUT_OF_BOUNDS",
            -28 => "PLCTAG_ERR_READ",
            -29 => "PLCTAG_ERR_REMOTE_ERR",
            -30 => "PLCTAG_ERR_THREAD_CREATE",
            -31 => "PLCTAG_ERR_THREAD_JOIN",
            -32 => "PLCTAG_ERR_TIMEOUT",
            -33 => "PLCTAG_ERR_TOO_LARGE",
            -34 => "PLCTAG_ERR_TOO_SMALL",
            -35 => "PLCTAG_ERR_UNSUPPORTED",
            -36 => "PLCTAG_ERR_WINSOCK",
            -37 => "PLCTAG_ERR_WRITE",
            -38 => "PLCTAG_ERR_PARTIAL",
            -39 => "PLCTAG_ERR_BUSY",
            _ => "Unknown error.",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for StatusCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

/// Opaque handle to a tag created by an engine.
///
/// Deliberately neither `Copy` nor `Clone`: [`TagEngine::destroy`] consumes
/// the handle, so a destroyed handle cannot be used or destroyed again.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TagHandle(i32);

impl TagHandle {
    /// Wraps a raw, non-negative engine handle.
    ///
    /// Only engine implementations should call this.
    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw engine handle.
    pub fn raw(&self) -> i32 {
        self.0
    }
}

/// Capability set of an external tag engine.
///
/// Every blocking call takes the timeout to apply. A timeout is reported as
/// [`StatusCode::ERR_TIMEOUT`], never as a panic.
pub trait TagEngine {
    /// Creates a tag from its descriptor.
    ///
    /// Returns the failing status when the engine cannot create the tag at all.
    fn create(
        &mut self,
        descriptor: &TagDescriptor,
        timeout: Duration,
    ) -> std::result::Result<TagHandle, StatusCode>;

    /// Releases the tag and its buffer.
    fn destroy(&mut self, handle: TagHandle);

    /// Returns the current status of the tag.
    fn status(&self, handle: &TagHandle) -> StatusCode;

    /// Reads the tag from the controller into its buffer.
    fn read(&mut self, handle: &TagHandle, timeout: Duration) -> StatusCode;

    /// Writes the tag buffer to the controller.
    fn write(&mut self, handle: &TagHandle, timeout: Duration) -> StatusCode;

    /// Reads a byte at `offset`.
    fn get_u8(&self, handle: &TagHandle, offset: usize) -> u8;

    /// Stores a byte at `offset`.
    fn set_u8(&mut self, handle: &TagHandle, offset: usize, value: u8);

    /// Reads a 16-bit word at `offset`.
    fn get_u16(&self, handle: &TagHandle, offset: usize) -> u16;

    /// Stores a 16-bit word at `offset`.
    fn set_u16(&mut self, handle: &TagHandle, offset: usize, value: u16);

    /// Reads a 32-bit word at `offset`.
    fn get_u32(&self, handle: &TagHandle, offset: usize) -> u32;

    /// Stores a 32-bit word at `offset`.
    fn set_u32(&mut self, handle: &TagHandle, offset: usize, value: u32);

    /// Reads a signed 16-bit value at `offset`.
    fn get_i16(&self, handle: &TagHandle, offset: usize) -> i16 {
        self.get_u16(handle, offset) as i16
    }

    /// Stores a signed 16-bit value at `offset`.
    fn set_i16(&mut self, handle: &TagHandle, offset: usize, value: i16) {
        self.set_u16(handle, offset, value as u16)
    }

    /// Reads a signed 32-bit value at `offset`.
    fn get_i32(&self, handle: &TagHandle, offset: usize) -> i32 {
        self.get_u32(handle, offset) as i32
    }

    /// Stores a signed 32-bit value at `offset`.
    fn set_i32(&mut self, handle: &TagHandle, offset: usize, value: i32) {
        self.set_u32(handle, offset, value as u32)
    }

    /// Reads an IEEE-754 single at `offset`.
    fn get_f32(&self, handle: &TagHandle, offset: usize) -> f32 {
        f32::from_bits(self.get_u32(handle, offset))
    }

    /// Stores an IEEE-754 single at `offset`.
    fn set_f32(&mut self, handle: &TagHandle, offset: usize, value: f32) {
        self.set_u32(handle, offset, value.to_bits())
    }

    /// Decodes a status code into a human-readable reason.
    fn decode_status(&self, status: StatusCode) -> String {
        status.description().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(StatusCode::OK.is_ok());
        assert!(!StatusCode::OK.is_err());
        assert!(!StatusCode::PENDING.is_err());
        assert!(StatusCode::ERR_TIMEOUT.is_timeout());
        assert!(StatusCode::ERR_TIMEOUT.is_err());
        assert!(!StatusCode::ERR_READ.is_timeout());
    }

    #[test]
    fn test_status_descriptions() {
        assert_eq!(StatusCode::OK.description(), "PLCTAG_STATUS_OK");
        assert_eq!(
            StatusCode::ERR_OUT_OF_BOUNDS.description(),
            "PLCTAG_ERR_OUT_OF_BOUNDS"
        );
        assert_eq!(StatusCode::ERR_BUSY.description(), "PLCTAG_ERR_BUSY");
        assert_eq!(StatusCode(7).description(), "Unknown error.");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StatusCode::ERR_NOT_FOUND.to_string(), "-19");
        assert_eq!(StatusCode::from(0), StatusCode::OK);
    }

    #[test]
    fn test_handle_raw() {
        let handle = TagHandle::from_raw(42);
        assert_eq!(handle.raw(), 42);
    }
}
