//! In-memory tag engine.
//!
//! [`SimulatedEngine`] implements [`TagEngine`] against a simulated
//! controller: every tag name maps to a block of controller memory, `read`
//! copies that memory into the tag buffer and `write` copies the buffer back.
//! Tags created with the same name therefore share controller memory, as they
//! would on a real controller.
//!
//! Faults can be injected per tag name and operation, and every call is
//! counted, which makes the engine suitable for exercising failure handling.
//! Buffers are little-endian. As with libplctag, every accessor leaves its
//! outcome in the tag status: `OK`, or `ERR_OUT_OF_BOUNDS` for an offset
//! past the buffer.
//!
//! # Example
//!
//! ```
//! use plctag_client::{ConnectionConfig, SimulatedEngine, StatusCode, TagEngine};
//! use std::time::Duration;
//!
//! let mut engine = SimulatedEngine::new();
//! engine.fail_read("Mode", StatusCode::ERR_TIMEOUT);
//!
//! let descriptor = ConnectionConfig::default().descriptor("Mode", 2, 1)?;
//! let tag = engine.create(&descriptor, Duration::from_secs(1)).unwrap();
//! assert_eq!(engine.read(&tag, Duration::from_secs(1)), StatusCode::ERR_TIMEOUT);
//!
//! engine.destroy(tag);
//! assert_eq!(engine.live_handles(), 0);
//! # Ok::<(), plctag_client::TagError>(())
//! ```

use std::cell::Cell;
use std::collections::HashMap;
use std::time::Duration;

use crate::descriptor::TagDescriptor;
use crate::engine::{StatusCode, TagEngine, TagHandle};

/// Engine operation a fault can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOperation {
    /// `create` fails outright.
    Create,
    /// `status` right after a successful create reports the fault.
    Setup,
    /// `read` fails.
    Read,
    /// `write` fails.
    Write,
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    code: StatusCode,
    // Successful calls left before the fault fires.
    skip: usize,
}

#[derive(Debug)]
struct SimTag {
    name: String,
    buffer: Vec<u8>,
    status: Cell<StatusCode>,
}

/// Simulated tag engine backed by in-memory controller memory.
#[derive(Debug, Default)]
pub struct SimulatedEngine {
    next_handle: i32,
    tags: HashMap<i32, SimTag>,
    controller: HashMap<String, Vec<u8>>,
    faults: HashMap<(String, SimOperation), Fault>,
    created: Vec<String>,
    destroyed: Vec<String>,
    reads: Vec<String>,
    writes: Vec<String>,
    last_timeout: Option<Duration>,
}

impl SimulatedEngine {
    /// Creates an engine with empty controller memory and no faults.
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            ..Self::default()
        }
    }

    /// Seeds controller memory for `name`.
    ///
    /// Shorter seeds are zero-extended when a tag with a larger buffer reads them.
    pub fn preload(&mut self, name: impl Into<String>, bytes: &[u8]) {
        self.controller.insert(name.into(), bytes.to_vec());
    }

    /// Returns the controller memory behind `name`, if any tag wrote or created it.
    pub fn controller_memory(&self, name: &str) -> Option<&[u8]> {
        self.controller.get(name).map(Vec::as_slice)
    }

    /// Makes `operation` on `name` fail with `code` from now on.
    pub fn inject_fault(&mut self, name: impl Into<String>, operation: SimOperation, code: StatusCode) {
        self.inject_fault_after(name, operation, 0, code);
    }

    /// Makes `operation` on `name` fail with `code` after `successes` calls succeed.
    pub fn inject_fault_after(
        &mut self,
        name: impl Into<String>,
        operation: SimOperation,
        successes: usize,
        code: StatusCode,
    ) {
        self.faults.insert(
            (name.into(), operation),
            Fault {
                code,
                skip: successes,
            },
        );
    }

    /// Shorthand for a create fault.
    pub fn fail_create(&mut self, name: impl Into<String>, code: StatusCode) {
        self.inject_fault(name, SimOperation::Create, code);
    }

    /// Shorthand for a post-create status fault.
    pub fn fail_setup(&mut self, name: impl Into<String>, code: StatusCode) {
        self.inject_fault(name, SimOperation::Setup, code);
    }

    /// Shorthand for a read fault.
    pub fn fail_read(&mut self, name: impl Into<String>, code: StatusCode) {
        self.inject_fault(name, SimOperation::Read, code);
    }

    /// Shorthand for a write fault.
    pub fn fail_write(&mut self, name: impl Into<String>, code: StatusCode) {
        self.inject_fault(name, SimOperation::Write, code);
    }

    /// Removes every injected fault.
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Returns the tag buffer behind `handle`, if the handle is live.
    pub fn buffer(&self, handle: &TagHandle) -> Option<&[u8]> {
        self.tags.get(&handle.raw()).map(|tag| tag.buffer.as_slice())
    }

    /// Number of handles created and not yet destroyed.
    pub fn live_handles(&self) -> usize {
        self.tags.len()
    }

    /// Names of successfully created tags, in creation order.
    pub fn created(&self) -> &[String] {
        &self.created
    }

    /// Names of destroyed tags, in destroy order.
    pub fn destroyed(&self) -> &[String] {
        &self.destroyed
    }

    /// Names of read calls, in call order.
    pub fn reads(&self) -> &[String] {
        &self.reads
    }

    /// Names of write calls, in call order.
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    /// Timeout passed to the most recent blocking call.
    pub fn last_timeout(&self) -> Option<Duration> {
        self.last_timeout
    }

    fn take_fault(&mut self, name: &str, operation: SimOperation) -> Option<StatusCode> {
        let fault = self.faults.get_mut(&(name.to_string(), operation))?;
        if fault.skip > 0 {
            fault.skip -= 1;
            None
        } else {
            Some(fault.code)
        }
    }

    fn with_bytes<const N: usize>(&self, handle: &TagHandle, offset: usize) -> [u8; N] {
        let mut out = [0u8; N];
        if let Some(tag) = self.tags.get(&handle.raw()) {
            match offset.checked_add(N).and_then(|end| tag.buffer.get(offset..end)) {
                Some(bytes) => {
                    out.copy_from_slice(bytes);
                    tag.status.set(StatusCode::OK);
                }
                None => tag.status.set(StatusCode::ERR_OUT_OF_BOUNDS),
            }
        }
        out
    }

    fn store_bytes(&mut self, handle: &TagHandle, offset: usize, bytes: &[u8]) {
        if let Some(tag) = self.tags.get_mut(&handle.raw()) {
            let end = offset.checked_add(bytes.len());
            match end.and_then(|end| tag.buffer.get_mut(offset..end)) {
                Some(slot) => {
                    slot.copy_from_slice(bytes);
                    tag.status.set(StatusCode::OK);
                }
                None => tag.status.set(StatusCode::ERR_OUT_OF_BOUNDS),
            }
        }
    }
}

impl TagEngine for SimulatedEngine {
    fn create(
        &mut self,
        descriptor: &TagDescriptor,
        timeout: Duration,
    ) -> std::result::Result<TagHandle, StatusCode> {
        self.last_timeout = Some(timeout);
        let name = descriptor.name().to_string();
        if let Some(code) = self.take_fault(&name, SimOperation::Create) {
            return Err(code);
        }

        let size = descriptor.buffer_size();
        self.controller
            .entry(name.clone())
            .or_insert_with(|| vec![0; size]);

        let status = self
            .take_fault(&name, SimOperation::Setup)
            .unwrap_or(StatusCode::OK);
        let raw = self.next_handle;
        self.next_handle += 1;
        self.tags.insert(
            raw,
            SimTag {
                name: name.clone(),
                buffer: vec![0; size],
                status: Cell::new(status),
            },
        );
        self.created.push(name);
        Ok(TagHandle::from_raw(raw))
    }

    fn destroy(&mut self, handle: TagHandle) {
        if let Some(tag) = self.tags.remove(&handle.raw()) {
            self.destroyed.push(tag.name);
        }
    }

    fn status(&self, handle: &TagHandle) -> StatusCode {
        self.tags
            .get(&handle.raw())
            .map_or(StatusCode::ERR_NOT_FOUND, |tag| tag.status.get())
    }

    fn read(&mut self, handle: &TagHandle, timeout: Duration) -> StatusCode {
        self.last_timeout = Some(timeout);
        let Some(name) = self.tags.get(&handle.raw()).map(|tag| tag.name.clone()) else {
            return StatusCode::ERR_NOT_FOUND;
        };
        self.reads.push(name.clone());

        let status = match self.take_fault(&name, SimOperation::Read) {
            Some(code) => code,
            None => {
                let memory = self.controller.get(&name).cloned().unwrap_or_default();
                if let Some(tag) = self.tags.get_mut(&handle.raw()) {
                    let len = tag.buffer.len();
                    tag.buffer.fill(0);
                    let n = memory.len().min(len);
                    tag.buffer[..n].copy_from_slice(&memory[..n]);
                }
                StatusCode::OK
            }
        };
        if let Some(tag) = self.tags.get(&handle.raw()) {
            tag.status.set(status);
        }
        status
    }

    fn write(&mut self, handle: &TagHandle, timeout: Duration) -> StatusCode {
        self.last_timeout = Some(timeout);
        let Some(tag) = self.tags.get(&handle.raw()) else {
            return StatusCode::ERR_NOT_FOUND;
        };
        let name = tag.name.clone();
        let buffer = tag.buffer.clone();
        self.writes.push(name.clone());

        let status = match self.take_fault(&name, SimOperation::Write) {
            Some(code) => code,
            None => {
                self.controller.insert(name, buffer);
                StatusCode::OK
            }
        };
        if let Some(tag) = self.tags.get(&handle.raw()) {
            tag.status.set(status);
        }
        status
    }

    fn get_u8(&self, handle: &TagHandle, offset: usize) -> u8 {
        self.with_bytes::<1>(handle, offset)[0]
    }

    fn set_u8(&mut self, handle: &TagHandle, offset: usize, value: u8) {
        self.store_bytes(handle, offset, &[value]);
    }

    fn get_u16(&self, handle: &TagHandle, offset: usize) -> u16 {
        u16::from_le_bytes(self.with_bytes(handle, offset))
    }

    fn set_u16(&mut self, handle: &TagHandle, offset: usize, value: u16) {
        self.store_bytes(handle, offset, &value.to_le_bytes());
    }

    fn get_u32(&self, handle: &TagHandle, offset: usize) -> u32 {
        u32::from_le_bytes(self.with_bytes(handle, offset))
    }

    fn set_u32(&mut self, handle: &TagHandle, offset: usize, value: u32) {
        self.store_bytes(handle, offset, &value.to_le_bytes());
    }
}
