//! Tag registry.
//!
//! [`TagRegistry`] is the sole owner of every [`TagHandle`] it creates. It
//! borrows the engine for its whole lifetime, so handles can never outlive the
//! engine that produced them, and it destroys each handle exactly once:
//! either in [`TagRegistry::close_all`] or, if that was never called, when the
//! registry is dropped.
//!
//! # Example
//!
//! ```
//! use plctag_client::{ConnectionConfig, SimulatedEngine, TagKind, TagRegistry, TagSpec, TagValue};
//!
//! let mut engine = SimulatedEngine::new();
//! let config = ConnectionConfig::default();
//! let specs = [
//!     TagSpec::new("Mode", TagKind::U16),
//!     TagSpec::new("StateName", TagKind::String),
//! ];
//!
//! let mut tags = TagRegistry::open_all(&mut engine, &config, &specs)?;
//! tags.set_value("Mode", &TagValue::U16(2))?;
//! tags.write("Mode")?;
//! tags.read_all()?;
//! assert_eq!(tags.value("Mode")?, TagValue::U16(2));
//!
//! assert_eq!(tags.close_all(), 2);
//! assert_eq!(engine.live_handles(), 0);
//! # Ok::<(), plctag_client::TagError>(())
//! ```

use std::collections::HashSet;
use std::time::Duration;

use crate::descriptor::ConnectionConfig;
use crate::engine::{StatusCode, TagEngine, TagHandle};
use crate::error::{Operation, Result, TagError};
use crate::value::{TagKind, TagValue};

/// Shape of one logical tag to register.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagSpec {
    /// Tag name on the controller.
    pub name: String,
    /// How the buffer is interpreted.
    pub kind: TagKind,
    /// Bytes per element.
    pub element_size: usize,
    /// Number of elements.
    pub element_count: usize,
}

impl TagSpec {
    /// Creates a single-element spec sized for `kind`.
    ///
    /// # Example
    ///
    /// ```
    /// use plctag_client::{TagKind, TagSpec};
    ///
    /// let spec = TagSpec::new("FaultMessage", TagKind::String);
    /// assert_eq!(spec.element_size, 88);
    /// assert_eq!(spec.element_count, 1);
    /// ```
    pub fn new(name: impl Into<String>, kind: TagKind) -> Self {
        Self {
            name: name.into(),
            kind,
            element_size: kind.element_size(),
            element_count: 1,
        }
    }

    /// Sets the number of elements (default is 1).
    pub fn with_element_count(mut self, element_count: usize) -> Self {
        self.element_count = element_count;
        self
    }

    /// Overrides the element size (default is the kind's size).
    ///
    /// Useful when the controller pads elements, e.g. UDT members.
    pub fn with_element_size(mut self, element_size: usize) -> Self {
        self.element_size = element_size;
        self
    }
}

/// One registered tag.
#[derive(Debug)]
pub struct TagEntry {
    name: String,
    kind: TagKind,
    element_size: usize,
    element_count: usize,
    handle: TagHandle,
    last_status: StatusCode,
}

impl TagEntry {
    /// Tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interpretation of the buffer.
    pub fn kind(&self) -> TagKind {
        self.kind
    }

    /// Bytes per element, padding included.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Number of elements.
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Engine handle, borrowed from the registry.
    pub fn handle(&self) -> &TagHandle {
        &self.handle
    }

    /// Status of the most recent setup, read or write.
    pub fn last_status(&self) -> StatusCode {
        self.last_status
    }
}

/// Owned collection of live tags, in registration order.
pub struct TagRegistry<'e, E: TagEngine + ?Sized> {
    engine: &'e mut E,
    entries: Vec<TagEntry>,
    timeout: Duration,
}

impl<'e, E: TagEngine + ?Sized> TagRegistry<'e, E> {
    /// Creates every tag in `specs` and checks its status.
    ///
    /// Tags are created in order. On the first failure, every handle this call
    /// already created is destroyed before the error is returned, including a
    /// handle whose post-create status check failed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Two specs share a name (`TagError::DuplicateTag`, nothing is created)
    /// - A spec has an invalid name or shape (`TagError::InvalidParameter`)
    /// - The engine refuses to create a tag (`TagError::Create`)
    /// - A created tag reports a non-OK status (`TagError::Status`/`Timeout`)
    pub fn open_all(
        engine: &'e mut E,
        config: &ConnectionConfig,
        specs: &[TagSpec],
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for spec in specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(TagError::DuplicateTag {
                    name: spec.name.clone(),
                });
            }
        }

        log::info!("creating {} tags", specs.len());
        let mut registry = Self {
            engine,
            entries: Vec::with_capacity(specs.len()),
            timeout: config.timeout,
        };

        for spec in specs {
            if let Err(err) = registry.open_one(config, spec) {
                let destroyed = registry.teardown();
                log::info!("destroyed {} tags after failed setup", destroyed);
                return Err(err);
            }
        }

        Ok(registry)
    }

    fn open_one(&mut self, config: &ConnectionConfig, spec: &TagSpec) -> Result<()> {
        if spec.element_size < spec.kind.element_size() {
            return Err(TagError::invalid_parameter(
                "element_size",
                format!(
                    "{} bytes is too small for {} tag \"{}\" ({} bytes needed)",
                    spec.element_size,
                    spec.kind,
                    spec.name,
                    spec.kind.element_size()
                ),
            ));
        }
        let descriptor = config.descriptor_for(spec)?;

        let handle = match self.engine.create(&descriptor, self.timeout) {
            Ok(handle) => handle,
            Err(code) => {
                let reason = self.engine.decode_status(code);
                log::error!(
                    "could not create tag \"{}\": error code {}: {}",
                    spec.name,
                    code,
                    reason
                );
                return Err(TagError::Create {
                    tag: spec.name.clone(),
                    code,
                    reason,
                });
            }
        };

        let status = self.engine.status(&handle);
        self.entries.push(TagEntry {
            name: spec.name.clone(),
            kind: spec.kind,
            element_size: spec.element_size,
            element_count: spec.element_count,
            handle,
            last_status: status,
        });
        let index = self.entries.len() - 1;
        self.check(index, Operation::Setup, status)
    }

    /// Destroys every handle, in registration order.
    ///
    /// Teardown is unconditional: each handle gets exactly one destroy call,
    /// whatever its last status. Returns the number of destroy calls.
    pub fn close_all(mut self) -> usize {
        self.teardown()
    }

    fn teardown(&mut self) -> usize {
        let mut destroyed = 0;
        for entry in self.entries.drain(..) {
            log::debug!("destroying tag \"{}\"", entry.name);
            self.engine.destroy(entry.handle);
            destroyed += 1;
        }
        destroyed
    }

    /// Returns the handle registered under `name`.
    ///
    /// # Panics
    ///
    /// Panics if no tag is registered under `name`. Names are fixed when the
    /// registry is opened, so a miss is a programming error.
    pub fn get(&self, name: &str) -> &TagHandle {
        match self.handle(name) {
            Some(handle) => handle,
            None => panic!("tag \"{name}\" is not registered"),
        }
    }

    /// Returns the handle registered under `name`, if any.
    pub fn handle(&self, name: &str) -> Option<&TagHandle> {
        self.entry(name).map(TagEntry::handle)
    }

    /// Returns the entry registered under `name`, if any.
    pub fn entry(&self, name: &str) -> Option<&TagEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Iterates over the entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &TagEntry> {
        self.entries.iter()
    }

    /// Iterates over the tag names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(TagEntry::name)
    }

    /// Number of registered tags.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no tag is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Status of the most recent operation on `name`.
    pub fn last_status(&self, name: &str) -> Option<StatusCode> {
        self.entry(name).map(TagEntry::last_status)
    }

    /// Timeout applied to every read and write.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Shared access to the engine, e.g. for primitive accessors.
    pub fn engine(&self) -> &E {
        &*self.engine
    }

    /// Reads one tag from the controller.
    pub fn read(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        self.read_index(index)
    }

    /// Writes one tag to the controller.
    pub fn write(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        self.write_index(index)
    }

    /// Reads every tag in registration order, stopping at the first failure.
    pub fn read_all(&mut self) -> Result<()> {
        for index in 0..self.entries.len() {
            self.read_index(index)?;
        }
        Ok(())
    }

    /// Writes the named tags in the given order, stopping at the first failure.
    ///
    /// Every name is resolved before anything is written.
    pub fn write_tags<'n, I>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = &'n str>,
    {
        let indices = names
            .into_iter()
            .map(|name| self.index_of(name))
            .collect::<Result<Vec<_>>>()?;
        for index in indices {
            self.write_index(index)?;
        }
        Ok(())
    }

    /// Decodes the first element of `name` according to its kind.
    pub fn value(&self, name: &str) -> Result<TagValue> {
        self.value_at(name, 0)
    }

    /// Decodes element `index` of `name` according to its kind.
    pub fn value_at(&self, name: &str, index: usize) -> Result<TagValue> {
        let entry = &self.entries[self.index_of(name)?];
        check_element(entry, index)?;
        Ok(entry
            .kind
            .decode(&*self.engine, &entry.handle, index * entry.element_size))
    }

    /// Encodes `value` into the first element of `name`'s buffer.
    ///
    /// The buffer is only sent to the controller by a later write.
    pub fn set_value(&mut self, name: &str, value: &TagValue) -> Result<()> {
        self.set_value_at(name, 0, value)
    }

    /// Encodes `value` into element `index` of `name`'s buffer.
    ///
    /// Elements are `element_size` bytes apart, padding included.
    ///
    /// # Errors
    ///
    /// Besides lookup and kind errors, returns the engine's status if it
    /// rejected the encode (for example `ERR_OUT_OF_BOUNDS`), so a stale
    /// buffer is never written silently.
    pub fn set_value_at(&mut self, name: &str, index: usize, value: &TagValue) -> Result<()> {
        let position = self.index_of(name)?;
        let entry = &self.entries[position];
        check_element(entry, index)?;
        value.encode(
            &mut *self.engine,
            &entry.handle,
            entry.kind,
            index * entry.element_size,
        )?;
        let status = self.engine.status(&entry.handle);
        self.check(position, Operation::Write, status)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name == name)
            .ok_or_else(|| TagError::invalid_parameter("name", format!("unknown tag \"{name}\"")))
    }

    fn read_index(&mut self, index: usize) -> Result<()> {
        let status = self.engine.read(&self.entries[index].handle, self.timeout);
        self.check(index, Operation::Read, status)
    }

    fn write_index(&mut self, index: usize) -> Result<()> {
        let status = self.engine.write(&self.entries[index].handle, self.timeout);
        self.check(index, Operation::Write, status)
    }

    fn check(&mut self, index: usize, operation: Operation, status: StatusCode) -> Result<()> {
        let entry = &mut self.entries[index];
        entry.last_status = status;
        if status.is_ok() {
            return Ok(());
        }

        let reason = self.engine.decode_status(status);
        log::error!(
            "{} failed on tag \"{}\": error code {}: {}",
            operation,
            entry.name,
            status,
            reason
        );
        Err(TagError::from_status(
            entry.name.clone(),
            operation,
            status,
            reason,
            self.timeout,
        ))
    }
}

fn check_element(entry: &TagEntry, index: usize) -> Result<()> {
    if index >= entry.element_count {
        return Err(TagError::invalid_parameter(
            "index",
            format!(
                "element {index} out of range for tag \"{}\" with {} elements",
                entry.name, entry.element_count
            ),
        ));
    }
    Ok(())
}

impl<E: TagEngine + ?Sized> Drop for TagRegistry<'_, E> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("registry dropped with {} live tags", self.entries.len());
            self.teardown();
        }
    }
}

impl<E: TagEngine + ?Sized> std::fmt::Debug for TagRegistry<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagRegistry")
            .field("entries", &self.entries)
            .field("timeout", &self.timeout)
            .finish()
    }
}
