//! Connection configuration and tag descriptors.
//!
//! A tag engine identifies a tag by a descriptor string built from the global
//! connection parameters plus the tag's own name and shape. It is composed of
//! ampersand-delimited `key=value` pairs, similar to a URL query:
//!
//! ```text
//! protocol=ab-eip&gateway=10.0.0.1&path=1,0&cpu=LGX&elem_size=2&elem_count=1&debug=1&name=Mode
//! ```
//!
//! | Key | Source |
//! |-----|--------|
//! | `protocol` | [`ConnectionConfig::protocol`] |
//! | `gateway` | [`ConnectionConfig::gateway`] |
//! | `path` | [`ConnectionConfig::path`] (backplane, slot) |
//! | `cpu` | [`ConnectionConfig::cpu`] |
//! | `elem_size` | bytes per element |
//! | `elem_count` | number of elements |
//! | `debug` | [`ConnectionConfig::debug_level`] |
//! | `name` | tag name on the controller |
//!
//! # Example
//!
//! ```
//! use plctag_client::{ConnectionConfig, ControllerFamily};
//!
//! let config = ConnectionConfig::default()
//!     .with_gateway("10.0.0.1")
//!     .with_cpu(ControllerFamily::Logix)
//!     .with_debug_level(1);
//!
//! let descriptor = config.descriptor("Mode", 2, 1)?;
//! assert_eq!(
//!     descriptor.as_str(),
//!     "protocol=ab-eip&gateway=10.0.0.1&path=1,0&cpu=LGX&elem_size=2&elem_count=1&debug=1&name=Mode"
//! );
//! # Ok::<(), plctag_client::TagError>(())
//! ```

use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TagError};
use crate::registry::TagSpec;

/// Default gateway address.
pub const DEFAULT_GATEWAY: &str = "192.168.1.200";

/// Default routing path (backplane 1, slot 0).
pub const DEFAULT_PATH: &str = "1,0";

/// Default engine debug level.
pub const DEFAULT_DEBUG_LEVEL: u32 = 4;

/// Default timeout for create, read and write.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Protocol spoken by the tag engine to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Protocol {
    /// EtherNet/IP with CIP, as used by Allen-Bradley controllers.
    #[default]
    AbEip,
    /// Modbus over TCP.
    ModbusTcp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::AbEip => write!(f, "ab-eip"),
            Protocol::ModbusTcp => write!(f, "modbus-tcp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "ab-eip" => Ok(Protocol::AbEip),
            "modbus-tcp" => Ok(Protocol::ModbusTcp),
            _ => Err(TagError::invalid_parameter(
                "protocol",
                format!("unknown protocol \"{s}\""),
            )),
        }
    }
}

/// Controller family addressed by the descriptor's `cpu` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControllerFamily {
    /// ControlLogix / CompactLogix.
    #[default]
    Logix,
    /// PLC-5.
    Plc5,
    /// SLC 500.
    Slc,
    /// MicroLogix.
    MicroLogix,
    /// Micro800.
    Micro800,
    /// Omron NJ/NX series.
    OmronNjNx,
}

impl std::fmt::Display for ControllerFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerFamily::Logix => write!(f, "LGX"),
            ControllerFamily::Plc5 => write!(f, "PLC5"),
            ControllerFamily::Slc => write!(f, "SLC"),
            ControllerFamily::MicroLogix => write!(f, "MLGX"),
            ControllerFamily::Micro800 => write!(f, "Micro800"),
            ControllerFamily::OmronNjNx => write!(f, "omron-njnx"),
        }
    }
}

impl FromStr for ControllerFamily {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lgx" | "logix" | "controllogix" | "compactlogix" => Ok(ControllerFamily::Logix),
            "plc5" | "plc" => Ok(ControllerFamily::Plc5),
            "slc" | "slc500" => Ok(ControllerFamily::Slc),
            "mlgx" | "micrologix" => Ok(ControllerFamily::MicroLogix),
            "micro800" | "micro8xx" => Ok(ControllerFamily::Micro800),
            "omron-njnx" | "omron-nj" | "omron-nx" => Ok(ControllerFamily::OmronNjNx),
            _ => Err(TagError::invalid_parameter(
                "cpu",
                format!("unknown controller family \"{s}\""),
            )),
        }
    }
}

/// Global connection parameters shared by every tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionConfig {
    /// Protocol spoken to the controller.
    pub protocol: Protocol,
    /// Gateway host name or IP address.
    pub gateway: String,
    /// Routing path from the gateway to the controller.
    pub path: String,
    /// Controller family.
    pub cpu: ControllerFamily,
    /// Engine debug level.
    pub debug_level: u32,
    /// Timeout applied to create, read and write.
    pub timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::AbEip,
            gateway: DEFAULT_GATEWAY.to_string(),
            path: DEFAULT_PATH.to_string(),
            cpu: ControllerFamily::Logix,
            debug_level: DEFAULT_DEBUG_LEVEL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Creates a configuration for the given gateway with default settings.
    ///
    /// # Example
    ///
    /// ```
    /// use plctag_client::ConnectionConfig;
    ///
    /// let config = ConnectionConfig::new("10.206.1.27");
    /// assert_eq!(config.gateway, "10.206.1.27");
    /// assert_eq!(config.path, "1,0");
    /// ```
    pub fn new(gateway: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
            ..Self::default()
        }
    }

    /// Sets the protocol (default is `ab-eip`).
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Sets the gateway address.
    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = gateway.into();
        self
    }

    /// Sets the routing path (default is `1,0`).
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the controller family (default is `LGX`).
    pub fn with_cpu(mut self, cpu: ControllerFamily) -> Self {
        self.cpu = cpu;
        self
    }

    /// Sets the engine debug level (default is 4).
    pub fn with_debug_level(mut self, debug_level: u32) -> Self {
        self.debug_level = debug_level;
        self
    }

    /// Sets the timeout (default is 5 seconds).
    ///
    /// # Example
    ///
    /// ```
    /// use plctag_client::ConnectionConfig;
    /// use std::time::Duration;
    ///
    /// let config = ConnectionConfig::default().with_timeout(Duration::from_secs(2));
    /// assert_eq!(config.timeout, Duration::from_secs(2));
    /// ```
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Loads the configuration from `PLCTAG_*` environment variables.
    ///
    /// Unset variables keep their defaults. See [`ConnectionConfig::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from a key lookup.
    ///
    /// Recognized keys: `PLCTAG_PROTOCOL`, `PLCTAG_GATEWAY`, `PLCTAG_PATH`,
    /// `PLCTAG_CPU`, `PLCTAG_DEBUG`, `PLCTAG_TIMEOUT_MS`.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidParameter` when a value does not parse.
    ///
    /// # Example
    ///
    /// ```
    /// use plctag_client::ConnectionConfig;
    /// use std::time::Duration;
    ///
    /// let config = ConnectionConfig::from_lookup(|key| match key {
    ///     "PLCTAG_GATEWAY" => Some("10.0.0.1".to_string()),
    ///     "PLCTAG_TIMEOUT_MS" => Some("250".to_string()),
    ///     _ => None,
    /// })?;
    /// assert_eq!(config.gateway, "10.0.0.1");
    /// assert_eq!(config.timeout, Duration::from_millis(250));
    /// # Ok::<(), plctag_client::TagError>(())
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(protocol) = lookup("PLCTAG_PROTOCOL") {
            config.protocol = protocol.trim().parse()?;
        }
        if let Some(gateway) = lookup("PLCTAG_GATEWAY") {
            config.gateway = gateway.trim().to_string();
        }
        if let Some(path) = lookup("PLCTAG_PATH") {
            config.path = path.trim().to_string();
        }
        if let Some(cpu) = lookup("PLCTAG_CPU") {
            config.cpu = cpu.trim().parse()?;
        }
        if let Some(debug) = lookup("PLCTAG_DEBUG") {
            config.debug_level = debug.trim().parse().map_err(|_| {
                TagError::invalid_parameter("PLCTAG_DEBUG", format!("not a number: \"{debug}\""))
            })?;
        }
        if let Some(timeout) = lookup("PLCTAG_TIMEOUT_MS") {
            let millis: u64 = timeout.trim().parse().map_err(|_| {
                TagError::invalid_parameter(
                    "PLCTAG_TIMEOUT_MS",
                    format!("not a number: \"{timeout}\""),
                )
            })?;
            if millis == 0 {
                return Err(TagError::invalid_parameter(
                    "PLCTAG_TIMEOUT_MS",
                    "must be greater than 0",
                ));
            }
            config.timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Builds the descriptor for one tag.
    ///
    /// # Arguments
    ///
    /// * `name` - Tag name on the controller
    /// * `element_size` - Bytes per element (> 0)
    /// * `element_count` - Number of elements (>= 1)
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidParameter` if:
    /// - The name is empty or contains `&`, `=` or NUL
    /// - The gateway or path contains `&`, `=` or NUL
    /// - The element size is 0
    /// - The element count is 0
    /// - The buffer size (`element_size * element_count`) overflows `usize`
    pub fn descriptor(
        &self,
        name: &str,
        element_size: usize,
        element_count: usize,
    ) -> Result<TagDescriptor> {
        validate_name(name)?;
        validate_value("gateway", &self.gateway)?;
        validate_value("path", &self.path)?;
        if element_size == 0 {
            return Err(TagError::invalid_parameter(
                "element_size",
                "must be greater than 0",
            ));
        }
        if element_count == 0 {
            return Err(TagError::invalid_parameter(
                "element_count",
                "must be at least 1",
            ));
        }
        if element_size.checked_mul(element_count).is_none() {
            return Err(TagError::invalid_parameter(
                "element_count",
                format!("{element_count} elements of {element_size} bytes overflow the buffer size"),
            ));
        }

        let descriptor = TagDescriptor::new(
            self.protocol,
            self.gateway.clone(),
            self.path.clone(),
            self.cpu,
            element_size,
            element_count,
            self.debug_level,
            name.to_string(),
        );
        log::debug!("created tag path \"{}\"", descriptor);
        Ok(descriptor)
    }

    /// Builds the descriptor for a registry spec.
    pub fn descriptor_for(&self, spec: &TagSpec) -> Result<TagDescriptor> {
        self.descriptor(&spec.name, spec.element_size, spec.element_count)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TagError::invalid_parameter("name", "must not be empty"));
    }
    validate_value("name", name)
}

// `&` and `=` delimit descriptor pairs; NUL ends the C string.
fn validate_value(parameter: &str, value: &str) -> Result<()> {
    if value.contains(['&', '=', '\0']) {
        return Err(TagError::invalid_parameter(
            parameter,
            format!("\"{value}\" contains a reserved character"),
        ));
    }
    Ok(())
}

/// Everything a tag engine needs to create one tag.
///
/// Immutable once built. The serialized form is computed once and owned by
/// the descriptor, so it lives as long as the descriptor does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDescriptor {
    protocol: Protocol,
    gateway: String,
    path: String,
    cpu: ControllerFamily,
    element_size: usize,
    element_count: usize,
    debug_level: u32,
    name: String,
    serialized: String,
}

impl TagDescriptor {
    #[allow(clippy::too_many_arguments)]
    fn new(
        protocol: Protocol,
        gateway: String,
        path: String,
        cpu: ControllerFamily,
        element_size: usize,
        element_count: usize,
        debug_level: u32,
        name: String,
    ) -> Self {
        let serialized = format!(
            "protocol={protocol}&gateway={gateway}&path={path}&cpu={cpu}\
             &elem_size={element_size}&elem_count={element_count}&debug={debug_level}&name={name}"
        );
        Self {
            protocol,
            gateway,
            path,
            cpu,
            element_size,
            element_count,
            debug_level,
            name,
            serialized,
        }
    }

    /// Returns the serialized descriptor.
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Consumes the descriptor and returns the serialized form.
    pub fn into_string(self) -> String {
        self.serialized
    }

    /// Returns the tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Returns the gateway address.
    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Returns the routing path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the controller family.
    pub fn cpu(&self) -> ControllerFamily {
        self.cpu
    }

    /// Returns the bytes per element.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Returns the number of elements.
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Returns the engine debug level.
    pub fn debug_level(&self) -> u32 {
        self.debug_level
    }

    /// Returns the tag buffer size, `element_size * element_count`.
    ///
    /// Cannot overflow: [`ConnectionConfig::descriptor`] rejects shapes whose
    /// size does not fit in `usize`.
    pub fn buffer_size(&self) -> usize {
        self.element_size * self.element_count
    }
}

impl std::fmt::Display for TagDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.serialized)
    }
}

impl AsRef<str> for TagDescriptor {
    fn as_ref(&self) -> &str {
        &self.serialized
    }
}

impl FromStr for TagDescriptor {
    type Err = TagError;

    /// Parses a serialized descriptor. Key order is not significant; `debug`
    /// defaults to 0 when absent.
    fn from_str(s: &str) -> Result<Self> {
        let mut protocol = None;
        let mut gateway = None;
        let mut path = None;
        let mut cpu = None;
        let mut element_size = None;
        let mut element_count = None;
        let mut debug_level = 0;
        let mut name = None;

        for pair in s.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                TagError::invalid_parameter("descriptor", format!("malformed pair \"{pair}\""))
            })?;
            match key {
                "protocol" => protocol = Some(value.parse::<Protocol>()?),
                "gateway" => gateway = Some(value.to_string()),
                "path" => path = Some(value.to_string()),
                "cpu" | "plc" => cpu = Some(value.parse::<ControllerFamily>()?),
                "elem_size" => element_size = Some(parse_number(key, value)?),
                "elem_count" => element_count = Some(parse_number(key, value)?),
                "debug" => debug_level = parse_number::<u32>(key, value)?,
                "name" => name = Some(value.to_string()),
                _ => {
                    return Err(TagError::invalid_parameter(
                        "descriptor",
                        format!("unknown key \"{key}\""),
                    ))
                }
            }
        }

        let missing = |key: &str| TagError::invalid_parameter("descriptor", format!("missing \"{key}\""));
        let config = ConnectionConfig {
            protocol: protocol.ok_or_else(|| missing("protocol"))?,
            gateway: gateway.ok_or_else(|| missing("gateway"))?,
            path: path.unwrap_or_default(),
            cpu: cpu.ok_or_else(|| missing("cpu"))?,
            debug_level,
            timeout: DEFAULT_TIMEOUT,
        };
        config.descriptor(
            &name.ok_or_else(|| missing("name"))?,
            element_size.ok_or_else(|| missing("elem_size"))?,
            element_count.unwrap_or(1),
        )
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| TagError::invalid_parameter(key, format!("not a number: \"{value}\"")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_config() -> ConnectionConfig {
        ConnectionConfig::new("10.0.0.1")
            .with_protocol(Protocol::AbEip)
            .with_path("1,0")
            .with_cpu(ControllerFamily::Logix)
            .with_debug_level(1)
    }

    #[test]
    fn test_descriptor_serialization() {
        let descriptor = reference_config().descriptor("Mode", 2, 1).unwrap();
        assert_eq!(
            descriptor.as_str(),
            "protocol=ab-eip&gateway=10.0.0.1&path=1,0&cpu=LGX&elem_size=2&elem_count=1&debug=1&name=Mode"
        );
        assert_eq!(descriptor.buffer_size(), 2);
    }

    #[test]
    fn test_descriptor_is_deterministic() {
        let config = reference_config();
        let a = config.descriptor("FaultMessage", 88, 1).unwrap();
        let b = config.descriptor("FaultMessage", 88, 1).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.into_string());
    }

    #[test]
    fn test_descriptor_outlives_config() {
        let descriptor = {
            let config = reference_config().with_gateway("10.206.1.27");
            config.descriptor("Loc_Txt", 88, 48).unwrap()
        };
        assert!(descriptor.as_str().contains("gateway=10.206.1.27"));
        assert!(descriptor.as_str().ends_with("elem_size=88&elem_count=48&debug=1&name=Loc_Txt"));
        assert_eq!(descriptor.buffer_size(), 88 * 48);
    }

    #[test]
    fn test_descriptor_validation() {
        let config = reference_config();
        assert!(matches!(
            config.descriptor("", 2, 1),
            Err(TagError::InvalidParameter { .. })
        ));
        assert!(config.descriptor("Mode", 0, 1).is_err());
        assert!(config.descriptor("Mode", 2, 0).is_err());
        assert!(config.descriptor("Mode&debug=9", 2, 1).is_err());
    }

    #[test]
    fn test_gateway_and_path_cannot_inject_pairs() {
        let err = reference_config()
            .with_gateway("10.0.0.1&name=Other")
            .descriptor("Mode", 2, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            TagError::InvalidParameter { ref parameter, .. } if parameter == "gateway"
        ));

        let err = reference_config()
            .with_path("1,0&debug=9")
            .descriptor("Mode", 2, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            TagError::InvalidParameter { ref parameter, .. } if parameter == "path"
        ));

        assert!(reference_config()
            .with_gateway("plc\0")
            .descriptor("Mode", 2, 1)
            .is_err());
    }

    #[test]
    fn test_oversized_shape_rejected() {
        let config = reference_config();
        assert!(matches!(
            config.descriptor("Huge", usize::MAX / 2, 3),
            Err(TagError::InvalidParameter { .. })
        ));
        assert_eq!(
            config.descriptor("Big", 88, 48).unwrap().buffer_size(),
            88 * 48
        );
    }

    #[test]
    fn test_descriptor_for_spec() {
        use crate::value::TagKind;

        let spec = TagSpec::new("Loc_Txt", TagKind::String).with_element_count(48);
        let descriptor = reference_config().descriptor_for(&spec).unwrap();
        assert_eq!(descriptor.element_size(), 88);
        assert_eq!(descriptor.element_count(), 48);
        assert_eq!(descriptor.name(), "Loc_Txt");
    }

    #[test]
    fn test_descriptor_parse_roundtrip() {
        let descriptor = reference_config().descriptor("State", 2, 1).unwrap();
        let parsed: TagDescriptor = descriptor.as_str().parse().unwrap();
        assert_eq!(parsed, descriptor);
    }

    #[test]
    fn test_descriptor_parse_any_key_order() {
        let parsed: TagDescriptor =
            "protocol=ab_eip&gateway=192.168.1.200&path=1,0&cpu=LGX&elem_size=4&elem_count=10&name=myDINTArray&debug=4"
                .parse()
                .unwrap();
        assert_eq!(parsed.name(), "myDINTArray");
        assert_eq!(parsed.protocol(), Protocol::AbEip);
        assert_eq!(parsed.element_size(), 4);
        assert_eq!(parsed.element_count(), 10);
        assert_eq!(parsed.debug_level(), 4);
    }

    #[test]
    fn test_descriptor_parse_rejects_garbage() {
        assert!("protocol=ab-eip&gateway".parse::<TagDescriptor>().is_err());
        assert!("protocol=ab-eip&gateway=h&cpu=LGX&elem_size=2"
            .parse::<TagDescriptor>()
            .is_err());
        assert!("protocol=ab-eip&gateway=h&cpu=LGX&elem_size=x&name=A"
            .parse::<TagDescriptor>()
            .is_err());
    }

    #[test]
    fn test_enum_tokens() {
        assert_eq!(Protocol::AbEip.to_string(), "ab-eip");
        assert_eq!(Protocol::ModbusTcp.to_string(), "modbus-tcp");
        assert_eq!("AB_EIP".parse::<Protocol>().unwrap(), Protocol::AbEip);
        assert_eq!(ControllerFamily::Logix.to_string(), "LGX");
        assert_eq!(ControllerFamily::MicroLogix.to_string(), "MLGX");
        assert_eq!(
            "micro800".parse::<ControllerFamily>().unwrap(),
            ControllerFamily::Micro800
        );
        assert!("s7".parse::<ControllerFamily>().is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.protocol, Protocol::AbEip);
        assert_eq!(config.gateway, DEFAULT_GATEWAY);
        assert_eq!(config.path, DEFAULT_PATH);
        assert_eq!(config.cpu, ControllerFamily::Logix);
        assert_eq!(config.debug_level, 4);
        assert_eq!(config.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_config_from_lookup() {
        let config = ConnectionConfig::from_lookup(|key| match key {
            "PLCTAG_PROTOCOL" => Some("modbus_tcp".into()),
            "PLCTAG_CPU" => Some("mlgx".into()),
            "PLCTAG_PATH" => Some(" 1,2 ".into()),
            "PLCTAG_DEBUG" => Some("0".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.protocol, Protocol::ModbusTcp);
        assert_eq!(config.cpu, ControllerFamily::MicroLogix);
        assert_eq!(config.path, "1,2");
        assert_eq!(config.debug_level, 0);
        assert_eq!(config.gateway, DEFAULT_GATEWAY);
    }

    #[test]
    fn test_config_from_lookup_rejects_bad_values() {
        let err = ConnectionConfig::from_lookup(|key| {
            (key == "PLCTAG_TIMEOUT_MS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("PLCTAG_TIMEOUT_MS"));

        assert!(ConnectionConfig::from_lookup(|key| {
            (key == "PLCTAG_TIMEOUT_MS").then(|| "0".to_string())
        })
        .is_err());
        assert!(ConnectionConfig::from_lookup(|key| {
            (key == "PLCTAG_PROTOCOL").then(|| "profinet".to_string())
        })
        .is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serde_roundtrip() {
        let config = reference_config();
        let json = serde_json::to_string(&config).unwrap();
        let back: ConnectionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
