//! Lot configuration for the parklot coordinator.
//!
//! One TOML file describes the lot layout (destinations, group controllers
//! with their spaces, entrance controllers) plus radio and delivery
//! settings. `PARKLOT_`-prefixed environment variables overlay it, with
//! `__` separating nested keys (`PARKLOT_DELIVERY__MAX_ATTEMPTS=5`).

use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use parklot_core::{Position, Registry, RegistryError, RetryPolicy};
use parklot_radio::{NodeAddress, UdpConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default UDP port of the radio gateway.
pub const DEFAULT_PORT: u16 = 9750;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("invalid lot layout: {0}")]
    Registry(#[from] RegistryError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LotConfig {
    #[serde(default)]
    pub radio: RadioConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Places drivers want to park near, in display order.
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,

    /// Group controllers and the spaces they sense.
    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,

    /// Entrance controllers. The entrance index carried in vehicle-arrival
    /// frames is the position in this list.
    #[serde(default)]
    pub entrances: Vec<EntranceConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RadioConfig {
    /// Local socket the gateway binds to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    /// How long one transmission waits for the link acknowledgment.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Attempts before giving up on a frame. 0 retries forever.
    #[serde(default)]
    pub max_attempts: u32,

    /// Pause between failed attempts.
    #[serde(default)]
    pub backoff_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: default_attempt_timeout_ms(),
            max_attempts: 0,
            backoff_ms: 0,
        }
    }
}

fn default_attempt_timeout_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DestinationConfig {
    pub id: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    pub id: String,
    pub x: i32,
    pub y: i32,
    /// 64-bit radio address, hex.
    pub address: NodeAddress,
    /// Socket the gateway reaches this node at.
    pub peer: SocketAddr,
    #[serde(default)]
    pub spaces: Vec<SpaceConfig>,
}

/// A space, positioned relative to its controller.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpaceConfig {
    pub number: u8,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntranceConfig {
    pub address: NodeAddress,
    pub peer: SocketAddr,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the default config file path via platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "parklot", "parklot").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("lot.toml");
            p
        },
        |dirs| dirs.config_dir().join("lot.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("parklot");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate the config at `path` (or the default location),
/// overlaid by the environment.
pub fn load(path: Option<&Path>) -> Result<LotConfig, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    if !path.is_file() {
        return Err(ConfigError::NotFound { path });
    }

    let figment = Figment::new()
        .merge(Serialized::defaults(LotConfig::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("PARKLOT_").split("__"));

    let config: LotConfig = figment.extract()?;
    config.validate()?;
    Ok(config)
}

impl LotConfig {
    /// Checks the registry cannot express: timing values and address
    /// uniqueness across controllers and entrances.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delivery.attempt_timeout_ms == 0 {
            return Err(ConfigError::Validation {
                field: "delivery.attempt_timeout_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.entrances.len() > usize::from(u8::MAX) + 1 {
            return Err(ConfigError::Validation {
                field: "entrances".into(),
                reason: format!("{} configured, at most 256 are addressable", self.entrances.len()),
            });
        }

        let mut seen = HashSet::new();
        for (i, entrance) in self.entrances.iter().enumerate() {
            if !seen.insert(entrance.address) {
                return Err(ConfigError::Validation {
                    field: format!("entrances[{i}].address"),
                    reason: format!("{} is used by another entrance", entrance.address),
                });
            }
        }
        for controller in &self.controllers {
            if seen.contains(&controller.address) {
                return Err(ConfigError::Validation {
                    field: format!("controllers[{}].address", controller.id),
                    reason: format!("{} is already an entrance address", controller.address),
                });
            }
        }
        Ok(())
    }

    /// Build the entity registry in file order.
    pub fn build_registry(&self) -> Result<Registry, ConfigError> {
        let mut builder = Registry::builder();
        for d in &self.destinations {
            builder.destination(d.id.clone(), Position::new(d.x, d.y))?;
        }
        for c in &self.controllers {
            let idx = builder.controller(c.id.clone(), Position::new(c.x, c.y), c.address)?;
            for s in &c.spaces {
                builder.space(idx, s.number, s.x, s.y)?;
            }
        }
        Ok(builder.build())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let timeout = Duration::from_millis(self.delivery.attempt_timeout_ms);
        let policy = match NonZeroU32::new(self.delivery.max_attempts) {
            Some(max) => RetryPolicy::bounded(timeout, max),
            None => RetryPolicy::forever(timeout),
        };
        policy.with_backoff(Duration::from_millis(self.delivery.backoff_ms))
    }

    pub fn entrance_count(&self) -> usize {
        self.entrances.len()
    }

    /// Gateway settings with a peer socket for every configured node.
    pub fn udp_config(&self) -> UdpConfig {
        let mut peers = HashMap::with_capacity(self.controllers.len() + self.entrances.len());
        for c in &self.controllers {
            peers.insert(c.address, c.peer);
        }
        for e in &self.entrances {
            peers.insert(e.address, e.peer);
        }
        UdpConfig {
            bind: self.radio.bind,
            peers,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const LOT: &str = r#"
[delivery]
max_attempts = 4
backoff_ms = 250

[[destinations]]
id = "mall"
x = 40
y = 10

[[destinations]]
id = "cinema"
x = 300
y = 10

[[controllers]]
id = "G1"
x = 100
y = 50
address = "0013A200 40A1B2C3"
peer = "10.0.0.21:9750"
spaces = [ { number = 1, x = 0, y = 10 }, { number = 2, x = 12, y = 10 } ]

[[controllers]]
id = "G2"
x = 280
y = 50
address = "0013A20040A1B2C4"
peer = "10.0.0.22:9750"
spaces = [ { number = 1, x = 0, y = 0 } ]

[[entrances]]
address = "0x0013A20040A1B2FF"
peer = "10.0.0.30:9750"
"#;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_lot_layout() {
        let file = write(LOT);
        let config = load(Some(file.path())).unwrap();

        assert_eq!(config.radio.bind, default_bind());
        assert_eq!(config.delivery.attempt_timeout_ms, 3000);
        assert_eq!(config.entrance_count(), 1);

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.destination_count(), 2);
        let ids: Vec<&str> = registry.spaces().map(|(_, s)| s.id()).collect();
        assert_eq!(ids, ["G1.1", "G1.2", "G2.1"]);
        let g12 = registry.space_by_id("G1.2").unwrap();
        assert_eq!(registry.space(g12).position(), Position::new(112, 60));
        assert_eq!(
            registry.owner(g12).address(),
            NodeAddress::new(0x0013_A200_40A1_B2C3)
        );
    }

    #[test]
    fn delivery_settings_map_to_retry_policy() {
        let file = write(LOT);
        let policy = load(Some(file.path())).unwrap().retry_policy();
        assert_eq!(policy.attempt_timeout, Duration::from_secs(3));
        assert_eq!(policy.max_attempts, NonZeroU32::new(4));
        assert_eq!(policy.backoff, Duration::from_millis(250));

        assert_eq!(LotConfig::default().retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn udp_peers_cover_controllers_and_entrances() {
        let file = write(LOT);
        let udp = load(Some(file.path())).unwrap().udp_config();
        assert_eq!(udp.peers.len(), 3);
        assert_eq!(
            udp.peers[&NodeAddress::new(0x0013_A200_40A1_B2FF)],
            "10.0.0.30:9750".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            load(Some(&path)),
            Err(ConfigError::NotFound { path: p }) if p == path
        ));
    }

    #[test]
    fn bad_address_is_rejected() {
        let file = write(&LOT.replace("0013A200 40A1B2C3", "not-hex"));
        assert!(matches!(
            load(Some(file.path())),
            Err(ConfigError::Figment(_))
        ));
    }

    #[test]
    fn layout_errors_surface_from_registry() {
        let file = write(&LOT.replace("number = 2", "number = 1"));
        let config = load(Some(file.path())).unwrap();
        assert!(matches!(
            config.build_registry(),
            Err(ConfigError::Registry(RegistryError::DuplicateSpace(id))) if id == "G1.1"
        ));
    }

    #[test]
    fn entrance_and_controller_addresses_must_differ() {
        let file = write(&LOT.replace("0x0013A20040A1B2FF", "0013A20040A1B2C4"));
        assert!(matches!(
            load(Some(file.path())),
            Err(ConfigError::Validation { field, .. }) if field == "controllers[G2].address"
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config: LotConfig = toml::from_str(LOT).unwrap();
        config.delivery.attempt_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }
}
