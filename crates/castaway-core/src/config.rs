//! Configuration loading and typed config structures for Castaway.
//!
//! The canonical configuration lives in `castaway-config.yaml` in the
//! working directory. Every field has a default, so a partial (or missing)
//! file is always valid input; [`CastawayConfig::validate`] rejects values
//! that would wedge a session.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use castaway_types::Site;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is syntactically fine but unusable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `castaway-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CastawayConfig {
    /// Listener and static asset settings.
    #[serde(default)]
    pub server: ListenConfig,

    /// Session timing and gameplay tuning.
    #[serde(default)]
    pub session: SessionConfig,

    /// Site event odds.
    #[serde(default)]
    pub odds: OddsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CastawayConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the listener:
    /// - `CASTAWAY_HOST` overrides `server.host`
    /// - `CASTAWAY_PORT` overrides `server.port`
    /// - `CASTAWAY_STATIC_DIR` overrides `server.static_dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.server.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        self.odds.validate()
    }
}

/// Listener and static asset configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for paths that match no API route.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Session joined when a client does not name one.
    #[serde(default = "default_session_name")]
    pub default_session: String,
}

impl ListenConfig {
    /// Override listener settings with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CASTAWAY_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("CASTAWAY_PORT") {
            match val.parse() {
                Ok(port) => self.port = port,
                Err(e) => tracing::warn!(value = val, error = %e, "ignoring invalid CASTAWAY_PORT"),
            }
        }
        if let Ok(val) = std::env::var("CASTAWAY_STATIC_DIR") {
            self.static_dir = val;
        }
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            default_session: default_session_name(),
        }
    }
}

/// Session timing and gameplay tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Real-time milliseconds between clock ticks. All timers fire on a
    /// tick boundary, so this is the timer granularity.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Participants required before the waiting room can start.
    #[serde(default = "default_min_players")]
    pub min_players: usize,

    /// Window in which a second trade proposal completes the first.
    #[serde(default = "default_trade_timeout_ms")]
    pub trade_timeout_ms: u64,

    /// Number of event/status rounds per site visit.
    #[serde(default = "default_site_visit_rounds")]
    pub site_visit_rounds: u32,

    /// Length of an event phase.
    #[serde(default = "default_round_duration_ms")]
    pub round_duration_ms: u64,

    /// Length of a status phase.
    #[serde(default = "default_status_duration_ms")]
    pub status_duration_ms: u64,

    /// Cap on random events generated per participant per visit
    /// (the guaranteed repair is not counted).
    #[serde(default = "default_max_events_per_visit")]
    pub max_events_per_visit: usize,

    /// Integrity every site starts with.
    #[serde(default = "default_initial_integrity")]
    pub initial_integrity: u64,

    /// Repairs saturate at this integrity.
    #[serde(default = "default_max_integrity")]
    pub max_integrity: u64,

    /// Health a participant starts with.
    #[serde(default = "default_starting_health")]
    pub starting_health: u32,

    /// Health lost to an undefended attack.
    #[serde(default = "default_attack_damage")]
    pub attack_damage: u32,

    /// Supplies each beach visitor must account for before departure.
    #[serde(default = "default_beach_supplies_per_participant")]
    pub beach_supplies_per_participant: u32,

    /// When set, site selection ends after this long even if some
    /// participants have not chosen.
    #[serde(default)]
    pub site_selection_timeout_ms: Option<u64>,

    /// A session with no participants for this long shuts down. `null`
    /// keeps empty sessions forever.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: Option<u64>,

    /// Capacity of the session's inbound event channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Fixed RNG seed; entropy-seeded when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SessionConfig {
    /// Interval between clock ticks.
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Trade handshake window.
    pub const fn trade_timeout(&self) -> Duration {
        Duration::from_millis(self.trade_timeout_ms)
    }

    /// Event phase length.
    pub const fn round_duration(&self) -> Duration {
        Duration::from_millis(self.round_duration_ms)
    }

    /// Status phase length.
    pub const fn status_duration(&self) -> Duration {
        Duration::from_millis(self.status_duration_ms)
    }

    /// Optional site selection deadline.
    pub fn site_selection_timeout(&self) -> Option<Duration> {
        self.site_selection_timeout_ms.map(Duration::from_millis)
    }

    /// How long an empty session lingers before shutting down.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "session.tick_interval_ms must be at least 1".to_owned(),
            });
        }
        if self.site_visit_rounds == 0 {
            return Err(ConfigError::Invalid {
                reason: "session.site_visit_rounds must be at least 1".to_owned(),
            });
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                reason: "session.event_channel_capacity must be at least 1".to_owned(),
            });
        }
        if self.initial_integrity > self.max_integrity {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "session.initial_integrity ({}) exceeds session.max_integrity ({})",
                    self.initial_integrity, self.max_integrity
                ),
            });
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            min_players: default_min_players(),
            trade_timeout_ms: default_trade_timeout_ms(),
            site_visit_rounds: default_site_visit_rounds(),
            round_duration_ms: default_round_duration_ms(),
            status_duration_ms: default_status_duration_ms(),
            max_events_per_visit: default_max_events_per_visit(),
            initial_integrity: default_initial_integrity(),
            max_integrity: default_max_integrity(),
            starting_health: default_starting_health(),
            attack_damage: default_attack_damage(),
            beach_supplies_per_participant: default_beach_supplies_per_participant(),
            site_selection_timeout_ms: None,
            idle_timeout_ms: default_idle_timeout_ms(),
            event_channel_capacity: default_event_channel_capacity(),
            seed: None,
        }
    }
}

/// Probabilities used when filling a participant's event queue.
///
/// Each generated slot rolls once: the roll lands in the pickup band, the
/// attack band, the rendezvous band, or nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct SiteOdds {
    /// Chance of a resource pickup.
    #[serde(default)]
    pub resource_pickup: f64,

    /// Chance of an animal attack.
    #[serde(default)]
    pub animal_attack: f64,

    /// Chance of a beach rendezvous.
    #[serde(default)]
    pub beach_rendezvous: f64,
}

impl SiteOdds {
    fn total(&self) -> f64 {
        self.resource_pickup + self.animal_attack + self.beach_rendezvous
    }
}

/// Site event odds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OddsConfig {
    /// Chance, per slot, that the watchtower observes an attack.
    #[serde(default = "default_observed_attack_chance")]
    pub observed_attack_chance: f64,

    /// Per-site odds. Sites missing from the map never generate events.
    #[serde(default = "default_site_odds")]
    pub sites: BTreeMap<Site, SiteOdds>,
}

impl OddsConfig {
    /// Odds for one site (all zero when unconfigured).
    pub fn for_site(&self, site: Site) -> SiteOdds {
        self.sites.get(&site).copied().unwrap_or_default()
    }

    /// Odds that never generate anything; useful for scripted sessions.
    pub fn quiet() -> Self {
        Self {
            observed_attack_chance: 0.0,
            sites: BTreeMap::new(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.observed_attack_chance) {
            return Err(ConfigError::Invalid {
                reason: "odds.observed_attack_chance must be within [0, 1]".to_owned(),
            });
        }
        for (site, odds) in &self.sites {
            let parts = [odds.resource_pickup, odds.animal_attack, odds.beach_rendezvous];
            if parts.iter().any(|p| *p < 0.0) || odds.total() > 1.0 {
                return Err(ConfigError::Invalid {
                    reason: format!("odds for {site} must be non-negative and sum to at most 1"),
                });
            }
        }
        Ok(())
    }
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            observed_attack_chance: default_observed_attack_chance(),
            sites: default_site_odds(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> String {
    "./web".to_owned()
}

fn default_session_name() -> String {
    "main".to_owned()
}

const fn default_tick_interval_ms() -> u64 {
    300
}

const fn default_min_players() -> usize {
    1
}

const fn default_trade_timeout_ms() -> u64 {
    100
}

const fn default_site_visit_rounds() -> u32 {
    5
}

const fn default_round_duration_ms() -> u64 {
    2_000
}

const fn default_status_duration_ms() -> u64 {
    2_000
}

const fn default_max_events_per_visit() -> usize {
    3
}

const fn default_initial_integrity() -> u64 {
    50
}

const fn default_max_integrity() -> u64 {
    100
}

const fn default_starting_health() -> u32 {
    100
}

const fn default_attack_damage() -> u32 {
    20
}

const fn default_beach_supplies_per_participant() -> u32 {
    5
}

const fn default_idle_timeout_ms() -> Option<u64> {
    Some(300_000)
}

const fn default_event_channel_capacity() -> usize {
    1_024
}

const fn default_observed_attack_chance() -> f64 {
    0.2
}

fn default_site_odds() -> BTreeMap<Site, SiteOdds> {
    let odds = |resource_pickup, animal_attack, beach_rendezvous| SiteOdds {
        resource_pickup,
        animal_attack,
        beach_rendezvous,
    };
    BTreeMap::from([
        (Site::Forest, odds(0.5, 0.3, 0.0)),
        (Site::Farm, odds(0.6, 0.2, 0.0)),
        (Site::Hospital, odds(0.5, 0.1, 0.0)),
        (Site::Watchtower, odds(0.4, 0.2, 0.0)),
        (Site::Beach, odds(0.0, 0.2, 0.6)),
    ])
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CastawayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.tick_interval_ms, 300);
        assert_eq!(config.session.site_visit_rounds, 5);
        assert_eq!(config.session.initial_integrity, 50);
        assert_eq!(config.server.port, 8080);
        assert!(config.odds.for_site(Site::Beach).resource_pickup.abs() < f64::EPSILON);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9000
  static_dir: "./public"
  default_session: "lobby"

session:
  tick_interval_ms: 100
  min_players: 3
  trade_timeout_ms: 250
  site_visit_rounds: 2
  round_duration_ms: 1000
  status_duration_ms: 500
  max_events_per_visit: 4
  initial_integrity: 40
  max_integrity: 80
  starting_health: 50
  attack_damage: 10
  beach_supplies_per_participant: 3
  site_selection_timeout_ms: 15000
  idle_timeout_ms: 60000
  event_channel_capacity: 64
  seed: 9

odds:
  observed_attack_chance: 0.5
  sites:
    forest:
      resource_pickup: 0.7
      animal_attack: 0.1

logging:
  level: "debug"
  json: true
"#;

        let config = CastawayConfig::parse(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.default_session, "lobby");
        assert_eq!(config.session.min_players, 3);
        assert_eq!(config.session.site_selection_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.session.seed, Some(9));
        assert_eq!(config.session.idle_timeout(), Some(Duration::from_secs(60)));
        assert!((config.odds.for_site(Site::Forest).resource_pickup - 0.7).abs() < f64::EPSILON);
        // Sites omitted from an explicit map never generate events.
        assert_eq!(config.odds.for_site(Site::Farm), SiteOdds::default());
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = CastawayConfig::parse("session:\n  min_players: 2\n").unwrap();
        assert_eq!(config.session.min_players, 2);
        assert_eq!(config.session.round_duration(), Duration::from_secs(2));
        assert_eq!(config.session.site_selection_timeout(), None);
        assert_eq!(config.session.idle_timeout(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn null_idle_timeout_keeps_sessions() {
        let config = CastawayConfig::parse("session:\n  idle_timeout_ms: null\n").unwrap();
        assert_eq!(config.session.idle_timeout(), None);
    }

    #[test]
    fn parse_empty_mapping() {
        assert_eq!(CastawayConfig::parse("{}").unwrap(), CastawayConfig::default());
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let err = CastawayConfig::parse("session:\n  tick_interval_ms: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn rejects_odds_above_one() {
        let yaml = "odds:\n  sites:\n    farm:\n      resource_pickup: 0.8\n      animal_attack: 0.4\n";
        assert!(matches!(
            CastawayConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_initial_integrity_above_cap() {
        let yaml = "session:\n  initial_integrity: 120\n  max_integrity: 100\n";
        assert!(CastawayConfig::parse(yaml).is_err());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("castaway-config.yaml");
        if path.exists() {
            let config = CastawayConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
