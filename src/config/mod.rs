use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::scoring::GeoFence;
use crate::tier::UpgradeGating;

/// KYC engine configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "kycgate")]
#[command(about = "Identity verification and account provisioning engine")]
pub struct Config {
    /// HTTP server listen address
    #[arg(long, default_value = "0.0.0.0:8080", env = "KYCGATE_LISTEN_ADDR")]
    pub listen_addr: String,

    /// Path to the identity registry seed YAML
    #[arg(long, default_value = "data/registry.yaml", env = "KYCGATE_REGISTRY_PATH")]
    pub registry_path: PathBuf,

    /// Path to a tier table YAML (built-in tiers if not set)
    #[arg(long, env = "KYCGATE_TIERS_PATH")]
    pub tiers_path: Option<PathBuf>,

    /// Path to the account journal (in-memory accounts if neither this nor a
    /// database URL is set)
    #[arg(long, env = "KYCGATE_JOURNAL_PATH")]
    pub journal_path: Option<PathBuf>,

    /// PostgreSQL connection URL; takes precedence over the journal
    #[arg(long, env = "KYCGATE_DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, default_value = "1", env = "KYCGATE_DB_MIN_CONNECTIONS")]
    pub db_min_connections: u32,

    #[arg(long, default_value = "10", env = "KYCGATE_DB_MAX_CONNECTIONS")]
    pub db_max_connections: u32,

    /// Registry lookup timeout in milliseconds
    #[arg(long, default_value = "2000", env = "KYCGATE_REGISTRY_TIMEOUT_MS")]
    pub registry_timeout_ms: u64,

    /// Latency budget in milliseconds for account creation
    #[arg(long, default_value = "250", env = "KYCGATE_LATENCY_BUDGET_MS")]
    pub latency_budget_ms: u64,

    /// Require the evidence of every intermediate tier when skipping tiers
    #[arg(long, env = "KYCGATE_CUMULATIVE_TIER_UPGRADES")]
    pub cumulative_tier_upgrades: bool,

    #[arg(long, default_value = "4.0", env = "KYCGATE_GEOFENCE_MIN_LAT", allow_negative_numbers = true)]
    pub geofence_min_lat: f64,

    #[arg(long, default_value = "14.0", env = "KYCGATE_GEOFENCE_MAX_LAT", allow_negative_numbers = true)]
    pub geofence_max_lat: f64,

    #[arg(long, default_value = "2.5", env = "KYCGATE_GEOFENCE_MIN_LNG", allow_negative_numbers = true)]
    pub geofence_min_lng: f64,

    #[arg(long, default_value = "15.0", env = "KYCGATE_GEOFENCE_MAX_LNG", allow_negative_numbers = true)]
    pub geofence_max_lng: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "KYCGATE_LOG_JSON")]
    pub log_json: bool,

    /// Enable graceful shutdown
    #[arg(long, default_value = "true", env = "KYCGATE_GRACEFUL_SHUTDOWN")]
    pub graceful_shutdown: bool,
}

impl Config {
    pub fn registry_timeout(&self) -> Duration {
        Duration::from_millis(self.registry_timeout_ms)
    }

    pub fn geofence(&self) -> GeoFence {
        GeoFence {
            min_lat: self.geofence_min_lat,
            max_lat: self.geofence_max_lat,
            min_lng: self.geofence_min_lng,
            max_lng: self.geofence_max_lng,
        }
    }

    pub fn upgrade_gating(&self) -> UpgradeGating {
        if self.cumulative_tier_upgrades {
            UpgradeGating::Cumulative
        } else {
            UpgradeGating::TargetOnly
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "0.0.0.0:8080".to_string(),
            registry_path: PathBuf::from("data/registry.yaml"),
            tiers_path: None,
            journal_path: None,
            database_url: None,
            db_min_connections: 1,
            db_max_connections: 10,
            registry_timeout_ms: 2000,
            latency_budget_ms: 250,
            cumulative_tier_upgrades: false,
            geofence_min_lat: GeoFence::NIGERIA.min_lat,
            geofence_max_lat: GeoFence::NIGERIA.max_lat,
            geofence_min_lng: GeoFence::NIGERIA.min_lng,
            geofence_max_lng: GeoFence::NIGERIA.max_lng,
            log_level: "info".to_string(),
            log_json: false,
            graceful_shutdown: true,
        }
    }
}
