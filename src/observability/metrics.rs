use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

use crate::domain::IdentityType;

pub const PROVISIONING_TOTAL: &str = "kycgate_provisioning_total";
pub const PROVISIONING_LATENCY: &str = "kycgate_provisioning_latency_seconds";
pub const IDENTITY_LOOKUPS_TOTAL: &str = "kycgate_identity_lookups_total";
pub const TIER_UPGRADES_TOTAL: &str = "kycgate_tier_upgrades_total";
pub const LOCATION_CHECKS_TOTAL: &str = "kycgate_location_checks_total";

/// Install the global Prometheus recorder and describe every metric.
///
/// Returns the handle used by the `/metrics` endpoint to render output.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

pub fn describe_metrics() {
    describe_counter!(PROVISIONING_TOTAL, "Account creation attempts by outcome");
    describe_histogram!(
        PROVISIONING_LATENCY,
        Unit::Seconds,
        "Time to process an account creation attempt"
    );
    describe_counter!(IDENTITY_LOOKUPS_TOTAL, "Registry lookups by type and outcome");
    describe_counter!(TIER_UPGRADES_TOTAL, "Tier upgrade requests by outcome");
    describe_counter!(LOCATION_CHECKS_TOTAL, "GPS location checks by result");
}

/// Record the outcome of an account creation attempt.
pub fn record_provisioning(outcome: &'static str) {
    counter!(PROVISIONING_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_identity_lookup(identity_type: IdentityType, outcome: &'static str) {
    counter!(
        IDENTITY_LOOKUPS_TOTAL,
        "type" => identity_type.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_tier_upgrade(outcome: &'static str) {
    counter!(TIER_UPGRADES_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_location_check(within_bounds: bool) {
    let result = if within_bounds { "within" } else { "outside" };
    counter!(LOCATION_CHECKS_TOTAL, "result" => result).increment(1);
}

/// Records provisioning latency when dropped.
pub struct TimingGuard {
    start: Instant,
}

impl TimingGuard {
    pub fn new() -> Self {
        TimingGuard {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for TimingGuard {
    fn default() -> Self {
        TimingGuard::new()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        histogram!(PROVISIONING_LATENCY).record(self.start.elapsed().as_secs_f64());
    }
}
