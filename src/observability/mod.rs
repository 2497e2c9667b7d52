pub mod metrics;
pub mod tracing;

pub use self::metrics::{install_recorder, TimingGuard};
pub use self::tracing::init_tracing;
