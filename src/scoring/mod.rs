pub mod location;
pub mod trust;

pub use location::{GeoFence, LocationVerdict};
pub use trust::{compute_score, recommend, TrustFactors};
