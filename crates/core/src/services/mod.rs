//! Format detection and the boundary to external feature extraction/classification.

pub mod backends;
pub mod detection;
pub mod external;
