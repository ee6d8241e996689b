//! Cache Module
//!
//! Holds the latest rendered front page per source and the rotation cursor
//! that decides which source the next request is served.

mod entry;
mod rotation;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use rotation::RotationCursor;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed source id length in bytes
pub const MAX_SOURCE_ID_LENGTH: usize = 256;
