//! Shared play-by-play types for the box score engine.
//!
//! This crate contains pure data structures with no derivation logic:
//! raw feed rows, the game clock, rosters, counting stats and the
//! classified event form the engine produces. It is a dependency for
//! the `boxscore` crate.

pub mod classified;
pub mod clock;
pub mod feed;
pub mod raw;
pub mod roster;
pub mod stats;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

/// Source player identifier.
pub type PlayerId = String;
/// Source team identifier.
pub type TeamId = String;

// Re-export clock types
pub use clock::{GameClock, ParseClockError, TENTHS_PER_MINUTE};

// Re-export raw event types
pub use raw::{RawEvent, RawEventBuilder};

// Re-export roster types
pub use roster::{GameRoster, TeamSide};

// Re-export stat types
pub use stats::{DeltaTarget, Stat, StatDelta, StatLine};

// Re-export classified event types
pub use classified::{
    AdminKind, ClassifiedEvent, EventCategory, FreeThrowInfo, FreeThrowPosition, ReboundKind,
    ShotInfo,
};

// Re-export feed helpers
pub use feed::{parse_events, read_events, read_roster, FeedError};
