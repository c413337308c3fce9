//! Shared primitive types used across the tracker.

/// Wall-clock instant in milliseconds since the Unix epoch.
/// Signed so a skewed clock can be represented without wrapping.
pub type EpochMs = i64;

/// A count of score points.
pub type Points = u64;

/// Identifier for one process run of the tracker (journal grouping).
pub type SessionId = String;

/// Idle accounting is quantized to whole seconds.
pub const MS_PER_POINT: i64 = 1000;
