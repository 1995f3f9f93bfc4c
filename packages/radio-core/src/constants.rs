//! Fixed constants of the radio subsystem.
//!
//! Tunable values live in [`Config`](crate::config::Config); these are the
//! defaults it starts from.

// ─────────────────────────────────────────────────────────────────────────────
// Hardware
// ─────────────────────────────────────────────────────────────────────────────

/// Minimum number of modules for background scanning.
pub const DUAL_TUNER_MODULES: usize = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Retry
// ─────────────────────────────────────────────────────────────────────────────

/// Base delay of the linear reopen backoff (milliseconds).
///
/// The n-th consecutive failure waits `n * base`.
pub const DEFAULT_REOPEN_BASE_DELAY_MS: u64 = 5000;

// ─────────────────────────────────────────────────────────────────────────────
// Background scan
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum scan requests per sweep before giving up on loop-back.
///
/// A band with no stations never returns to its starting channel.
pub const DEFAULT_SCAN_MAX_STEPS: u32 = 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Channels
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the session command queue.
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 64;

/// Capacity of the broadcast listener bridge.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 100;

/// Capacity of the storage notification channel.
pub const STORE_EVENT_CHANNEL_CAPACITY: usize = 32;
