//! Expiry Header
//!
//! Every entry written by the orchestrator starts with an 8-byte big-endian
//! absolute expiry timestamp in nanoseconds since the unix epoch. A zero
//! header means no expiry is tracked for the entry.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Size of the expiry header in bytes
pub const EXPIRY_HEADER_SIZE: usize = 8;

/// Remaining lifetime of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// No expiry tracked (zero header)
    Infinite,
    /// Time left before the entry expires (always > 0)
    Remaining(Duration),
}

impl Ttl {
    /// Clamp to an upper bound, treating `Infinite` as unbounded
    pub fn clamp_to(self, max: Duration) -> Duration {
        match self {
            Ttl::Infinite => max,
            Ttl::Remaining(d) => d.min(max),
        }
    }

    /// Remaining duration, `None` when infinite
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Ttl::Infinite => None,
            Ttl::Remaining(d) => Some(d),
        }
    }
}

/// Latest expiry the header can hold
pub fn max_expiry() -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(u64::MAX)
}

/// Expiry `ttl` after `now`, saturating at [`max_expiry`]
pub fn expiry_after(now: SystemTime, ttl: Duration) -> SystemTime {
    let max = max_expiry();
    now.checked_add(ttl).map_or(max, |at| at.min(max))
}

/// Write `at` into the first 8 bytes of `buf`.
///
/// Times at or before the epoch are written as 0. Times past
/// [`max_expiry`] are written as [`max_expiry`].
///
/// # Panics
///
/// Panics if `buf` is shorter than [`EXPIRY_HEADER_SIZE`].
pub fn encode_expiry(at: SystemTime, buf: &mut [u8]) {
    let nanos = at
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0);
    buf[..EXPIRY_HEADER_SIZE].copy_from_slice(&nanos.to_be_bytes());
}

/// Read the expiry stored in the first 8 bytes of `buf`.
///
/// Returns `None` when the header is zero or `buf` is too short to hold one.
pub fn decode_expiry(buf: &[u8]) -> Option<SystemTime> {
    let header: [u8; EXPIRY_HEADER_SIZE] = buf.get(..EXPIRY_HEADER_SIZE)?.try_into().ok()?;
    match u64::from_be_bytes(header) {
        0 => None,
        nanos => Some(UNIX_EPOCH + Duration::from_nanos(nanos)),
    }
}

/// Remaining TTL of an entry with the given expiry, `None` once expired
pub fn remaining_ttl(expiry: Option<SystemTime>, now: SystemTime) -> Option<Ttl> {
    match expiry {
        None => Some(Ttl::Infinite),
        Some(at) => match at.duration_since(now) {
            Ok(d) if !d.is_zero() => Some(Ttl::Remaining(d)),
            _ => None,
        },
    }
}

// =============================================================================
// Tests
// =============================================================================
