//! Expiry Key Encoding
//!
//! Converts absolute expiry instants into fixed-width byte keys whose
//! lexicographic order is exactly chronological order.
//!
//! # Layout
//! - bytes `0..8`: whole Unix seconds as `i64`, sign bit flipped, big-endian
//! - bytes `8..12`: sub-second nanoseconds as `u32`, big-endian
//!
//! Flipping the sign bit maps `i64::MIN..=i64::MAX` onto `0..=u64::MAX`, so
//! instants before the epoch sort ahead of those after it. chrono reports a
//! leap second as nanos in `1_000_000_000..2_000_000_000` of second `:59`,
//! which still sorts after every regular nano of that second.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// Width of an encoded expiry key in bytes.
pub const ENCODED_LEN: usize = 12;

const SIGN_BIT: u64 = 1 << 63;

// == Expiry Key ==
/// Sortable encoding of an absolute expiry instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpiryKey([u8; ENCODED_LEN]);

impl ExpiryKey {
    // == Encode ==
    /// Encodes a UTC instant.
    pub fn encode(at: DateTime<Utc>) -> Self {
        let secs = (at.timestamp() as u64) ^ SIGN_BIT;
        let nanos = at.timestamp_subsec_nanos();

        let mut bytes = [0u8; ENCODED_LEN];
        bytes[..8].copy_from_slice(&secs.to_be_bytes());
        bytes[8..].copy_from_slice(&nanos.to_be_bytes());
        Self(bytes)
    }

    // == Decode ==
    /// Decodes the key back into the instant it was produced from.
    ///
    /// # Panics
    /// Panics if the bytes do not describe a valid instant. Keys only ever
    /// come from [`ExpiryKey::encode`], so a failure here means the index is
    /// corrupted and continuing would evict the wrong entries.
    pub fn decode(&self) -> DateTime<Utc> {
        let mut secs = [0u8; 8];
        secs.copy_from_slice(&self.0[..8]);
        let mut nanos = [0u8; 4];
        nanos.copy_from_slice(&self.0[8..]);

        let secs = (u64::from_be_bytes(secs) ^ SIGN_BIT) as i64;
        let nanos = u32::from_be_bytes(nanos);

        DateTime::from_timestamp(secs, nanos).unwrap_or_else(|| {
            panic!(
                "expiry index holds an undecodable key {:02x?} (secs={}, nanos={})",
                self.0, secs, nanos
            )
        })
    }

    /// Wraps raw bytes previously obtained from [`ExpiryKey::as_bytes`].
    pub fn from_bytes(bytes: [u8; ENCODED_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw encoded bytes.
    pub fn as_bytes(&self) -> &[u8; ENCODED_LEN] {
        &self.0
    }
}

impl From<DateTime<Utc>> for ExpiryKey {
    fn from(at: DateTime<Utc>) -> Self {
        Self::encode(at)
    }
}

impl fmt::Display for ExpiryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.decode().to_rfc3339_opts(SecondsFormat::Nanos, true))
    }
}

// == Expiry Check ==
/// Returns true once `now` has reached `expires_at`.
///
/// Expiry is inclusive: an entry is gone at exactly its timestamp.
pub fn is_expired(now: DateTime<Utc>, expires_at: DateTime<Utc>) -> bool {
    expires_at <= now
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_encode_decode_preserves_instant() {
        let at = Utc.with_ymd_and_hms(2024, 2, 29, 13, 45, 7).unwrap()
            + Duration::nanoseconds(123_456_789);

        assert_eq!(ExpiryKey::encode(at).decode(), at);
    }

    #[test]
    fn test_encode_decode_before_epoch() {
        let at = Utc.with_ymd_and_hms(1901, 12, 13, 20, 45, 52).unwrap()
            + Duration::nanoseconds(5);

        assert_eq!(ExpiryKey::encode(at).decode(), at);
    }

    #[test]
    fn test_order_matches_chronology() {
        let base = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        let instants = [
            base - Duration::days(365 * 400),
            base - Duration::seconds(1),
            base - Duration::nanoseconds(1),
            base,
            base + Duration::nanoseconds(1),
            base + Duration::nanoseconds(999_999_999),
            base + Duration::seconds(1),
            base + Duration::days(365 * 9000),
        ];

        for pair in instants.windows(2) {
            let (a, b) = (ExpiryKey::encode(pair[0]), ExpiryKey::encode(pair[1]));
            assert!(a < b, "{} should sort before {}", pair[0], pair[1]);
            assert!(a.as_bytes() < b.as_bytes());
        }
    }

    #[test]
    fn test_sub_second_precision_not_trimmed() {
        // 10ms and 100ms must stay distinct and ordered
        let base = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
        let a = ExpiryKey::encode(base + Duration::milliseconds(10));
        let b = ExpiryKey::encode(base + Duration::milliseconds(100));

        assert!(a < b);
    }

    #[test]
    fn test_display_is_rfc3339_nanos() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

        assert_eq!(
            ExpiryKey::encode(at).to_string(),
            "2025-01-02T03:04:05.000000000Z"
        );
    }

    #[test]
    fn test_bytes_round_trip() {
        let key = ExpiryKey::encode(Utc::now());

        assert_eq!(ExpiryKey::from_bytes(*key.as_bytes()), key);
    }

    #[test]
    #[should_panic(expected = "undecodable key")]
    fn test_decode_corrupted_key_panics() {
        let mut bytes = *ExpiryKey::encode(Utc::now()).as_bytes();
        bytes[8..].copy_from_slice(&u32::MAX.to_be_bytes());

        ExpiryKey::from_bytes(bytes).decode();
    }

    #[test]
    fn test_is_expired_boundary() {
        let now = Utc::now();

        assert!(is_expired(now, now));
        assert!(is_expired(now, now - Duration::nanoseconds(1)));
        assert!(!is_expired(now, now + Duration::nanoseconds(1)));
    }
}
