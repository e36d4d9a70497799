// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Lease records and the dotted-decimal address codec.

use std::{net::Ipv4Addr, time::Duration};

use chrono::{DateTime, Utc};

use crate::error::LeaseError;

/// Lifetime of a lease from its creation or last successful read.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// An address leased to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseRecord {
    /// The leased address.
    pub address: Ipv4Addr,
    /// The instant at which the lease is no longer valid.
    pub expires_at: DateTime<Utc>,
}

impl LeaseRecord {
    /// Creates a record expiring `ttl` after `now`.
    pub fn new(address: Ipv4Addr, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            address,
            expires_at: expiry_after(now, ttl),
        }
    }

    /// Returns true if the lease is no longer valid at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Binary form of the address, most significant octet first.
    pub fn octets(&self) -> [u8; 4] {
        self.address.octets()
    }

    /// Dotted-decimal form of the address.
    pub fn dotted_decimal(&self) -> String {
        self.address.to_string()
    }
}

/// Returns `now + ttl`, saturating at the latest representable instant.
pub(crate) fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Parses a dotted-decimal IPv4 address into its binary form.
///
/// Exactly four decimal octets in `0..=255` without leading zeros are accepted. The octets are
/// packed big-endian.
pub fn parse_dotted_decimal(s: &str) -> Result<Ipv4Addr, LeaseError> {
    let malformed = || LeaseError::MalformedAddress(s.to_string());

    let mut octets = [0u8; 4];
    let mut parts = s.split('.');
    for octet in octets.iter_mut() {
        let part = parts.next().ok_or_else(malformed)?;
        if part.is_empty()
            || part.len() > 3
            || (part.len() > 1 && part.starts_with('0'))
            || !part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }
        *octet = part.parse().map_err(|_| malformed())?;
    }
    if parts.next().is_some() {
        return Err(malformed());
    }

    Ok(Ipv4Addr::from(u32::from_be_bytes(octets)))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn dotted_decimal_round_trips_edge_octets() {
        for s in [
            "0.0.0.0",
            "255.255.255.255",
            "10.0.0.5",
            "192.168.0.255",
            "0.255.0.255",
            "1.2.3.4",
        ] {
            let addr = parse_dotted_decimal(s).expect("valid address");
            assert_eq!(addr.to_string(), s);
        }
    }

    #[test]
    fn packs_octets_big_endian() {
        let addr = parse_dotted_decimal("10.20.30.40").unwrap();
        assert_eq!(u32::from(addr), 0x0A14_1E28);
        assert_eq!(addr.octets(), [10, 20, 30, 40]);
    }

    #[test]
    fn rejects_malformed_addresses() {
        for s in [
            "",
            "10.0.0",
            "10.0.0.0.1",
            "256.0.0.1",
            "10..0.1",
            "10.0.0.-1",
            "10.0.0.+1",
            "a.b.c.d",
            " 10.0.0.1",
            "1000.0.0.1",
            "010.0.0.1",
            "10.0.0.00",
            "10.00.0.1",
        ] {
            assert_eq!(
                parse_dotted_decimal(s),
                Err(LeaseError::MalformedAddress(s.to_string())),
                "{s:?} should be rejected"
            );
        }
    }

    #[test]
    fn record_expires_at_boundary() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let record = LeaseRecord::new(Ipv4Addr::new(10, 0, 0, 1), now, DEFAULT_LEASE_TTL);

        assert_eq!(record.expires_at, now + chrono::Duration::hours(24));
        let boundary = now + chrono::Duration::hours(24);
        assert!(!record.is_expired_at(boundary - chrono::Duration::seconds(1)));
        assert!(record.is_expired_at(boundary));
    }

    #[test]
    fn binary_and_text_forms_agree() {
        let record = LeaseRecord::new(Ipv4Addr::new(172, 16, 0, 9), Utc::now(), DEFAULT_LEASE_TTL);
        assert_eq!(record.octets(), [172, 16, 0, 9]);
        assert_eq!(record.dotted_decimal(), "172.16.0.9");
    }
}
