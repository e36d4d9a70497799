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
//! Durable lease documents and filters.

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::LeaseError,
    identity::{LeaseIdentity, SelectionDescriptor},
    record::{LeaseRecord, parse_dotted_decimal},
};

/// A lease as stored in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseDocument {
    /// Subscriber permanent identifier.
    #[serde(rename = "SUPI")]
    pub supi: String,
    /// Data network and slice selection.
    #[serde(rename = "UPFSelection")]
    pub selection: SelectionDescriptor,
    /// Leased address in dotted-decimal form.
    #[serde(rename = "IP Address")]
    pub address: String,
    /// Expiration of the lease.
    #[serde(rename = "expirationDate")]
    pub expires_at: DateTime<Utc>,
}

impl LeaseDocument {
    /// Creates a document leasing `address` to `identity`.
    pub fn new(identity: &LeaseIdentity, address: Ipv4Addr, expires_at: DateTime<Utc>) -> Self {
        Self {
            supi: identity.supi.clone(),
            selection: identity.selection.clone(),
            address: address.to_string(),
            expires_at,
        }
    }

    /// Converts the document into a record, parsing the stored address.
    pub fn to_record(&self) -> Result<LeaseRecord, LeaseError> {
        Ok(LeaseRecord {
            address: parse_dotted_decimal(&self.address)?,
            expires_at: self.expires_at,
        })
    }
}

/// Exact-match predicate over lease documents.
///
/// Unset fields match every document. The identity fields are compared individually, so two
/// distinct identities never match the same filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaseFilter {
    /// Required SUPI.
    pub supi: Option<String>,
    /// Required selection.
    pub selection: Option<SelectionDescriptor>,
    /// Required address in dotted-decimal form.
    pub address: Option<String>,
    /// Matches documents expiring at or before this instant.
    pub expired_at: Option<DateTime<Utc>>,
}

impl LeaseFilter {
    /// Matches the documents of `identity`.
    pub fn identity(identity: &LeaseIdentity) -> Self {
        Self {
            supi: Some(identity.supi.clone()),
            selection: Some(identity.selection.clone()),
            ..Default::default()
        }
    }

    /// Matches the documents leasing `address`, whoever holds them.
    pub fn address(address: Ipv4Addr) -> Self {
        Self::default().with_address(address)
    }

    /// Matches the documents expired at `now`.
    pub fn expired(now: DateTime<Utc>) -> Self {
        Self {
            expired_at: Some(now),
            ..Default::default()
        }
    }

    /// Additionally require `address`.
    pub fn with_address(mut self, address: Ipv4Addr) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Returns true if `document` satisfies every set field.
    pub fn matches(&self, document: &LeaseDocument) -> bool {
        self.supi.as_ref().is_none_or(|supi| *supi == document.supi)
            && self
                .selection
                .as_ref()
                .is_none_or(|selection| *selection == document.selection)
            && self
                .address
                .as_ref()
                .is_none_or(|address| *address == document.address)
            && self
                .expired_at
                .is_none_or(|now| document.expires_at <= now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::identity::tests::identity;

    #[test]
    fn should_serialize_with_store_field_names() {
        let expires_at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let document = LeaseDocument::new(
            &identity("imsi-001", "internet"),
            Ipv4Addr::new(10, 0, 0, 5),
            expires_at,
        );

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "SUPI": "imsi-001",
                "UPFSelection": {
                    "Dnn": "internet",
                    "Dnai": "edge-1",
                    "SNssai": { "Sst": 1, "Sd": "010203" },
                },
                "IP Address": "10.0.0.5",
                "expirationDate": "2025-03-01T08:00:00Z",
            })
        );
    }

    #[test]
    fn should_match_identity_and_address() {
        let document = LeaseDocument::new(
            &identity("imsi-001", "internet"),
            Ipv4Addr::new(10, 0, 0, 5),
            Utc::now(),
        );

        assert!(LeaseFilter::identity(&identity("imsi-001", "internet")).matches(&document));
        assert!(LeaseFilter::address(Ipv4Addr::new(10, 0, 0, 5)).matches(&document));
        assert!(
            LeaseFilter::identity(&identity("imsi-001", "internet"))
                .with_address(Ipv4Addr::new(10, 0, 0, 5))
                .matches(&document)
        );
        assert!(
            !LeaseFilter::identity(&identity("imsi-001", "internet"))
                .with_address(Ipv4Addr::new(10, 0, 0, 6))
                .matches(&document)
        );
        assert!(!LeaseFilter::identity(&identity("imsi-001", "ims")).matches(&document));
    }

    #[test]
    fn should_not_confuse_identities_that_share_a_legacy_key() {
        let document = LeaseDocument::new(
            &identity("1", "23internet"),
            Ipv4Addr::new(10, 0, 0, 5),
            Utc::now(),
        );
        assert!(!LeaseFilter::identity(&identity("12", "3internet")).matches(&document));
    }

    #[test]
    fn should_match_expired_documents_at_boundary() {
        let expires_at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let document = LeaseDocument::new(
            &identity("imsi-001", "internet"),
            Ipv4Addr::new(10, 0, 0, 5),
            expires_at,
        );

        assert!(LeaseFilter::expired(expires_at).matches(&document));
        assert!(
            !LeaseFilter::expired(expires_at - chrono::Duration::seconds(1)).matches(&document)
        );
    }

    #[test]
    fn should_reject_malformed_stored_address() {
        let mut document = LeaseDocument::new(
            &identity("imsi-001", "internet"),
            Ipv4Addr::new(10, 0, 0, 5),
            Utc::now(),
        );
        document.address = "10.0.0".to_string();

        assert_eq!(
            document.to_record(),
            Err(LeaseError::MalformedAddress("10.0.0".to_string()))
        );
    }
}
