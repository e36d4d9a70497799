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
//! Lease identities and their encoding into ephemeral store keys.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Single network slice selection assistance information.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snssai {
    /// Slice/service type.
    #[serde(rename = "Sst")]
    pub sst: u8,
    /// Slice differentiator.
    #[serde(rename = "Sd")]
    pub sd: String,
}

/// The data network and slice a session was established for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionDescriptor {
    /// Data network name.
    #[serde(rename = "Dnn")]
    pub dnn: String,
    /// Data network access identifier.
    #[serde(rename = "Dnai")]
    pub dnai: String,
    /// Network slice selector.
    #[serde(rename = "SNssai")]
    pub snssai: Snssai,
}

/// Identifies one session's right to an address: a subscriber together with the selection the
/// session was established for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaseIdentity {
    /// Subscriber permanent identifier.
    pub supi: String,
    /// Data network and slice selection.
    pub selection: SelectionDescriptor,
}

impl LeaseIdentity {
    /// Creates a new lease identity.
    pub fn new(supi: impl Into<String>, selection: SelectionDescriptor) -> Self {
        Self {
            supi: supi.into(),
            selection,
        }
    }
}

impl Display for LeaseIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}/{}/{}-{}",
            self.supi,
            self.selection.dnn,
            self.selection.dnai,
            self.selection.snssai.sst,
            self.selection.snssai.sd
        )
    }
}

/// Key of the ephemeral store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeaseKey(String);

impl LeaseKey {
    /// The encoded key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LeaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a [LeaseIdentity] is turned into a [LeaseKey].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEncoding {
    /// Every field is prefixed with its byte length, fields are separated by `|`.
    ///
    /// Distinct identities always produce distinct keys.
    #[default]
    LengthPrefixed,
    /// Plain concatenation of all fields without any delimiter.
    ///
    /// Kept for compatibility with keys produced by earlier deployments. Distinct identities can
    /// collide, e.g. SUPI `"1"` with DNN `"23internet"` and SUPI `"12"` with DNN `"3internet"`.
    Legacy,
}

impl KeyEncoding {
    /// Encodes the identity into a key.
    pub fn encode(self, identity: &LeaseIdentity) -> LeaseKey {
        let selection = &identity.selection;
        let sst = selection.snssai.sst.to_string();
        let fields = [
            identity.supi.as_str(),
            selection.dnn.as_str(),
            selection.dnai.as_str(),
            sst.as_str(),
            selection.snssai.sd.as_str(),
        ];

        let key = match self {
            KeyEncoding::LengthPrefixed => {
                fields
                    .iter()
                    .map(|field| format!("{}:{field}", field.len()))
                    .collect::<Vec<_>>()
                    .join("|")
            }
            KeyEncoding::Legacy => fields.concat(),
        };
        LeaseKey(key)
    }
}
