// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! RFCOMM service identifiers and channel security.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Service UUID used by peers running the same Android library.
pub const ANDROID_DEVICE_UUID: Uuid = Uuid::from_u128(0xfa87c0d0_afac_11de_8a39_0800200c9a66);

/// Standard SPP UUID, for generic serial-port peers.
pub const SERIAL_PORT_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// Default SDP service record name.
pub const DEFAULT_SERVICE_NAME: &str = "Bluetooth Secure";

/// Kind of software stack running on the peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerType {
    /// Peer speaks the identifier-compatible service.
    AndroidDevice,
    /// Peer exposes a plain serial port profile.
    #[default]
    OtherDevice,
}

/// Transport security of the RFCOMM channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Security {
    /// Authenticated and encrypted link.
    #[default]
    Secure,
    /// No link-layer authentication.
    Insecure,
}

/// Service identifier and security pair applied to both listening and
/// connecting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceProfile {
    pub peer: PeerType,
    pub security: Security,
}

impl ServiceProfile {
    pub fn new(peer: PeerType, security: Security) -> Self {
        Self { peer, security }
    }

    /// Service UUID selected by the peer type.
    pub fn uuid(&self) -> Uuid {
        match self.peer {
            PeerType::AndroidDevice => ANDROID_DEVICE_UUID,
            PeerType::OtherDevice => SERIAL_PORT_UUID,
        }
    }

    pub fn is_secure(&self) -> bool {
        self.security == Security::Secure
    }
}

impl fmt::Display for ServiceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let security = match self.security {
            Security::Secure => "secure",
            Security::Insecure => "insecure",
        };
        write!(f, "{} ({})", self.uuid(), security)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        assert_eq!(
            ANDROID_DEVICE_UUID.to_string(),
            "fa87c0d0-afac-11de-8a39-0800200c9a66"
        );
        assert_eq!(
            SERIAL_PORT_UUID.to_string(),
            "00001101-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_profile_selects_uuid() {
        let android = ServiceProfile::new(PeerType::AndroidDevice, Security::Insecure);
        assert_eq!(android.uuid(), ANDROID_DEVICE_UUID);
        assert!(!android.is_secure());

        // Library defaults: generic serial peer over a secure channel
        let default = ServiceProfile::default();
        assert_eq!(default.uuid(), SERIAL_PORT_UUID);
        assert!(default.is_secure());
    }
}
