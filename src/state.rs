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

//! Connection lifecycle state.

use std::fmt;

/// Lifecycle state of the single RFCOMM connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No worker is running.
    #[default]
    Idle,
    /// Waiting for an inbound channel.
    Listening,
    /// Opening an outbound channel.
    Connecting,
    /// A session is established.
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Listening => "Listening",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }

    /// Whether the state admits an incoming worker success.
    pub fn is_pending(&self) -> bool {
        matches!(self, ConnectionState::Listening | ConnectionState::Connecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(ConnectionState::default(), ConnectionState::Idle);
    }

    #[test]
    fn test_pending_states() {
        assert!(ConnectionState::Listening.is_pending());
        assert!(ConnectionState::Connecting.is_pending());
        assert!(!ConnectionState::Idle.is_pending());
        assert!(!ConnectionState::Connected.is_pending());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
        assert_eq!(
            format!("{} -> {}", ConnectionState::Listening, ConnectionState::Connecting),
            "Listening -> Connecting"
        );
    }
}
