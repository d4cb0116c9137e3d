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

//! Error types surfaced to consumers of the connection manager.

use thiserror::Error;

/// Errors returned by the consumer-facing control surface.
#[derive(Debug, Error)]
pub enum BluetoothError {
    /// The platform has no usable Bluetooth radio.
    #[error("bluetooth radio is not available")]
    RadioUnavailable,

    /// The radio exists but is powered off.
    #[error("bluetooth radio is disabled")]
    RadioDisabled,

    /// No session is installed.
    #[error("not connected")]
    NotConnected,

    /// The manager has been stopped.
    #[error("connection manager has been stopped")]
    Stopped,

    /// Writing to the session failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The radio backend rejected a request.
    #[error("radio error: {0}")]
    Radio(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BluetoothError>;
