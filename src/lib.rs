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

//! Single-session RFCOMM connection manager.
//!
//! [`BluetoothManager`] discovers candidate devices, opens an outbound
//! channel or accepts an inbound one, streams bytes in both directions and
//! falls back to listening when a connection fails or drops. Every
//! lifecycle and data event is delivered through one ordered channel.

pub mod bluetooth;
pub mod config;
pub mod error;
pub mod events;
pub mod state;

pub use bluetooth::{BluetoothManager, Device, PeerType, Radio, Security, ServiceProfile};
pub use config::{BluetoothConfig, Config};
pub use error::BluetoothError;
pub use events::{BluetoothEvent, DeviceChooser, EventDispatcher, Listener};
pub use state::ConnectionState;
