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

//! Bluetooth communication module.
//!
//! Manages one RFCOMM connection: listen and connect workers, the session
//! that owns an established channel, and the state machine coordinating
//! them.

#[cfg(feature = "bluez")]
mod bluez;
mod client;
mod connection;
mod device;
mod discovery;
mod machine;
mod manager;
mod radio;
mod server;
mod service;
mod worker;

#[cfg(feature = "bluez")]
pub use bluez::BluezRadio;
pub use connection::{with_terminator, LINE_TERMINATOR};
pub use device::{Device, DeviceRegistry};
pub(crate) use discovery::Discovery;
pub use machine::{ConnectionMachine, DEFAULT_READ_BUFFER};
pub use manager::BluetoothManager;
pub use radio::{BoxedStream, DiscoveryEvent, Radio, RfcommListener, RfcommStream};
pub use service::{
    PeerType, Security, ServiceProfile, ANDROID_DEVICE_UUID, DEFAULT_SERVICE_NAME,
    SERIAL_PORT_UUID,
};
pub use worker::WorkerKind;
