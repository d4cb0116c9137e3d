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

//! Platform radio capability.
//!
//! The connection manager never touches the Bluetooth stack directly; it
//! is handed a [`Radio`] at construction. The BlueZ implementation lives
//! in `bluez`, tests substitute an in-memory one.

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use super::device::Device;
use super::service::ServiceProfile;

/// A connected RFCOMM byte stream.
pub trait RfcommStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> RfcommStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Owned, type-erased RFCOMM stream.
pub type BoxedStream = Box<dyn RfcommStream>;

/// Notification produced while a discovery scan runs.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A nearby device answered the scan.
    DeviceFound(Device),
    /// The scan is over.
    Finished,
}

/// A bound listening endpoint. Dropping it closes the endpoint.
#[async_trait]
pub trait RfcommListener: Send {
    /// Wait for one inbound channel.
    async fn accept(&mut self) -> Result<(BoxedStream, Device)>;
}

/// Handle to the platform Bluetooth radio.
#[async_trait]
pub trait Radio: Send + Sync + 'static {
    /// Whether the platform has a radio at all.
    async fn is_available(&self) -> bool;

    /// Whether the radio is powered.
    async fn is_enabled(&self) -> bool;

    /// Devices bonded at the platform level.
    async fn bonded_devices(&self) -> Result<Vec<Device>>;

    /// Register for discovery notifications, replacing any previous
    /// subscriber.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<DiscoveryEvent>;

    /// Drop the current discovery subscriber.
    fn unsubscribe(&self);

    async fn start_discovery(&self) -> Result<()>;

    async fn cancel_discovery(&self) -> Result<()>;

    async fn is_discovering(&self) -> bool;

    /// Open a listening endpoint for the given service.
    async fn listen(&self, profile: ServiceProfile) -> Result<Box<dyn RfcommListener>>;

    /// Open a client channel to `device`.
    ///
    /// On failure no partially opened channel may remain.
    async fn connect(&self, device: &Device, profile: ServiceProfile) -> Result<BoxedStream>;
}
