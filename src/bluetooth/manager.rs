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

//! Consumer-facing connection manager.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::connection::with_terminator;
use super::device::Device;
use super::discovery::Discovery;
use super::machine::ConnectionMachine;
use super::radio::Radio;
use super::service::ServiceProfile;
use super::worker::WorkerKind;
use crate::config::BluetoothConfig;
use crate::error::{BluetoothError, Result};
use crate::events::{BluetoothEvent, DeviceChooser};
use crate::state::ConnectionState;

/// Manager for a single RFCOMM connection.
///
/// The service profile is fixed at construction and used for both
/// listening and connecting.
pub struct BluetoothManager {
    radio: Arc<dyn Radio>,
    machine: Arc<ConnectionMachine>,
    discovery: Arc<Discovery>,
    profile: ServiceProfile,
    event_rx: Option<mpsc::UnboundedReceiver<BluetoothEvent>>,
}

impl BluetoothManager {
    /// Create a new manager on top of `radio`.
    pub fn new(radio: Arc<dyn Radio>, config: &BluetoothConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let profile = config.profile();
        let machine = ConnectionMachine::new(
            Arc::clone(&radio),
            profile,
            config.read_buffer_size,
            event_tx,
        );
        let discovery = Discovery::new(Arc::clone(&radio), Arc::clone(&machine));
        Self {
            radio,
            machine,
            discovery,
            profile,
            event_rx: Some(event_rx),
        }
    }

    /// Take the event receiver (can only be called once).
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<BluetoothEvent>> {
        self.event_rx.take()
    }

    pub fn profile(&self) -> ServiceProfile {
        self.profile
    }

    pub fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn connected_device(&self) -> Option<Device> {
        self.machine.connected_device()
    }

    pub fn active_worker(&self) -> Option<WorkerKind> {
        self.machine.active_worker()
    }

    /// Current candidate list.
    pub fn devices(&self) -> Vec<Device> {
        self.discovery.devices()
    }

    pub async fn is_radio_available(&self) -> bool {
        self.radio.is_available().await
    }

    pub async fn is_radio_enabled(&self) -> bool {
        self.radio.is_enabled().await
    }

    fn chooser(&self) -> DeviceChooser {
        DeviceChooser::new(
            Arc::clone(&self.machine),
            Arc::clone(&self.discovery),
            self.profile,
        )
    }

    fn ensure_running(&self) -> Result<()> {
        if self.machine.is_stopped() {
            return Err(BluetoothError::Stopped);
        }
        Ok(())
    }

    /// Check radio preconditions, reporting a failure to the consumer.
    async fn check_radio(&self) -> Result<()> {
        if !self.radio.is_available().await {
            warn!("Bluetooth radio not available");
            self.machine.emit(BluetoothEvent::RadioUnavailable);
            return Err(BluetoothError::RadioUnavailable);
        }
        if !self.radio.is_enabled().await {
            warn!("Bluetooth radio disabled");
            self.machine.emit(BluetoothEvent::RadioDisabled);
            return Err(BluetoothError::RadioDisabled);
        }
        Ok(())
    }

    /// Offer paired devices, or discover nearby ones if none are paired.
    pub async fn try_connection(&self) -> Result<()> {
        self.ensure_running()?;
        self.check_radio().await?;

        let paired = self.radio.bonded_devices().await?;
        let devices = self.discovery.offer_paired(paired);
        info!("Paired devices: {}", devices.len());

        if devices.is_empty() {
            return self.start_discovery().await;
        }
        self.machine.emit(BluetoothEvent::DevicesFound {
            devices,
            chooser: self.chooser(),
        });
        Ok(())
    }

    /// Scan for nearby devices.
    ///
    /// Results are reported through `DiscoveryFinished` followed by
    /// `DevicesFound` or `NoDevicesFound`.
    pub async fn start_discovery(&self) -> Result<()> {
        self.ensure_running()?;
        self.check_radio().await?;

        self.discovery.reset();
        self.machine.emit(BluetoothEvent::DiscoveryStarted);

        if self.radio.is_discovering().await {
            self.radio.unsubscribe();
            self.radio.cancel_discovery().await?;
        }

        let found = self.radio.subscribe();
        if let Err(e) = self.radio.start_discovery().await {
            self.radio.unsubscribe();
            return Err(e.into());
        }
        info!("Discovery started");

        self.discovery.begin(found, self.chooser());
        Ok(())
    }

    /// Abort a running scan without reporting results.
    pub async fn cancel_discovery(&self) -> Result<()> {
        self.discovery.cancel();
        self.radio.cancel_discovery().await?;
        Ok(())
    }

    /// Open an outbound channel to `device`.
    pub fn connect_to(&self, device: Device) -> Result<()> {
        self.ensure_running()?;
        self.chooser().connect_to(device);
        Ok(())
    }

    /// Wait for an inbound channel.
    pub fn start_listening(&self) -> Result<bool> {
        self.ensure_running()?;
        Ok(self.machine.start_listening())
    }

    /// Drop the current connection or attempt and go idle.
    pub async fn disconnect(&self) {
        self.machine.disconnect().await;
    }

    /// Shut everything down. Safe to call more than once.
    pub async fn stop(&self) {
        if self.machine.is_stopped() {
            return;
        }
        self.discovery.cancel();
        if let Err(e) = self.radio.cancel_discovery().await {
            debug!("Could not cancel discovery: {:#}", e);
        }
        self.machine.stop().await;
    }

    /// Send raw bytes, optionally followed by CR LF.
    pub async fn send(&self, data: &[u8], append_terminator: bool) -> Result<usize> {
        self.machine
            .send(with_terminator(data, append_terminator))
            .await
    }

    /// Send UTF-8 text, optionally followed by CR LF.
    pub async fn send_text(&self, text: &str, append_terminator: bool) -> Result<usize> {
        self.send(text.as_bytes(), append_terminator).await
    }
}
