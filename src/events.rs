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

//! Lifecycle and data events, and their ordered delivery to a listener.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::bluetooth::{ConnectionMachine, Device, Discovery, ServiceProfile};

/// Events emitted by the connection manager, in transition order.
#[derive(Debug, Clone)]
pub enum BluetoothEvent {
    /// The platform has no Bluetooth radio.
    RadioUnavailable,
    /// The radio is powered off.
    RadioDisabled,
    /// Listening started from idle.
    Listening,
    /// Outbound connection attempt started.
    Connecting(Device),
    /// Session established.
    Connected(Device),
    /// Session ended.
    Disconnected,
    /// Outbound attempt failed; listening again.
    ConnectionFailed(Device),
    DiscoveryStarted,
    DiscoveryFinished,
    /// Discovery ended without candidates.
    NoDevicesFound,
    /// Candidates are available; pick one through the chooser.
    DevicesFound {
        devices: Vec<Device>,
        chooser: DeviceChooser,
    },
    /// Bytes read from the session.
    DataReceived(Vec<u8>),
    /// Bytes written to the session.
    DataSent(Vec<u8>),
    /// Listening could not be set up.
    Error(String),
}

/// Callback handed out with [`BluetoothEvent::DevicesFound`].
#[derive(Clone)]
pub struct DeviceChooser {
    machine: Arc<ConnectionMachine>,
    discovery: Arc<Discovery>,
    profile: ServiceProfile,
}

impl DeviceChooser {
    pub(crate) fn new(
        machine: Arc<ConnectionMachine>,
        discovery: Arc<Discovery>,
        profile: ServiceProfile,
    ) -> Self {
        Self {
            machine,
            discovery,
            profile,
        }
    }

    /// Connect to the chosen device, ending any scan still running.
    pub fn connect_to(&self, device: Device) {
        if self.machine.is_stopped() {
            return;
        }
        self.discovery.finish_for_connect();
        self.machine.connect_to(device, self.profile);
    }
}

impl fmt::Debug for DeviceChooser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceChooser")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

/// Consumer callbacks, one per event. All default to no-ops.
#[allow(unused_variables)]
pub trait Listener: Send + 'static {
    fn on_radio_unavailable(&mut self) {}
    fn on_radio_disabled(&mut self) {}
    fn on_listening(&mut self) {}
    fn on_connecting(&mut self, device: &Device) {}
    fn on_connected(&mut self, device: &Device) {}
    fn on_disconnected(&mut self) {}
    fn on_connection_failed(&mut self, device: &Device) {}
    fn on_discovery_started(&mut self) {}
    fn on_discovery_finished(&mut self) {}
    fn on_no_devices_found(&mut self) {}
    fn on_devices_found(&mut self, devices: &[Device], chooser: DeviceChooser) {}
    fn on_data_received(&mut self, data: &[u8]) {}
    fn on_data_sent(&mut self, data: &[u8]) {}
    fn on_error(&mut self, message: &str) {}
}

/// Delivers events to a [`Listener`] from a single task, preserving order.
pub struct EventDispatcher<L> {
    listener: L,
}

impl<L: Listener> EventDispatcher<L> {
    pub fn new(listener: L) -> Self {
        Self { listener }
    }

    /// Deliver a single event.
    pub fn dispatch(&mut self, event: BluetoothEvent) {
        match event {
            BluetoothEvent::RadioUnavailable => self.listener.on_radio_unavailable(),
            BluetoothEvent::RadioDisabled => self.listener.on_radio_disabled(),
            BluetoothEvent::Listening => self.listener.on_listening(),
            BluetoothEvent::Connecting(device) => self.listener.on_connecting(&device),
            BluetoothEvent::Connected(device) => self.listener.on_connected(&device),
            BluetoothEvent::Disconnected => self.listener.on_disconnected(),
            BluetoothEvent::ConnectionFailed(device) => {
                self.listener.on_connection_failed(&device)
            }
            BluetoothEvent::DiscoveryStarted => self.listener.on_discovery_started(),
            BluetoothEvent::DiscoveryFinished => self.listener.on_discovery_finished(),
            BluetoothEvent::NoDevicesFound => self.listener.on_no_devices_found(),
            BluetoothEvent::DevicesFound { devices, chooser } => {
                self.listener.on_devices_found(&devices, chooser)
            }
            BluetoothEvent::DataReceived(data) => self.listener.on_data_received(&data),
            BluetoothEvent::DataSent(data) => self.listener.on_data_sent(&data),
            BluetoothEvent::Error(message) => self.listener.on_error(&message),
        }
    }

    /// Drain `events` until every sender is gone, then hand the listener
    /// back.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<BluetoothEvent>) -> L {
        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }
        debug!("Event channel closed");
        self.listener
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self, events: mpsc::UnboundedReceiver<BluetoothEvent>) -> tokio::task::JoinHandle<L> {
        tokio::spawn(self.run(events))
    }
}
