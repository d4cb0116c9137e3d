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

//! Smooth Bluetooth serial terminal

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smooth_bluetooth::bluetooth::BluezRadio;
use smooth_bluetooth::{BluetoothManager, Config, Device, DeviceChooser, EventDispatcher, Listener};

/// Logs lifecycle events and prints received bytes to stdout.
struct Terminal;

impl Listener for Terminal {
    fn on_radio_unavailable(&mut self) {
        error!("No Bluetooth adapter available");
    }

    fn on_radio_disabled(&mut self) {
        error!("Bluetooth adapter is powered off");
    }

    fn on_listening(&mut self) {
        info!("Waiting for incoming connections");
    }

    fn on_connecting(&mut self, device: &Device) {
        info!("Connecting to {}", device);
    }

    fn on_connected(&mut self, device: &Device) {
        info!("Connected to {}", device);
    }

    fn on_disconnected(&mut self) {
        info!("Disconnected");
    }

    fn on_connection_failed(&mut self, device: &Device) {
        warn!("Connection to {} failed, listening again", device);
    }

    fn on_discovery_started(&mut self) {
        info!("Scanning for devices...");
    }

    fn on_no_devices_found(&mut self) {
        warn!("No devices found");
    }

    fn on_devices_found(&mut self, devices: &[Device], chooser: DeviceChooser) {
        for (i, device) in devices.iter().enumerate() {
            info!("  [{}] {}{}", i, device, if device.is_paired() { " (paired)" } else { "" });
        }
        // Non-interactive: take the first candidate
        if let Some(device) = devices.first() {
            chooser.connect_to(device.clone());
        }
    }

    fn on_data_received(&mut self, data: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(data);
        let _ = stdout.flush();
    }

    fn on_error(&mut self, message: &str) {
        error!("Bluetooth error: {}", message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("smooth_bluetooth=info".parse()?),
        )
        .init();

    info!("Starting Smooth Bluetooth v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded ({})", config.bluetooth.profile());

    let radio = Arc::new(BluezRadio::new(&config.bluetooth).await?);
    radio.power_on().await?;

    let mut manager = BluetoothManager::new(radio, &config.bluetooth);
    let events = manager
        .take_event_receiver()
        .ok_or_else(|| anyhow::anyhow!("event receiver already taken"))?;
    let dispatcher = EventDispatcher::new(Terminal).spawn(events);

    manager.start_listening()?;
    if let Err(e) = manager.try_connection().await {
        error!("Unable to start connection: {}", e);
    }

    let append_terminator = config.bluetooth.append_terminator;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if let Err(e) = manager.send_text(&line, append_terminator).await {
                        warn!("Send failed: {}", e);
                    }
                }
                None => {
                    info!("Input closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    manager.stop().await;
    drop(manager);
    // Flush whatever was queued before the stop
    let _ = tokio::time::timeout(Duration::from_secs(1), dispatcher).await;

    info!("Smooth Bluetooth stopped");
    Ok(())
}
