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

//! BlueZ radio implementation.
//!
//! RFCOMM channels are obtained through BlueZ profiles: listening registers
//! a server profile for the service UUID, connecting registers a client
//! profile and asks the remote device to connect it.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bluer::rfcomm::{Profile, ProfileHandle, ReqError, Role};
use bluer::{Adapter, AdapterEvent, Address, Session};
use futures::{pin_mut, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::device::Device;
use super::radio::{BoxedStream, DiscoveryEvent, Radio, RfcommListener};
use super::service::ServiceProfile;
use crate::config::BluetoothConfig;

type Subscriber = Arc<Mutex<Option<mpsc::UnboundedSender<DiscoveryEvent>>>>;

/// Radio backed by the default BlueZ adapter.
pub struct BluezRadio {
    session: Session,
    adapter: Adapter,
    service_name: String,
    discovery_timeout: Duration,
    subscriber: Subscriber,
    scan: Mutex<Option<JoinHandle<()>>>,
}

impl BluezRadio {
    /// Open a BlueZ session on the default adapter.
    pub async fn new(config: &BluetoothConfig) -> Result<Self> {
        info!("Initializing Bluetooth radio...");

        // Create BlueZ session
        let session = Session::new().await?;
        info!("BlueZ session created");

        let adapter = session.default_adapter().await?;
        info!("Using Bluetooth adapter: {}", adapter.name());

        Ok(Self {
            session,
            adapter,
            service_name: config.service_name.clone(),
            discovery_timeout: config.discovery_timeout(),
            subscriber: Arc::new(Mutex::new(None)),
            scan: Mutex::new(None),
        })
    }

    /// Power the adapter on if needed.
    pub async fn power_on(&self) -> Result<()> {
        if !self.adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter...");
            self.adapter.set_powered(true).await?;
        }
        Ok(())
    }

    fn notify(subscriber: &Subscriber, event: DiscoveryEvent) {
        if let Some(tx) = subscriber.lock().as_ref() {
            let _ = tx.send(event);
        }
    }

    async fn scan(adapter: Adapter, subscriber: Subscriber, window: Duration) {
        let events = match adapter.discover_devices().await {
            Ok(events) => events,
            Err(e) => {
                warn!("Discovery failed: {}", e);
                Self::notify(&subscriber, DiscoveryEvent::Finished);
                return;
            }
        };
        pin_mut!(events);
        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                event = events.next() => match event {
                    Some(AdapterEvent::DeviceAdded(addr)) => {
                        match describe(&adapter, addr).await {
                            Ok(device) => Self::notify(&subscriber, DiscoveryEvent::DeviceFound(device)),
                            Err(e) => debug!("Skipping {}: {:#}", addr, e),
                        }
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }

        // Dropping the event stream ends the scan
        Self::notify(&subscriber, DiscoveryEvent::Finished);
    }
}

/// Build a [`Device`] from an adapter address.
async fn describe(adapter: &Adapter, addr: Address) -> Result<Device> {
    let device = adapter.device(addr)?;
    let name = device.alias().await.unwrap_or_else(|_| addr.to_string());
    let paired = device.is_paired().await.unwrap_or(false);
    Ok(Device::new(name, addr.to_string(), paired))
}

/// Server profile registration; each request is one inbound channel.
struct BluezListener {
    adapter: Adapter,
    handle: ProfileHandle,
}

#[async_trait]
impl RfcommListener for BluezListener {
    async fn accept(&mut self) -> Result<(BoxedStream, Device)> {
        let request = self
            .handle
            .next()
            .await
            .ok_or_else(|| anyhow!("profile registration closed"))?;
        let addr = request.device();
        let stream = request.accept()?;
        let device = describe(&self.adapter, addr).await?;
        Ok((Box::new(stream), device))
    }
}

#[async_trait]
impl Radio for BluezRadio {
    async fn is_available(&self) -> bool {
        self.adapter.address().await.is_ok()
    }

    async fn is_enabled(&self) -> bool {
        self.adapter.is_powered().await.unwrap_or(false)
    }

    async fn bonded_devices(&self) -> Result<Vec<Device>> {
        let mut devices = Vec::new();

        for addr in self.adapter.device_addresses().await? {
            let device = self.adapter.device(addr)?;
            if device.is_paired().await? {
                let name = device.alias().await.unwrap_or_else(|_| addr.to_string());
                devices.push(Device::new(name, addr.to_string(), true));
            }
        }

        Ok(devices)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<DiscoveryEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.subscriber.lock() = Some(tx);
        rx
    }

    fn unsubscribe(&self) {
        self.subscriber.lock().take();
    }

    async fn start_discovery(&self) -> Result<()> {
        let task = tokio::spawn(Self::scan(
            self.adapter.clone(),
            Arc::clone(&self.subscriber),
            self.discovery_timeout,
        ));
        if let Some(previous) = self.scan.lock().replace(task) {
            previous.abort();
        }
        Ok(())
    }

    async fn cancel_discovery(&self) -> Result<()> {
        if let Some(task) = self.scan.lock().take() {
            task.abort();
        }
        Ok(())
    }

    async fn is_discovering(&self) -> bool {
        self.adapter.is_discovering().await.unwrap_or(false)
    }

    async fn listen(&self, profile: ServiceProfile) -> Result<Box<dyn RfcommListener>> {
        let handle = self
            .session
            .register_profile(Profile {
                uuid: profile.uuid(),
                name: Some(self.service_name.clone()),
                role: Some(Role::Server),
                require_authentication: Some(profile.is_secure()),
                require_authorization: Some(false),
                ..Default::default()
            })
            .await
            .context("registering server profile")?;
        Ok(Box::new(BluezListener {
            adapter: self.adapter.clone(),
            handle,
        }))
    }

    async fn connect(&self, device: &Device, profile: ServiceProfile) -> Result<BoxedStream> {
        let address: Address = device
            .address()
            .parse()
            .with_context(|| format!("invalid address {}", device.address()))?;
        let uuid = profile.uuid();

        let mut handle = self
            .session
            .register_profile(Profile {
                uuid,
                role: Some(Role::Client),
                require_authentication: Some(profile.is_secure()),
                require_authorization: Some(false),
                ..Default::default()
            })
            .await
            .context("registering client profile")?;

        let remote = self.adapter.device(address)?;
        let connect = async {
            // Already connected at the ACL level is fine
            let _ = remote.connect().await;
            remote.connect_profile(&uuid).await
        };
        tokio::pin!(connect);
        let mut requested = false;

        loop {
            tokio::select! {
                result = &mut connect, if !requested => {
                    result.with_context(|| format!("connecting profile on {}", address))?;
                    requested = true;
                }
                request = handle.next() => {
                    let request = request.ok_or_else(|| anyhow!("profile registration closed"))?;
                    if request.device() == address {
                        let stream = request.accept()?;
                        return Ok(Box::new(stream));
                    }
                    debug!("Rejecting unexpected request from {}", request.device());
                    request.reject(ReqError::Rejected);
                }
            }
        }
    }
}
