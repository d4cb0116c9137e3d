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

//! Discovery scan bookkeeping shared by the manager and device choosers.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::device::{Device, DeviceRegistry};
use super::machine::ConnectionMachine;
use super::radio::{DiscoveryEvent, Radio};
use crate::events::{BluetoothEvent, DeviceChooser};

/// The scan currently collecting results. Lock order: `scan`, then
/// `registry`, then the machine.
#[derive(Default)]
struct Scan {
    generation: u64,
    active: Option<u64>,
    task: Option<JoinHandle<()>>,
}

impl Scan {
    /// Forget the running scan. Returns whether one was running.
    fn end(&mut self) -> bool {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.active.take().is_some()
    }
}

pub(crate) struct Discovery {
    radio: Arc<dyn Radio>,
    machine: Arc<ConnectionMachine>,
    registry: Mutex<DeviceRegistry>,
    scan: Mutex<Scan>,
}

impl Discovery {
    pub(crate) fn new(radio: Arc<dyn Radio>, machine: Arc<ConnectionMachine>) -> Arc<Self> {
        Arc::new(Self {
            radio,
            machine,
            registry: Mutex::new(DeviceRegistry::new()),
            scan: Mutex::new(Scan::default()),
        })
    }

    pub(crate) fn devices(&self) -> Vec<Device> {
        self.registry.lock().snapshot()
    }

    /// Replace the candidate list with `paired` and return it.
    pub(crate) fn offer_paired(&self, paired: Vec<Device>) -> Vec<Device> {
        let mut registry = self.registry.lock();
        registry.clear();
        registry.add_paired(paired);
        registry.snapshot()
    }

    /// Drop the running scan task and empty the candidate list. Results
    /// still in flight from the old scan are discarded.
    pub(crate) fn reset(&self) {
        let mut scan = self.scan.lock();
        scan.end();
        scan.generation += 1;
        self.registry.lock().clear();
    }

    /// Collect results from `found` until the radio reports the scan done.
    pub(crate) fn begin(
        self: &Arc<Self>,
        found: mpsc::UnboundedReceiver<DiscoveryEvent>,
        chooser: DeviceChooser,
    ) {
        let mut scan = self.scan.lock();
        scan.end();
        scan.generation += 1;
        let generation = scan.generation;
        scan.active = Some(generation);

        let discovery = Arc::clone(self);
        scan.task = Some(tokio::spawn(async move {
            discovery.collect(generation, found, chooser).await;
        }));
    }

    async fn collect(
        &self,
        generation: u64,
        mut found: mpsc::UnboundedReceiver<DiscoveryEvent>,
        chooser: DeviceChooser,
    ) {
        loop {
            match found.recv().await {
                Some(DiscoveryEvent::DeviceFound(device)) => {
                    let scan = self.scan.lock();
                    if scan.active != Some(generation) {
                        return;
                    }
                    debug!("Device found: {}", device);
                    self.registry.lock().add_discovered(device);
                }
                Some(DiscoveryEvent::Finished) => break,
                None => {
                    debug!("Discovery subscription closed");
                    return;
                }
            }
        }

        let mut scan = self.scan.lock();
        if scan.active != Some(generation) {
            return;
        }
        scan.active = None;
        // Our own handle; dropping it detaches
        scan.task = None;

        self.radio.unsubscribe();
        let devices = self.registry.lock().snapshot();
        info!("Discovery finished: {}", devices.len());
        self.machine.emit(BluetoothEvent::DiscoveryFinished);
        if devices.is_empty() {
            self.machine.emit(BluetoothEvent::NoDevicesFound);
        } else {
            self.machine.emit(BluetoothEvent::DevicesFound { devices, chooser });
        }
    }

    /// End the scan because a connection attempt is starting.
    ///
    /// Candidates found so far stay in the registry; only
    /// `DiscoveryFinished` is reported.
    pub(crate) fn finish_for_connect(&self) {
        let mut scan = self.scan.lock();
        if !scan.end() {
            return;
        }
        self.radio.unsubscribe();
        info!("Discovery ended by connection attempt");
        self.machine.emit(BluetoothEvent::DiscoveryFinished);
    }

    /// End the scan without reporting anything.
    pub(crate) fn cancel(&self) {
        self.scan.lock().end();
        self.radio.unsubscribe();
    }
}
