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

//! Connect worker: one outbound connection attempt.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::device::Device;
use super::machine::ConnectionMachine;
use super::radio::Radio;
use super::service::ServiceProfile;
use super::worker::CancelSignal;

pub(crate) async fn run_connector(
    machine: Arc<ConnectionMachine>,
    radio: Arc<dyn Radio>,
    id: u64,
    device: Device,
    profile: ServiceProfile,
    mut cancel: CancelSignal,
) {
    // A running scan slows the connection down considerably
    if let Err(e) = radio.cancel_discovery().await {
        debug!("Could not cancel discovery: {:#}", e);
    }

    info!("Connecting to {} on {}", device, profile);
    let result = tokio::select! {
        biased;
        _ = &mut cancel => {
            debug!("Connect to {} cancelled", device);
            return;
        }
        result = radio.connect(&device, profile) => result,
    };

    match result {
        Ok(stream) => {
            info!("Connected to {}", device);
            machine.on_worker_connected(id, stream, device);
        }
        Err(e) => {
            warn!("Connection to {} failed: {:#}", device, e);
            machine.on_worker_failed(id, device);
        }
    }
}
