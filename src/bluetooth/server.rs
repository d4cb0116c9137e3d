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

//! Listen worker: waits for one inbound RFCOMM channel.

use std::sync::Arc;
use tracing::{debug, error, info};

use super::machine::ConnectionMachine;
use super::radio::Radio;
use super::service::ServiceProfile;
use super::worker::CancelSignal;

/// Bind a listening endpoint for `profile` and accept a single channel.
///
/// Cancellation drops the endpoint, which unblocks the pending accept; the
/// worker then exits without reporting anything.
pub(crate) async fn run_listener(
    machine: Arc<ConnectionMachine>,
    radio: Arc<dyn Radio>,
    id: u64,
    profile: ServiceProfile,
    mut cancel: CancelSignal,
) {
    let bound = tokio::select! {
        biased;
        _ = &mut cancel => {
            debug!("Listener {} cancelled before bind", id);
            return;
        }
        result = radio.listen(profile) => result,
    };

    let mut listener = match bound {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to listen on {}: {:#}", profile, e);
            machine.on_listen_failed(id, e);
            return;
        }
    };
    info!("RFCOMM server listening on {}", profile);

    let accepted = tokio::select! {
        biased;
        _ = &mut cancel => {
            debug!("Listener {} cancelled", id);
            return;
        }
        result = listener.accept() => result,
    };
    drop(listener);

    match accepted {
        Ok((stream, device)) => {
            info!("Connection from: {}", device);
            machine.on_worker_connected(id, stream, device);
        }
        Err(e) => {
            error!("Accept error: {:#}", e);
            machine.on_listen_failed(id, e);
        }
    }
}
