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

//! Connection state machine.
//!
//! Owns the lifecycle state and the worker handles. Every transition runs
//! under one lock and emits its lifecycle event while still holding it, so
//! the event channel observes transitions in the order they happened. The
//! lock is never held across an `.await`.
//!
//! Workers report back through the `on_*` entry points. Each worker carries
//! an id; an outcome from a worker that is no longer eligible (superseded,
//! cancelled, or beaten by a competing worker) is discarded and its channel
//! closed.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::client::run_connector;
use super::connection::{run_session, SessionWriter};
use super::device::Device;
use super::radio::{BoxedStream, Radio};
use super::server::run_listener;
use super::service::ServiceProfile;
use super::worker::{WorkerHandle, WorkerKind};
use crate::error::{BluetoothError, Result};
use crate::events::BluetoothEvent;
use crate::state::ConnectionState;

/// Default size of the session read buffer.
pub const DEFAULT_READ_BUFFER: usize = 1024;

struct Session {
    worker: WorkerHandle,
    writer: SessionWriter,
    device: Device,
}

struct Inner {
    state: ConnectionState,
    profile: ServiceProfile,
    listen: Option<WorkerHandle>,
    connect: Option<WorkerHandle>,
    session: Option<Session>,
    next_id: u64,
    /// Oldest worker id whose success may still be installed.
    eligible_from: u64,
    stopped: bool,
}

impl Inner {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Cancel every worker and hand back their handles for joining.
    fn take_workers(&mut self) -> Vec<WorkerHandle> {
        let mut workers = Vec::new();
        workers.extend(self.listen.take());
        workers.extend(self.connect.take());
        workers.extend(self.session.take().map(|s| s.worker));
        for worker in &mut workers {
            worker.cancel();
        }
        workers
    }

    fn cancel_pending(&mut self) {
        if let Some(mut worker) = self.listen.take() {
            worker.cancel();
        }
        if let Some(mut worker) = self.connect.take() {
            worker.cancel();
        }
    }

    fn cancel_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.worker.cancel();
        }
    }
}

/// Orchestrates the listen, connect and session workers.
pub struct ConnectionMachine {
    radio: Arc<dyn Radio>,
    events: mpsc::UnboundedSender<BluetoothEvent>,
    read_buffer_size: usize,
    inner: Mutex<Inner>,
}

impl ConnectionMachine {
    pub fn new(
        radio: Arc<dyn Radio>,
        profile: ServiceProfile,
        read_buffer_size: usize,
        events: mpsc::UnboundedSender<BluetoothEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            radio,
            events,
            read_buffer_size,
            inner: Mutex::new(Inner {
                state: ConnectionState::Idle,
                profile,
                listen: None,
                connect: None,
                session: None,
                next_id: 1,
                eligible_from: 1,
                stopped: false,
            }),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    /// The worker currently alive, if any.
    pub fn active_worker(&self) -> Option<WorkerKind> {
        let inner = self.inner.lock();
        if let Some(session) = &inner.session {
            return Some(session.worker.kind());
        }
        inner
            .connect
            .as_ref()
            .or(inner.listen.as_ref())
            .map(|w| w.kind())
    }

    pub fn connected_device(&self) -> Option<Device> {
        self.inner.lock().session.as_ref().map(|s| s.device.clone())
    }

    /// Emit an event outside of a transition. Dropped once stopped.
    pub(crate) fn emit(&self, event: BluetoothEvent) {
        let inner = self.inner.lock();
        self.emit_locked(&inner, event);
    }

    fn emit_locked(&self, inner: &Inner, event: BluetoothEvent) {
        if inner.stopped {
            debug!("Dropping {:?} after stop", event);
            return;
        }
        // The receiver going away only means nobody is observing
        let _ = self.events.send(event);
    }

    fn spawn_listen(self: &Arc<Self>, inner: &mut Inner) -> u64 {
        let id = inner.allocate_id();
        let machine = Arc::clone(self);
        let radio = Arc::clone(&self.radio);
        let profile = inner.profile;
        inner.listen = Some(WorkerHandle::spawn(id, WorkerKind::Listen, move |cancel| {
            run_listener(machine, radio, id, profile, cancel)
        }));
        id
    }

    fn spawn_connect(self: &Arc<Self>, inner: &mut Inner, device: Device) -> u64 {
        let id = inner.allocate_id();
        let machine = Arc::clone(self);
        let radio = Arc::clone(&self.radio);
        let profile = inner.profile;
        inner.connect = Some(WorkerHandle::spawn(id, WorkerKind::Connect, move |cancel| {
            run_connector(machine, radio, id, device, profile, cancel)
        }));
        id
    }

    fn spawn_session(self: &Arc<Self>, inner: &mut Inner, stream: BoxedStream, device: Device) {
        let id = inner.allocate_id();
        let (reader, writer) = tokio::io::split(stream);
        let writer = SessionWriter::new(writer);
        let machine = Arc::clone(self);
        let session_writer = writer.clone();
        let buffer_size = self.read_buffer_size;
        let worker = WorkerHandle::spawn(id, WorkerKind::Session, move |cancel| {
            run_session(machine, id, reader, session_writer, cancel, buffer_size)
        });
        inner.session = Some(Session {
            worker,
            writer,
            device,
        });
    }

    /// Respawn listening after a failure and make it the only eligible
    /// worker.
    fn restart_listening(self: &Arc<Self>, inner: &mut Inner) {
        let id = self.spawn_listen(inner);
        inner.eligible_from = id;
        inner.state = ConnectionState::Listening;
    }

    /// Start accepting inbound channels.
    ///
    /// Valid from `Idle` and `Connected`; returns `false` otherwise.
    pub fn start_listening(self: &Arc<Self>) -> bool {
        let mut inner = self.inner.lock();
        if inner.stopped {
            return false;
        }
        let previous = inner.state;
        match previous {
            ConnectionState::Idle | ConnectionState::Connected => {}
            ConnectionState::Listening | ConnectionState::Connecting => {
                debug!("start_listening ignored while {}", previous);
                return false;
            }
        }

        inner.cancel_session();
        inner.cancel_pending();
        self.restart_listening(&mut inner);
        info!("State {} -> {}", previous, inner.state);

        let event = if previous == ConnectionState::Connected {
            BluetoothEvent::Disconnected
        } else {
            BluetoothEvent::Listening
        };
        self.emit_locked(&inner, event);
        true
    }

    /// Open an outbound channel to `device`, dropping whatever was running.
    pub fn connect_to(self: &Arc<Self>, device: Device, profile: ServiceProfile) {
        let mut inner = self.inner.lock();
        if inner.stopped {
            return;
        }

        if inner.state == ConnectionState::Connected {
            inner.cancel_session();
            inner.state = ConnectionState::Idle;
            info!("State Connected -> Idle");
            self.emit_locked(&inner, BluetoothEvent::Disconnected);
        }

        // An inbound accept racing this attempt may still win
        let listen_id = inner.listen.as_ref().map(|w| w.id());
        inner.cancel_pending();
        inner.profile = profile;
        let connect_id = self.spawn_connect(&mut inner, device.clone());
        inner.eligible_from = listen_id.unwrap_or(connect_id);

        let previous = inner.state;
        inner.state = ConnectionState::Connecting;
        info!("State {} -> {} ({})", previous, inner.state, device);
        self.emit_locked(&inner, BluetoothEvent::Connecting(device));
    }

    /// A listen or connect worker produced a channel.
    pub(crate) fn on_worker_connected(self: &Arc<Self>, id: u64, stream: BoxedStream, device: Device) {
        let mut inner = self.inner.lock();
        if inner.stopped || !inner.state.is_pending() || id < inner.eligible_from {
            debug!(
                "Discarding late channel from worker {} ({}) while {}",
                id, device, inner.state
            );
            drop(inner);
            drop(stream);
            return;
        }

        inner.cancel_pending();
        self.spawn_session(&mut inner, stream, device.clone());
        inner.eligible_from = inner.next_id;

        let previous = inner.state;
        inner.state = ConnectionState::Connected;
        info!("State {} -> {} ({})", previous, inner.state, device);
        self.emit_locked(&inner, BluetoothEvent::Connected(device));
    }

    /// The current connect worker could not establish a channel.
    pub(crate) fn on_worker_failed(self: &Arc<Self>, id: u64, device: Device) {
        let mut inner = self.inner.lock();
        if inner.stopped || inner.connect.as_ref().map(|w| w.id()) != Some(id) {
            debug!("Ignoring failure of superseded connect worker {}", id);
            return;
        }
        inner.connect = None;

        self.restart_listening(&mut inner);
        info!("State Connecting -> {} (failed: {})", inner.state, device);
        self.emit_locked(&inner, BluetoothEvent::ConnectionFailed(device));
    }

    /// The current listen worker could not bind or accept.
    pub(crate) fn on_listen_failed(&self, id: u64, error: anyhow::Error) {
        let mut inner = self.inner.lock();
        if inner.stopped || inner.listen.as_ref().map(|w| w.id()) != Some(id) {
            debug!("Ignoring failure of superseded listen worker {}", id);
            return;
        }
        inner.listen = None;
        inner.eligible_from = inner.next_id;
        inner.state = ConnectionState::Idle;
        warn!("State Listening -> Idle: {:#}", error);
        self.emit_locked(&inner, BluetoothEvent::Error(format!("{:#}", error)));
    }

    /// The current session's read loop failed.
    pub(crate) fn on_session_lost(self: &Arc<Self>, id: u64) {
        let mut inner = self.inner.lock();
        if inner.stopped || inner.session.as_ref().map(|s| s.worker.id()) != Some(id) {
            debug!("Ignoring loss of superseded session {}", id);
            return;
        }
        // The worker is exiting on its own
        inner.session = None;

        self.restart_listening(&mut inner);
        info!("State Connected -> {} (session lost)", inner.state);
        self.emit_locked(&inner, BluetoothEvent::Disconnected);
    }

    pub(crate) fn on_data_received(&self, id: u64, data: Vec<u8>) {
        let inner = self.inner.lock();
        if inner.session.as_ref().map(|s| s.worker.id()) == Some(id) {
            self.emit_locked(&inner, BluetoothEvent::DataReceived(data));
        }
    }

    /// Write `data` to the current session.
    pub async fn send(&self, data: Vec<u8>) -> Result<usize> {
        let (id, writer) = {
            let inner = self.inner.lock();
            if inner.stopped {
                return Err(BluetoothError::Stopped);
            }
            match (&inner.session, inner.state) {
                (Some(session), ConnectionState::Connected) => {
                    (session.worker.id(), session.writer.clone())
                }
                _ => return Err(BluetoothError::NotConnected),
            }
        };

        writer.write(&data).await?;
        let written = data.len();

        let inner = self.inner.lock();
        if inner.session.as_ref().map(|s| s.worker.id()) == Some(id) {
            debug!("Sent {} bytes", written);
            self.emit_locked(&inner, BluetoothEvent::DataSent(data));
        }
        Ok(written)
    }

    /// Stop every worker and return to `Idle`.
    pub async fn disconnect(&self) {
        let workers = {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return;
            }
            let previous = inner.state;
            let workers = inner.take_workers();
            inner.eligible_from = inner.next_id;
            inner.state = ConnectionState::Idle;
            info!("State {} -> Idle (disconnect)", previous);
            if previous == ConnectionState::Connected {
                self.emit_locked(&inner, BluetoothEvent::Disconnected);
            }
            workers
        };

        for worker in workers {
            worker.join().await;
        }
    }

    /// Terminal shutdown. No event is emitted once this returns.
    pub async fn stop(&self) {
        let workers = {
            let mut inner = self.inner.lock();
            if inner.stopped {
                return;
            }
            let previous = inner.state;
            let workers = inner.take_workers();
            inner.eligible_from = inner.next_id;
            inner.state = ConnectionState::Idle;
            if previous == ConnectionState::Connected {
                self.emit_locked(&inner, BluetoothEvent::Disconnected);
            }
            inner.stopped = true;
            info!("Connection machine stopped");
            workers
        };

        for worker in workers {
            worker.join().await;
        }
    }

    #[cfg(test)]
    fn worker_ids(&self) -> (Option<u64>, Option<u64>) {
        let inner = self.inner.lock();
        (
            inner.listen.as_ref().map(|w| w.id()),
            inner.connect.as_ref().map(|w| w.id()),
        )
    }
}
