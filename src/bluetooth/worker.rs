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

//! Cancellable worker task handles.

use std::future::Future;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Kind of worker currently owned by the connection machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerKind {
    Listen,
    Connect,
    Session,
}

/// Receiving side of a cancel signal. Resolves when the worker should stop,
/// including when its handle was dropped.
pub(crate) type CancelSignal = oneshot::Receiver<()>;

/// A spawned worker task together with its cancel trigger.
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    id: u64,
    kind: WorkerKind,
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawn `run` with a fresh cancel signal.
    pub(crate) fn spawn<F, Fut>(id: u64, kind: WorkerKind, run: F) -> Self
    where
        F: FnOnce(CancelSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(run(cancel_rx));
        Self {
            id,
            kind,
            cancel: Some(cancel_tx),
            task: Some(task),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn kind(&self) -> WorkerKind {
        self.kind
    }

    /// Signal the worker to close its channel. Safe to call repeatedly.
    pub(crate) fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // The worker may already have exited
            let _ = cancel.send(());
        }
    }

    /// Cancel, then wait for the task to finish.
    pub(crate) async fn join(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}
