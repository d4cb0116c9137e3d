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

//! Session worker: owns an established channel.

use std::io;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::machine::ConnectionMachine;
use super::radio::BoxedStream;
use super::worker::CancelSignal;

/// Line terminator optionally appended to outbound data.
pub const LINE_TERMINATOR: &[u8; 2] = b"\r\n";

/// Copy `data` into a buffer sized for the optional CR LF terminator.
pub fn with_terminator(data: &[u8], append_terminator: bool) -> Vec<u8> {
    let extra = if append_terminator {
        LINE_TERMINATOR.len()
    } else {
        0
    };
    let mut buf = Vec::with_capacity(data.len() + extra);
    buf.extend_from_slice(data);
    if append_terminator {
        buf.extend_from_slice(LINE_TERMINATOR);
    }
    buf
}

/// Serializing entry point for the session's output stream.
#[derive(Clone)]
pub(crate) struct SessionWriter {
    inner: Arc<Mutex<WriteHalf<BoxedStream>>>,
}

impl SessionWriter {
    pub(crate) fn new(writer: WriteHalf<BoxedStream>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Write and flush one buffer. Concurrent callers are queued.
    pub(crate) async fn write(&self, data: &[u8]) -> io::Result<()> {
        let mut writer = self.inner.lock().await;
        writer.write_all(data).await?;
        writer.flush().await
    }

    pub(crate) async fn close(&self) {
        let mut writer = self.inner.lock().await;
        if let Err(e) = writer.shutdown().await {
            debug!("Shutdown of session writer failed: {}", e);
        }
    }
}

/// Read loop of one session.
///
/// Forwards every chunk to the machine until the channel fails or the
/// worker is cancelled. A failure is reported exactly once; cancellation
/// is not reported at all.
pub(crate) async fn run_session(
    machine: Arc<ConnectionMachine>,
    id: u64,
    mut reader: ReadHalf<BoxedStream>,
    writer: SessionWriter,
    mut cancel: CancelSignal,
    buffer_size: usize,
) {
    info!("Session {} started", id);
    let mut buf = vec![0u8; buffer_size.max(1)];

    loop {
        tokio::select! {
            biased;
            _ = &mut cancel => {
                debug!("Session {} cancelled", id);
                break;
            }
            result = reader.read(&mut buf) => match result {
                Ok(0) => {
                    info!("Connection closed by remote");
                    machine.on_session_lost(id);
                    break;
                }
                Ok(n) => {
                    debug!("Received {} bytes", n);
                    machine.on_data_received(id, buf[..n].to_vec());
                }
                Err(e) => {
                    warn!("Read error: {}", e);
                    machine.on_session_lost(id);
                    break;
                }
            }
        }
    }

    drop(reader);
    writer.close().await;
    debug!("Session {} closed", id);
}
