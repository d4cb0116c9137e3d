//! In-memory radio used by the integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::sync::{mpsc, oneshot};

use smooth_bluetooth::bluetooth::{BoxedStream, DiscoveryEvent, RfcommListener};
use smooth_bluetooth::{
    BluetoothConfig, BluetoothEvent, BluetoothManager, ConnectionState, Device, Radio,
    ServiceProfile,
};

/// Outcome of the next outbound connect call.
pub enum ConnectPlan {
    Succeed,
    Fail,
    /// Block until the sender decides: `true` succeeds, `false` fails.
    Gate(oneshot::Receiver<bool>),
}

type Inbound = mpsc::UnboundedSender<(BoxedStream, Device)>;

pub struct FakeRadio {
    pub available: AtomicBool,
    pub enabled: AtomicBool,
    /// Make `listen` fail to bind.
    pub fail_listen: AtomicBool,
    bonded: Mutex<Vec<Device>>,
    subscriber: Mutex<Option<mpsc::UnboundedSender<DiscoveryEvent>>>,
    discovering: AtomicBool,
    discovery_starts: AtomicUsize,
    discovery_cancels: AtomicUsize,
    inbound: Mutex<Option<Inbound>>,
    listens: AtomicUsize,
    plans: Mutex<VecDeque<ConnectPlan>>,
    connect_calls: Mutex<Vec<Device>>,
    peers: Mutex<Vec<DuplexStream>>,
}

impl FakeRadio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            available: AtomicBool::new(true),
            enabled: AtomicBool::new(true),
            fail_listen: AtomicBool::new(false),
            bonded: Mutex::new(Vec::new()),
            subscriber: Mutex::new(None),
            discovering: AtomicBool::new(false),
            discovery_starts: AtomicUsize::new(0),
            discovery_cancels: AtomicUsize::new(0),
            inbound: Mutex::new(None),
            listens: AtomicUsize::new(0),
            plans: Mutex::new(VecDeque::new()),
            connect_calls: Mutex::new(Vec::new()),
            peers: Mutex::new(Vec::new()),
        })
    }

    pub fn set_bonded(&self, devices: Vec<Device>) {
        *self.bonded.lock() = devices;
    }

    pub fn plan(&self, plan: ConnectPlan) {
        self.plans.lock().push_back(plan);
    }

    pub fn listens(&self) -> usize {
        self.listens.load(Ordering::SeqCst)
    }

    pub fn discovery_starts(&self) -> usize {
        self.discovery_starts.load(Ordering::SeqCst)
    }

    pub fn discovery_cancels(&self) -> usize {
        self.discovery_cancels.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> Vec<Device> {
        self.connect_calls.lock().clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriber.lock().is_some()
    }

    /// Report a discovery notification to the current subscriber.
    pub fn discover(&self, event: DiscoveryEvent) {
        if let Some(tx) = self.subscriber.lock().as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Remote end of the most recent outbound channel.
    pub fn take_peer(&self) -> Option<DuplexStream> {
        self.peers.lock().pop()
    }

    /// Hand an inbound channel to the current listener.
    pub fn accept_inbound(&self, device: Device) -> Option<DuplexStream> {
        let (local, remote) = tokio::io::duplex(1024);
        let inbound = self.inbound.lock();
        inbound.as_ref()?.send((Box::new(local), device)).ok()?;
        Some(remote)
    }

    /// Drop the current listener's inbound source so its accept fails.
    pub fn close_inbound(&self) {
        self.inbound.lock().take();
    }

    fn open_link(&self) -> BoxedStream {
        let (local, remote) = tokio::io::duplex(1024);
        self.peers.lock().push(remote);
        Box::new(local)
    }
}

struct FakeListener {
    rx: mpsc::UnboundedReceiver<(BoxedStream, Device)>,
}

#[async_trait]
impl RfcommListener for FakeListener {
    async fn accept(&mut self) -> Result<(BoxedStream, Device)> {
        self.rx.recv().await.ok_or_else(|| anyhow!("listener closed"))
    }
}

#[async_trait]
impl Radio for FakeRadio {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn bonded_devices(&self) -> Result<Vec<Device>> {
        Ok(self.bonded.lock().clone())
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
        self.discovering.store(true, Ordering::SeqCst);
        self.discovery_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cancel_discovery(&self) -> Result<()> {
        self.discovering.store(false, Ordering::SeqCst);
        self.discovery_cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn is_discovering(&self) -> bool {
        self.discovering.load(Ordering::SeqCst)
    }

    async fn listen(&self, _profile: ServiceProfile) -> Result<Box<dyn RfcommListener>> {
        if self.fail_listen.load(Ordering::SeqCst) {
            return Err(anyhow!("adapter busy"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inbound.lock() = Some(tx);
        self.listens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeListener { rx }))
    }

    async fn connect(&self, device: &Device, _profile: ServiceProfile) -> Result<BoxedStream> {
        self.connect_calls.lock().push(device.clone());
        let plan = self.plans.lock().pop_front().unwrap_or(ConnectPlan::Fail);
        match plan {
            ConnectPlan::Succeed => Ok(self.open_link()),
            ConnectPlan::Fail => Err(anyhow!("connection refused")),
            ConnectPlan::Gate(gate) => match gate.await {
                Ok(true) => Ok(self.open_link()),
                _ => Err(anyhow!("connection refused")),
            },
        }
    }
}

pub fn manager(radio: &Arc<FakeRadio>) -> (BluetoothManager, mpsc::UnboundedReceiver<BluetoothEvent>) {
    let radio: Arc<dyn Radio> = radio.clone();
    let mut manager = BluetoothManager::new(radio, &BluetoothConfig::default());
    let events = manager.take_event_receiver().unwrap();
    (manager, events)
}

pub fn device(name: &str, address: &str, paired: bool) -> Device {
    Device::new(name, address, paired)
}

const WAIT: Duration = Duration::from_secs(2);

pub async fn next_event(events: &mut mpsc::UnboundedReceiver<BluetoothEvent>) -> BluetoothEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Assert that nothing else is queued right now.
pub fn assert_no_event(events: &mut mpsc::UnboundedReceiver<BluetoothEvent>) {
    if let Ok(event) = events.try_recv() {
        panic!("unexpected event: {:?}", event);
    }
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}

pub async fn wait_for_state(manager: &BluetoothManager, state: ConnectionState) {
    wait_until(|| manager.state() == state).await;
}
