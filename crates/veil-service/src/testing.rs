//! Recording fakes for the engine, provisioner and notification seams.

use crate::engine::{AnchorEngine, EngineError, EngineFactory, StartOptions};
use crate::notification::{
    Notification, NotificationChannel, NotificationError, NotificationPresenter,
};
use crate::tunnel::{
    ProvisionError, RawTunFd, TunnelDescriptor, TunnelHandle, TunnelProvisioner, TunnelSpec,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use tokio::sync::Notify;

pub struct FakeEngine {
    starts: Mutex<Vec<(String, String, StartOptions)>>,
    start_error: Mutex<Option<EngineError>>,
    cidr: Mutex<String>,
    gateway_cidr: Mutex<String>,
    attach_error: Mutex<Option<EngineError>>,
    attached: Mutex<Vec<RawTunFd>>,
    hold: AtomicBool,
    gate: Notify,
    stops: AtomicUsize,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            starts: Mutex::new(Vec::new()),
            start_error: Mutex::new(None),
            cidr: Mutex::new("10.0.0.2/24".into()),
            gateway_cidr: Mutex::new("10.0.0.1/24".into()),
            attach_error: Mutex::new(None),
            attached: Mutex::new(Vec::new()),
            hold: AtomicBool::new(false),
            gate: Notify::new(),
            stops: AtomicUsize::new(0),
        })
    }

    pub fn factory(self: &Arc<Self>) -> Arc<dyn EngineFactory> {
        let engine = self.clone();
        Arc::new(move || -> Arc<dyn AnchorEngine> { engine.clone() })
    }

    pub fn fail_start(&self, error: EngineError) {
        *self.start_error.lock() = Some(error);
    }

    pub fn set_cidrs(&self, cidr: &str, gateway_cidr: &str) {
        *self.cidr.lock() = cidr.into();
        *self.gateway_cidr.lock() = gateway_cidr.into();
    }

    pub fn fail_attach(&self, message: &str) {
        *self.attach_error.lock() = Some(EngineError::new(message));
    }

    /// Keep attach pending until [`release_attach`](Self::release_attach)
    pub fn hold_attach(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn release_attach(&self) {
        self.gate.notify_one();
    }

    pub fn starts(&self) -> Vec<(String, String, StartOptions)> {
        self.starts.lock().clone()
    }

    pub fn start_calls(&self) -> usize {
        self.starts.lock().len()
    }

    pub fn attach_calls(&self) -> usize {
        self.attached.lock().len()
    }

    pub fn attached_fds(&self) -> Vec<RawTunFd> {
        self.attached.lock().clone()
    }

    pub fn stop_calls(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnchorEngine for FakeEngine {
    fn start(
        &self,
        guardian: &str,
        token: &str,
        options: StartOptions,
    ) -> Result<(), EngineError> {
        self.starts
            .lock()
            .push((guardian.to_string(), token.to_string(), options));
        match self.start_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn cidr(&self) -> String {
        self.cidr.lock().clone()
    }

    fn gateway_cidr(&self) -> String {
        self.gateway_cidr.lock().clone()
    }

    async fn attach(&self, fd: RawTunFd) -> Result<(), EngineError> {
        self.attached.lock().push(fd);
        if self.hold.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        match self.attach_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn stop(&self) -> Result<(), EngineError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Err(EngineError::new("already stopped"))
    }
}

struct FakeHandle {
    fd: RawTunFd,
    open: Arc<AtomicUsize>,
}

impl TunnelHandle for FakeHandle {
    fn raw_fd(&self) -> RawTunFd {
        self.fd
    }

    fn close(&mut self) -> io::Result<()> {
        self.open.fetch_sub(1, Ordering::SeqCst);
        Err(io::Error::other("close reported an error"))
    }
}

pub struct FakeProvisioner {
    specs: Mutex<Vec<TunnelSpec>>,
    error: Mutex<Option<ProvisionError>>,
    open: Arc<AtomicUsize>,
    next_fd: AtomicI32,
}

impl FakeProvisioner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            specs: Mutex::new(Vec::new()),
            error: Mutex::new(None),
            open: Arc::new(AtomicUsize::new(0)),
            next_fd: AtomicI32::new(100),
        })
    }

    pub fn fail_with(&self, error: ProvisionError) {
        *self.error.lock() = Some(error);
    }

    pub fn specs(&self) -> Vec<TunnelSpec> {
        self.specs.lock().clone()
    }

    pub fn open_descriptors(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

impl TunnelProvisioner for FakeProvisioner {
    fn establish(&self, spec: &TunnelSpec) -> Result<TunnelDescriptor, ProvisionError> {
        self.specs.lock().push(spec.clone());
        if let Some(e) = self.error.lock().clone() {
            return Err(e);
        }

        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(TunnelDescriptor::new(Box::new(FakeHandle {
            fd: self.next_fd.fetch_add(1, Ordering::SeqCst),
            open: self.open.clone(),
        })))
    }
}

#[derive(Default)]
pub struct FakePresenter {
    channels: AtomicUsize,
    shown: Mutex<Vec<Notification>>,
    dismissed: Mutex<Vec<u32>>,
    fail: AtomicBool,
}

impl FakePresenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_show(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn channel_calls(&self) -> usize {
        self.channels.load(Ordering::SeqCst)
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().clone()
    }

    pub fn dismissed(&self) -> Vec<u32> {
        self.dismissed.lock().clone()
    }
}

impl NotificationPresenter for FakePresenter {
    fn ensure_channel(&self, _channel: &NotificationChannel) -> Result<(), NotificationError> {
        self.channels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn show_foreground(&self, notification: &Notification) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::Show("no foreground permission".into()));
        }
        self.shown.lock().push(notification.clone());
        Ok(())
    }

    fn dismiss(&self, id: u32) {
        self.dismissed.lock().push(id);
    }
}
