//! Mock transports for driving the supervisor without network or WebRTC.

use async_trait::async_trait;
use feedlink::media::{
    DescriptionKind, MediaSession, MediaSessionFactory, MediaStream, RenderSink,
    SessionDescription,
};
use feedlink::signaling::{SignalingChannel, SignalingConnector};
use feedlink::{ClientConfig, ConnectionSupervisor, Error, MediaEvents, Result, SignalingEvents};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

pub fn offer(sdp: &str) -> SessionDescription {
    SessionDescription {
        kind: DescriptionKind::Offer,
        sdp: sdp.to_string(),
    }
}

pub fn answer(sdp: &str) -> SessionDescription {
    SessionDescription {
        kind: DescriptionKind::Answer,
        sdp: sdp.to_string(),
    }
}

pub fn answer_json(sdp: &str) -> String {
    format!(r#"{{"type":"answer","sdp":"{}"}}"#, sdp)
}

/// Records every channel the supervisor opens, keeping the event handle so
/// tests can play the server's part.
#[derive(Default)]
pub struct MockConnector {
    channels: Mutex<Vec<Arc<MockChannel>>>,
    events: Mutex<Vec<SignalingEvents>>,
}

impl MockConnector {
    pub fn opens(&self) -> usize {
        self.channels.lock().unwrap().len()
    }

    pub fn channel(&self, i: usize) -> Arc<MockChannel> {
        self.channels.lock().unwrap()[i].clone()
    }

    pub fn events(&self, i: usize) -> SignalingEvents {
        self.events.lock().unwrap()[i].clone()
    }
}

impl SignalingConnector for MockConnector {
    fn open(&self, _url: &str, events: SignalingEvents) -> Arc<dyn SignalingChannel> {
        let channel = Arc::new(MockChannel::default());
        self.channels.lock().unwrap().push(channel.clone());
        self.events.lock().unwrap().push(events);
        channel
    }
}

#[derive(Default)]
pub struct MockChannel {
    pub sent: Mutex<Vec<String>>,
    pub closes: AtomicUsize,
}

impl MockChannel {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalingChannel for MockChannel {
    fn send(&self, payload: String) {
        self.sent.lock().unwrap().push(payload);
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Produces sessions whose local description the test releases (or fails)
/// on demand, so both orderings of the descriptor/channel race can be
/// exercised deterministically.
#[derive(Default)]
pub struct MockMediaFactory {
    sessions: Mutex<Vec<Arc<MockSession>>>,
    events: Mutex<Vec<MediaEvents>>,
    locals: Mutex<Vec<Option<oneshot::Sender<SessionDescription>>>>,
    fail_creates: AtomicUsize,
}

impl MockMediaFactory {
    /// Make the next `n` create calls fail.
    pub fn fail_next_creates(&self, n: usize) {
        self.fail_creates.store(n, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn session(&self, i: usize) -> Arc<MockSession> {
        self.sessions.lock().unwrap()[i].clone()
    }

    pub fn events(&self, i: usize) -> MediaEvents {
        self.events.lock().unwrap()[i].clone()
    }

    /// Complete the pending local description of session `i`.
    pub fn produce_local(&self, i: usize, description: SessionDescription) {
        if let Some(tx) = self.locals.lock().unwrap()[i].take() {
            let _ = tx.send(description);
        }
    }

    /// Abort the pending local description of session `i`, failing it.
    pub fn fail_local(&self, i: usize) {
        self.locals.lock().unwrap()[i].take();
    }
}

#[async_trait]
impl MediaSessionFactory for MockMediaFactory {
    async fn create(&self, events: MediaEvents) -> Result<Arc<dyn MediaSession>> {
        let remaining = self.fail_creates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_creates.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Media("mock create failure".to_string()));
        }

        let (tx, rx) = oneshot::channel();
        let session = Arc::new(MockSession {
            local_rx: Mutex::new(Some(rx)),
            applied: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        });
        self.sessions.lock().unwrap().push(session.clone());
        self.events.lock().unwrap().push(events);
        self.locals.lock().unwrap().push(Some(tx));
        Ok(session)
    }
}

pub struct MockSession {
    local_rx: Mutex<Option<oneshot::Receiver<SessionDescription>>>,
    pub applied: Mutex<Vec<(SessionDescription, SessionDescription)>>,
    pub closes: AtomicUsize,
}

impl MockSession {
    pub fn applied(&self) -> Vec<(SessionDescription, SessionDescription)> {
        self.applied.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSession for MockSession {
    async fn create_local_description(&self) -> Result<SessionDescription> {
        let rx = self.local_rx.lock().unwrap().take();
        match rx {
            Some(rx) => rx
                .await
                .map_err(|_| Error::Media("local description aborted".to_string())),
            None => Err(Error::Media("local description already produced".to_string())),
        }
    }

    async fn apply_descriptions(
        &self,
        local: SessionDescription,
        remote: SessionDescription,
    ) -> Result<()> {
        self.applied.lock().unwrap().push((local, remote));
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockSink {
    pub attached: Mutex<Vec<String>>,
    pub detaches: AtomicUsize,
}

impl MockSink {
    pub fn attached(&self) -> Vec<String> {
        self.attached.lock().unwrap().clone()
    }

    pub fn detaches(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }
}

impl RenderSink for MockSink {
    fn attach(&self, stream: Arc<dyn MediaStream>) {
        self.attached.lock().unwrap().push(stream.id());
    }

    fn detach(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockStream(pub String);

impl MediaStream for MockStream {
    fn id(&self) -> String {
        self.0.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A running supervisor wired to mocks.
pub struct TestClient {
    pub connector: Arc<MockConnector>,
    pub media: Arc<MockMediaFactory>,
    pub sink: Arc<MockSink>,
    pub handle: feedlink::SupervisorHandle,
    pub runner: tokio::task::JoinHandle<()>,
}

pub fn test_config() -> ClientConfig {
    ClientConfig {
        signaling_url: "ws://127.0.0.1:9/feed".to_string(),
        min_backoff_ms: 50,
        max_backoff_ms: 1000,
        stun_servers: Vec::new(),
    }
}

/// Spawn a supervisor against fresh mocks. On a current-thread runtime the
/// spawned run loop does not execute until the test first yields, so the
/// mocks can still be configured right after this returns.
pub fn start() -> TestClient {
    let connector = Arc::new(MockConnector::default());
    let media = Arc::new(MockMediaFactory::default());
    let sink = Arc::new(MockSink::default());

    let (supervisor, handle) = ConnectionSupervisor::new(
        test_config(),
        connector.clone(),
        media.clone(),
        sink.clone(),
    )
    .expect("valid config");

    let runner = tokio::spawn(supervisor.run());

    TestClient {
        connector,
        media,
        sink,
        handle,
        runner,
    }
}

/// Yield until `cond` holds, panicking after a bounded number of scheduler
/// turns. Never sleeps, so a paused clock stays put.
pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never reached: {}", what);
}

/// Let spawned tasks drain without advancing time.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock.
pub async fn advance_ms(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
}
