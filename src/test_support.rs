use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::MakeWriter;
use crate::cache::Clock;
use crate::upstream::{ConnectorError, Upstream, UpstreamRequest, UpstreamResponse};

pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Instant::now()),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

type Responder = dyn Fn(&UpstreamRequest) -> Result<UpstreamResponse, ConnectorError> + Send + Sync;

/// Scripted upstream that records every call it receives.
pub struct FakeUpstream {
    responder: Box<Responder>,
    delay: Option<Duration>,
    calls: Mutex<Vec<UpstreamRequest>>,
}

impl FakeUpstream {
    pub fn with<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&UpstreamRequest) -> Result<UpstreamResponse, ConnectorError> + Send + Sync + 'static,
    {
        Arc::new(Self::build(responder, None))
    }

    fn build<F>(responder: F, delay: Option<Duration>) -> Self
    where
        F: Fn(&UpstreamRequest) -> Result<UpstreamResponse, ConnectorError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(body: &'static str) -> Arc<Self> {
        Self::with(move |_| Ok(json_response(StatusCode::OK, body)))
    }

    /// Upstream that only answers after `delay` (tokio time).
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(
            |_| Ok(json_response(StatusCode::OK, "{}")),
            Some(delay),
        ))
    }

    pub fn calls(&self) -> Vec<UpstreamRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn call(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ConnectorError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&request)
    }
}

pub fn json_response(status: StatusCode, body: &'static str) -> UpstreamResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    UpstreamResponse {
        status,
        headers,
        body: Bytes::from_static(body.as_bytes()),
    }
}

/// In-memory sink for fmt subscriber output.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
