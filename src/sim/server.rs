use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use url::Url;
use crate::net::{Request, Response};

/// Simulated remote server.
///
/// Holds one canned [`Response`] and a processing latency. Every reply waits
/// for the latency, restamps the canned response with the requested status
/// code and hands out a snapshot of it.
#[derive(Debug)]
pub struct SimServer {
    /// Address the server pretends to listen on
    addr: String,
    /// The response that is restamped on every reply
    canned: Mutex<Response>,
    /// Processing time per reply
    latency: Duration,
    /// Number of requests drained off the link and served
    served: AtomicU64,
    last_request_url: Mutex<Option<Url>>,
}

impl SimServer {
    pub fn new(addr: impl Into<String>, canned: Response, latency: Duration) -> Self {
        Self {
            addr: addr.into(),
            canned: Mutex::new(canned),
            latency,
            served: AtomicU64::new(0),
            last_request_url: Mutex::new(None),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Status code currently stamped on the canned response.
    pub fn status(&self) -> u16 {
        lock(&self.canned).status
    }

    /// Reconfigures the canned response. Only do this between exchanges.
    pub fn set_status(&self, status: u16) {
        lock(&self.canned).set_status(status);
    }

    /// Blocks for the processing latency, then stamps `status` onto the canned
    /// response and returns it.
    pub async fn reply(&self, status: u16) -> Response {
        tokio::time::sleep(self.latency).await;

        let mut canned = lock(&self.canned);
        canned.set_status(status);
        canned.clone()
    }

    /// Accounts for a request taken off the link and replies to it.
    pub async fn serve(&self, request: &Request, status: u16) -> Response {
        log::debug!("[{}] server {}: serving {} {}", request.id(), self.addr, request.method(), request.url());

        self.served.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_request_url) = Some(request.url().clone());

        self.reply(status).await
    }

    pub fn requests_served(&self) -> u64 {
        self.served.load(Ordering::SeqCst)
    }

    pub fn last_request_url(&self) -> Option<Url> {
        lock(&self.last_request_url).clone()
    }
}

/// Poisoning is ignored: every critical section is a single assignment or clone.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
