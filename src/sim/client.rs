use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::task::AbortOnDropHandle;
use crate::config::TimeoutPolicy;
use crate::errors::{HarnessError, Result};
use crate::net::{ExchangeId, Request, Response};
use crate::sim::handle::ResponseHandle;
use crate::sim::link::{ExchangePermit, Link};
use crate::sim::server::SimServer;

/// Simulated HTTP client.
///
/// Drives a single request over a [`Link`] to a [`SimServer`] and back. The
/// client itself holds no connection state; the link and server are passed
/// in per call so each harness can wire its own triple together.
#[derive(Debug)]
pub struct SimClient {
    /// Last timeout set on the client
    timeout: RwLock<Duration>,
    /// Whether `timeout` may abort an exchange
    policy: TimeoutPolicy,
}

impl SimClient {
    pub fn new(timeout: Duration, policy: TimeoutPolicy) -> Self {
        Self {
            timeout: RwLock::new(timeout),
            policy,
        }
    }

    pub fn timeout(&self) -> Duration {
        *self.timeout.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the recorded timeout. Every later call observes the new value.
    pub fn set_timeout(&self, timeout: Duration) {
        *self.timeout.write().unwrap_or_else(PoisonError::into_inner) = timeout;
    }

    pub fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    /// Sends `request` to `server` and waits for the full round trip.
    ///
    /// The request goes on the link right away; a background task carries it
    /// across the wire, lets the server answer, pushes the response back and
    /// signals completion. The caller wakes only after that signal, so the
    /// observed time is at least the network latency plus the server latency.
    pub async fn dispatch(&self, request: Request, link: &Arc<Link>, server: &Arc<SimServer>) -> Result<Response> {
        let id = request.id();
        let permit = Arc::new(link.acquire().await?);

        let status = server.status();
        log::debug!("[{id}] dispatch {} {} (expecting {status})", request.method(), request.url());

        link.send_request(request).await?;

        // Dropping `exchange` (timeout, or the caller giving up) aborts the carrier
        let task = AbortOnDropHandle::new(tokio::spawn(carry_round_trip(id, link.clone(), server.clone(), status, permit.clone())));
        let exchange = await_round_trip(id, link, task);

        let response = match self.policy {
            TimeoutPolicy::Recorded => exchange.await?,
            TimeoutPolicy::Enforced => {
                let timeout = self.timeout();
                match tokio::time::timeout(timeout, exchange).await {
                    Ok(res) => res?,
                    Err(_) => {
                        log::warn!("[{id}] exchange timed out after {timeout:?}");
                        return Err(HarnessError::Timeout(timeout));
                    }
                }
            }
        };

        log::debug!("[{id}] dispatch complete: {}", response.status_text);
        Ok(response)
    }

    /// Sends `request` to `server` and returns a handle without waiting for the reply.
    ///
    /// Only the network latency is spent before returning; the server's
    /// processing happens in the background.
    pub async fn dispatch_async(&self, request: Request, link: &Arc<Link>, server: &Arc<SimServer>) -> Result<ResponseHandle> {
        let id = request.id();
        let permit = Arc::new(link.acquire().await?);

        let status = server.status();
        log::debug!("[{id}] dispatch_async {} {} (expecting {status})", request.method(), request.url());

        tokio::time::sleep(link.network_latency()).await;
        link.send_request(request).await?;

        let task = AbortOnDropHandle::new(tokio::spawn(carry_reply(id, link.clone(), server.clone(), status, permit.clone())));

        let timeout = match self.policy {
            TimeoutPolicy::Recorded => None,
            TimeoutPolicy::Enforced => Some(self.timeout()),
        };

        Ok(ResponseHandle::new(id, link.clone(), task, permit, timeout))
    }
}

/// Client side of a blocking exchange: wait for the carrier task, the completion signal, then the response.
async fn await_round_trip(id: ExchangeId, link: &Link, task: AbortOnDropHandle<Result<()>>) -> Result<Response> {
    task.await??;
    link.await_done().await?;
    link.recv_response(id).await
}

/// Server side of a blocking exchange: wire delay, serve, return-trip delay, then signal completion.
///
/// Carrier tasks share the exchange permit with their caller, so the link stays
/// locked until an aborted carrier has really stopped.
async fn carry_round_trip(id: ExchangeId, link: Arc<Link>, server: Arc<SimServer>, status: u16, _permit: Arc<ExchangePermit>) -> Result<()> {
    tokio::time::sleep(link.network_latency()).await;

    let request = link.recv_request().await?;
    let response = server.serve(&request, status).await;
    link.send_response(id, response).await?;

    tokio::time::sleep(server.latency()).await;
    link.signal_done().await?;

    log::trace!("[{id}] round trip carried");
    Ok(())
}

/// Server side of a non-blocking exchange: serve and push the response back.
async fn carry_reply(id: ExchangeId, link: Arc<Link>, server: Arc<SimServer>, status: u16, _permit: Arc<ExchangePermit>) -> Result<()> {
    let request = link.recv_request().await?;
    let response = server.serve(&request, status).await;
    link.send_response(id, response).await?;

    log::trace!("[{id}] reply carried");
    Ok(())
}
