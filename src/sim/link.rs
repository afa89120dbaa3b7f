use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, OwnedMutexGuard};
use crate::errors::{HarnessError, Result};
use crate::net::{ExchangeId, Request, Response};

/// Every slot on the link holds at most one item.
const SLOT_CAPACITY: usize = 1;

/// Proof that the holder owns the link for one exchange. Dropping it lets the next exchange in.
#[derive(Debug)]
pub struct ExchangePermit {
    _guard: OwnedMutexGuard<()>,
}

/// The simulated wire between a client and a server.
///
/// A link has two single-slot channels, one per direction, plus a
/// completion signal. Requests travel client → server on the request slot,
/// responses travel back on the response slot. Because the directions never
/// share a slot, "request drained before response pushed" holds by
/// construction.
///
/// One link is shared by every exchange that uses it (wrap it in an `Arc`).
/// Only one exchange may be in flight at a time; [`Link::acquire`] hands out
/// the permit that enforces this.
pub struct Link {
    /// Time a request spends on the wire
    network_latency: Duration,

    request_tx: mpsc::Sender<Request>,
    request_rx: Mutex<mpsc::Receiver<Request>>,

    /// Responses are tagged with the exchange that produced them
    response_tx: mpsc::Sender<(ExchangeId, Response)>,
    response_rx: Mutex<mpsc::Receiver<(ExchangeId, Response)>>,

    done_tx: mpsc::Sender<()>,
    done_rx: Mutex<mpsc::Receiver<()>>,

    /// Single-flight lock, handed out as [`ExchangePermit`]
    exchange: Arc<Mutex<()>>,
    /// Flips to `true` exactly once, on close
    closed: watch::Sender<bool>,
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("network_latency", &self.network_latency)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Link {
    pub fn new(network_latency: Duration) -> Self {
        let (request_tx, request_rx) = mpsc::channel(SLOT_CAPACITY);
        let (response_tx, response_rx) = mpsc::channel(SLOT_CAPACITY);
        let (done_tx, done_rx) = mpsc::channel(SLOT_CAPACITY);
        let (closed, _) = watch::channel(false);

        Self {
            network_latency,
            request_tx,
            request_rx: Mutex::new(request_rx),
            response_tx,
            response_rx: Mutex::new(response_rx),
            done_tx,
            done_rx: Mutex::new(done_rx),
            exchange: Arc::new(Mutex::new(())),
            closed,
        }
    }

    pub fn network_latency(&self) -> Duration {
        self.network_latency
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Waits until no other exchange is in flight and returns the permit for a new one.
    ///
    /// Payloads left behind by an abandoned exchange are discarded before the
    /// permit is handed out.
    pub async fn acquire(&self) -> Result<ExchangePermit> {
        let guard = self.guarded(async { Some(self.exchange.clone().lock_owned().await) }).await?;

        let stale = self.drain().await;
        if stale > 0 {
            log::warn!("link: discarded {stale} stale item(s) from an abandoned exchange");
        }

        Ok(ExchangePermit { _guard: guard })
    }

    /// Places a request on the wire. Waits while the request slot is occupied.
    pub async fn send_request(&self, request: Request) -> Result<()> {
        log::trace!("[{}] link: request -> slot", request.id());
        self.guarded(async { self.request_tx.send(request).await.ok() }).await
    }

    /// Takes the next request off the wire, waiting until one arrives.
    pub async fn recv_request(&self) -> Result<Request> {
        let request = self.guarded(async { self.request_rx.lock().await.recv().await }).await?;
        log::trace!("[{}] link: request <- slot", request.id());
        Ok(request)
    }

    /// Places the response for exchange `id` on the wire. Waits while the response slot is occupied.
    pub async fn send_response(&self, id: ExchangeId, response: Response) -> Result<()> {
        log::trace!("[{id}] link: response -> slot");
        self.guarded(async { self.response_tx.send((id, response)).await.ok() }).await
    }

    /// Waits for the response belonging to exchange `id`.
    ///
    /// Responses tagged with another exchange can only come from an exchange
    /// that was abandoned mid-flight; they are dropped.
    pub async fn recv_response(&self, id: ExchangeId) -> Result<Response> {
        self.guarded(async {
            let mut rx = self.response_rx.lock().await;
            while let Some((got, response)) = rx.recv().await {
                if got == id {
                    log::trace!("[{id}] link: response <- slot");
                    return Some(response);
                }
                log::warn!("[{id}] link: dropping stale response of exchange {got}");
            }
            None
        })
        .await
    }

    pub async fn signal_done(&self) -> Result<()> {
        self.guarded(async { self.done_tx.send(()).await.ok() }).await
    }

    pub async fn await_done(&self) -> Result<()> {
        self.guarded(async { self.done_rx.lock().await.recv().await }).await
    }

    /// Closes the link. Everything waiting on it fails with [`HarnessError::LinkClosed`],
    /// and so does any later operation. Closing twice is an error.
    pub fn close(&self) -> Result<()> {
        if self.closed.send_replace(true) {
            return Err(HarnessError::LinkAlreadyClosed);
        }

        // Receivers held by an in-flight operation are released through `closed` instead
        if let Ok(mut rx) = self.request_rx.try_lock() {
            rx.close();
        }
        if let Ok(mut rx) = self.response_rx.try_lock() {
            rx.close();
        }
        if let Ok(mut rx) = self.done_rx.try_lock() {
            rx.close();
        }

        log::debug!("link: closed");
        Ok(())
    }

    /// Empties all slots and returns how many items were thrown away.
    pub async fn drain(&self) -> usize {
        let mut drained = 0;

        {
            let mut rx = self.request_rx.lock().await;
            while rx.try_recv().is_ok() {
                drained += 1;
            }
        }
        {
            let mut rx = self.response_rx.lock().await;
            while rx.try_recv().is_ok() {
                drained += 1;
            }
        }
        {
            let mut rx = self.done_rx.lock().await;
            while rx.try_recv().is_ok() {
                drained += 1;
            }
        }

        drained
    }

    /// Runs `op` unless the link is, or becomes, closed. `None` from `op` means
    /// the underlying channel went away, which only happens on close.
    async fn guarded<T>(&self, op: impl Future<Output = Option<T>>) -> Result<T> {
        let mut closed = self.closed.subscribe();
        let already_closed = *closed.borrow_and_update();
        if already_closed {
            return Err(HarnessError::LinkClosed);
        }

        tokio::select! {
            biased;
            _ = closed.changed() => Err(HarnessError::LinkClosed),
            res = op => res.ok_or(HarnessError::LinkClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, Method};

    fn request() -> Request {
        Request::new(Method::GET, "http://example.test", "ping").unwrap()
    }

    fn response(status: u16) -> Response {
        Response::new(status, HeaderMap::new(), "pong")
    }

    #[tokio::test]
    async fn request_and_response_use_separate_slots() {
        let link = Link::new(Duration::ZERO);
        let req = request();
        let id = req.id();

        // Both slots can be full at the same time
        link.send_request(req).await.unwrap();
        link.send_response(id, response(201)).await.unwrap();

        let got_req = link.recv_request().await.unwrap();
        assert_eq!(got_req.id(), id);
        assert_eq!(got_req.body_text(), "ping");

        let got_res = link.recv_response(id).await.unwrap();
        assert_eq!(got_res.status, 201);
    }

    #[tokio::test]
    async fn send_waits_while_slot_is_occupied() {
        let link = Link::new(Duration::ZERO);
        link.send_request(request()).await.unwrap();

        let second = tokio::time::timeout(Duration::from_millis(50), link.send_request(request())).await;
        assert!(second.is_err(), "second send should block on a full slot");

        link.recv_request().await.unwrap();
        link.send_request(request()).await.unwrap();
    }

    #[tokio::test]
    async fn done_signal_is_independent_of_payloads() {
        let link = Link::new(Duration::ZERO);
        link.signal_done().await.unwrap();
        link.await_done().await.unwrap();

        let again = tokio::time::timeout(Duration::from_millis(20), link.await_done()).await;
        assert!(again.is_err(), "done is one-shot per signal");
    }

    #[tokio::test]
    async fn recv_response_skips_other_exchanges() {
        let link = Arc::new(Link::new(Duration::ZERO));
        let stale = ExchangeId::new();
        let wanted = ExchangeId::new();

        let producer = {
            let link = link.clone();
            tokio::spawn(async move {
                link.send_response(stale, response(500)).await.unwrap();
                link.send_response(wanted, response(200)).await.unwrap();
            })
        };

        let got = link.recv_response(wanted).await.unwrap();
        assert_eq!(got.status, 200);
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn close_twice_is_an_error() {
        let link = Link::new(Duration::ZERO);
        assert!(!link.is_closed());
        link.close().unwrap();
        assert!(link.is_closed());
        assert!(matches!(link.close(), Err(HarnessError::LinkAlreadyClosed)));
    }

    #[tokio::test]
    async fn operations_after_close_fail_fast() {
        let link = Link::new(Duration::ZERO);
        link.close().unwrap();

        assert!(matches!(link.send_request(request()).await, Err(HarnessError::LinkClosed)));
        assert!(matches!(link.recv_request().await, Err(HarnessError::LinkClosed)));
        assert!(matches!(link.send_response(ExchangeId::new(), response(200)).await, Err(HarnessError::LinkClosed)));
        assert!(matches!(link.recv_response(ExchangeId::new()).await, Err(HarnessError::LinkClosed)));
        assert!(matches!(link.signal_done().await, Err(HarnessError::LinkClosed)));
        assert!(matches!(link.await_done().await, Err(HarnessError::LinkClosed)));
        assert!(matches!(link.acquire().await, Err(HarnessError::LinkClosed)));
    }

    #[tokio::test]
    async fn close_wakes_a_blocked_receiver() {
        let link = Arc::new(Link::new(Duration::ZERO));

        let waiter = {
            let link = link.clone();
            tokio::spawn(async move { link.recv_request().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        link.close().unwrap();

        let res = tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(matches!(res, Err(HarnessError::LinkClosed)));
    }

    #[tokio::test]
    async fn acquire_is_single_flight() {
        let link = Link::new(Duration::ZERO);
        let first = link.acquire().await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), link.acquire()).await;
        assert!(blocked.is_err(), "second exchange must wait for the first");

        drop(first);
        let _second = link.acquire().await.unwrap();
    }

    #[tokio::test]
    async fn acquire_discards_leftovers() {
        let link = Link::new(Duration::ZERO);
        link.send_request(request()).await.unwrap();
        link.send_response(ExchangeId::new(), response(200)).await.unwrap();
        link.signal_done().await.unwrap();

        let _permit = link.acquire().await.unwrap();

        // Request slot is free again
        tokio::time::timeout(Duration::from_millis(50), link.send_request(request()))
            .await
            .expect("request slot should be empty after acquire")
            .unwrap();
        assert_eq!(link.drain().await, 1);
    }
}
