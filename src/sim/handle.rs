use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::Instant;
use tokio_util::task::AbortOnDropHandle;
use crate::errors::{HarnessError, Result};
use crate::net::{ExchangeId, Response};
use crate::sim::link::{ExchangePermit, Link};

/// Receiving end of a non-blocking dispatch.
///
/// The exchange keeps running in the background after the handle is handed
/// out. Call [`ResponseHandle::recv`] (or simply `.await` the handle) to get
/// the response once it is convenient.
///
/// The handle owns the link for its exchange: no other exchange can start on
/// the same link until the response has been received or the handle is
/// dropped. Dropping the handle, or a pending `recv`, aborts the exchange.
pub struct ResponseHandle {
    id: ExchangeId,
    link: Arc<Link>,
    task: AbortOnDropHandle<Result<()>>,
    permit: Arc<ExchangePermit>,
    /// Deadline and the timeout it was derived from, only set when timeouts are enforced
    deadline: Option<(Instant, Duration)>,
}

impl std::fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("id", &self.id)
            .field("ready", &self.is_ready())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl ResponseHandle {
    pub(crate) fn new(
        id: ExchangeId,
        link: Arc<Link>,
        task: AbortOnDropHandle<Result<()>>,
        permit: Arc<ExchangePermit>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            id,
            link,
            task,
            permit,
            deadline: timeout.map(|t| (Instant::now() + t, t)),
        }
    }

    pub fn exchange_id(&self) -> ExchangeId {
        self.id
    }

    /// True once the background task has placed the response on the link.
    pub fn is_ready(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the response of this exchange.
    pub async fn recv(self) -> Result<Response> {
        let Self { id, link, task, permit, deadline } = self;

        // Held until the response is off the link
        let _permit = permit;
        let receive = await_reply(id, link, task);

        match deadline {
            None => receive.await,
            Some((at, timeout)) => match tokio::time::timeout_at(at, receive).await {
                Ok(res) => res,
                Err(_) => {
                    log::warn!("[{id}] async exchange timed out after {timeout:?}");
                    Err(HarnessError::Timeout(timeout))
                }
            },
        }
    }
}

async fn await_reply(id: ExchangeId, link: Arc<Link>, task: AbortOnDropHandle<Result<()>>) -> Result<Response> {
    task.await??;
    link.recv_response(id).await
}

impl IntoFuture for ResponseHandle {
    type Output = Result<Response>;
    type IntoFuture = BoxFuture<'static, Result<Response>>;

    fn into_future(self) -> Self::IntoFuture {
        self.recv().boxed()
    }
}
