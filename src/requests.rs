//! Request façade.
//!
//! [`Requests`] is what test code talks to: `get` for a blocking round trip,
//! `get_async` for a handle that is received later. Each `Requests` owns its
//! own client/link/server triple, so independent harnesses never interfere
//! and can run in parallel.
//!
//! ```no_run
//! use requests_sim::{config::HarnessConfig, net::Credentials, Requests};
//! # async fn demo() -> requests_sim::Result<()> {
//! let requests = Requests::new(HarnessConfig::default())?;
//! let res = requests.get("http://example.test", r#"{"foo": ["bar", "baz"]}"#, &Credentials::new()).await?;
//! assert_eq!(res.status, 200);
//! requests.close()?;
//! # Ok(()) }
//! ```

use std::sync::Arc;
use std::time::Duration;
use http::{HeaderMap, Method};
use crate::config::HarnessConfig;
use crate::errors::Result;
use crate::net::{Credentials, Request, Response};
use crate::sim::{Link, ResponseHandle, SimClient, SimServer};

pub struct Requests {
    client: Arc<SimClient>,
    link: Arc<Link>,
    server: Arc<SimServer>,
}

impl std::fmt::Debug for Requests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requests")
            .field("server", &self.server.addr())
            .field("timeout", &self.client.timeout())
            .field("link", &self.link)
            .finish()
    }
}

impl Requests {
    /// Builds a fresh client, link and server from `config`.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;

        let canned = Response::new(config.status, HeaderMap::new(), config.body);
        let server = SimServer::new(config.server_addr, canned, config.server_latency);
        let link = Link::new(config.network_latency);
        let client = SimClient::new(config.timeout, config.timeout_policy);

        Ok(Self::from_parts(Arc::new(client), Arc::new(link), Arc::new(server)))
    }

    /// Wires an existing triple together. Several façades may share one client,
    /// in which case they also share its recorded timeout.
    pub fn from_parts(client: Arc<SimClient>, link: Arc<Link>, server: Arc<SimServer>) -> Self {
        Self { client, link, server }
    }

    pub fn client(&self) -> &Arc<SimClient> {
        &self.client
    }

    pub fn link(&self) -> &Arc<Link> {
        &self.link
    }

    pub fn server(&self) -> &Arc<SimServer> {
        &self.server
    }

    /// Performs a GET and waits for the response.
    pub async fn get(&self, url: &str, body: &str, auth: &Credentials) -> Result<Response> {
        let request = build_get(url, body, auth)?;
        self.client.dispatch(request, &self.link, &self.server).await
    }

    /// Performs a GET and returns a handle to receive the response later.
    ///
    /// `timeout_secs` replaces the client's recorded timeout before the request
    /// is sent, so later calls observe it too.
    pub async fn get_async(&self, url: &str, body: &str, auth: &Credentials, timeout_secs: u64) -> Result<ResponseHandle> {
        self.client.set_timeout(Duration::from_secs(timeout_secs));

        let request = build_get(url, body, auth)?;
        self.client.dispatch_async(request, &self.link, &self.server).await
    }

    /// Tears down the link. Only call this once no exchange is in flight.
    pub fn close(&self) -> Result<()> {
        self.link.close()
    }
}

fn build_get(url: &str, body: &str, auth: &Credentials) -> Result<Request> {
    let request = Request::new(Method::GET, url, body)?;

    if !auth.is_empty() {
        // @TODO: apply basic auth once the request model carries headers
        log::debug!("[{}] ignoring credentials for {} user(s)", request.id(), auth.len());
    }

    Ok(request)
}
