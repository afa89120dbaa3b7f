//! Harness configuration.
//!
//! `HarnessConfig` describes one simulated wire/server/client triple: how long
//! the network takes to carry a request, how long the server spends producing
//! a reply, which status code and body the server answers with and how the client
//! treats its timeout.
//!
//! Defaults match a "slow but healthy" remote: 100ms on the wire, 100ms of
//! server processing and a `200 OK` answer.
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use requests_sim::config::HarnessConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = HarnessConfig::builder()
//!     .network_latency(Duration::from_millis(20))
//!     .server_latency(Duration::from_millis(30))
//!     .status(404)
//!     .build()?;
//! assert_eq!(cfg.status, 404);
//! # Ok(()) }
//! ```

use std::fmt;
use std::time::Duration;

const DEFAULT_SERVER_ADDR: &str = "http://jochasinga.io";

/// How the client treats its recorded timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// The timeout is stored on the client but never aborts an exchange.
    #[default]
    Recorded,
    /// Exchanges that outlive the timeout are aborted with `HarnessError::Timeout`.
    Enforced,
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Time the simulated wire needs to carry a request
    pub network_latency: Duration,
    /// Time the simulated server spends before replying
    pub server_latency: Duration,
    /// Initial client timeout
    pub timeout: Duration,
    pub timeout_policy: TimeoutPolicy,
    /// Address the simulated server pretends to listen on
    pub server_addr: String,
    /// Status code stamped on every reply
    pub status: u16,
    /// Body of the canned reply
    pub body: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            network_latency: Duration::from_millis(100),
            server_latency: Duration::from_millis(100),
            timeout: Duration::from_secs(3),
            timeout_policy: TimeoutPolicy::Recorded,
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            status: 200,
            body: String::new(),
        }
    }
}

impl HarnessConfig {
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::default()
    }

    /// Checks a config that was assembled by hand instead of through the builder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate(self)
    }
}

/// Builder for [`HarnessConfig`].
#[derive(Debug, Clone, Default)]
pub struct HarnessConfigBuilder {
    inner: HarnessConfig,
}

impl HarnessConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut HarnessConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn network_latency(self, d: Duration) -> Self { self.map(|c| c.network_latency = d) }
    pub fn server_latency(self, d: Duration) -> Self { self.map(|c| c.server_latency = d) }
    pub fn timeout(self, d: Duration) -> Self { self.map(|c| c.timeout = d) }
    pub fn timeout_policy(self, p: TimeoutPolicy) -> Self { self.map(|c| c.timeout_policy = p) }
    pub fn server_addr<S: Into<String>>(self, addr: S) -> Self { self.map(|c| c.server_addr = addr.into()) }
    pub fn status(self, code: u16) -> Self { self.map(|c| c.status = code) }
    pub fn body<S: Into<String>>(self, body: S) -> Self { self.map(|c| c.body = body.into()) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut HarnessConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<HarnessConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidStatus(u16),
    InvalidServerAddr(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidStatus(code) =>
                write!(f, "status {code} is out of range (expected 100..=999)"),
            ConfigError::InvalidServerAddr(addr) =>
                write!(f, "server_addr {addr:?} is not an absolute URL"),
        }
    }
}
impl std::error::Error for ConfigError {}

fn validate(c: &HarnessConfig) -> Result<(), ConfigError> {
    if http::StatusCode::from_u16(c.status).is_err() {
        return Err(ConfigError::InvalidStatus(c.status));
    }
    if url::Url::parse(&c.server_addr).is_err() {
        return Err(ConfigError::InvalidServerAddr(c.server_addr.clone()));
    }
    Ok(())
}
