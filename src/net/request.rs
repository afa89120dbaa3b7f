use std::collections::HashMap;
use std::fmt::Display;
use std::io::Cursor;
use http::Method;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Username to password mapping accepted by the façade. Not applied to requests yet.
pub type Credentials = HashMap<String, String>;

/// A unique identifier for one simulated exchange, represented as a UUID.
///
/// Every [`Request`] gets a fresh id when it is built. The id travels with
/// the request over the link and is used to correlate log lines of a single
/// round trip.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeId(Uuid);

impl ExchangeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request handed to the simulated client.
///
/// Immutable once built: all fields are private and only exposed through
/// accessors.
#[derive(Debug, Clone)]
pub struct Request {
    id: ExchangeId,
    method: Method,
    url: Url,
    body: Vec<u8>,
}

impl Request {
    /// Builds a request. `raw_url` must be an absolute URL, anything else is
    /// reported as a construction failure.
    pub fn new(method: Method, raw_url: &str, body: impl Into<Vec<u8>>) -> Result<Self, url::ParseError> {
        let url = Url::parse(raw_url)?;

        Ok(Self {
            id: ExchangeId::new(),
            method,
            url,
            body: body.into(),
        })
    }

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as a readable stream
    pub fn body_reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.body.as_slice())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    const JSON_BODY: &str = r#"{"foo": ["bar", "baz"]}"#;

    #[test]
    fn new_parses_absolute_url() {
        let req = Request::new(Method::GET, "http://example.test/path?q=1", JSON_BODY).unwrap();
        assert_eq!(*req.method(), Method::GET);
        assert_eq!(req.url().host_str(), Some("example.test"));
        assert_eq!(req.url().path(), "/path");
        assert_eq!(req.body_text(), JSON_BODY);
    }

    #[test]
    fn new_rejects_relative_and_garbage_urls() {
        assert!(Request::new(Method::GET, "/relative/only", "").is_err());
        assert!(Request::new(Method::GET, "not a url", "").is_err());
        assert!(Request::new(Method::GET, "", "").is_err());
    }

    #[test]
    fn body_reader_streams_the_whole_body() {
        let req = Request::new(Method::GET, "http://example.test", JSON_BODY).unwrap();
        let mut out = String::new();
        req.body_reader().read_to_string(&mut out).unwrap();
        assert_eq!(out, JSON_BODY);
    }

    #[test]
    fn json_decodes_body() {
        #[derive(Deserialize)]
        struct Payload {
            foo: Vec<String>,
        }

        let req = Request::new(Method::GET, "http://example.test", JSON_BODY).unwrap();
        let payload: Payload = req.json().unwrap();
        assert_eq!(payload.foo, vec!["bar".to_string(), "baz".to_string()]);
    }

    #[test]
    fn every_request_gets_its_own_exchange_id() {
        let a = Request::new(Method::GET, "http://example.test", "").unwrap();
        let b = Request::new(Method::GET, "http://example.test", "").unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }
}
