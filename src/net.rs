mod request;
mod response;

pub use request::{Credentials, ExchangeId, Request};
pub use response::Response;
