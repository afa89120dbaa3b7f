pub mod config;
pub mod errors;
pub mod net;
pub mod requests;
pub mod sim;

pub use errors::{HarnessError, Result};
pub use requests::Requests;
