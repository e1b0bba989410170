//! The scepc command line client.
pub mod client;
pub mod options;

pub use self::client::{Error, Outcome, ScepcClient};
pub use self::options::Options;
