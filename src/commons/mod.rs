//! Common types used by the various scepc components.
pub mod crypto;
pub mod error;
pub mod util;

//------------ Response Aliases ----------------------------------------------

pub type ScepEmptyResult = std::result::Result<(), self::error::Error>;
pub type ScepResult<T> = std::result::Result<T, self::error::Error>;
