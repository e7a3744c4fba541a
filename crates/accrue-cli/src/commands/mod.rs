//! Command implementations.

pub mod extract;
pub mod init;
pub mod matching;

pub use self::extract::execute_extract;
pub use self::init::execute_init;
pub use self::matching::execute_match;
