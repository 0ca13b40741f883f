// Library interface for review-intake modules
// This allows tests and other binaries to import modules

pub mod error;
pub mod intake;
pub mod notify;
pub mod sentiment;
pub mod server;
pub mod storage;
