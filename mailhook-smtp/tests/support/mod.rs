pub mod client;
pub mod recorder;
