pub mod digest;
pub mod errors;
pub mod interaction;
pub mod log;
pub mod search;
pub mod stream;
pub mod types;
