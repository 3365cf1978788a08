pub mod incident;
pub mod push;
pub mod snapshot;
pub mod sse;
