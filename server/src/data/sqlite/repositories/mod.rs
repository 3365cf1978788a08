//! Repository functions over the sqlite pool

pub mod historical;
pub mod incident;
