//! Wire types shared by the Spritz server and its Rust client.

pub mod api;
pub mod models;
