//! Route handlers and their shared state.

pub mod admin;
pub mod cookies;
pub mod health;
pub mod me;
pub mod principal;
pub mod root;
pub mod state;
pub mod users;
