//! Admin/diagnostics HTTP surface

pub mod server;

pub use server::{AdminState, router, run_admin};
