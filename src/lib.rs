// Resume tailor session core.
// Decides which popup panel is shown and keeps the persisted session consistent
// across popup lifetimes, long backend requests, and sign-in changes.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod render;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use coordinator::Coordinator;
pub use error::{Result, TailorError};
