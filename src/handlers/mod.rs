//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `token` - Short-lived session credential minting

pub mod api;
pub mod token;

pub use token::generate_token;
