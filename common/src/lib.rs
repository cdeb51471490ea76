//! Shared building blocks for the browser bridge crates.
//!
//! Everything here is dependency-light so that both the long-lived
//! application and the short-lived helper process can link it.

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
