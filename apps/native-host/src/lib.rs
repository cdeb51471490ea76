// Library exports for testing
// Both binaries import these as well

pub mod cli;
pub mod error;
pub mod logger;

#[cfg(test)]
mod tests;
