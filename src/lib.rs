pub mod cli;
pub mod config;
pub mod executor;
pub mod harvest;
pub mod model;
pub mod runner;
pub mod traits;
pub mod transmit;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export common types for convenience
pub use config::HarvestConfig;
pub use executor::*;
pub use model::*;
pub use traits::*;
