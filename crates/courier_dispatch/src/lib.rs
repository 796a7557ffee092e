pub mod context_factory;
pub mod costing;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod extension;
pub mod orchestrator;
pub mod params;
pub mod problem;
pub mod providers;
pub mod search;
mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
