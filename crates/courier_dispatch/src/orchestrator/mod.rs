pub mod cloud;
pub mod orchestrator;
pub mod start_params;
pub mod unit;
