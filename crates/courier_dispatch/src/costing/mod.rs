pub mod distance_costing;
pub mod route_costing;
pub mod route_profile;
