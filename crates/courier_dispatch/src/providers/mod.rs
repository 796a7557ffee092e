pub mod depth_policy;
pub mod geo_provider;
pub mod stores;
