pub mod courier;
pub mod geo_matrix;
pub mod ids;
pub mod order;
pub mod route_candidate;
pub mod shop;
pub mod time_window;
