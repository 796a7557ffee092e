pub mod route_extender;
pub mod time_reserve;
