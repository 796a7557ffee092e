pub mod dispatcher;
mod kernel;
pub mod subset_space;
pub mod subset_table;
