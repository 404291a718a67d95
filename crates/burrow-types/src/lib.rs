pub mod api;
pub mod viewer;
