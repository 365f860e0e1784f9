pub mod api;
pub mod b64;
pub mod models;
