pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod hierarchy;
pub mod schema;
pub mod tables;
pub const BASE_URL: &str = "http://localhost:37240";
pub const TAGS_API: &str = "tags";
pub const GROUPS_API: &str = "groups";
