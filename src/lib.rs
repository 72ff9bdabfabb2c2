#![doc = "The `apihub` library crate."]
#![doc = ""]
#![doc = "A REST backend with user accounts, todos, a Q&A board with votes, and chat."]
#![doc = "Every resource reads and writes through a `db::SoftDeleteStore`, so rows of"]
#![doc = "audited kinds are only ever marked deleted. The binary (`main.rs`) wires"]
#![doc = "these modules into an actix-web server."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod response;
pub mod routes;
pub mod votes;

pub use crate::config::Config;
pub use crate::error::AppError;
