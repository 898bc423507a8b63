pub mod config;
pub mod repository;

pub use self::config::*;
pub use repository::*;
