pub mod schema;
pub use schema::*;

pub mod relation;
pub use relation::*;

pub mod seed;
pub use seed::*;

pub mod db;
pub use db::*;
