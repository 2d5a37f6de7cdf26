pub mod error;
pub use error::{PivotError, Result};

pub mod config;
pub use config::PivotConfig;

pub mod catalog;
pub use catalog::{Catalog, RelationKind};

pub mod sql;

pub mod database;
pub use database::{Db, DbCommon, SchemaDict, SeedFile, SqlType};

pub mod executor;

pub mod pivot;
pub use pivot::{CategorySet, PivotGenerator, PivotOutcome, PivotRequest};
