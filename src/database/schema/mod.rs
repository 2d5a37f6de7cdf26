pub mod sql_type;
pub use sql_type::*;

pub mod column_def;
pub use column_def::*;

pub mod schema_dict;
pub use schema_dict::*;
