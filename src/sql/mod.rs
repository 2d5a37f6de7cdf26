pub mod ident;
pub use ident::*;

pub mod statement;
pub use statement::*;
