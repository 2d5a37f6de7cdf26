pub mod request;
pub use request::*;

pub mod naming;
pub use naming::*;

pub mod category_set;
pub use category_set::*;

pub mod discovery;
pub use discovery::*;

pub mod builder;
pub use builder::*;

pub mod materialize;
pub use materialize::*;

pub mod generator;
pub use generator::*;

#[cfg(test)]
mod _tests;
