pub mod accumulator;
pub use accumulator::*;

pub mod helpers;
pub use helpers::*;

pub mod pivot_eval;
pub use pivot_eval::*;

pub mod statement_executor;
pub use statement_executor::*;
