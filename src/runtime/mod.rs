pub mod arithmetic;
pub mod array;
pub mod builtin_functions;
pub mod controls;
pub mod datetime;
pub mod evaluator;
pub mod json;
pub mod logical;
pub mod operators;
pub mod string;
pub mod type_casting;
pub mod utils;

pub use evaluator::Evaluator;
pub use string::{split_literal, split_regex};
pub use utils::{clamp_index, values_equal};
