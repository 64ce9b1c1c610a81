pub mod builder;
pub mod bytecode;
pub mod program;
pub mod span;
