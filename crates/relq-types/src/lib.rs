//! relq type system
//!
//! This crate defines everything the compiler knows about types and names:
//! - `DataType` and `Heading`, the relational type model
//! - literal `Value`s
//! - `CallInfo` overload chains and the builtin operator table
//! - symbols, nested scopes and the accumulator counters that track folds
//! - overload resolution (`check_type`)

mod accum;
mod builtins;
mod callinfo;
mod context;
mod data_type;
mod resolver;
mod scope;
mod symbols;
mod value;

pub use accum::*;
pub use builtins::*;
pub use callinfo::*;
pub use context::*;
pub use data_type::*;
pub use resolver::*;
pub use scope::*;
pub use symbols::*;
pub use value::*;
