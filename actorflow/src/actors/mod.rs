//! A small catalogue of concrete actors.
//!
//! Each actor owns its configuration and publishes an option table, so a
//! scripting layer can configure it by option name.

mod basic;
mod callable;
mod db;
pub mod expression;
mod filter;
mod interactive;
mod math;
mod source;
mod storage;
mod variables;

pub use basic::{LogSink, NullSink, PassThrough};
pub use callable::CallableTransformer;
pub use db::DbQuery;
pub use filter::ScaleFilter;
pub use interactive::EnterValue;
pub use math::MathExpression;
pub use source::ForLoop;
pub use storage::{GetStorageValue, InitStorageCache, SetStorageValue};
pub use variables::{MapVariableIterator, SetManyVariables, SetVariable};
