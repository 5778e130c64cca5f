//! Value objects - immutable identity types

mod intents;
mod object_kind;
mod snowflake;

pub use intents::{Intents, IntentsParseError};
pub use object_kind::{ObjectKind, ObjectRef};
pub use snowflake::{Snowflake, SnowflakeParseError};
