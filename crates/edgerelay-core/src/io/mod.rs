//! I/O utilities shared by the server and tests.

mod kind;
mod prefixed;

pub use kind::{error_kind_from_name, error_kind_name};
pub use prefixed::PrefixedStream;
