pub mod context;
pub mod error;
pub mod value;

pub use context::Context;
pub use error::{DbError, Result, SERIALIZATION_FAILURE};
pub use value::{Args, Value};
