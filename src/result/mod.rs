pub mod binding;
#[allow(clippy::module_inception)]
pub mod result;

pub use binding::Results;
pub use result::{QueryResult, Row};
