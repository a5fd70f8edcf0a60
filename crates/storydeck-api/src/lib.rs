pub mod adapter;
pub mod api;
pub mod query;

pub use adapter::*;
pub use api::*;
pub use query::*;
