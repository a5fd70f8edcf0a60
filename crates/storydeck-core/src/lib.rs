pub mod actions;
pub mod config;
pub mod reducer;
pub mod reshape;
pub mod state;

pub use actions::*;
pub use config::*;
pub use reducer::*;
pub use reshape::*;
pub use state::*;
