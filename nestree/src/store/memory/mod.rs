mod config;
mod rows;
mod store;
mod transaction;

pub use config::*;
pub use store::*;
pub use transaction::*;
