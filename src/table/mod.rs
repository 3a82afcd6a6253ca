pub mod store;
pub mod types;

pub use store::RowStore;
pub use types::*;
