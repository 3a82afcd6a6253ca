pub mod loader;
pub mod reader;

pub use loader::{LoadCoordinator, LoadEvent, LoadState};
pub use reader::{read_range, ChunkReader};
