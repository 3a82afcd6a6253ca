pub mod search;
pub mod view;

pub use search::{SearchEngine, SearchEvent, SearchMatch, SearchScope};
pub use view::{RowCountEstimate, RowWindow, VirtualView};
