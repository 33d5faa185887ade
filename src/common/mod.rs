mod feed;
mod state;
mod task;

pub use feed::{LiveFeed, LiveSnapshot};
pub use state::AppState;
pub use task::TaskHandle;
