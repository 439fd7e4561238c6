pub mod navigation;
pub mod page_sequencer;

pub use navigation::{NavigationController, MAX_NAVIGATION_ATTEMPTS};
pub use page_sequencer::PageSequencer;
