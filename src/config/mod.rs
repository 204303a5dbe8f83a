pub mod dynamic;
pub mod settings;

pub use dynamic::{SchedulerConfig, SchedulerState, SharedSchedulerConfig};
pub use settings::Settings;
