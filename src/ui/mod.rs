pub mod icons;
pub mod output;
pub mod progress;
pub mod progress_message;
pub mod theme;

pub use icons::Icons;
pub use output::{error, info, section, success, summary_row};
pub use progress::ProgressManager;
pub use progress_message::{NoProgress, ProgressMessage, ProgressPhase, ProgressSink};
pub use theme::{theme, Theme};
