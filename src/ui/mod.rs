pub mod icons;
pub mod output;
pub mod progress;
pub mod progress_message;
pub mod table;

pub use icons::Icons;
pub use output::{error, header, is_quiet, section, success, theme, warn, Theme};
pub use progress::{ProgressManager, Spinner};
pub use progress_message::{ProgressMessage, ProgressPhase, ProgressSink};
pub use table::TableBuilder;
