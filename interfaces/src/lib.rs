pub mod baseline;
pub mod defs;
pub mod empty;
pub mod state;

pub use baseline::CsvExportWriter;
pub use defs::*;
pub use empty::{EmptyArticleSource, MemoryPreferenceStore};
pub use state::FilePreferenceStore;
