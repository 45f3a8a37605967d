//! Project model: class metadata, history of previous runs, and the
//! structural graph the Seeding strategy queries.

mod graph;
mod history;
mod inheritance;
mod static_data;

pub use graph::{GraphError, ProjectGraph};
pub use history::{is_coverage_improving, History, HistoryError, COMMIT_IMPROVEMENT};
pub use inheritance::{InheritanceError, InheritanceTree};
pub use static_data::ProjectStaticData;
