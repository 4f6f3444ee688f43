pub mod artifact;
pub mod check_files;
pub mod emit;
pub mod insight;
pub mod merge;

pub use artifact::SaveArtifactHandler;
pub use check_files::CheckFilesHandler;
pub use emit::EmitHandler;
pub use insight::{LookupInsightHandler, RecordInsightHandler};
pub use merge::MergeHandler;
