pub mod collector;
pub mod error;
pub mod process;
pub mod snapshot;
pub mod summary;
pub mod tree;

pub use error::{AccessError, AncestryIssue, SnapshotError};
pub use process::{ProcessRecord, ProcessState};
pub use snapshot::{ProcessSource, StaticSource, SystemSnapshot};
pub use summary::{DEFAULT_TOP_N, ResourceSummary, TopEntry, summarize, top_cpu, top_memory};
pub use tree::{ProcessForest, ProcessTreeNode, build_tree};
