pub mod cache;
pub mod layout;

pub use cache::{GraphCache, GraphNode, GraphView, RepoSnapshot, repo_id_for};
pub use layout::{LayoutConfig, LayoutNode, layout_learning_path, resolve_overlaps};
