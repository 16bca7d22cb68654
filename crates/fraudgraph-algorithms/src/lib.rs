pub mod common;
pub mod community;
pub mod traversal;

pub use common::{EdgeId, GraphView, NodeId};
pub use community::{weakly_connected_components, WccResult};
pub use traversal::{bounded_bfs, TraversalResult};
