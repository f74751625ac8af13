// Graph Nodes Module
// Pipeline stage implementations

pub mod generate;
pub mod refine;
pub mod retrieve;

pub use generate::{GenerateNode, GenerateRawNode};
pub use refine::RefineNode;
pub use retrieve::{RetrievalScope, RetrieveNode};
