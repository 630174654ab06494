use thiserror::Error;

use crate::graph::NodeId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers the failure modes of graph construction and region
/// identification. Each variant provides specific context about the failure to
/// enable appropriate error handling.
///
/// # Examples
///
/// ```rust
/// use cfg_regions::{
///     regions::{RegionIdentifier, RegionIdentifierOptions},
///     BlockArena, Error, FlowGraph,
/// };
///
/// let mut blocks = BlockArena::new();
/// let graph = FlowGraph::new();
/// match RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default()) {
///     Err(Error::EmptyGraph) => {}
///     other => panic!("expected EmptyGraph, got {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The analyzed graph has no nodes.
    ///
    /// Region identification needs at least one block to determine a start
    /// node and build a region tree.
    #[error("Cannot identify regions in an empty graph")]
    EmptyGraph,

    /// No start node could be determined for the graph.
    ///
    /// The start node is the node without incoming edges; when every node has
    /// predecessors, the node whose address equals the configured function
    /// address is used instead. This error means neither rule produced a node.
    #[error("Cannot find the start node of the graph")]
    NoStartNode,

    /// An operation referenced a node that is not part of the graph.
    ///
    /// Typically raised when adding an edge whose endpoint was never added or
    /// has already been removed.
    #[error("Node {0} is not part of the graph")]
    NodeNotFound(NodeId),

    /// The graph violates a structural expectation of the analysis.
    ///
    /// The error includes the source location where the malformation was
    /// detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}

/// Convenience alias for `Result<T, cfg_regions::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::EmptyGraph.to_string(),
            "Cannot identify regions in an empty graph"
        );
        assert_eq!(
            Error::NoStartNode.to_string(),
            "Cannot find the start node of the graph"
        );
        assert_eq!(
            Error::NodeNotFound(NodeId::new(3)).to_string(),
            "Node n3 is not part of the graph"
        );
    }

    #[test]
    fn test_malformed_error_macro() {
        let err = malformed_error!("merge of {} nodes", 2);
        match err {
            Error::Malformed { message, .. } => assert_eq!(message, "merge of 2 nodes"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
