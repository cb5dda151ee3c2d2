//! Defines the two networks of the library: the relational `TemplateModel` and the
//! `GroundNetwork` instantiated from it.

/// The `Network` trait represents a directed graph of named nodes, each of which knows its
/// parents by index.
pub trait Network {

    /// The concrete type of node held by the `Network`
    type Node;


    /// Lookup a node in the `Network` based on the name
    fn lookup_node(&self, name: &str) -> Option<&Self::Node>;


    /// Lookup the name of the node with the given index
    fn lookup_name(&self, idx: usize) -> Option<&str>;


    /// Get the number of nodes in the `Network`
    fn num_nodes(&self) -> usize;


    /// Get the indices of the parents of a node, in table column order. Unknown nodes have no
    /// parents.
    fn parent_indices(&self, idx: usize) -> &[usize];
}

pub mod template;
pub mod ground;
