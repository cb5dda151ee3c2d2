//! Defines a `GroundNetwork`, the concrete Bayesian network instantiated from a `TemplateModel`.

use factor::Cpf;
use model::template::TemplateId;
use util::{RelbnError, Result};
use variable::Domain;
use super::Network;

use indexmap::IndexMap;


/// The index of a `GroundNode` within its `GroundNetwork`
pub type NodeIndex = usize;


/// How a `GroundNode` came to be
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroundKind {
    /// A ground variable of a template function
    Atom,

    /// One grounding of a noisy-or aggregated node
    AggregatorAux,

    /// A node for a hard logical constraint, which must always be true
    HardConstraint
}


/// A concrete random variable of the `GroundNetwork`
#[derive(Clone, Debug)]
pub struct GroundNode {
    pub(crate) name: String,
    pub(crate) function: String,
    pub(crate) args: Vec<String>,
    pub(crate) domain: Domain,

    /// The parents, in table column order
    pub(crate) parents: Vec<NodeIndex>,

    /// The table over `[self, parents...]`
    pub(crate) cpf: Cpf,
    pub(crate) template: Option<TemplateId>,
    pub(crate) cpf_id: Option<String>,
    pub(crate) kind: GroundKind
}

impl GroundNode {

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn parents(&self) -> &[NodeIndex] {
        &self.parents
    }

    pub fn cpf(&self) -> &Cpf {
        &self.cpf
    }

    /// The template this node was instantiated from
    pub fn template(&self) -> Option<TemplateId> {
        self.template
    }

    /// The identifier of the table structure this node's table was derived from
    pub fn cpf_id(&self) -> Option<&str> {
        self.cpf_id.as_ref().map(|s| s.as_str())
    }

    pub fn kind(&self) -> GroundKind {
        self.kind
    }
}


/// Represents a ground Bayesian network.
///
/// # Representation
/// The nodes are held in insertion order. Parents are always inserted before their children, so
/// this order is topological. The table of every node defines its incoming edges.
#[derive(Clone, Debug, Default)]
pub struct GroundNetwork {
    nodes: IndexMap<String, GroundNode>,

    /// The nodes added for hard constraints
    hard_constraints: Vec<NodeIndex>
}

impl GroundNetwork {

    pub fn new() -> Self {
        GroundNetwork { nodes: IndexMap::new(), hard_constraints: Vec::new() }
    }

    /// Add a node whose parents are already part of the network.
    ///
    /// # Errors
    /// * `RelbnError::DuplicateVariable` if a node with the same name exists
    /// * `RelbnError::MissingParent` if a parent index is unknown
    /// * `RelbnError::TableSizeMismatch` if the table does not fit the domain product
    pub(crate) fn add_node(&mut self, node: GroundNode) -> Result<NodeIndex> {
        if self.nodes.contains_key(&node.name) {
            return Err(RelbnError::DuplicateVariable(node.name));
        }

        let shape = self.domain_product(&node.name, &node.domain, &node.parents)?;
        if node.cpf.shape() != &shape[..] {
            return Err(RelbnError::TableSizeMismatch(
                format!("table of {} has shape {:?}, domain product is {:?}", node.name, node.cpf.shape(), shape)
            ));
        }

        let idx = self.nodes.len();
        self.nodes.insert(node.name.clone(), node);
        Ok(idx)
    }

    /// The sizes of the domains of a node and its parents
    fn domain_product(&self, name: &str, domain: &Domain, parents: &[NodeIndex]) -> Result<Vec<usize>> {
        let mut shape = Vec::with_capacity(parents.len() + 1);
        shape.push(domain.order());
        for &p in parents.iter() {
            match self.node(p) {
                Some(parent) => shape.push(parent.domain.order()),
                None => return Err(RelbnError::MissingParent(format!("#{} of {}", p, name)))
            }
        }
        Ok(shape)
    }

    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.nodes.get_full(name).map(|(idx, _, _)| idx)
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&GroundNode> {
        self.nodes.get_index(idx).map(|(_, n)| n)
    }

    pub fn get(&self, name: &str) -> Option<&GroundNode> {
        self.nodes.get(name)
    }

    /// Iterate over all nodes in topological order
    pub fn nodes(&self) -> impl Iterator<Item = &GroundNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The parent nodes of the named node, in table column order
    pub fn parents_of(&self, name: &str) -> Vec<&GroundNode> {
        match self.nodes.get(name) {
            Some(node) => node.parents.iter().filter_map(|&p| self.node(p)).collect(),
            None => Vec::new()
        }
    }

    /// The template the named node was instantiated from
    pub fn template_of(&self, name: &str) -> Option<TemplateId> {
        self.nodes.get(name).and_then(|n| n.template)
    }

    /// The identifier of the table structure the named node's table was derived from
    pub fn cpf_id(&self, name: &str) -> Option<&str> {
        self.nodes.get(name).and_then(|n| n.cpf_id())
    }

    /// Iterate over the nodes that were added for hard constraints
    pub fn auxiliary_nodes<'a>(&'a self) -> impl Iterator<Item = &'a GroundNode> + 'a {
        self.hard_constraints.iter().filter_map(move |&idx| self.node(idx))
    }

    /// Add a boolean node for a hard constraint over the given ground atoms, with a zero table.
    ///
    /// An atom `attr(x,v)` that is not part of the network is taken to mean the functional
    /// variable `attr(x)` having the value `v`, so `attr(x)` becomes the parent instead.
    ///
    /// # Errors
    /// * `RelbnError::MissingParent` if an atom cannot be found in either form
    /// * `RelbnError::DuplicateParent` if two atoms denote the same node
    /// * `RelbnError::DuplicateVariable` if the name is taken
    pub fn add_hard_constraint_node(&mut self, name: &str, parent_atoms: &[String]) -> Result<NodeIndex> {
        let mut parents = Vec::with_capacity(parent_atoms.len());
        for atom in parent_atoms.iter() {
            let idx = match self.index_of(atom) {
                Some(idx) => idx,
                None => {
                    let functional = match atom.rfind(',') {
                        Some(pos) => format!("{})", &atom[..pos]),
                        None => return Err(RelbnError::MissingParent(atom.clone()))
                    };
                    self.index_of(&functional).ok_or_else(|| RelbnError::MissingParent(atom.clone()))?
                }
            };
            if parents.contains(&idx) {
                return Err(RelbnError::DuplicateParent(String::from(name), atom.clone()));
            }
            parents.push(idx);
        }

        let domain = Domain::boolean();
        let shape = self.domain_product(name, &domain, &parents)?;
        let idx = self.add_node(GroundNode {
            name: String::from(name),
            function: String::from(name),
            args: Vec::new(),
            domain,
            parents,
            cpf: Cpf::zeros(&shape),
            template: None,
            cpf_id: None,
            kind: GroundKind::HardConstraint
        })?;
        self.hard_constraints.push(idx);

        Ok(idx)
    }

    /// Replace the table of a node.
    ///
    /// # Errors
    /// * `RelbnError::TableSizeMismatch` if the table does not fit the node's domain product
    pub fn set_cpf(&mut self, idx: NodeIndex, cpf: Cpf) -> Result<()> {
        let node = self.nodes
                       .get_index_mut(idx)
                       .map(|(_, n)| n)
                       .ok_or_else(|| RelbnError::General(format!("no ground node with index {}", idx)))?;

        if node.cpf.shape() != cpf.shape() {
            return Err(RelbnError::TableSizeMismatch(
                format!("table of {} has shape {:?}, new table has {:?}", node.name, node.cpf.shape(), cpf.shape())
            ));
        }
        node.cpf = cpf;

        Ok(())
    }

    /// Translate evidence into domain indices, adding the evidence that every hard constraint
    /// holds.
    ///
    /// # Args
    /// * `evidence`: pairs of node name and value
    ///
    /// # Returns
    /// the evidence index of every node in network order, `None` where there is no evidence
    ///
    /// # Errors
    /// * `RelbnError::MissingParent` if an evidence node is not part of the network
    /// * `RelbnError::UnknownValue` if a value is not part of its node's domain
    pub fn full_evidence(&self, evidence: &[(String, String)]) -> Result<Vec<Option<usize>>> {
        let mut indices = vec![None; self.nodes.len()];

        for &(ref name, ref value) in evidence.iter() {
            let (idx, _, node) = self.nodes
                                     .get_full(name.as_str())
                                     .ok_or_else(|| RelbnError::MissingParent(name.clone()))?;
            indices[idx] = Some(node.domain.require_index(value)?);
        }

        for &idx in self.hard_constraints.iter() {
            if let Some(node) = self.node(idx) {
                indices[idx] = node.domain.true_index();
            }
        }

        Ok(indices)
    }
}

impl Network for GroundNetwork {
    type Node = GroundNode;

    fn lookup_node(&self, name: &str) -> Option<&GroundNode> {
        self.nodes.get(name)
    }

    fn lookup_name(&self, idx: usize) -> Option<&str> {
        self.nodes.get_index(idx).map(|(name, _)| name.as_str())
    }

    fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn parent_indices(&self, idx: usize) -> &[usize] {
        self.node(idx).map(|n| &n.parents[..]).unwrap_or(&[])
    }
}
