//! Defines a `TemplateModel`, the relational (templated) network from which ground networks are
//! built.
//!
//! Every `TemplateNode` is one occurrence of a function with formal parameters. Nodes that carry
//! a table are *fragments* and can instantiate variables of their function; every other node only
//! appears as a parent of fragments.

use combine::Aggregator;
use database::Database;
use factor::Cpf;
use init::Initialization;
use signature::{Signature, SignatureRegistry};
use util::{RelbnError, Result};
use variable::{format_var_name, Domain};
use super::Network;

use bidir_map::BidirMap;
use indexmap::IndexMap;

use std::collections::{HashMap, HashSet};


/// The index of a `TemplateNode` within its `TemplateModel`
pub type TemplateId = usize;


/// The role a `TemplateNode` plays when it appears as a parent
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// A regular random variable
    Probabilistic,

    /// A boolean relation that must hold for a parent binding to be admissible. Its coordinate in
    /// the tables of its children is fixed to `True`.
    Precondition,

    /// A zero-argument function whose value is bound by the parameter carrying its name
    Constant,

    /// A guard on the entire template. Its coordinate is fixed to `True`.
    Decision(Guard)
}


/// A logical condition over template variables, evaluated against the fact database
#[derive(Clone, Debug, PartialEq)]
pub enum Guard {
    /// `predicate(terms...)` is true in the database
    Holds(String, Vec<String>),

    /// Both terms denote the same object
    Equals(String, String),

    Not(Box<Guard>),
    And(Vec<Guard>),
    Or(Vec<Guard>)
}

impl Guard {

    pub fn holds(predicate: &str, terms: &[&str]) -> Guard {
        Guard::Holds(String::from(predicate), terms.iter().map(|t| String::from(*t)).collect())
    }

    pub fn equals(a: &str, b: &str) -> Guard {
        Guard::Equals(String::from(a), String::from(b))
    }

    pub fn negate(guard: Guard) -> Guard {
        Guard::Not(Box::new(guard))
    }

    /// Evaluate the guard.
    ///
    /// # Args
    /// * `variables`: the variables of the template. Every other term is a literal.
    /// * `binding`: the values of the variables bound so far
    /// * `db`: the fact database. Unknown facts are false.
    ///
    /// # Returns
    /// the truth value, or `None` if the guard depends on a variable that is not yet bound
    pub fn evaluate<D: Database + ?Sized>(
        &self,
        variables: &[String],
        binding: &HashMap<String, String>,
        db: &D
    ) -> Option<bool> {
        match *self {
            Guard::Holds(ref predicate, ref terms) => {
                let mut args = Vec::with_capacity(terms.len());
                for t in terms.iter() {
                    args.push(resolve(t, variables, binding)?);
                }
                Some(db.value_of(predicate, &args).map_or(false, |v| v.eq_ignore_ascii_case("true")))
            },
            Guard::Equals(ref a, ref b) => {
                let a = resolve(a, variables, binding)?;
                let b = resolve(b, variables, binding)?;
                Some(a == b)
            },
            Guard::Not(ref g) => g.evaluate(variables, binding, db).map(|v| ! v),
            Guard::And(ref gs) => {
                let mut deferred = false;
                for g in gs.iter() {
                    match g.evaluate(variables, binding, db) {
                        Some(false) => return Some(false),
                        None => deferred = true,
                        _ => ()
                    }
                }
                if deferred { None } else { Some(true) }
            },
            Guard::Or(ref gs) => {
                let mut deferred = false;
                for g in gs.iter() {
                    match g.evaluate(variables, binding, db) {
                        Some(true) => return Some(true),
                        None => deferred = true,
                        _ => ()
                    }
                }
                if deferred { None } else { Some(false) }
            }
        }
    }
}

fn resolve(term: &str, variables: &[String], binding: &HashMap<String, String>) -> Option<String> {
    if variables.iter().any(|v| v == term) {
        binding.get(term).cloned()
    } else {
        Some(String::from(term))
    }
}


/// A node of the `TemplateModel`
#[derive(Clone, Debug)]
pub struct TemplateNode {
    id: TemplateId,
    function: String,
    params: Vec<String>,

    /// Free parameters that appear only in some parents and are aggregated over
    add_params: Vec<String>,
    domain: Domain,
    kind: NodeKind,
    aggregator: Option<Aggregator>,

    /// The parents, in table column order
    parents: Vec<TemplateId>,

    /// The table over `[self, parents...]`; present exactly for fragments
    cpt: Option<Cpf>
}

impl TemplateNode {

    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn add_params(&self) -> &[String] {
        &self.add_params
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn aggregator(&self) -> Option<Aggregator> {
        self.aggregator
    }

    pub fn parents(&self) -> &[TemplateId] {
        &self.parents
    }

    pub fn cpt(&self) -> Option<&Cpf> {
        self.cpt.as_ref()
    }

    /// Check if this node can instantiate variables of its function
    pub fn is_fragment(&self) -> bool {
        self.cpt.is_some()
    }

    pub fn guard(&self) -> Option<&Guard> {
        match self.kind {
            NodeKind::Decision(ref g) => Some(g),
            _ => None
        }
    }

    /// The node written with its formal parameters, e.g. `friendOf(X,Y)`
    pub fn label(&self) -> String {
        format_var_name(&self.function, &self.params)
    }

    /// The name of the ground variable this node yields for the given arguments
    pub fn variable_name(&self, args: &[String]) -> String {
        format_var_name(&self.function, args)
    }
}


/// The declaration of a `TemplateNode`, consumed by the `TemplateModelBuilder`
#[derive(Clone, Debug)]
pub struct NodeDecl {
    function: String,
    params: Vec<String>,
    add_params: Vec<String>,
    domain: Domain,
    kind: NodeKind,
    aggregator: Option<Aggregator>,
    parents: Vec<String>
}

impl NodeDecl {

    fn with_kind(function: &str, params: &[&str], domain: Domain, kind: NodeKind) -> Self {
        NodeDecl {
            function: String::from(function),
            params: params.iter().map(|p| String::from(*p)).collect(),
            add_params: Vec::new(),
            domain,
            kind,
            aggregator: None,
            parents: Vec::new()
        }
    }

    /// A regular (boolean, unless a domain is set) node
    pub fn new(function: &str, params: &[&str]) -> Self {
        NodeDecl::with_kind(function, params, Domain::boolean(), NodeKind::Probabilistic)
    }

    /// A boolean precondition node
    pub fn precondition(function: &str, params: &[&str]) -> Self {
        NodeDecl::with_kind(function, params, Domain::boolean(), NodeKind::Precondition)
    }

    /// A constant ranging over the objects of `domain`
    pub fn constant(function: &str, domain: Domain) -> Self {
        NodeDecl::with_kind(function, &[], domain, NodeKind::Constant)
    }

    /// A decision node guarding its children
    pub fn decision(name: &str, guard: Guard) -> Self {
        NodeDecl::with_kind(name, &[], Domain::boolean(), NodeKind::Decision(guard))
    }

    pub fn domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    /// Set the parents by their names in the model, in table column order
    pub fn parents(mut self, parents: &[&str]) -> Self {
        self.parents = parents.iter().map(|p| String::from(*p)).collect();
        self
    }

    pub fn aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn add_params(mut self, params: &[&str]) -> Self {
        self.add_params = params.iter().map(|p| String::from(*p)).collect();
        self
    }

    /// The node written with its formal parameters
    pub fn label(&self) -> String {
        format_var_name(&self.function, &self.params)
    }

    pub(crate) fn into_node(self, id: TemplateId, parents: Vec<TemplateId>, cpt: Option<Cpf>) -> TemplateNode {
        TemplateNode {
            id,
            function: self.function,
            params: self.params,
            add_params: self.add_params,
            domain: self.domain,
            kind: self.kind,
            aggregator: self.aggregator,
            parents,
            cpt
        }
    }
}


/// A relational Bayesian network template.
///
/// # Representation
/// The nodes are held in declaration order, which is a topological order of the template graph.
/// Fragments are indexed by function so that all templates able to instantiate a variable can be
/// found quickly.
pub struct TemplateModel {
    nodes: Vec<TemplateNode>,

    /// The user-defined names of each node, looked up in both directions
    names: BidirMap<TemplateId, String>,

    signatures: SignatureRegistry,

    /// Functions whose variables are only ever observed
    evidence_functions: HashSet<String>,

    /// The fragments of each function, in declaration order
    fragments: IndexMap<String, Vec<TemplateId>>
}

impl TemplateModel {

    pub fn node(&self, id: TemplateId) -> Option<&TemplateNode> {
        self.nodes.get(id)
    }

    /// Get a node that is known to be part of the model.
    ///
    /// # Errors
    /// * `RelbnError::General` if there is no such node
    pub fn require(&self, id: TemplateId) -> Result<&TemplateNode> {
        self.nodes.get(id).ok_or_else(|| RelbnError::General(format!("no template node with id {}", id)))
    }

    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    pub fn signatures(&self) -> &SignatureRegistry {
        &self.signatures
    }

    /// Replace a type by a new type in all signatures
    pub fn replace_type(&mut self, old: &str, new: &str) {
        self.signatures.replace_type(old, new);
    }

    /// The fragments that can instantiate variables of `function`
    pub fn fragments_of(&self, function: &str) -> &[TemplateId] {
        self.fragments.get(function).map(|f| &f[..]).unwrap_or(&[])
    }

    /// The functions that have at least one fragment, in declaration order
    pub fn fragment_functions(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(|f| f.as_str())
    }

    pub fn is_evidence_function(&self, function: &str) -> bool {
        self.evidence_functions.contains(function)
    }
}

impl Network for TemplateModel {
    type Node = TemplateNode;

    fn lookup_node(&self, name: &str) -> Option<&TemplateNode> {
        self.names.get_by_second(&String::from(name)).and_then(|&id| self.nodes.get(id))
    }

    fn lookup_name(&self, idx: usize) -> Option<&str> {
        self.names.get_by_first(&idx).map(|n| n.as_str())
    }

    fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn parent_indices(&self, idx: usize) -> &[usize] {
        self.nodes.get(idx).map(|n| &n.parents[..]).unwrap_or(&[])
    }
}


/// An implementation of the [builder pattern] for creating a `TemplateModel`.
///
/// Nodes must be declared in topological order: the parents of a node must already be part of
/// the model.
///
/// [builder pattern]: https://en.wikipedia.org/wiki/Builder_pattern
pub struct TemplateModelBuilder {
    nodes: Vec<TemplateNode>,
    names: BidirMap<TemplateId, String>,
    signatures: SignatureRegistry,
    evidence_functions: HashSet<String>,
    guess_signatures: bool,

    /// The error state of the builder
    err: Option<RelbnError>
}

impl TemplateModelBuilder {

    /// Construct a new `TemplateModelBuilder` representing an empty `TemplateModel`
    pub fn new() -> Self {
        TemplateModelBuilder {
            nodes: Vec::new(),
            names: BidirMap::new(),
            signatures: SignatureRegistry::new(),
            evidence_functions: HashSet::new(),
            guess_signatures: false,
            err: None
        }
    }

    pub fn with_signature(mut self, sig: Signature) -> Self {
        self.signatures.register(sig);
        self
    }

    /// Derive the signatures from the parameter names instead of registering them
    pub fn guess_signatures(mut self) -> Self {
        self.guess_signatures = true;
        self
    }

    /// Declare a function whose variables are only observed. Such variables are skipped
    /// instead of failing when no template applies to them.
    pub fn evidence_function(mut self, function: &str) -> Self {
        self.evidence_functions.insert(String::from(function));
        self
    }

    /// Add a fragment, named by its label.
    ///
    /// # Args
    /// * `decl`: the node declaration. Its parents must already be in the model.
    /// * `init`: the initialization mechanism for the table over `[node, parents...]`
    pub fn with_fragment(self, decl: NodeDecl, init: Initialization) -> Self {
        let name = decl.label();
        self.add_node(name, decl, Some(init))
    }

    /// Add a named fragment
    pub fn with_named_fragment(self, name: &str, decl: NodeDecl, init: Initialization) -> Self {
        self.add_node(String::from(name), decl, Some(init))
    }

    /// Add a node without a table, named by its label
    pub fn with_node(self, decl: NodeDecl) -> Self {
        let name = decl.label();
        self.add_node(name, decl, None)
    }

    /// Add a named node without a table
    pub fn with_named_node(self, name: &str, decl: NodeDecl) -> Self {
        self.add_node(String::from(name), decl, None)
    }

    /// Complete building the model. The signatures are checked (or guessed) for every node.
    ///
    /// # Returns
    /// the `TemplateModel`, or the first error generated during the building process
    pub fn build(self) -> Result<TemplateModel> {
        if let Some(e) = self.err {
            return Err(e);
        }

        let mut signatures = self.signatures;
        if self.guess_signatures {
            signatures.guess(&self.nodes)?;
        } else {
            signatures.check(&self.nodes)?;
        }

        let mut fragments: IndexMap<String, Vec<TemplateId>> = IndexMap::new();
        for node in self.nodes.iter().filter(|n| n.is_fragment()) {
            fragments.entry(node.function.clone()).or_insert_with(Vec::new).push(node.id);
        }

        Ok(TemplateModel {
            nodes: self.nodes,
            names: self.names,
            signatures,
            evidence_functions: self.evidence_functions,
            fragments
        })
    }

    /// Internal function that actually adds the node to the model
    fn add_node(mut self, name: String, decl: NodeDecl, init: Option<Initialization>) -> Self {
        ///////////////////////////////////////////////////////////////////////
        // 1) if we are in an error state, do nothing
        if self.err.is_some() {
            return self;
        }

        ///////////////////////////////////////////////////////////////////////
        // 2) Check for error conditions
        if self.names.get_by_second(&name).is_some() {
            self.err = Some(RelbnError::DuplicateVariable(name));
            return self;
        }

        let mut parents = Vec::with_capacity(decl.parents.len());
        for p in decl.parents.iter() {
            match self.names.get_by_second(p) {
                Some(&id) => parents.push(id),
                None => {
                    self.err = Some(RelbnError::MissingParent(p.clone()));
                    return self;
                }
            }
        }

        if init.is_some() && decl.kind != NodeKind::Probabilistic {
            self.err = Some(RelbnError::General(
                format!("Only probabilistic nodes can be fragments, but '{}' is not", name)
            ));
            return self;
        }

        if init.is_none() && decl.aggregator.is_some() {
            self.err = Some(RelbnError::General(
                format!("'{}' declares an aggregator but has no table", name)
            ));
            return self;
        }

        ///////////////////////////////////////////////////////////////////////
        // 3) Build the table based on the initialization
        let cpt = match init {
            Some(init) => {
                let mut shape = vec![decl.domain.order()];
                shape.extend(parents.iter().map(|&p| self.nodes[p].domain.order()));
                match init.build_cpt(&shape, true) {
                    Ok(cpt) => Some(cpt),
                    Err(e) => {
                        self.err = Some(e);
                        return self;
                    }
                }
            },
            None => None
        };

        ///////////////////////////////////////////////////////////////////////
        // 4) Add to current model
        let id = self.nodes.len();
        self.nodes.push(decl.into_node(id, parents, cpt));
        self.names.insert(id, name);

        self
    }
}
