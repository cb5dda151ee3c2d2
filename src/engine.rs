//! The grounding engine, which instantiates a `GroundNetwork` from a `TemplateModel` and the
//! facts of a `Database`.
//!
//! Every ground variable is instantiated at most once. Its parents are instantiated first (the
//! recursion follows the template structure), so the network is built in topological order. The
//! table of a variable is either transferred from its only applicable template, built by the
//! template's aggregator, or combined from several template instantiations by the combining rule
//! configured for its function.

use cache::{CacheKey, TableCache};
use combine::{grouped_or_table, or_table, supports_or, Aggregator, CombiningRule};
use config::GroundingConfig;
use database::Database;
use factor::{Cpf, Table};
use grounder::{filter_preconditions, parameter_sets, Grounding, ParentGrounder};
use model::ground::{GroundKind, GroundNetwork, GroundNode, NodeIndex};
use model::template::{NodeKind, TemplateId, TemplateModel, TemplateNode};
use util::{RelbnError, Result};
use variable::{format_var_name, Addresses};

use indexmap::IndexMap;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;


/// Callbacks into the grounding process, e.g. to add nodes for hard logical constraints
pub trait GroundingHooks {

    /// Called whenever a ground variable was added for a template
    fn on_ground_atom_added(&mut self, _template: &TemplateNode, _args: &[String], _node: &GroundNode) {}

    /// Called once all regular variables are grounded, if auxiliary nodes are enabled
    fn ground_auxiliary_constraints(&mut self, _model: &TemplateModel, _network: &mut GroundNetwork) -> Result<()> {
        Ok(())
    }
}

/// `GroundingHooks` that do nothing
pub struct NoHooks;

impl GroundingHooks for NoHooks {}


/// The state of one grounding run
pub struct GroundingSession {
    network: GroundNetwork,

    /// Variables whose parents are being instantiated
    resolving: HashSet<String>,

    /// Evidence variables without an applicable template
    skipped: HashSet<String>,

    grounders: HashMap<TemplateId, ParentGrounder>,
    cache: TableCache
}

impl GroundingSession {

    pub fn new(use_table_cache: bool) -> Self {
        GroundingSession {
            network: GroundNetwork::new(),
            resolving: HashSet::new(),
            skipped: HashSet::new(),
            grounders: HashMap::new(),
            cache: TableCache::new(use_table_cache)
        }
    }

    pub fn network(&self) -> &GroundNetwork {
        &self.network
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    /// Check if the named variable was skipped as evidence
    pub fn is_skipped(&self, name: &str) -> bool {
        self.skipped.contains(name)
    }

    pub fn into_network(self) -> GroundNetwork {
        self.network
    }
}


/// A coordinate of a template table within a combined table
enum Column {
    /// The coordinate is fixed to the given index
    Fixed(usize),

    /// The coordinate is the combined table's coordinate with the given number
    Shared(usize)
}

/// One template instantiation contributing to a combined table
struct Source<'m> {
    cpt: &'m Cpf,
    columns: Vec<Column>
}

/// The parents of one grounding
struct ResolvedParents {
    /// The ground parents, in template column order
    nodes: Vec<NodeIndex>,

    /// The settings of the template's coordinates that have no ground parent
    fixed: Vec<Option<usize>>
}


/// Instantiates ground networks.
pub struct GroundingEngine<'a, D: Database + ?Sized + 'a> {
    model: &'a TemplateModel,
    db: &'a D,
    config: GroundingConfig
}

impl<'a, D: Database + ?Sized + 'a> GroundingEngine<'a, D> {

    pub fn new(model: &'a TemplateModel, db: &'a D, config: &GroundingConfig) -> Self {
        GroundingEngine { model, db, config: config.clone() }
    }

    /// Use `rule` to combine competing instantiations of the variables of `function`
    pub fn with_combining_rule(mut self, function: &str, rule: CombiningRule) -> Self {
        self.config.combining_rules.insert(String::from(function), rule);
        self
    }

    pub fn config(&self) -> &GroundingConfig {
        &self.config
    }

    /// Start a new grounding run
    pub fn session(&self) -> GroundingSession {
        GroundingSession::new(self.config.use_table_cache)
    }

    /// Instantiate the ground network for all objects in the database
    pub fn ground(&self) -> Result<GroundNetwork> {
        self.ground_with(&mut NoHooks)
    }

    /// Instantiate the ground network for all objects in the database.
    ///
    /// Every function with a fragment is grounded for all argument tuples of its signature. The
    /// run fails with the first error; no partial network is returned.
    pub fn ground_with<H: GroundingHooks + ?Sized>(&self, hooks: &mut H) -> Result<GroundNetwork> {
        let start = Instant::now();
        info!("generating network");

        let mut session = self.session();
        for function in self.model.fragment_functions() {
            debug!(function = %function, "grounding function");
            let sig = self.model.signatures().lookup(function)?;
            for args in parameter_sets(sig, self.db) {
                self.instantiate_variable(&mut session, hooks, function, &args)?;
            }
        }

        if self.config.add_auxiliary_nodes {
            debug!("grounding auxiliary constraints");
            hooks.ground_auxiliary_constraints(self.model, &mut session.network)?;
        }

        info!(
            nodes = session.network.len(),
            cache_hits = session.cache.hits(),
            cache_misses = session.cache.misses(),
            seconds = start.elapsed().as_secs_f64(),
            "network generated"
        );

        Ok(session.into_network())
    }

    /// Instantiate the variable `function(args)`, or return it if it exists already.
    ///
    /// # Returns
    /// the index of the ground node, or `None` if the variable is evidence without an applicable
    /// template
    ///
    /// # Errors
    /// * `RelbnError::NoTemplateFound` if no template applies to a non-evidence variable
    /// * `RelbnError::AmbiguousComposition` if several templates apply and one has an aggregator
    /// * `RelbnError::MissingCombiningRule` if several instantiations compete and no combining
    ///   rule is configured for the function
    /// * `RelbnError::CyclicDependency` if the variable is its own ancestor
    /// * any error raised while instantiating its parents
    pub fn instantiate_variable<H: GroundingHooks + ?Sized>(
        &self,
        session: &mut GroundingSession,
        hooks: &mut H,
        function: &str,
        args: &[String]
    ) -> Result<Option<NodeIndex>> {
        let name = format_var_name(function, args);
        if let Some(idx) = session.network.index_of(&name) {
            return Ok(Some(idx));
        }
        if session.skipped.contains(&name) {
            return Ok(None);
        }
        if session.resolving.contains(&name) {
            return Err(RelbnError::CyclicDependency(name));
        }

        ///////////////////////////////////////////////////////////////////////
        // 1) collect the applicable templates along with their groundings
        let mut suitable: Vec<(TemplateId, Vec<Grounding>)> = Vec::new();
        for &tid in self.model.fragments_of(function).iter() {
            let groundings = self.groundings(session, tid, args)?;
            if ! groundings.is_empty() {
                suitable.push((tid, groundings));
            }
        }

        if suitable.is_empty() {
            if self.is_evidence_function(function) {
                debug!(variable = %name, "skipped, is evidence");
                session.skipped.insert(name);
                return Ok(None);
            }
            return Err(RelbnError::NoTemplateFound(name));
        }

        let aggregated = suitable.iter().any(|&(tid, _)| {
            self.model.node(tid).map_or(false, |t| t.aggregator().is_some())
        });
        if aggregated && suitable.len() > 1 {
            return Err(RelbnError::AmbiguousComposition(name));
        }

        ///////////////////////////////////////////////////////////////////////
        // 2) instantiate the parents and build the table
        session.resolving.insert(name.clone());
        let result = if aggregated {
            let (tid, ref groundings) = suitable[0];
            self.instantiate_aggregated(session, hooks, &name, args, tid, groundings)
        } else if suitable.len() == 1 && suitable[0].1.len() == 1 {
            self.instantiate_single(session, hooks, &name, args, suitable[0].0, &suitable[0].1[0])
        } else {
            match self.combining_rule(function) {
                Some(rule) => self.instantiate_combined(session, hooks, &name, args, &suitable, rule),
                None => Err(RelbnError::MissingCombiningRule(name.clone()))
            }
        };
        session.resolving.remove(&name);
        let idx = result?;

        let template = self.model.require(suitable[0].0)?;
        if let Some(node) = session.network.node(idx) {
            hooks.on_ground_atom_added(template, args, node);
        }
        debug!(variable = %name, "instantiated");

        Ok(Some(idx))
    }

    fn is_evidence_function(&self, function: &str) -> bool {
        self.model.is_evidence_function(function) || self.config.evidence_functions.iter().any(|f| f == function)
    }

    fn combining_rule(&self, function: &str) -> Option<CombiningRule> {
        self.config.combining_rules.get(function).cloned()
    }

    /// The admissible groundings of a template for the given arguments
    fn groundings(&self, session: &mut GroundingSession, tid: TemplateId, args: &[String]) -> Result<Vec<Grounding>> {
        let grounder = match session.grounders.entry(tid) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(ParentGrounder::new(self.model, tid)?)
        };

        let groundings = grounder.groundings(self.model, args, self.db)?;
        filter_preconditions(self.model, tid, groundings, self.db)
    }

    /// Instantiate the ground parents of one grounding and determine the settings of the
    /// coordinates that have none: guards and preconditions are true, constants take their bound
    /// value.
    fn resolve_parents<H: GroundingHooks + ?Sized>(
        &self,
        session: &mut GroundingSession,
        hooks: &mut H,
        target: &str,
        tid: TemplateId,
        grounding: &Grounding
    ) -> Result<ResolvedParents> {
        let template = self.model.require(tid)?;
        let mut nodes = Vec::with_capacity(template.parents().len());
        let mut fixed = vec![None; template.parents().len() + 1];

        for (col, &pid) in template.parents().iter().enumerate() {
            let parent = self.model.require(pid)?;
            let coord = col + 1;

            match *parent.kind() {
                NodeKind::Decision(_) => fixed[coord] = Some(0),
                NodeKind::Precondition => fixed[coord] = Some(parent.domain().true_index().unwrap_or(0)),
                NodeKind::Constant => {
                    let value = grounding.get(&pid)
                                         .and_then(|a| a.first())
                                         .ok_or_else(|| RelbnError::UnboundParameter(template.label(), String::from(parent.function())))?;
                    fixed[coord] = Some(parent.domain().require_index(value)?);
                },
                NodeKind::Probabilistic => {
                    let args = grounding.get(&pid)
                                        .ok_or_else(|| RelbnError::UnboundParameter(template.label(), parent.label()))?;
                    let parent_name = parent.variable_name(args);

                    let idx = match self.instantiate_variable(session, hooks, parent.function(), args)? {
                        Some(idx) => idx,
                        None => return Err(RelbnError::UnresolvedParent(String::from(target), parent_name))
                    };
                    if nodes.contains(&idx) {
                        return Err(RelbnError::DuplicateParent(String::from(target), parent_name));
                    }
                    nodes.push(idx);
                }
            }
        }

        Ok(ResolvedParents { nodes, fixed })
    }

    /// Connect the parents of one grounding and transfer the matching part of the template
    /// table: the whole table if every template parent has a ground parent, otherwise the
    /// projection onto the coordinates that are not fixed.
    fn transfer<H: GroundingHooks + ?Sized>(
        &self,
        session: &mut GroundingSession,
        hooks: &mut H,
        target: &str,
        tid: TemplateId,
        grounding: &Grounding
    ) -> Result<(Vec<NodeIndex>, Cpf, CacheKey)> {
        let resolved = self.resolve_parents(session, hooks, target, tid, grounding)?;
        let template = self.model.require(tid)?;
        let cpt = template.cpt()
                          .ok_or_else(|| RelbnError::General(format!("{} has no table", template.label())))?;
        let shape = domain_product(&session.network, template.domain().order(), &resolved.nodes);

        if resolved.nodes.len() == template.parents().len() {
            let cpf = fit(target, &shape, cpt.values().clone())?;
            return Ok((resolved.nodes, cpf, CacheKey::Template(tid)));
        }

        let key = CacheKey::Projection {
            template: tid,
            fixed: resolved.fixed.iter().enumerate().filter_map(|(c, f)| f.map(|i| (c, i))).collect()
        };
        let values = {
            let fixed = &resolved.fixed;
            session.cache.get_or_try_insert_with(&key, || cpt.project(fixed))?
        };
        trace!(variable = %target, key = %key, "projected template table");

        let cpf = fit(target, &shape, values)?;
        Ok((resolved.nodes, cpf, key))
    }

    fn instantiate_single<H: GroundingHooks + ?Sized>(
        &self,
        session: &mut GroundingSession,
        hooks: &mut H,
        name: &str,
        args: &[String],
        tid: TemplateId,
        grounding: &Grounding
    ) -> Result<NodeIndex> {
        let (parents, cpf, key) = self.transfer(session, hooks, name, tid, grounding)?;
        let template = self.model.require(tid)?;

        session.network.add_node(GroundNode {
            name: String::from(name),
            function: String::from(template.function()),
            args: args.to_vec(),
            domain: template.domain().clone(),
            parents,
            cpf,
            template: Some(tid),
            cpf_id: Some(key.to_string()),
            kind: GroundKind::Atom
        })
    }

    /// Instantiate a variable from a template with an aggregator over all of its groundings.
    ///
    /// Nothing is added to the network before every grounding is resolved and the aggregate
    /// table is built, so a failed variable leaves no auxiliary nodes behind.
    fn instantiate_aggregated<H: GroundingHooks + ?Sized>(
        &self,
        session: &mut GroundingSession,
        hooks: &mut H,
        name: &str,
        args: &[String],
        tid: TemplateId,
        groundings: &[Grounding]
    ) -> Result<NodeIndex> {
        let template = self.model.require(tid)?;
        let aggregator = template.aggregator()
                                 .ok_or_else(|| RelbnError::General(format!("{} has no aggregator", template.label())))?;
        if ! supports_or(template.domain()) {
            return Err(RelbnError::NonBooleanAggregator(String::from(name)));
        }

        // the grounded parents linked directly, or the transfers for one auxiliary node each
        let mut parents: Vec<NodeIndex> = Vec::new();
        let mut auxiliaries: Vec<(Vec<NodeIndex>, Cpf, CacheKey)> = Vec::new();
        let mut group_size = None;

        if aggregator.is_functional() {
            for grounding in groundings.iter() {
                let resolved = self.resolve_parents(session, hooks, name, tid, grounding)?;
                match group_size {
                    Some(g) if g != resolved.nodes.len() => {
                        return Err(RelbnError::TableSizeMismatch(
                            format!("groups of {} have sizes {} and {}", name, g, resolved.nodes.len())
                        ));
                    },
                    Some(_) => (),
                    None => group_size = Some(resolved.nodes.len())
                }

                for idx in resolved.nodes {
                    let parent = session.network
                                        .node(idx)
                                        .ok_or_else(|| RelbnError::MissingParent(format!("#{} of {}", idx, name)))?;
                    if ! supports_or(parent.domain()) {
                        return Err(RelbnError::NonBooleanAggregator(String::from(parent.name())));
                    }
                    if parents.contains(&idx) {
                        return Err(RelbnError::DuplicateParent(String::from(name), String::from(parent.name())));
                    }
                    parents.push(idx);
                }
            }
        } else {
            for grounding in groundings.iter() {
                auxiliaries.push(self.transfer(session, hooks, name, tid, grounding)?);
            }
        }

        let key = CacheKey::Aggregate { aggregator, groundings: groundings.len(), group_size };
        let inputs = if aggregator.is_functional() { parents.len() } else { auxiliaries.len() };
        let values = session.cache.get_or_try_insert_with(&key, || {
            match group_size {
                Some(g) => grouped_or_table(inputs, g),
                None => or_table(inputs)
            }
        })?;

        let order = template.domain().order();
        let shape = if aggregator.is_functional() {
            domain_product(&session.network, order, &parents)
        } else {
            vec![order; inputs + 1]
        };
        let cpf = fit(name, &shape, values)?;

        for (k, (aux_parents, aux_cpf, aux_key)) in auxiliaries.into_iter().enumerate() {
            let idx = session.network.add_node(GroundNode {
                name: format!("AUX{}_{}", k, name),
                function: String::from(template.function()),
                args: args.to_vec(),
                domain: template.domain().clone(),
                parents: aux_parents,
                cpf: aux_cpf,
                template: Some(tid),
                cpf_id: Some(aux_key.to_string()),
                kind: GroundKind::AggregatorAux
            })?;
            parents.push(idx);
        }

        session.network.add_node(GroundNode {
            name: String::from(name),
            function: String::from(template.function()),
            args: args.to_vec(),
            domain: template.domain().clone(),
            parents,
            cpf,
            template: Some(tid),
            cpf_id: Some(key.to_string()),
            kind: GroundKind::Atom
        })
    }

    /// Instantiate a variable from several competing template instantiations, merged column by
    /// column with a combining rule.
    fn instantiate_combined<H: GroundingHooks + ?Sized>(
        &self,
        session: &mut GroundingSession,
        hooks: &mut H,
        name: &str,
        args: &[String],
        suitable: &[(TemplateId, Vec<Grounding>)],
        rule: CombiningRule
    ) -> Result<NodeIndex> {
        let first = self.model.require(suitable[0].0)?;
        let domain = first.domain().clone();
        if rule.boolean_semantics() && ! supports_or(&domain) {
            return Err(RelbnError::NonBooleanAggregator(String::from(name)));
        }

        ///////////////////////////////////////////////////////////////////////
        // 1) the union of all ground parents, in order of appearance
        let mut combined: IndexMap<NodeIndex, usize> = IndexMap::new();
        let mut sources = Vec::new();

        for &(tid, ref groundings) in suitable.iter() {
            let template = self.model.require(tid)?;
            if template.domain().order() != domain.order() {
                return Err(RelbnError::TableSizeMismatch(
                    format!("templates of {} disagree on the number of values", name)
                ));
            }
            let cpt = template.cpt()
                              .ok_or_else(|| RelbnError::General(format!("{} has no table", template.label())))?;

            for grounding in groundings.iter() {
                let resolved = self.resolve_parents(session, hooks, name, tid, grounding)?;
                let mut nodes = resolved.nodes.into_iter();
                let mut columns = Vec::with_capacity(resolved.fixed.len() - 1);

                for setting in resolved.fixed[1..].iter() {
                    let column = match *setting {
                        Some(idx) => Column::Fixed(idx),
                        None => {
                            let parent = nodes.next().ok_or_else(|| {
                                RelbnError::General(format!("parents of {} do not match its template", name))
                            })?;
                            let next = combined.len() + 1;
                            Column::Shared(*combined.entry(parent).or_insert(next))
                        }
                    };
                    columns.push(column);
                }
                sources.push(Source { cpt, columns });
            }
        }

        ///////////////////////////////////////////////////////////////////////
        // 2) fill the table column by column
        let parents: Vec<NodeIndex> = combined.keys().cloned().collect();
        let shape = domain_product(&session.network, domain.order(), &parents);
        let mut cpf = Cpf::zeros(&shape);

        for column in Addresses::new(&shape[1..]) {
            let mut addr = Vec::with_capacity(shape.len());
            addr.push(0);
            addr.extend(column.iter().cloned());

            if rule.boolean_semantics() {
                let p = rule.compute(&column_entries(&sources, 0, &column)?);
                addr[0] = 0;
                cpf.put(&addr, p)?;
                addr[0] = 1;
                cpf.put(&addr, 1.0 - p)?;
            } else {
                let mut scores = Vec::with_capacity(domain.order());
                for value in 0..domain.order() {
                    scores.push(rule.compute(&column_entries(&sources, value, &column)?));
                }

                let z: f64 = scores.iter().sum();
                if z == 0.0 {
                    return Err(RelbnError::DegenerateNormalization(String::from(name)));
                }
                for (value, score) in scores.iter().enumerate() {
                    addr[0] = value;
                    cpf.put(&addr, score / z)?;
                }
            }
        }

        session.network.add_node(GroundNode {
            name: String::from(name),
            function: String::from(first.function()),
            args: args.to_vec(),
            domain,
            parents,
            cpf,
            template: Some(first.id()),
            cpf_id: None,
            kind: GroundKind::Atom
        })
    }
}


/// The sizes of a node's domain and its parents' domains
fn domain_product(network: &GroundNetwork, order: usize, parents: &[NodeIndex]) -> Vec<usize> {
    let mut shape = Vec::with_capacity(parents.len() + 1);
    shape.push(order);
    shape.extend(parents.iter().map(|&p| network.node(p).map_or(0, |n| n.domain().order())));
    shape
}

/// Build the table of `target` from shared values
fn fit(target: &str, shape: &[usize], values: Arc<Table>) -> Result<Cpf> {
    Cpf::build(shape, values).map_err(|e| match e {
        RelbnError::TableSizeMismatch(msg) => RelbnError::TableSizeMismatch(format!("{}: {}", target, msg)),
        other => other
    })
}

/// The entries of every source's table for the given value of the node and column of the
/// combined table
fn column_entries(sources: &[Source], value: usize, column: &[usize]) -> Result<Vec<f64>> {
    sources.iter().map(|s| {
        let mut addr = Vec::with_capacity(s.columns.len() + 1);
        addr.push(value);
        for c in s.columns.iter() {
            addr.push(match *c {
                Column::Fixed(idx) => idx,
                Column::Shared(coord) => column[coord - 1]
            });
        }
        s.cpt.value(&addr)
    }).collect()
}
