//! The parent grounder, which enumerates the admissible bindings of a template's parents for the
//! actual parameters of a variable.

use database::Database;
use model::template::{Guard, NodeKind, TemplateId, TemplateModel, TemplateNode};
use signature::Signature;
use util::{RelbnError, Result};
use variable::Addresses;

use indexmap::IndexMap;

use std::collections::HashMap;


/// One binding of a template: the actual arguments of the node itself and of each of its
/// parents, keyed by template id. Decision parents take no arguments and have no entry; a constant
/// parent's single argument is the value it is bound to.
pub type Grounding = IndexMap<TemplateId, Vec<String>>;


/// Enumerates the `Grounding`s of one template.
///
/// Parameters that occur in parents but not in the template node itself are *free*: they are
/// bound by the true tuples of a precondition parent containing them, or else by all objects of
/// their type.
#[derive(Clone, Debug)]
pub struct ParentGrounder {
    template: TemplateId,

    /// The node's own parameters followed by the free parameters
    variables: Vec<String>,
    free_params: Vec<String>,
    free_types: Vec<String>,

    /// The guards of the decision parents
    guards: Vec<Guard>
}

impl ParentGrounder {

    /// Analyze the parents of a template.
    ///
    /// # Errors
    /// * `RelbnError::UnboundParameter` if a free parameter occurs in no parent, so that its type
    ///   is unknown
    /// * `RelbnError::MissingSignature` if a parent binding a free parameter has no signature
    pub fn new(model: &TemplateModel, template: TemplateId) -> Result<Self> {
        let node = model.require(template)?;

        let mut free_params: Vec<String> = Vec::new();
        {
            let mut add_free = |p: &String| {
                if ! node.params().contains(p) && ! free_params.contains(p) {
                    free_params.push(p.clone());
                }
            };

            // declared additional parameters come first
            for p in node.add_params().iter() {
                add_free(p);
            }
            for &pid in node.parents().iter() {
                let parent = model.require(pid)?;
                if binds_params(parent) {
                    for p in parent.params().iter() {
                        add_free(p);
                    }
                }
            }
        }

        let mut free_types = Vec::with_capacity(free_params.len());
        for param in free_params.iter() {
            free_types.push(param_type(model, node, param)?);
        }

        let mut guards = Vec::new();
        for &pid in node.parents().iter() {
            if let Some(g) = model.require(pid)?.guard() {
                guards.push(g.clone());
            }
        }

        let mut variables = node.params().to_vec();
        variables.extend(free_params.iter().cloned());

        Ok(ParentGrounder { template, variables, free_params, free_types, guards })
    }

    pub fn template(&self) -> TemplateId {
        self.template
    }

    pub fn free_params(&self) -> &[String] {
        &self.free_params
    }

    /// Compute all groundings of the template for the given actual parameters.
    ///
    /// # Returns
    /// the groundings in enumeration order, without duplicates. The result is empty if the
    /// template's guards fail.
    ///
    /// # Errors
    /// * `RelbnError::SignatureArityMismatch` if the number of arguments is wrong
    /// * `RelbnError::UnboundParameter` if a parent uses a parameter that cannot be bound
    pub fn groundings<D: Database + ?Sized>(
        &self,
        model: &TemplateModel,
        args: &[String],
        db: &D
    ) -> Result<Vec<Grounding>> {
        let node = model.require(self.template)?;
        if args.len() != node.params().len() {
            return Err(RelbnError::SignatureArityMismatch(node.label(), node.params().len(), args.len()));
        }

        let mut binding: HashMap<String, String> = HashMap::new();
        for (p, a) in node.params().iter().zip(args.iter()) {
            if let Some(bound) = binding.get(p) {
                // a repeated parameter needs equal arguments
                if bound != a {
                    return Ok(Vec::new());
                }
            }
            binding.insert(p.clone(), a.clone());
        }

        // keyed by the bound arguments; the slots of one template always come in the same order
        let mut groundings: IndexMap<Vec<Vec<String>>, Grounding> = IndexMap::new();
        self.extend(model, node, db, 0, &mut binding, &mut groundings)?;
        Ok(groundings.into_iter().map(|(_, g)| g).collect())
    }

    fn extend<D: Database + ?Sized>(
        &self,
        model: &TemplateModel,
        node: &TemplateNode,
        db: &D,
        i: usize,
        binding: &mut HashMap<String, String>,
        out: &mut IndexMap<Vec<Vec<String>>, Grounding>
    ) -> Result<()> {
        let complete = i == self.free_params.len();
        if ! self.guards_admit(db, binding, complete) {
            return Ok(());
        }

        if complete {
            let grounding = self.assemble(model, node, binding)?;
            let key: Vec<Vec<String>> = grounding.values().cloned().collect();
            out.entry(key).or_insert(grounding);
            return Ok(());
        }

        let param = &self.free_params[i];
        for candidate in self.candidates(model, node, db, i, binding)? {
            binding.insert(param.clone(), candidate);
            self.extend(model, node, db, i + 1, binding, out)?;
        }
        binding.remove(param);

        Ok(())
    }

    /// Guards that depend on unbound parameters are deferred until the binding is complete
    fn guards_admit<D: Database + ?Sized>(&self, db: &D, binding: &HashMap<String, String>, complete: bool) -> bool {
        self.guards.iter().all(|g| {
            match g.evaluate(&self.variables, binding, db) {
                Some(v) => v,
                None => ! complete
            }
        })
    }

    fn candidates<D: Database + ?Sized>(
        &self,
        model: &TemplateModel,
        node: &TemplateNode,
        db: &D,
        i: usize,
        binding: &HashMap<String, String>
    ) -> Result<Vec<String>> {
        let param = &self.free_params[i];

        for &pid in node.parents().iter() {
            let parent = model.require(pid)?;
            if *parent.kind() != NodeKind::Precondition {
                continue;
            }
            let pos = match parent.params().iter().position(|p| p == param) {
                Some(pos) => pos,
                None => continue
            };

            let mut values: Vec<String> = Vec::new();
            for (args, value) in db.tuples(parent.function()) {
                if args.len() != parent.params().len() || ! parent.domain().is_true(value) {
                    continue;
                }
                let consistent = parent.params()
                                       .iter()
                                       .zip(args.iter())
                                       .all(|(p, a)| binding.get(p).map_or(true, |b| b == a));
                if consistent && ! values.contains(&args[pos]) {
                    values.push(args[pos].clone());
                }
            }
            return Ok(values);
        }

        Ok(db.objects_of_type(&self.free_types[i]).to_vec())
    }

    fn assemble(&self, model: &TemplateModel, node: &TemplateNode, binding: &HashMap<String, String>) -> Result<Grounding> {
        let mut grounding = Grounding::new();
        grounding.insert(node.id(), bind(node, node.params(), binding)?);

        for &pid in node.parents().iter() {
            let parent = model.require(pid)?;
            let args = match *parent.kind() {
                NodeKind::Decision(_) => continue,
                NodeKind::Constant => bind(node, &[String::from(parent.function())], binding)?,
                _ => bind(node, parent.params(), binding)?
            };
            grounding.insert(pid, args);
        }

        Ok(grounding)
    }
}


/// Check if a parent's parameters are bound by the grounding
fn binds_params(parent: &TemplateNode) -> bool {
    match *parent.kind() {
        NodeKind::Decision(_) | NodeKind::Constant => false,
        _ => true
    }
}

/// The type of a parameter, taken from the signature of the first parent using it
fn param_type(model: &TemplateModel, node: &TemplateNode, param: &str) -> Result<String> {
    for &pid in node.parents().iter() {
        let parent = model.require(pid)?;
        if ! binds_params(parent) {
            continue;
        }
        if let Some(pos) = parent.params().iter().position(|p| p == param) {
            let sig = model.signatures().lookup(parent.function())?;
            if let Some(t) = sig.arg_types.get(pos) {
                return Ok(t.clone());
            }
        }
    }

    Err(RelbnError::UnboundParameter(node.label(), String::from(param)))
}

fn bind(node: &TemplateNode, params: &[String], binding: &HashMap<String, String>) -> Result<Vec<String>> {
    params.iter()
          .map(|p| binding.get(p).cloned().ok_or_else(|| RelbnError::UnboundParameter(node.label(), p.clone())))
          .collect()
}


/// Keep only the groundings in which every precondition parent of the template is true in the
/// database.
pub fn filter_preconditions<D: Database + ?Sized>(
    model: &TemplateModel,
    template: TemplateId,
    groundings: Vec<Grounding>,
    db: &D
) -> Result<Vec<Grounding>> {
    let node = model.require(template)?;
    let mut preconditions = Vec::new();
    for &pid in node.parents().iter() {
        let parent = model.require(pid)?;
        if *parent.kind() == NodeKind::Precondition {
            preconditions.push(parent);
        }
    }

    Ok(groundings.into_iter()
                 .filter(|g| {
                     preconditions.iter().all(|p| {
                         g.get(&p.id())
                          .and_then(|args| db.value_of(p.function(), args))
                          .map_or(false, |v| p.domain().is_true(v))
                     })
                 })
                 .collect())
}


/// Enumerate every argument tuple of a function from the objects of its argument types, in
/// lexicographic order.
pub fn parameter_sets<D: Database + ?Sized>(sig: &Signature, db: &D) -> Vec<Vec<String>> {
    let objects: Vec<&[String]> = sig.arg_types.iter().map(|t| db.objects_of_type(t)).collect();
    let sizes: Vec<usize> = objects.iter().map(|o| o.len()).collect();

    Addresses::new(&sizes).map(|addr| {
        addr.iter()
            .zip(objects.iter())
            .map(|(&i, o)| o[i].clone())
            .collect::<Vec<String>>()
    }).collect()
}
