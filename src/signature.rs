//! Defines `Signature`s, the argument and return types of the functions used by a template model,
//! and the `SignatureRegistry` which checks templates for type consistency.

use model::template::{NodeKind, TemplateNode};
use util::{RelbnError, Result};
use variable::BOOLEAN;

use indexmap::IndexMap;

use std::collections::HashMap;
use std::fmt;


/// The signature of a function (or predicate, if it returns `Boolean`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// The name of the function
    pub function: String,

    /// The name of the domain of return values
    pub return_type: String,

    /// The type names of the arguments
    pub arg_types: Vec<String>
}

impl Signature {

    pub fn new(function: &str, return_type: &str, arg_types: &[&str]) -> Self {
        Signature {
            function: String::from(function),
            return_type: String::from(return_type),
            arg_types: arg_types.iter().map(|t| String::from(*t)).collect()
        }
    }

    /// Check if the function is a predicate
    pub fn is_boolean(&self) -> bool {
        self.return_type == BOOLEAN
    }

    /// The number of arguments
    pub fn arity(&self) -> usize {
        self.arg_types.len()
    }

    /// Replace every occurrence of a type (arguments and return type)
    pub fn replace_type(&mut self, old: &str, new: &str) {
        if self.return_type == old {
            self.return_type = String::from(new);
        }
        for t in self.arg_types.iter_mut().filter(|t| *t == old) {
            *t = String::from(new);
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({}) -> {}", self.function, self.arg_types.join(", "), self.return_type)
    }
}


/// Maps function names (case-insensitively) to their `Signature`s
#[derive(Clone, Debug, Default)]
pub struct SignatureRegistry {
    signatures: IndexMap<String, Signature>
}

impl SignatureRegistry {

    pub fn new() -> Self {
        SignatureRegistry { signatures: IndexMap::new() }
    }

    /// Register (or replace) the signature of a function
    pub fn register(&mut self, sig: Signature) {
        self.signatures.insert(sig.function.to_lowercase(), sig);
    }

    /// Get the signature of a function, if there is one
    pub fn get(&self, function: &str) -> Option<&Signature> {
        self.signatures.get(&function.to_lowercase())
    }

    /// Get the signature of a function.
    ///
    /// # Errors
    /// * `RelbnError::MissingSignature` if no signature was registered for the function
    pub fn lookup(&self, function: &str) -> Result<&Signature> {
        self.get(function).ok_or_else(|| RelbnError::MissingSignature(String::from(function)))
    }

    /// Iterate over all signatures in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.values()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Replace a type by a new type in all signatures
    pub fn replace_type(&mut self, old: &str, new: &str) {
        for sig in self.signatures.values_mut() {
            sig.replace_type(old, new);
        }
    }

    /// Check the templates for consistency with the registered signatures and derive the
    /// signatures of constant templates.
    ///
    /// A constant's type is the type of the parameter that carries its name in the templates
    /// that reference it.
    ///
    /// # Errors
    /// * `RelbnError::MissingSignature` if a template's function has no signature
    /// * `RelbnError::SignatureArityMismatch` if a template has the wrong number of parameters
    /// * `RelbnError::TypeConflict` if one parameter name is used with two types
    /// * `RelbnError::UntypedConstant` if a constant is never referenced
    pub fn check(&mut self, nodes: &[TemplateNode]) -> Result<()> {
        // obtain parameter -> type mapping for non-constant nodes
        let mut types: HashMap<&str, &str> = HashMap::new();
        let mut constants = Vec::new();

        for node in nodes.iter() {
            match *node.kind() {
                NodeKind::Decision(_) => continue,
                NodeKind::Constant => {
                    constants.push(node);
                    continue;
                },
                _ => ()
            }

            let sig = self.signatures
                          .get(&node.function().to_lowercase())
                          .ok_or_else(|| RelbnError::MissingSignature(String::from(node.function())))?;

            if sig.arg_types.len() != node.params().len() {
                return Err(RelbnError::SignatureArityMismatch(
                    node.label(), sig.arg_types.len(), node.params().len()
                ));
            }

            for (param, arg_type) in node.params().iter().zip(sig.arg_types.iter()) {
                if let Some(&known) = types.get(param.as_str()) {
                    if known != arg_type.as_str() {
                        return Err(RelbnError::TypeConflict(
                            param.clone(), String::from(known), arg_type.clone()
                        ));
                    }
                }
                types.insert(param.as_str(), arg_type.as_str());
            }
        }

        // constants that are referenced by any template now have a type assigned
        let mut synthesized = Vec::with_capacity(constants.len());
        for constant in constants {
            match types.get(constant.function()) {
                Some(&t) => synthesized.push(Signature::new(constant.function(), t, &[])),
                None => return Err(RelbnError::UntypedConstant(String::from(constant.function())))
            }
        }

        for sig in synthesized {
            self.register(sig);
        }

        Ok(())
    }

    /// Guess the signatures of all templates: every parameter `X` (ignoring numeric suffixes)
    /// gets the type `ObjType_X`, boolean nodes return `Boolean` and every other node returns
    /// its own domain `Dom<function>`. Constants are typed by `check` afterwards.
    pub fn guess(&mut self, nodes: &[TemplateNode]) -> Result<()> {
        for node in nodes.iter() {
            match *node.kind() {
                NodeKind::Decision(_) | NodeKind::Constant => continue,
                _ => ()
            }

            let arg_types: Vec<String> = node.params()
                                             .iter()
                                             .map(|p| {
                                                 let stripped: String = p.chars().filter(|c| ! c.is_ascii_digit()).collect();
                                                 format!("ObjType_{}", stripped)
                                             })
                                             .collect();
            let return_type = if node.domain().is_boolean() {
                String::from(BOOLEAN)
            } else {
                format!("Dom{}", node.function())
            };

            self.register(Signature {
                function: String::from(node.function()),
                return_type,
                arg_types
            });
        }

        self.check(nodes)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use model::template::NodeDecl;
    use variable::Domain;

    fn temp_nodes(with_reference: bool) -> Vec<TemplateNode> {
        let temps = Domain::new("Temperature", &["low", "high"]);
        let mut nodes = vec![
            NodeDecl::constant("maxTemp", temps.clone()).into_node(0, vec![], None),
            NodeDecl::new("alarm", &["S"]).into_node(1, vec![], None),
        ];
        if with_reference {
            nodes.push(NodeDecl::new("tempReading", &["maxTemp"]).into_node(2, vec![], None));
        }
        nodes
    }

    #[test]
    fn constant_is_typed_by_reference() {
        let mut reg = SignatureRegistry::new();
        reg.register(Signature::new("alarm", BOOLEAN, &["Sensor"]));
        reg.register(Signature::new("tempReading", BOOLEAN, &["Temperature"]));

        reg.check(&temp_nodes(true)).expect("Unexpected error");

        let sig = reg.lookup("maxTemp").unwrap();
        assert_eq!("Temperature", sig.return_type);
        assert_eq!(0, sig.arity());
    }

    #[test]
    fn untyped_constant() {
        let mut reg = SignatureRegistry::new();
        reg.register(Signature::new("alarm", BOOLEAN, &["Sensor"]));

        match reg.check(&temp_nodes(false)) {
            Err(RelbnError::UntypedConstant(name)) => assert_eq!("maxTemp", name),
            _ => panic!("wrong result")
        };
    }

    #[test]
    fn missing_signature() {
        let mut reg = SignatureRegistry::new();
        match reg.check(&temp_nodes(false)) {
            Err(RelbnError::MissingSignature(name)) => assert_eq!("alarm", name),
            _ => panic!("wrong result")
        };
        assert!(reg.lookup("nothing").is_err());
    }

    #[test]
    fn arity_mismatch() {
        let mut reg = SignatureRegistry::new();
        reg.register(Signature::new("friendOf", BOOLEAN, &["Person"]));
        let nodes = vec![NodeDecl::new("friendOf", &["X", "Y"]).into_node(0, vec![], None)];

        match reg.check(&nodes) {
            Err(RelbnError::SignatureArityMismatch(_, 1, 2)) => assert!(true),
            _ => panic!("wrong result")
        };
    }

    #[test]
    fn type_conflict() {
        let mut reg = SignatureRegistry::new();
        reg.register(Signature::new("smokes", BOOLEAN, &["Person"]));
        reg.register(Signature::new("grade", "Grade", &["Course"]));
        let nodes = vec![
            NodeDecl::new("smokes", &["X"]).into_node(0, vec![], None),
            NodeDecl::new("grade", &["X"]).into_node(1, vec![], None),
        ];

        match reg.check(&nodes) {
            Err(RelbnError::TypeConflict(param, a, b)) => {
                assert_eq!("X", param);
                assert_eq!("Person", a);
                assert_eq!("Course", b);
            },
            _ => panic!("wrong result")
        };
    }

    #[test]
    fn case_insensitive_lookup() {
        let mut reg = SignatureRegistry::new();
        reg.register(Signature::new("friendOf", BOOLEAN, &["Person", "Person"]));
        assert!(reg.get("FRIENDOF").is_some());
        assert!(reg.lookup("friendof").unwrap().is_boolean());
    }

    #[test]
    fn guess_signatures() {
        let mut reg = SignatureRegistry::new();
        let grades = Domain::new("Grade", &["A", "B", "C"]);
        let nodes = vec![
            NodeDecl::new("takes", &["S1", "C"]).into_node(0, vec![], None),
            NodeDecl::new("grade", &["S2", "C"]).domain(grades).into_node(1, vec![], None),
        ];

        reg.guess(&nodes).expect("Unexpected error");

        let takes = reg.lookup("takes").unwrap();
        assert_eq!(vec!["ObjType_S", "ObjType_C"], takes.arg_types);
        assert!(takes.is_boolean());
        assert_eq!("Domgrade", reg.lookup("grade").unwrap().return_type);
    }

    #[test]
    fn replace_type() {
        let mut reg = SignatureRegistry::new();
        reg.register(Signature::new("friendOf", BOOLEAN, &["ObjType_X", "ObjType_Y"]));
        reg.replace_type("ObjType_Y", "ObjType_X");
        assert_eq!(vec!["ObjType_X", "ObjType_X"], reg.lookup("friendOf").unwrap().arg_types);
        assert_eq!("friendOf(ObjType_X, ObjType_X) -> Boolean", reg.lookup("friendOf").unwrap().to_string());
    }
}
