//! Defines the `Database` contract through which the grounder consults the known facts, and the
//! `MemoryDatabase`, an in-memory implementation of it.

use signature::Signature;
use util::{RelbnError, Result};

use indexmap::IndexMap;


/// A read-only store of objects and relation instances
pub trait Database {

    /// The value of the ground variable `function(args)`, or `None` if it is unknown
    fn value_of(&self, function: &str, args: &[String]) -> Option<&str>;

    /// All objects of the given type, in the order they became known
    fn objects_of_type(&self, type_name: &str) -> &[String];

    /// All known instances of a function, as pairs of arguments and value
    fn tuples(&self, function: &str) -> Vec<(&[String], &str)>;
}


/// A `Database` that keeps all facts in memory
#[derive(Clone, Debug, Default)]
pub struct MemoryDatabase {
    /// Objects by type name
    objects: IndexMap<String, Vec<String>>,

    /// Values of ground variables by function name and arguments
    facts: IndexMap<String, IndexMap<Vec<String>, String>>
}

impl MemoryDatabase {

    pub fn new() -> Self {
        MemoryDatabase { objects: IndexMap::new(), facts: IndexMap::new() }
    }

    /// Make an object of the given type known. Adding an object twice has no effect.
    pub fn add_object(&mut self, type_name: &str, object: &str) {
        let objects = self.objects.entry(String::from(type_name)).or_insert_with(Vec::new);
        if ! objects.iter().any(|o| o == object) {
            objects.push(String::from(object));
        }
    }

    /// Set the value of the ground variable `function(args)`
    pub fn set_value(&mut self, function: &str, args: &[&str], value: &str) {
        let args: Vec<String> = args.iter().map(|a| String::from(*a)).collect();
        self.facts.entry(String::from(function))
                  .or_insert_with(IndexMap::new)
                  .insert(args, String::from(value));
    }

    /// Set the value of a ground variable and make its arguments known as objects of the types
    /// given by the function's `Signature`.
    ///
    /// # Errors
    /// * `RelbnError::SignatureArityMismatch` if the number of arguments disagrees with the
    ///   signature
    pub fn declare(&mut self, sig: &Signature, args: &[&str], value: &str) -> Result<()> {
        if sig.arity() != args.len() {
            return Err(RelbnError::SignatureArityMismatch(
                sig.function.clone(), sig.arity(), args.len()
            ));
        }

        for (arg_type, arg) in sig.arg_types.iter().zip(args.iter()) {
            self.add_object(arg_type, arg);
        }
        self.set_value(&sig.function, args, value);

        Ok(())
    }

    /// The number of known ground variables
    pub fn num_facts(&self) -> usize {
        self.facts.values().map(|f| f.len()).sum()
    }
}

impl Database for MemoryDatabase {

    fn value_of(&self, function: &str, args: &[String]) -> Option<&str> {
        self.facts.get(function)
                  .and_then(|f| f.get(args))
                  .map(|v| v.as_str())
    }

    fn objects_of_type(&self, type_name: &str) -> &[String] {
        self.objects.get(type_name).map(|o| &o[..]).unwrap_or(&[])
    }

    fn tuples(&self, function: &str) -> Vec<(&[String], &str)> {
        match self.facts.get(function) {
            Some(f) => f.iter().map(|(args, value)| (&args[..], value.as_str())).collect(),
            None => Vec::new()
        }
    }
}
