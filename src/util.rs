//! Defines the `Error` type for the relbn library

use std::error::Error;
use std::fmt;
use std::result;

pub type Result<T> = result::Result<T, RelbnError>;

#[derive(Clone, Debug, PartialEq)]
pub enum RelbnError {

    /// A function was used by a template but no `Signature` was registered for it
    MissingSignature(String),

    /// The number of parameters of a template node disagrees with its `Signature`.
    /// Holds the node label, the signature's arity and the node's arity.
    SignatureArityMismatch(String, usize, usize),

    /// The same logical parameter was given two different types.
    /// Holds the parameter name and both types.
    TypeConflict(String, String, String),

    /// A constant template is never referenced as a parameter, so its type is unknown
    UntypedConstant(String),

    /// No template could be applied to the variable with the given name
    NoTemplateFound(String),

    /// Several template instantiations apply to the variable, but no combining rule was given
    MissingCombiningRule(String),

    /// An aggregator (or boolean combining rule) was used on a variable with a non-boolean
    /// domain
    NonBooleanAggregator(String),

    /// Several templates apply to the variable and at least one of them declares an aggregator
    AmbiguousComposition(String),

    /// The same ground parent was connected twice to one node. Holds the node and the parent.
    DuplicateParent(String, String),

    /// A table does not match the domain product of the node it was built for
    TableSizeMismatch(String),

    /// The normalization constant of a combined column was zero
    DegenerateNormalization(String),

    /// A parent could not be instantiated because it is an evidence-only variable without a
    /// template. Holds the child and the parent.
    UnresolvedParent(String, String),

    /// The variable was reached again while its own parents were being resolved
    CyclicDependency(String),

    /// A template parameter could not be bound while grounding. Holds the template label and
    /// the parameter.
    UnboundParameter(String, String),

    /// A value is not part of the given domain. Holds the value and the domain name.
    UnknownValue(String, String),

    /// Represents an error where there was a parent node expected, but not found
    MissingParent(String),

    /// Represents a node that was present multiple times in a situation where it should only
    /// have been present once
    DuplicateVariable(String),

    /// Represents an attempt to initialize a table with an incompatible `Initialization`
    InvalidInitialization,

    /// Represents a situation in which there was a non-positive probability provided
    NonPositiveProbability,

    /// An address does not lie within the bounds of a table
    InvalidAddress(Vec<usize>),

    /// The grounding configuration could not be read
    InvalidConfig(String),

    /// A general error with the given description
    General(String)

}

impl Error for RelbnError {}

impl fmt::Display for RelbnError {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RelbnError::MissingSignature(ref name) => {
                write!(f, "No signature was registered for '{}'", name)
            },
            RelbnError::SignatureArityMismatch(ref node, sig, actual) => {
                write!(
                    f,
                    "Signature of '{}' does not match node definition: it contains {} elements vs. {} in the node",
                    node, sig, actual
                )
            },
            RelbnError::TypeConflict(ref param, ref a, ref b) => {
                write!(f, "Type mismatch: '{}' has types '{}' and '{}'", param, a, b)
            },
            RelbnError::UntypedConstant(ref name) => {
                write!(f, "Constant '{}' is not referenced and therefore not typed", name)
            },
            RelbnError::NoTemplateFound(ref var) => {
                write!(f, "No template was found that could serve to instantiate {}", var)
            },
            RelbnError::MissingCombiningRule(ref var) => {
                write!(f, "More than one group of parents for {} but no combining rule was specified", var)
            },
            RelbnError::NonBooleanAggregator(ref var) => {
                write!(f, "Cannot use a boolean combination function on non-boolean variable {}", var)
            },
            RelbnError::AmbiguousComposition(ref var) => {
                write!(f, "Several templates apply to {} and at least one declares an aggregator", var)
            },
            RelbnError::DuplicateParent(ref var, ref parent) => {
                write!(f, "Cannot instantiate {}: duplicate parent {}", var, parent)
            },
            RelbnError::TableSizeMismatch(ref msg) => write!(f, "Table size mismatch: {}", msg),
            RelbnError::DegenerateNormalization(ref var) => {
                write!(f, "Normalization constant is zero while combining the table of {}", var)
            },
            RelbnError::UnresolvedParent(ref var, ref parent) => {
                write!(f, "Parent {} of {} has no template and was not instantiated", parent, var)
            },
            RelbnError::CyclicDependency(ref var) => {
                write!(f, "{} depends on itself", var)
            },
            RelbnError::UnboundParameter(ref node, ref param) => {
                write!(f, "Parameter '{}' of '{}' could not be bound", param, node)
            },
            RelbnError::UnknownValue(ref value, ref domain) => {
                write!(f, "'{}' is not a value of domain '{}'", value, domain)
            },
            RelbnError::MissingParent(ref name) => write!(f, "Missing parent '{}' from the model", name),
            RelbnError::DuplicateVariable(ref name) => write!(f, "'{}' was encountered twice", name),
            RelbnError::InvalidInitialization => write!(f, "An invalid initialization was provided"),
            RelbnError::NonPositiveProbability => write!(f, "Encountered a non-positive probability"),
            RelbnError::InvalidAddress(ref addr) => write!(f, "Address {:?} lies outside of the table", addr),
            RelbnError::InvalidConfig(ref msg) => write!(f, "Invalid configuration: {}", msg),
            RelbnError::General(ref err) => write!(f, "{}", err),
        }
    }

}
