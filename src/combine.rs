//! Combination functions: the `CombiningRule`s that merge the tables of several template
//! instantiations, and the `Aggregator`s that combine the groundings of a single template.

use factor::Table;
use util::{RelbnError, Result};
use variable::{Addresses, Domain};

use ndarray::prelude as nd;

use std::fmt;
use std::str::FromStr;


/// A combining rule merges the values that competing template instantiations assign to one
/// column entry of a ground table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombiningRule {
    NoisyOr,
    NoisyAnd,
    Average,
    Max,
    Min,
    NoisyOrNormalized,
    NoisyAndNormalized
}

impl CombiningRule {

    pub fn name(&self) -> &'static str {
        match *self {
            CombiningRule::NoisyOr => "noisy-or",
            CombiningRule::NoisyAnd => "noisy-and",
            CombiningRule::Average => "average",
            CombiningRule::Max => "max",
            CombiningRule::Min => "min",
            CombiningRule::NoisyOrNormalized => "noisy-or-normalized",
            CombiningRule::NoisyAndNormalized => "noisy-and-normalized"
        }
    }

    /// Check if the rule has boolean semantics: it computes the probability of `True` only and
    /// `False` receives the complement. All other rules score every value and normalize.
    pub fn boolean_semantics(&self) -> bool {
        match *self {
            CombiningRule::NoisyOr | CombiningRule::NoisyAnd => true,
            _ => false
        }
    }

    /// Combine the given values. The combination of no values is zero for all rules but the
    /// noisy-and rules, for which it is one.
    pub fn compute(&self, values: &[f64]) -> f64 {
        match *self {
            CombiningRule::NoisyOr | CombiningRule::NoisyOrNormalized => {
                1.0 - values.iter().fold(1.0, |acc, &v| acc * (1.0 - v))
            },
            CombiningRule::NoisyAnd | CombiningRule::NoisyAndNormalized => {
                values.iter().product()
            },
            CombiningRule::Average => {
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            },
            CombiningRule::Max => values.iter().cloned().fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.max(v)))
            }).unwrap_or(0.0),
            CombiningRule::Min => values.iter().cloned().fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.min(v)))
            }).unwrap_or(0.0)
        }
    }
}

impl fmt::Display for CombiningRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CombiningRule {
    type Err = RelbnError;

    fn from_str(s: &str) -> Result<Self> {
        let rules = [
            CombiningRule::NoisyOr,
            CombiningRule::NoisyAnd,
            CombiningRule::Average,
            CombiningRule::Max,
            CombiningRule::Min,
            CombiningRule::NoisyOrNormalized,
            CombiningRule::NoisyAndNormalized
        ];

        rules.iter()
             .find(|r| r.name().eq_ignore_ascii_case(s))
             .cloned()
             .ok_or_else(|| RelbnError::InvalidConfig(format!("unknown combining rule '{}'", s)))
    }
}


/// The aggregators a template can declare to combine all of its groundings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Aggregator {
    /// The node is the disjunction of conjunctions: one conjunction of the grounded parents per
    /// grounding
    FunctionalOr,

    /// Every grounding yields an auxiliary node carrying the template table; the node is the
    /// disjunction of the auxiliary nodes
    NoisyOr
}

impl Aggregator {

    /// Check if the node is a deterministic function of the grounded parents
    pub fn is_functional(&self) -> bool {
        *self == Aggregator::FunctionalOr
    }

    /// The textual form of the aggregator
    pub fn syntax(&self) -> &'static str {
        match *self {
            Aggregator::FunctionalOr => "=OR",
            Aggregator::NoisyOr => "OR"
        }
    }
}


/// Check if OR-style tables can be built for a node with the given domain: the domain must be
/// boolean with `True` as its first value.
pub fn supports_or(domain: &Domain) -> bool {
    domain.is_boolean() && domain.order() == 2 && domain.true_index() == Some(0)
}


/// Build the deterministic table of a node that is the OR of `inputs` boolean parents.
///
/// The table has shape `[2; inputs + 1]`; index 0 is `True` everywhere.
pub fn or_table(inputs: usize) -> Result<Table> {
    deterministic_table(inputs, |parents| parents.iter().any(|&p| p == 0))
}


/// Build the deterministic table of a node that is true iff at least one group of `group_size`
/// consecutive boolean parents is entirely true. A trailing incomplete group counts as a group;
/// groups of size zero are trivially true.
pub fn grouped_or_table(inputs: usize, group_size: usize) -> Result<Table> {
    if group_size == 0 {
        return deterministic_table(inputs, |_| true);
    }

    deterministic_table(inputs, |parents| {
        parents.chunks(group_size).any(|group| group.iter().all(|&p| p == 0))
    })
}


fn deterministic_table<F>(inputs: usize, is_true: F) -> Result<Table>
    where F: Fn(&[usize]) -> bool
{
    let entries = (0..inputs + 1).try_fold(1usize, |acc, _| acc.checked_mul(2))
                                 .ok_or_else(|| RelbnError::TableSizeMismatch(
                                     format!("an OR over {} inputs exceeds the addressable table size", inputs)
                                 ))?;

    let shape = vec![2; inputs + 1];
    let mut values = Vec::with_capacity(entries);
    for addr in Addresses::new(&shape) {
        let holds = is_true(&addr[1..]);
        let value = if (addr[0] == 0) == holds { 1.0 } else { 0.0 };
        values.push(value);
    }

    Table::from_shape_vec(nd::IxDyn(&shape), values)
        .map_err(|e| RelbnError::General(format!("could not build OR table: {}", e)))
}
