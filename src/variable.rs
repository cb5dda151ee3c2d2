//! Definition of the variable module
//!
//! A `Domain` is the finite set of values a discrete random variable can take. Values are
//! referenced by their index; tables are addressed by one index per variable, and
//! `Addresses` enumerates all such addresses in lexicographic order.

use util::{Result, RelbnError};

use std::fmt;


/// The name of the boolean domain as used in signatures
pub const BOOLEAN: &str = "Boolean";


/// A finite, ordered set of named values
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Domain {
    /// The name of the `Domain`
    name: String,

    /// The values, in index order
    values: Vec<String>
}

impl Domain {

    /// Construct a new `Domain` with the given name and values
    pub fn new(name: &str, values: &[&str]) -> Domain {
        Domain {
            name: String::from(name),
            values: values.iter().map(|s| String::from(*s)).collect()
        }
    }

    /// The boolean domain. Index 0 is `True`, index 1 is `False`.
    pub fn boolean() -> Domain {
        Domain::new(BOOLEAN, &["True", "False"])
    }

    /// Get the name of the `Domain`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of values in the `Domain`
    pub fn order(&self) -> usize {
        self.values.len()
    }

    /// Get the values in index order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Get the value with the given index
    pub fn value(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).map(|s| s.as_str())
    }

    /// Look up the index of a value
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Look up the index of a value, failing with `RelbnError::UnknownValue`
    pub fn require_index(&self, value: &str) -> Result<usize> {
        self.index_of(value)
            .ok_or_else(|| RelbnError::UnknownValue(String::from(value), self.name.clone()))
    }

    /// Check if this is a boolean domain, i.e. one or two values, one of which is `true`
    /// (compared case-insensitively). A single-valued `false` domain is boolean as well.
    pub fn is_boolean(&self) -> bool {
        match self.values.len() {
            1 => {
                self.values[0].eq_ignore_ascii_case("true") || self.values[0].eq_ignore_ascii_case("false")
            },
            2 => self.values.iter().any(|v| v.eq_ignore_ascii_case("true")),
            _ => false
        }
    }

    /// The index of the `true` value of a boolean domain
    pub fn true_index(&self) -> Option<usize> {
        self.values.iter().position(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Check if `value` is the `true` value of this domain
    pub fn is_true(&self, value: &str) -> bool {
        value.eq_ignore_ascii_case("true") && self.index_of(value).is_some()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = {{{}}}", self.name, self.values.join(", "))
    }
}


/// Formats the canonical name of a variable, e.g. `friendOf(a,b)`.
pub fn format_var_name(function: &str, args: &[String]) -> String {
    format!("{}({})", function, args.join(","))
}


/// An iterator over every address of a table with the given per-coordinate sizes.
///
/// This is a mixed-radix counter: the last coordinate varies fastest, so the addresses come out
/// in lexicographic order, which is also the row-major order of the table values. A table
/// without coordinates has exactly one (empty) address; a coordinate of size zero yields no
/// addresses at all.
#[derive(Clone, Debug)]
pub struct Addresses {
    radices: Vec<usize>,
    next: Option<Vec<usize>>
}

impl Addresses {

    pub fn new(radices: &[usize]) -> Self {
        let next = if radices.iter().any(|&r| r == 0) {
            None
        } else {
            Some(vec![0; radices.len()])
        };

        Addresses { radices: radices.to_vec(), next }
    }

    /// The number of addresses the counter produces in total
    pub fn count_all(&self) -> usize {
        self.radices.iter().product()
    }
}

impl Iterator for Addresses {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;

        let mut succ = current.clone();
        let mut i = succ.len();
        loop {
            if i == 0 {
                // wrapped around; the counter is exhausted
                break;
            }
            i -= 1;
            succ[i] += 1;
            if succ[i] < self.radices[i] {
                self.next = Some(succ);
                break;
            }
            succ[i] = 0;
        }

        Some(current)
    }
}
