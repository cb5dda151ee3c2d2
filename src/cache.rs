//! The structural table cache of a grounding session.
//!
//! Ground nodes that are instantiated from the same structure (a template with the same fixed
//! coordinates, or an aggregator over the same number of groundings) have identical tables. The
//! cache hands out the very same values for all of them.

use combine::Aggregator;
use factor::Table;
use model::template::TemplateId;
use util::Result;

use itertools::Itertools;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;


/// The structure a ground table was derived from
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The unmodified table of a template
    Template(TemplateId),

    /// The table of a template with some coordinates fixed, as `(coordinate, index)` pairs in
    /// ascending coordinate order
    Projection { template: TemplateId, fixed: Vec<(usize, usize)> },

    /// The table of an aggregator over the given number of groundings
    Aggregate { aggregator: Aggregator, groundings: usize, group_size: Option<usize> }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CacheKey::Template(id) => write!(f, "{}", id),
            CacheKey::Projection { template, ref fixed } => {
                let settings = fixed.iter().map(|&(c, i)| format!("{}={}", c, i)).join(", ");
                write!(f, "{}{{{}}}", template, settings)
            },
            CacheKey::Aggregate { aggregator, groundings, group_size } => {
                write!(f, "{}-{}", aggregator.syntax(), groundings)?;
                if let Some(g) = group_size {
                    write!(f, "-{}", g)?;
                }
                Ok(())
            }
        }
    }
}


/// Maps structural keys to shared table values
#[derive(Debug)]
pub struct TableCache {
    enabled: bool,
    tables: HashMap<CacheKey, Arc<Table>>,
    hits: usize,
    misses: usize
}

impl TableCache {

    /// Construct an empty cache. A disabled cache computes every table anew.
    pub fn new(enabled: bool) -> Self {
        TableCache { enabled, tables: HashMap::new(), hits: 0, misses: 0 }
    }

    /// Get the values stored for `key`, or compute and store them.
    ///
    /// # Errors
    /// whatever error `compute` returns; nothing is stored in that case
    pub fn get_or_try_insert_with<F>(&mut self, key: &CacheKey, compute: F) -> Result<Arc<Table>>
        where F: FnOnce() -> Result<Table>
    {
        if self.enabled {
            if let Some(values) = self.tables.get(key) {
                self.hits += 1;
                trace!(key = %key, "table cache hit");
                return Ok(values.clone());
            }
        }

        self.misses += 1;
        let values = Arc::new(compute()?);
        if self.enabled {
            self.tables.insert(key.clone(), values.clone());
        }

        Ok(values)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    /// The number of stored tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
