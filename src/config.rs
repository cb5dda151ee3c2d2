//! Configuration of a grounding run.

use combine::CombiningRule;
use util::{RelbnError, Result};

use toml;

use std::collections::HashMap;


/// Options of the `GroundingEngine`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GroundingConfig {
    /// Run the auxiliary constraint hook once all regular nodes are grounded. Default: true.
    pub add_auxiliary_nodes: bool,

    /// Share the tables of structurally identical nodes. Default: true.
    pub use_table_cache: bool,

    /// The combining rule for each function whose variables can have several competing template
    /// instantiations
    pub combining_rules: HashMap<String, CombiningRule>,

    /// Functions treated as evidence-only in addition to those declared by the template model
    pub evidence_functions: Vec<String>
}

impl Default for GroundingConfig {
    fn default() -> Self {
        GroundingConfig {
            add_auxiliary_nodes: true,
            use_table_cache: true,
            combining_rules: HashMap::new(),
            evidence_functions: Vec::new()
        }
    }
}

impl GroundingConfig {

    /// Read the configuration from TOML. Missing keys take their default values.
    ///
    /// # Errors
    /// * `RelbnError::InvalidConfig` if the text is not valid TOML or holds values of the wrong
    ///   type
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RelbnError::InvalidConfig(e.to_string()))
    }

    pub fn with_combining_rule(mut self, function: &str, rule: CombiningRule) -> Self {
        self.combining_rules.insert(String::from(function), rule);
        self
    }
}
