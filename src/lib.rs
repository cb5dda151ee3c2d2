extern crate bidir_map;
extern crate indexmap;
#[cfg_attr(test, macro_use)]
extern crate itertools;
#[macro_use]
extern crate ndarray;
extern crate ndarray_rand;
extern crate rand;
#[macro_use]
extern crate serde;
extern crate toml;
#[macro_use]
extern crate tracing;

#[cfg(test)]
#[macro_use]
extern crate proptest;

pub mod util;
pub mod variable;
pub mod factor;
pub mod init;
pub mod signature;
pub mod database;
pub mod model;
pub mod grounder;
pub mod combine;
pub mod cache;
pub mod config;
pub mod engine;

pub use util::{Result, RelbnError};
pub use variable::{Domain, BOOLEAN};
pub use factor::{Cpf, Table};
pub use init::Initialization;
pub use signature::{Signature, SignatureRegistry};
pub use database::{Database, MemoryDatabase};
pub use model::Network;
pub use model::template::{Guard, NodeDecl, NodeKind, TemplateModel, TemplateModelBuilder, TemplateNode};
pub use model::ground::{GroundKind, GroundNetwork, GroundNode};
pub use combine::{Aggregator, CombiningRule};
pub use config::GroundingConfig;
pub use engine::{GroundingEngine, GroundingHooks, GroundingSession, NoHooks};
