//! Module containing initialization routines for the tables of template nodes.

use factor::{normalize, Cpf, Table};
use util::{RelbnError, Result};

use ndarray::prelude as nd;
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::SeedableRng;

use std::sync::Arc;

/// Defines possible ways to initialize the table of a template node.
pub enum Initialization<'a> {
    /// A uniform distribution over the node's values for every parent configuration
    Uniform,

    /// Randomly initialize the weights of the table. The seed makes the table reproducible.
    Random(u64),

    /// Initialize the table as a Binomial distribution with parameter ```p``` for the first
    /// value (`True` for boolean nodes).
    /// Note that this `Initialization` is valid only for a node with no parents.
    Binomial(f64),

    /// Initialize the table as a Multinomial distribution with parameters ```p_0, p_1...```.
    /// Note that this `Initialization` is valid only for a node with no parents.
    Multinomial(&'a [f64]),

    /// User defined table over ```[node, parent_1, ..., parent_k]```
    Table(Table)
}


impl<'a> Initialization<'a> {

    /// Construct the table of a template node, initialized based on ```self```
    ///
    /// # Args
    /// * `shape`: the domain product sizes; `shape[0]` is the size of the node's own domain,
    ///   followed by the sizes of its parents' domains
    /// * `cpd`: `true`, if the table must be a conditional distribution over `shape[0]`. Tables
    ///   of guards and constants carry no probabilities and are not checked.
    ///
    /// # Returns
    /// a `Cpf`, initialized according to ```self```
    pub fn build_cpt(self, shape: &[usize], cpd: bool) -> Result<Cpf> {
        if shape.is_empty() || shape.iter().any(|&d| d == 0) {
            return Err(RelbnError::InvalidInitialization);
        }

        ///////////////////////////////////////////////////////////////////////////////
        // if this is a user defined table, it just needs to be verified and returned
        if let Initialization::Table(tbl) = self {
            let cpf = Cpf::build(shape, Arc::new(tbl))?;
            if cpd && cpf.values().iter().any(|&v| v < 0.0) {
                return Err(RelbnError::NonPositiveProbability);
            }
            if cpd && ! cpf.is_normalized(0.001) {
                return Err(RelbnError::General(
                    String::from("Invalid arguments. Requested a CPD, but the values do not represent a CPD")
                ));
            }
            return Ok(cpf);
        }

        ///////////////////////////////////////////////////////////////////////////////
        // Check for errors
        match self {
            // A binomial/multinomial on a node with parents
            Initialization::Binomial(_) | Initialization::Multinomial(_) if shape.len() > 1 => {
                return Err(RelbnError::InvalidInitialization);
            },

            // A binomial distribution on a non-binary node
            Initialization::Binomial(p) if shape[0] != 2 || p < 0.0 || p > 1.0 => {
                return Err(RelbnError::InvalidInitialization);
            },

            // A multinomial distribution with an incorrect number of parameters
            Initialization::Multinomial(ps) if ps.len() != shape[0] => {
                return Err(RelbnError::InvalidInitialization);
            },

            _ => ()
        }

        ///////////////////////////////////////////////////////////////////////////////
        // now, build the table
        let tbl = match self {
            Initialization::Uniform => {
                // normalizing constant is just the number of values of the node
                let val = 1. / (shape[0] as f64);
                Table::from_elem(nd::IxDyn(shape), val)
            },
            Initialization::Random(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                let tbl = Table::random_using(nd::IxDyn(shape), Uniform::new(1.0, 100.0), &mut rng);
                normalize(tbl)?
            },
            Initialization::Binomial(p) => {
                array![p, 1.0 - p].into_dyn()
            },
            Initialization::Multinomial(ps) => {
                if ps.iter().any(|&p| p < 0.0) {
                    return Err(RelbnError::NonPositiveProbability);
                }
                nd::Array::from_iter(ps.iter().cloned()).into_dyn()
            },
            Initialization::Table(_) => unreachable!()
        };

        let cpf = Cpf::build(shape, Arc::new(tbl))?;
        if cpd && ! cpf.is_normalized(0.001) {
            return Err(RelbnError::InvalidInitialization);
        }

        Ok(cpf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_shape() {
        assert!(Initialization::Uniform.build_cpt(&[], true).is_err());
        assert!(Initialization::Random(7).build_cpt(&[2, 0], true).is_err());
    }

    #[test]
    fn invalid_table_shape() {
        let tbl = array![[0.1, 0.2], [0.9, 0.8]].into_dyn();
        match Initialization::Table(tbl).build_cpt(&[2, 3], true) {
            Err(RelbnError::TableSizeMismatch(_)) => assert!(true),
            _ => panic!("wrong result")
        };
    }

    #[test]
    fn invalid_table_values() {
        let tbl = array![[0.1, 0.2], [0.3, 0.8]].into_dyn();
        assert!(Initialization::Table(tbl.clone()).build_cpt(&[2, 2], true).is_err());

        // guards and constants do not need normalized tables
        assert!(Initialization::Table(tbl).build_cpt(&[2, 2], false).is_ok());
    }

    #[test]
    fn random_init() {
        let cpt = Initialization::Random(42).build_cpt(&[3, 2, 4], true).unwrap();
        assert_eq!(&[3, 2, 4], cpt.shape());
        assert!(cpt.is_normalized(1e-9));

        // the same seed gives the same table
        let again = Initialization::Random(42).build_cpt(&[3, 2, 4], true).unwrap();
        for addr in cpt.addresses() {
            assert_eq!(cpt.value(&addr).unwrap(), again.value(&addr).unwrap());
        }
    }

    #[test]
    fn uniform_init() {
        let cpt = Initialization::Uniform.build_cpt(&[4, 2], true).unwrap();
        for addr in cpt.addresses() {
            assert!((0.25 - cpt.value(&addr).unwrap()).abs() < std::f64::EPSILON);
        }
    }

    #[test]
    fn binomial_init() {
        let cpt = Initialization::Binomial(0.25).build_cpt(&[2], true).unwrap();
        assert!((0.25 - cpt.value(&[0]).unwrap()).abs() < std::f64::EPSILON);
        assert!((0.75 - cpt.value(&[1]).unwrap()).abs() < std::f64::EPSILON);

        assert!(Initialization::Binomial(0.25).build_cpt(&[3], true).is_err());
        assert!(Initialization::Binomial(0.25).build_cpt(&[2, 2], true).is_err());
    }

    #[test]
    fn multinomial_init() {
        let cpt = Initialization::Multinomial(&[ 0.1, 0.7, 0.2 ]).build_cpt(&[3], true).unwrap();
        assert!((0.7 - cpt.value(&[1]).unwrap()).abs() < std::f64::EPSILON);

        assert!(Initialization::Multinomial(&[ 0.5, 0.5 ]).build_cpt(&[3], true).is_err());
        assert!(Initialization::Multinomial(&[ 0.5, 0.5, 0.5 ]).build_cpt(&[3], true).is_err());
    }
}
