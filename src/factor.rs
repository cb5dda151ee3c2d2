//! Definition of the factor module
//!
//! A `Cpf` is the conditional probability function of a discrete node, stored as a table over
//! the node's domain product: coordinate 0 is the node itself, followed by its parents in
//! column order.

use util::{Result, RelbnError};
use variable::Addresses;

use ndarray::prelude as nd;

use std::sync::Arc;

/// Alias f64 ndarray::Array as Table
pub type Table = nd::ArrayD<f64>;


/// A table over the domain product of a node.
///
/// The values are shared: cloning a `Cpf` or building one from cached values does not copy the
/// table. Writing through `put` copies the values first if they are shared with anyone else.
#[derive(Clone, Debug)]
pub struct Cpf {
    /// The values of the table, shaped by the domain product
    table: Arc<Table>
}


impl Cpf {

    /// Build a `Cpf` with the given domain product sizes from (possibly shared) values.
    ///
    /// # Errors
    /// * `RelbnError::TableSizeMismatch` if the shape of `values` is not `shape`
    pub fn build(shape: &[usize], values: Arc<Table>) -> Result<Self> {
        if values.shape() != shape {
            return Err(RelbnError::TableSizeMismatch(
                format!("table has shape {:?}, domain product requires {:?}", values.shape(), shape)
            ));
        }

        Ok(Cpf { table: values })
    }


    /// Build a `Cpf` from row-major values.
    ///
    /// # Errors
    /// * `RelbnError::TableSizeMismatch` if the number of values does not fit `shape`
    pub fn from_vec(shape: &[usize], values: Vec<f64>) -> Result<Self> {
        let count = values.len();
        let table = Table::from_shape_vec(nd::IxDyn(shape), values).map_err(|_| {
            RelbnError::TableSizeMismatch(
                format!("{} values given for domain product {:?}", count, shape)
            )
        })?;

        Ok(Cpf { table: Arc::new(table) })
    }


    /// Build a zero-initialized `Cpf`
    pub fn zeros(shape: &[usize]) -> Self {
        Cpf { table: Arc::new(Table::zeros(nd::IxDyn(shape))) }
    }


    /// The sizes of the domain product
    pub fn shape(&self) -> &[usize] {
        self.table.shape()
    }


    /// The number of coordinates, i.e. the node plus its parents
    pub fn ndim(&self) -> usize {
        self.table.ndim()
    }


    /// The number of entries in the table
    pub fn len(&self) -> usize {
        self.table.len()
    }


    /// The shared table values
    pub fn values(&self) -> &Arc<Table> {
        &self.table
    }


    /// Check if two `Cpf`s share the very same values
    pub fn shares_values(&self, other: &Cpf) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }


    /// Iterate over every address of the table in row-major order
    pub fn addresses(&self) -> Addresses {
        Addresses::new(self.shape())
    }


    /// Retrieve the value at the given address.
    ///
    /// # Errors
    /// * `RelbnError::InvalidAddress` if the address is outside of the table
    pub fn value(&self, addr: &[usize]) -> Result<f64> {
        if addr.len() != self.ndim() {
            return Err(RelbnError::InvalidAddress(addr.to_vec()));
        }

        self.table.get(nd::IxDyn(addr))
                  .cloned()
                  .ok_or_else(|| RelbnError::InvalidAddress(addr.to_vec()))
    }


    /// Write the value at the given address.
    ///
    /// # Errors
    /// * `RelbnError::InvalidAddress` if the address is outside of the table
    pub fn put(&mut self, addr: &[usize], value: f64) -> Result<()> {
        if addr.len() != self.ndim() {
            return Err(RelbnError::InvalidAddress(addr.to_vec()));
        }

        match Arc::make_mut(&mut self.table).get_mut(nd::IxDyn(addr)) {
            Some(v) => {
                *v = value;
                Ok(())
            },
            None => Err(RelbnError::InvalidAddress(addr.to_vec()))
        }
    }


    /// Project the table onto the coordinates that are not fixed.
    ///
    /// Every coordinate with `Some(idx)` in `fixed` is sliced at `idx`; the remaining coordinates
    /// are enumerated over their full range. The result has one axis per non-fixed coordinate,
    /// in the original column order, and holds exactly the product of their sizes.
    ///
    /// # Errors
    /// * `RelbnError::InvalidAddress` if `fixed` does not have one entry per coordinate, or a
    ///   fixed index lies outside its coordinate
    pub fn project(&self, fixed: &[Option<usize>]) -> Result<Table> {
        let shape = self.shape();
        if fixed.len() != shape.len() {
            return Err(RelbnError::InvalidAddress(fixed.iter().map(|f| f.unwrap_or(0)).collect()));
        }

        let mut free_axes = Vec::new();
        let mut addr = vec![0; shape.len()];
        for (i, setting) in fixed.iter().enumerate() {
            match *setting {
                Some(idx) if idx >= shape[i] => {
                    return Err(RelbnError::InvalidAddress(fixed.iter().map(|f| f.unwrap_or(0)).collect()));
                },
                Some(idx) => addr[i] = idx,
                None => free_axes.push(i)
            }
        }

        let new_shape: Vec<usize> = free_axes.iter().map(|&i| shape[i]).collect();
        let addresses = Addresses::new(&new_shape);
        let mut values = Vec::with_capacity(addresses.count_all());
        for sub in addresses {
            for (&axis, &idx) in free_axes.iter().zip(sub.iter()) {
                addr[axis] = idx;
            }
            values.push(self.table[nd::IxDyn(&addr)]);
        }

        Table::from_shape_vec(nd::IxDyn(&new_shape), values)
            .map_err(|e| RelbnError::General(format!("projection produced a malformed table: {}", e)))
    }


    /// Check if the table is a conditional distribution over coordinate 0, i.e. all values are
    /// non-negative and every column sums to one (within `tolerance`).
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        if self.table.iter().any(|&v| v < 0.0) {
            return false;
        }

        let sums = self.table.sum_axis(nd::Axis(0));
        sums.iter().all(|&s| (s - 1.0).abs() <= tolerance)
    }
}


/// Normalize a table over coordinate 0 so that every column sums to one.
///
/// # Errors
/// * `RelbnError::DegenerateNormalization` if a column sums to zero
pub fn normalize(table: Table) -> Result<Table> {
    let sums = table.sum_axis(nd::Axis(0)).insert_axis(nd::Axis(0));
    if sums.iter().any(|&s| s == 0.0) {
        return Err(RelbnError::DegenerateNormalization(String::from("template table")));
    }

    Ok(table / &sums)
}
