//! Reading variable values at resolved grid cells.

use std::collections::BTreeMap;

use crate::dataset::GridDataset;
use crate::types::{CellIndex, Extracted, NoDataReason};

/// A requested variable and the output column it is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputField {
    pub variable: String,
    pub column: String,
}

/// Read one variable at one cell.
///
/// Absent variables, masked or non-finite values and read errors all become
/// "no data". Finite values pass through unchanged.
pub fn extract_value<D: GridDataset + ?Sized>(
    dataset: &D,
    cell: &CellIndex,
    variable: &str,
) -> Extracted {
    if !dataset.has_variable(variable) {
        return Extracted::NoData(NoDataReason::VariableAbsent);
    }
    match dataset.read(variable, cell) {
        Ok(Some(v)) if v.is_finite() => Extracted::Value(v),
        Ok(_) | Err(_) => Extracted::NoData(NoDataReason::InvalidReadValue),
    }
}

/// Extracts a product's requested variables from one opened dataset.
///
/// Variable presence is checked once, when the extractor is built for the
/// day's dataset, not per sample.
#[derive(Debug)]
pub struct VariableExtractor<'a> {
    fields: &'a [OutputField],
    present: Vec<bool>,
}

impl<'a> VariableExtractor<'a> {
    pub fn new<D: GridDataset + ?Sized>(fields: &'a [OutputField], dataset: &D) -> Self {
        let present = fields
            .iter()
            .map(|f| dataset.has_variable(&f.variable))
            .collect();
        Self { fields, present }
    }

    /// Requested variables the dataset does not contain.
    pub fn missing(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.fields
            .iter()
            .zip(&self.present)
            .filter(|(_, present)| !**present)
            .map(|(f, _)| f.variable.as_str())
    }

    /// Write every field for one sample.
    ///
    /// `cell` is `None` when the sample was rejected by the tolerance gate.
    pub fn extract_into<D: GridDataset + ?Sized>(
        &self,
        dataset: &D,
        cell: Option<&CellIndex>,
        outputs: &mut BTreeMap<String, Extracted>,
    ) {
        for (field, present) in self.fields.iter().zip(&self.present) {
            let value = match cell {
                None => Extracted::NoData(NoDataReason::OutOfTolerance),
                Some(_) if !present => Extracted::NoData(NoDataReason::VariableAbsent),
                Some(cell) => extract_value(dataset, cell, &field.variable),
            };
            outputs.insert(field.column.clone(), value);
        }
    }
}

/// Fill every field with the same "no data" reason.
pub fn fill_no_data(
    fields: &[OutputField],
    reason: NoDataReason,
    outputs: &mut BTreeMap<String, Extracted>,
) {
    for field in fields {
        outputs.insert(field.column.clone(), Extracted::NoData(reason));
    }
}
