// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Scraped Particle Records
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-assembly time series of scraped charge and energy.

use mwx_types::error::MwxResult;
use ndarray::Array1;
use serde_json::{Map, Value};

use crate::parallel::Communicator;

/// Column names, in storage order.
pub const SCRAPED_FIELDS: [&str; 7] = ["t", "step", "species_id", "V_e", "n", "q", "E_total"];

/// First column that holds a per-process partial (summed on read).
const FIRST_SUMMED: usize = 4;

pub type ScrapedRow = [f64; 7];

/// Append-only table with one row per (step, species).
#[derive(Debug, Clone, Default)]
pub struct ScrapedRecords {
    rows: Vec<ScrapedRow>,
}

impl ScrapedRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, row: ScrapedRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Local (unreduced) rows.
    pub fn rows(&self) -> &[ScrapedRow] {
        &self.rows
    }

    /// Copy out all rows with `n`, `q` and `E_total` summed across ranks.
    /// Every rank must call this collectively.
    pub fn collect(&mut self, comm: &dyn Communicator, clear: bool) -> MwxResult<FieldTable> {
        let n_rows = self.rows.len();
        let n_summed = SCRAPED_FIELDS.len() - FIRST_SUMMED;
        let mut partial: Vec<f64> = self
            .rows
            .iter()
            .flat_map(|r| r[FIRST_SUMMED..].iter().copied())
            .collect();
        comm.all_reduce_sum(&mut partial)?;

        let columns = SCRAPED_FIELDS
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let values = if col < FIRST_SUMMED {
                    Array1::from_shape_fn(n_rows, |r| self.rows[r][col])
                } else {
                    Array1::from_shape_fn(n_rows, |r| partial[r * n_summed + col - FIRST_SUMMED])
                };
                (name.to_string(), values)
            })
            .collect();

        if clear {
            self.rows.clear();
        }
        Ok(FieldTable { columns })
    }
}

/// Ordered name -> column mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTable {
    columns: Vec<(String, Array1<f64>)>,
}

impl FieldTable {
    pub fn get(&self, name: &str) -> Option<&Array1<f64>> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|(_, c)| c.len()).unwrap_or(0)
    }

    /// Column sum, or 0 for an unknown column.
    pub fn total(&self, name: &str) -> f64 {
        self.get(name).map(|c| c.sum()).unwrap_or(0.0)
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, col) in &self.columns {
            map.insert(name.clone(), Value::from(col.to_vec()));
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::SingleProcess;

    #[test]
    fn test_collect_preserves_order_and_values() {
        let mut rec = ScrapedRecords::new();
        rec.append([0.0, 1.0, 0.0, 2.1, 3.0, 4.8e-19, -1.0]);
        rec.append([1e-12, 2.0, 0.0, 2.1, 0.0, 0.0, 0.0]);
        let table = rec.collect(&SingleProcess, false).unwrap();
        let names: Vec<&str> = table.names().collect();
        assert_eq!(names, SCRAPED_FIELDS.to_vec());
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.get("n").unwrap()[0], 3.0);
        assert_eq!(table.get("step").unwrap()[1], 2.0);
        assert_eq!(rec.len(), 2);
    }

    #[test]
    fn test_clear_keeps_field_names() {
        let mut rec = ScrapedRecords::new();
        rec.append([0.0; 7]);
        let _ = rec.collect(&SingleProcess, true).unwrap();
        assert!(rec.is_empty());
        let empty = rec.collect(&SingleProcess, false).unwrap();
        assert_eq!(empty.n_rows(), 0);
        assert_eq!(empty.names().count(), 7);
    }

    #[test]
    fn test_json_export() {
        let mut rec = ScrapedRecords::new();
        rec.append([0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let json = rec.collect(&SingleProcess, false).unwrap().to_json();
        assert_eq!(json["n"][0], 2.0);
    }
}
