// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Sparse LU
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Sparse direct factorization backed by `faer`.
//!
//! Matrices are assembled as (row, col, value) triplets, factored once and
//! then reused for any number of right-hand sides.

use faer::prelude::*;
use faer::sparse::linalg::solvers::Lu;
use faer::sparse::SparseColMat;
use faer::Mat;

use mwx_types::error::{MwxError, MwxResult};

/// Triplet accumulator for a square sparse matrix.
#[derive(Debug, Clone)]
pub struct TripletBuilder {
    n: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl TripletBuilder {
    pub fn new(n: usize) -> Self {
        TripletBuilder {
            n,
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(n: usize, nnz: usize) -> Self {
        TripletBuilder {
            n,
            entries: Vec::with_capacity(nnz),
        }
    }

    pub fn push(&mut self, row: usize, col: usize, value: f64) {
        self.entries.push((row, col, value));
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(usize, usize, f64)] {
        &self.entries
    }

    /// Dense matrix-vector product, for residual checks.
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        let mut y = vec![0.0; self.n];
        for &(i, j, v) in &self.entries {
            y[i] += v * x[j];
        }
        y
    }

    pub fn factor(&self) -> MwxResult<SparseLu> {
        SparseLu::factor(self.n, &self.entries)
    }
}

/// LU factorization of a square sparse matrix.
pub struct SparseLu {
    n: usize,
    lu: Lu<usize, f64>,
}

impl std::fmt::Debug for SparseLu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseLu").field("n", &self.n).finish()
    }
}

impl SparseLu {
    /// Factor the `n x n` matrix given by `triplets`. Duplicate entries are
    /// summed.
    pub fn factor(n: usize, triplets: &[(usize, usize, f64)]) -> MwxResult<Self> {
        if n == 0 {
            return Err(MwxError::LinAlg("Cannot factor an empty matrix".to_string()));
        }
        if let Some(&(i, j, _)) = triplets.iter().find(|&&(i, j, _)| i >= n || j >= n) {
            return Err(MwxError::LinAlg(format!(
                "Triplet ({i}, {j}) out of bounds for {n}x{n} matrix"
            )));
        }
        let a = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, triplets)
            .map_err(|e| MwxError::LinAlg(format!("Sparse assembly failed: {e:?}")))?;
        let lu = a
            .as_ref()
            .sp_lu()
            .map_err(|e| MwxError::LinAlg(format!("Sparse LU failed: {e:?}")))?;
        Ok(SparseLu { n, lu })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn solve(&self, b: &[f64]) -> MwxResult<Vec<f64>> {
        if b.len() != self.n {
            return Err(MwxError::ShapeMismatch {
                what: "right-hand side".to_string(),
                expected: vec![self.n],
                got: vec![b.len()],
            });
        }
        let rhs = Mat::<f64>::from_fn(self.n, 1, |i, _| b[i]);
        let x = self.lu.solve(&rhs);
        let out: Vec<f64> = (0..self.n).map(|i| x[(i, 0)]).collect();
        if out.iter().any(|v| !v.is_finite()) {
            return Err(MwxError::LinAlg(
                "Sparse LU produced a non-finite solution (singular matrix?)".to_string(),
            ));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_solve() {
        let mut b = TripletBuilder::new(4);
        for i in 0..4 {
            b.push(i, i, 1.0);
        }
        let lu = b.factor().unwrap();
        let x = lu.solve(&[1.0, -2.0, 3.0, 0.5]).unwrap();
        assert_eq!(x, vec![1.0, -2.0, 3.0, 0.5]);
    }

    #[test]
    fn test_tridiagonal_residual() {
        // 1D Dirichlet Laplacian, n = 20
        let n = 20;
        let mut a = TripletBuilder::new(n);
        for i in 0..n {
            a.push(i, i, -2.0);
            if i > 0 {
                a.push(i, i - 1, 1.0);
            }
            if i + 1 < n {
                a.push(i, i + 1, 1.0);
            }
        }
        let rhs: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).sin()).collect();
        let x = a.factor().unwrap().solve(&rhs).unwrap();
        let r = a.apply(&x);
        for i in 0..n {
            assert!((r[i] - rhs[i]).abs() < 1e-10, "residual at {i}");
        }
    }

    #[test]
    fn test_nonsymmetric_pattern() {
        // [[2, 1, 0], [0, 3, 0], [1, 0, 4]]
        let lu = SparseLu::factor(
            3,
            &[(0, 0, 2.0), (0, 1, 1.0), (1, 1, 3.0), (2, 0, 1.0), (2, 2, 4.0)],
        )
        .unwrap();
        let x = lu.solve(&[4.0, 6.0, 9.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
        assert!((x[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_bad_inputs() {
        assert!(SparseLu::factor(0, &[]).is_err());
        assert!(SparseLu::factor(2, &[(0, 2, 1.0)]).is_err());
        let lu = SparseLu::factor(2, &[(0, 0, 1.0), (1, 1, 1.0)]).unwrap();
        assert!(matches!(
            lu.solve(&[1.0]),
            Err(MwxError::ShapeMismatch { .. })
        ));
    }
}
