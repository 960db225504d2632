//! Small dense linear-algebra helpers over faer.
//!
//! The design matrices here are a handful of columns wide, so
//! everything routes through Cholesky (LDLT fallback) and the
//! self-adjoint eigendecomposition. Failures surface as `None`; the
//! engines translate that into their null-model outcome.

use faer::linalg::solvers::{Ldlt, Llt, Solve};
use faer::{Mat, Side};
use ndarray::Array2;

fn to_faer(a: &Array2<f64>) -> Mat<f64> {
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn from_faer(m: &Mat<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Solve `a x = b` for symmetric positive (semi-)definite `a`.
pub fn solve_spd(a: &Array2<f64>, b: &Array2<f64>) -> Option<Array2<f64>> {
    if a.nrows() != a.ncols() || a.nrows() != b.nrows() {
        return None;
    }
    if a.iter().any(|v| !v.is_finite()) || b.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let a_f = to_faer(a);
    let b_f = to_faer(b);
    let solution = if let Ok(f) = Llt::new(a_f.as_ref(), Side::Lower) {
        f.solve(b_f.as_ref())
    } else if let Ok(f) = Ldlt::new(a_f.as_ref(), Side::Lower) {
        f.solve(b_f.as_ref())
    } else {
        return None;
    };
    let out = from_faer(&solution);
    if out.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(out)
}

/// Inverse of a symmetric positive (semi-)definite matrix.
pub fn inverse_spd(a: &Array2<f64>) -> Option<Array2<f64>> {
    let eye = Array2::eye(a.nrows());
    solve_spd(a, &eye)
}

/// Eigendecomposition of a symmetric matrix, eigenvalues descending.
///
/// Returns (eigenvalues, column eigenvectors).
pub fn sym_eigen(a: &Array2<f64>) -> Option<(Vec<f64>, Array2<f64>)> {
    if a.nrows() != a.ncols() || a.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let a_f = to_faer(a);
    let eig = a_f.as_ref().self_adjoint_eigen(Side::Lower).ok()?;
    let diag = eig.S();
    let vectors = eig.U();
    let p = diag.dim();
    let mut order: Vec<usize> = (0..p).collect();
    order.sort_by(|&x, &y| {
        diag[y]
            .partial_cmp(&diag[x])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let values: Vec<f64> = order.iter().map(|&idx| diag[idx]).collect();
    let mut sorted_vectors = Array2::zeros((p, p));
    for (col, &idx) in order.iter().enumerate() {
        for row in 0..p {
            sorted_vectors[[row, col]] = vectors[(row, idx)];
        }
    }
    Some((values, sorted_vectors))
}

/// Moore-Penrose pseudo-inverse of a symmetric matrix via its
/// eigendecomposition, dropping near-zero eigenvalues.
pub fn pinv_sym(a: &Array2<f64>) -> Option<Array2<f64>> {
    let (values, vectors) = sym_eigen(a)?;
    let scale = values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    let tol = (scale * 1e-12).max(1e-300);
    let p = values.len();
    let mut out = Array2::zeros((p, p));
    for (k, &lambda) in values.iter().enumerate() {
        if lambda.abs() <= tol {
            continue;
        }
        let inv = 1.0 / lambda;
        for i in 0..p {
            for j in 0..p {
                out[[i, j]] += inv * vectors[[i, k]] * vectors[[j, k]];
            }
        }
    }
    Some(out)
}
