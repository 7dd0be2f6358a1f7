//! Row selection and elementwise maps on `faer` columns.

use faer::Mat;

/// Rows `indices` of `matrix`, in the given order.
#[must_use]
pub fn select_rows(matrix: &Mat<f64>, indices: &[usize]) -> Mat<f64> {
    Mat::from_fn(indices.len(), matrix.ncols(), |i, j| {
        matrix[(indices[i], j)]
    })
}

#[must_use]
pub fn select_values(column: &Mat<f64>, indices: &[usize]) -> Mat<f64> {
    select_rows(column, indices)
}

#[must_use]
pub fn map_mat(values: &Mat<f64>, f: impl Fn(f64) -> f64) -> Mat<f64> {
    Mat::from_fn(values.nrows(), values.ncols(), |i, j| f(values[(i, j)]))
}

/// First column as a `Vec`, for keyed prediction containers.
#[must_use]
pub fn column_to_vec(column: &Mat<f64>) -> Vec<f64> {
    (0..column.nrows()).map(|i| column[(i, 0)]).collect()
}
