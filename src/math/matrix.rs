use rand::Rng;
use std::f64::consts::PI;

use crate::error::{NnError, Result};

/// Dense 2-D matrix of `f64` stored row-major in a flat buffer.
///
/// The buffer length always equals `rows * cols` and both dimensions are at
/// least 1. Every arithmetic method returns a fresh matrix; operands are
/// never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Matrix {
    /// Builds a matrix from row-major `values`.
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Result<Matrix> {
        check_dims(rows, cols)?;
        if values.len() != rows * cols {
            return Err(NnError::invalid(format!(
                "{rows}x{cols} matrix needs {} values, got {}",
                rows * cols,
                values.len()
            )));
        }
        Ok(Matrix { rows, cols, values })
    }

    pub fn zeros(rows: usize, cols: usize) -> Result<Matrix> {
        Matrix::filled(rows, cols, 0.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Result<Matrix> {
        check_dims(rows, cols)?;
        Ok(Matrix { rows, cols, values: vec![value; rows * cols] })
    }

    /// A 1x1 matrix, broadcastable against any shape.
    pub fn scalar(value: f64) -> Matrix {
        Matrix { rows: 1, cols: 1, values: vec![value] }
    }

    /// A 1xN matrix holding one sample.
    pub fn row_vector(values: Vec<f64>) -> Result<Matrix> {
        let cols = values.len();
        Matrix::new(1, cols, values)
    }

    /// Builds a matrix from nested rows; every row must have the same length.
    pub fn from_rows(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let rows = data.len();
        let cols = data.first().map_or(0, Vec::len);
        check_dims(rows, cols)?;
        if let Some(bad) = data.iter().position(|row| row.len() != cols) {
            return Err(NnError::invalid(format!(
                "row {bad} has {} values, expected {cols}",
                data[bad].len()
            )));
        }
        Ok(Matrix { rows, cols, values: data.into_iter().flatten().collect() })
    }

    /// Values drawn independently and uniformly from [-1, 1).
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Result<Matrix> {
        check_dims(rows, cols)?;
        let values = (0..rows * cols)
            .map(|_| rng.gen::<f64>() * 2.0 - 1.0)
            .collect();
        Ok(Matrix { rows, cols, values })
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // (0, 1] keeps ln() finite.
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn normal<R: Rng + ?Sized>(rows: usize, cols: usize, std_dev: f64, rng: &mut R) -> Result<Matrix> {
        check_dims(rows, cols)?;
        let values = (0..rows * cols)
            .map(|_| Matrix::sample_standard_normal(rng) * std_dev)
            .collect();
        Ok(Matrix { rows, cols, values })
    }

    /// He initialization: samples from N(0, sqrt(2 / fan_in)).
    ///
    /// Recommended before ReLU layers. `fan_in` is the number of input
    /// connections, i.e. `rows` for a weight matrix used as `inputs · W`.
    pub fn he<R: Rng + ?Sized>(rows: usize, cols: usize, fan_in: usize, rng: &mut R) -> Result<Matrix> {
        Matrix::normal(rows, cols, (2.0 / fan_in.max(1) as f64).sqrt(), rng)
    }

    /// Xavier (Glorot) initialization: samples from N(0, sqrt(1 / fan_in)).
    ///
    /// Recommended before Sigmoid/Tanh layers.
    pub fn xavier<R: Rng + ?Sized>(rows: usize, cols: usize, fan_in: usize, rng: &mut R) -> Result<Matrix> {
        Matrix::normal(rows, cols, (1.0 / fan_in.max(1) as f64).sqrt(), rng)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// The row-major value buffer.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        if row >= self.rows || col >= self.cols {
            return Err(NnError::IndexOutOfBounds { row, col, rows: self.rows, cols: self.cols });
        }
        Ok(self.at(row, col))
    }

    /// Unchecked read; callers guarantee the indices are in range.
    #[inline]
    fn at(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    /// A copy of row `row` as a 1xC matrix.
    pub fn row(&self, row: usize) -> Result<Matrix> {
        if row >= self.rows {
            return Err(NnError::IndexOutOfBounds { row, col: 0, rows: self.rows, cols: self.cols });
        }
        let start = row * self.cols;
        Ok(Matrix {
            rows: 1,
            cols: self.cols,
            values: self.values[start..start + self.cols].to_vec(),
        })
    }

    /// Matrix product `self · other`.
    pub fn dot(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(NnError::shape("dot", self.shape(), other.shape()));
        }

        let mut values = Vec::with_capacity(self.rows * other.cols);
        for i in 0..self.rows {
            for j in 0..other.cols {
                let mut sum = 0.0;
                for k in 0..self.cols {
                    sum += self.at(i, k) * other.at(k, j);
                }
                values.push(sum);
            }
        }

        Ok(Matrix { rows: self.rows, cols: other.cols, values })
    }

    pub fn transpose(&self) -> Matrix {
        let mut values = Vec::with_capacity(self.values.len());
        for col in 0..self.cols {
            for row in 0..self.rows {
                values.push(self.at(row, col));
            }
        }
        Matrix { rows: self.cols, cols: self.rows, values }
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            values: self.values.iter().map(|&x| functor(x)).collect(),
        }
    }

    /// Element-wise `x * factor`.
    pub fn scale(&self, factor: f64) -> Matrix {
        self.map(|x| x * factor)
    }

    /// Element-wise binary combination with broadcasting.
    ///
    /// Each dimension pair must be equal or one side must be 1; the result
    /// has shape `(max(R1, R2), max(C1, C2))` and the size-1 side repeats.
    pub fn broadcast<F>(&self, other: &Matrix, op: F) -> Result<Matrix>
    where
        F: Fn(f64, f64) -> f64,
    {
        let compatible = |a: usize, b: usize| a == b || a == 1 || b == 1;
        if !compatible(self.rows, other.rows) || !compatible(self.cols, other.cols) {
            return Err(NnError::shape("broadcast", self.shape(), other.shape()));
        }
        Ok(self.broadcast_wrapping(other, op))
    }

    /// Broadcasting by modulo indexing without a compatibility check:
    /// element (i, j) is `op(self(i % R1, j % C1), other(i % R2, j % C2))`.
    ///
    /// Shapes where neither side divides the other (3x1 against 2x1) still
    /// produce a result, but its rows wrap around and carry no meaning.
    pub fn broadcast_wrapping<F>(&self, other: &Matrix, op: F) -> Matrix
    where
        F: Fn(f64, f64) -> f64,
    {
        let rows = self.rows.max(other.rows);
        let cols = self.cols.max(other.cols);

        let mut values = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                values.push(op(
                    self.at(row % self.rows, col % self.cols),
                    other.at(row % other.rows, col % other.cols),
                ));
            }
        }

        Matrix { rows, cols, values }
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.broadcast(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Matrix) -> Result<Matrix> {
        self.broadcast(other, |a, b| a - b)
    }

    /// Element-wise (Hadamard) product.
    pub fn mult(&self, other: &Matrix) -> Result<Matrix> {
        self.broadcast(other, |a, b| a * b)
    }

    pub fn div(&self, other: &Matrix) -> Result<Matrix> {
        self.broadcast(other, |a, b| a / b)
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Column-wise sum collapsing every row into a single 1xC row.
    pub fn sum_rows(&self) -> Matrix {
        let mut values = vec![0.0; self.cols];
        for row in self.values.chunks(self.cols) {
            for (acc, x) in values.iter_mut().zip(row) {
                *acc += x;
            }
        }
        Matrix { rows: 1, cols: self.cols, values }
    }
}

fn check_dims(rows: usize, cols: usize) -> Result<()> {
    if rows == 0 || cols == 0 {
        return Err(NnError::invalid(format!(
            "matrix dimensions must be positive, got {rows}x{cols}"
        )));
    }
    Ok(())
}
