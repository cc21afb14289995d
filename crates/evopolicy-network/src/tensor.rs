//! Dense row-major tensors used for layer weights.
//!
//! Weight matrices are stored as a flat `Vec<f32>` in row-major order, so
//! [`Matrix::as_flat`] and [`Matrix::from_flat`] are exact inverses of each
//! other. Evolutionary operators work on the flat view and rebuild matrices
//! with the parent's shape; bias vectors are plain `Vec<f32>` and are flat
//! already.

use serde::{Deserialize, Serialize};

/// Shape of a tensor as `rows x cols`.
///
/// Bias vectors are described as a single row (see [`Shape::vector`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, Serialize, Deserialize)]
#[display("{rows}x{cols}")]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    #[must_use]
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Shape of a bias vector with `len` elements.
    #[must_use]
    pub const fn vector(len: usize) -> Self {
        Self { rows: 1, cols: len }
    }

    /// Number of scalars in a tensor of this shape.
    #[must_use]
    pub const fn len(self) -> usize {
        self.rows * self.cols
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// Two tensors that were expected to have the same shape do not.
///
/// Inside a single population this signals a broken invariant (all agents
/// are created from one topology) and should abort the run.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("tensor shape mismatch: expected {expected}, found {found}")]
pub struct ShapeMismatchError {
    pub expected: Shape,
    pub found: Shape,
}

impl ShapeMismatchError {
    /// Returns `Ok(())` when both shapes agree.
    pub fn check(expected: Shape, found: Shape) -> Result<(), Self> {
        if expected == found {
            Ok(())
        } else {
            Err(Self { expected, found })
        }
    }
}

/// A dense `f32` matrix in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix", into = "RawMatrix")]
pub struct Matrix {
    shape: Shape,
    data: Vec<f32>,
}

impl Matrix {
    /// Creates a matrix filled with zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        let shape = Shape::new(rows, cols);
        Self {
            shape,
            data: vec![0.0; shape.len()],
        }
    }

    /// Creates a matrix by evaluating `f(row, col)` for each element.
    ///
    /// Elements are visited in row-major order, which matters when `f` draws
    /// from a random number generator.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self {
            shape: Shape::new(rows, cols),
            data,
        }
    }

    /// Rebuilds a matrix of the given shape from its flattened row-major data.
    ///
    /// Fails if `data.len()` does not match `shape`.
    ///
    /// # Examples
    ///
    /// ```
    /// use evopolicy_network::{Matrix, Shape};
    ///
    /// let m = Matrix::from_flat(Shape::new(2, 3), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    /// assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
    /// assert!(Matrix::from_flat(Shape::new(2, 2), vec![1.0]).is_err());
    /// ```
    pub fn from_flat(shape: Shape, data: Vec<f32>) -> Result<Self, ShapeMismatchError> {
        if data.len() != shape.len() {
            return Err(ShapeMismatchError {
                expected: shape,
                found: Shape::vector(data.len()).with_rows_of(shape),
            });
        }
        Ok(Self { shape, data })
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.shape.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.shape.cols
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major flat view of all elements.
    #[must_use]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    pub fn as_flat_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the matrix, returning its row-major elements.
    #[must_use]
    pub fn into_flat(self) -> Vec<f32> {
        self.data
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[f32] {
        let cols = self.shape.cols;
        &self.data[row * cols..(row + 1) * cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f32] {
        let cols = self.shape.cols;
        &mut self.data[row * cols..(row + 1) * cols]
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.shape.cols + col]
    }
}

impl Shape {
    // Shape a flat buffer would have if it were split into `template.rows` rows.
    // Used only to report a meaningful `found` shape on mismatch.
    fn with_rows_of(self, template: Shape) -> Shape {
        let len = self.len();
        if template.rows > 0 && len.is_multiple_of(template.rows) {
            Shape::new(template.rows, len / template.rows)
        } else {
            self
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = ShapeMismatchError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        Matrix::from_flat(Shape::new(raw.rows, raw.cols), raw.data)
    }
}

impl From<Matrix> for RawMatrix {
    fn from(matrix: Matrix) -> Self {
        Self {
            rows: matrix.shape.rows,
            cols: matrix.shape.cols,
            data: matrix.data,
        }
    }
}
