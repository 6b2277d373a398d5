use serde::{Deserialize, Serialize};

/// Per-feature standardization fitted on a training batch.
///
/// Mean and variance are accumulated with Welford's update, the batch
/// counterpart of the running EWMA mean/variance. Variance is the population
/// variance (divide by N). A column with no spread keeps a scale of 1.0 so
/// `transform` never divides by zero.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
    samples: usize,
}

impl StandardScaler {
    pub fn fit<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, ScalerError> {
        let first = rows.first().ok_or(ScalerError::Empty)?;
        let dims = first.as_ref().len();
        if dims == 0 {
            return Err(ScalerError::Empty);
        }

        let mut mean = vec![0.0; dims];
        let mut m2 = vec![0.0; dims];
        let mut count = 0usize;

        for row in rows {
            let row = row.as_ref();
            if row.len() != dims {
                return Err(ScalerError::DimensionMismatch {
                    expected: dims,
                    found: row.len(),
                });
            }
            count += 1;
            for (dim, &x) in row.iter().enumerate() {
                let delta = x - mean[dim];
                mean[dim] += delta / count as f64;
                m2[dim] += delta * (x - mean[dim]);
            }
        }

        let scale = m2
            .iter()
            .map(|&m| {
                let std = (m / count as f64).sqrt();
                if std.is_finite() && std > 0.0 { std } else { 1.0 }
            })
            .collect();

        Ok(Self {
            mean,
            scale,
            samples: count,
        })
    }

    /// Standardize one row: `(x - mean) / scale`
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ScalerError> {
        if row.len() != self.mean.len() {
            return Err(ScalerError::DimensionMismatch {
                expected: self.mean.len(),
                found: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&mean, &scale))| (x - mean) / scale)
            .collect())
    }

    pub fn transform_all<R: AsRef<[f64]>>(&self, rows: &[R]) -> Result<Vec<Vec<f64>>, ScalerError> {
        rows.iter().map(|row| self.transform(row.as_ref())).collect()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn dimensions(&self) -> usize {
        self.mean.len()
    }

    pub fn samples(&self) -> usize {
        self.samples
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScalerError {
    Empty,
    DimensionMismatch { expected: usize, found: usize },
}

impl std::fmt::Display for ScalerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Cannot fit scaler on an empty batch"),
            Self::DimensionMismatch { expected, found } => write!(
                f,
                "Feature width mismatch: expected {}, found {}",
                expected, found
            ),
        }
    }
}

impl std::error::Error for ScalerError {}
