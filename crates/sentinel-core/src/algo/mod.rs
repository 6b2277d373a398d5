pub mod isolation_forest;
pub mod scaler;

// Re-exports for convenience
pub use isolation_forest::{ForestError, IsolationForest, IsolationForestParams, IsolationLabel};
pub use scaler::{ScalerError, StandardScaler};
