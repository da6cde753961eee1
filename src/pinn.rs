/// Physics-informed training engine: a compact feed-forward surrogate of a
/// trajectory, the residual of the governing equation evaluated through the
/// surrogate's time derivative, composite loss weighting, mini-batch
/// collocation training with SGD+momentum or Adam, and regression metrics.
pub mod network;

/// reverse pass through the value and tangent chains of the forward pass
pub mod backprop;

/// physics residual R = dY/dt - f(t, Y) over a collocation batch
pub mod residual;

/// weighted residual + initial-condition + data loss and its gradients
pub mod loss;

/// collocation point generation (random or grid)
pub mod sampler;

/// SGD with momentum and bias-corrected Adam
pub mod optimizers;

/// epoch/batch training driver
pub mod train;

/// NaN-aware MSE/RMSE/MAE/R^2 per dimension and overall
pub mod metrics;
