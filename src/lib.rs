mod hyperparameters;
mod loss;
mod model;
mod params;

pub use hyperparameters::DropoutConfig;
pub use hyperparameters::TrainConfig;
pub use loss::{argmax, cross_entropy, softmax};
pub use model::TrainingHistory;
pub use model::TwoLayerNet;
pub use params::{GradientSet, ParameterSet};
