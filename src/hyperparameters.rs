/// Inverted-dropout configuration for the hidden layer.
///
/// `rate` is the probability of zeroing an activation during training;
/// survivors are scaled by `1 / (1 - rate)` so the expected magnitude is
/// unchanged. Dropout is never applied at inference time.
#[derive(Debug, Clone, Copy)]
pub struct DropoutConfig {
    pub rate: f32,
    pub enabled: bool,
}

/// Hyperparameters for stochastic gradient descent training
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Initial learning rate
    pub learning_rate: f32,

    /// Multiplicative factor applied to the learning rate after each epoch
    pub learning_rate_decay: f32,

    /// L2 regularization strength
    pub reg: f32,

    /// Hard cap on the number of SGD steps
    pub num_iters: usize,

    /// Number of training examples sampled per step
    pub batch_size: usize,

    /// Hidden-layer dropout settings
    pub dropout: DropoutConfig,

    /// Fraction of each batch to flip horizontally, `None` disables
    /// augmentation entirely
    pub random_flip: Option<f32>,

    /// Print per-step loss every 100 iterations
    pub verbose: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            learning_rate: 1e-3,
            learning_rate_decay: 0.95,
            reg: 1e-5,
            num_iters: 100,
            batch_size: 200,
            dropout: DropoutConfig {
                rate: 0.5,
                enabled: false,
            },
            random_flip: None,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_train_config() {
        let config = TrainConfig::default();

        assert_eq!(config.learning_rate, 1e-3);
        assert_eq!(config.learning_rate_decay, 0.95);
        assert_eq!(config.reg, 1e-5);
        assert_eq!(config.num_iters, 100);
        assert_eq!(config.batch_size, 200);
        assert_eq!(config.dropout.rate, 0.5);
        assert!(!config.dropout.enabled);
        assert!(config.random_flip.is_none());
        assert!(!config.verbose);
    }
}
