use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Weights and biases of the two-layer network.
///
/// Shapes are fixed at construction time: `w1` is D×H, `b1` has length H,
/// `w2` is H×C and `b2` has length C, where D is the input feature count,
/// H the hidden width and C the number of classes. `Clone` is the snapshot
/// operation used to keep the best parameters during early stopping.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    pub w1: Array2<f32>,
    pub b1: Array1<f32>,
    pub w2: Array2<f32>,
    pub b2: Array1<f32>,
}

/// Gradients of the loss with respect to every parameter, one field per
/// parameter with matching shape.
#[derive(Debug, Clone)]
pub struct GradientSet {
    pub w1: Array2<f32>,
    pub b1: Array1<f32>,
    pub w2: Array2<f32>,
    pub b2: Array1<f32>,
}

impl ParameterSet {
    /// Initializes both weight matrices from `Normal(0, std_dev)` and both
    /// bias vectors to zero, drawing from the provided generator.
    pub fn new<R: Rng>(
        inputs: usize,
        hidden: usize,
        classes: usize,
        std_dev: f32,
        rng: &mut R,
    ) -> Self {
        let normal = Normal::new(0.0, std_dev).unwrap();

        ParameterSet {
            w1: Array2::from_shape_fn((inputs, hidden), |_| normal.sample(rng)),
            b1: Array1::zeros(hidden),
            w2: Array2::from_shape_fn((hidden, classes), |_| normal.sample(rng)),
            b2: Array1::zeros(classes),
        }
    }

    pub fn input_size(&self) -> usize {
        self.w1.nrows()
    }

    pub fn hidden_size(&self) -> usize {
        self.w1.ncols()
    }

    pub fn num_classes(&self) -> usize {
        self.w2.ncols()
    }

    /// Vanilla SGD update: `param -= learning_rate * gradient` for every field.
    pub fn sgd_step(&mut self, grads: &GradientSet, learning_rate: f32) {
        self.w1.scaled_add(-learning_rate, &grads.w1);
        self.b1.scaled_add(-learning_rate, &grads.b1);
        self.w2.scaled_add(-learning_rate, &grads.w2);
        self.b2.scaled_add(-learning_rate, &grads.b2);
    }

    /// Sum of squared weights, the quantity penalized by L2 regularization.
    /// Biases are not included.
    pub fn weight_squared_sum(&self) -> f32 {
        let w1: f32 = self.w1.iter().map(|w| w * w).sum();
        let w2: f32 = self.w2.iter().map(|w| w * w).sum();
        w1 + w2
    }
}
