use std::time::Instant;

use ndarray::{s, Array1, Array2, Axis, Zip};
use rand::seq::index;
use rand::Rng;

use crate::hyperparameters::{DropoutConfig, TrainConfig};
use crate::loss::{argmax, cross_entropy, softmax};
use crate::params::{GradientSet, ParameterSet};

/// Number of consecutive non-improving epochs tolerated before training
/// stops and the best parameters are restored.
const EARLY_STOPPING_PATIENCE: i32 = 10;

/// A two-layer fully connected classifier:
///
/// input - fully connected - ReLU - fully connected - softmax
///
/// The outputs of the second layer are the per-class scores. Training uses
/// softmax cross-entropy loss with L2 regularization on both weight
/// matrices.
#[derive(Debug, Clone)]
pub struct TwoLayerNet {
    pub params: ParameterSet,
}

/// Per-step and per-epoch metrics collected during training.
///
/// `loss` has one entry per SGD step; the other three have one entry per
/// epoch boundary. All four are append-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingHistory {
    pub loss: Vec<f32>,
    pub train_acc: Vec<f32>,
    pub val_acc: Vec<f32>,
    pub val_loss: Vec<f32>,
}

impl TwoLayerNet {
    /// Create a network with randomly initialized parameters.
    ///
    /// # Arguments
    ///
    /// * `input_size` - Dimension D of the input data
    /// * `hidden_size` - Number of neurons H in the hidden layer
    /// * `output_size` - Number of classes C
    /// * `std_dev` - Scale of the normal weight initialization, typically 1e-4
    pub fn new<R: Rng>(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        std_dev: f32,
        rng: &mut R,
    ) -> Self {
        TwoLayerNet {
            params: ParameterSet::new(input_size, hidden_size, output_size, std_dev, rng),
        }
    }

    /// Class scores for a batch of inputs, shape N×C. Dropout is never
    /// applied here; this is the inference-mode forward pass.
    pub fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        let hidden = self.hidden_activation(x);
        hidden.dot(&self.params.w2) + &self.params.b2
    }

    fn hidden_activation(&self, x: &Array2<f32>) -> Array2<f32> {
        assert_eq!(
            x.ncols(),
            self.params.input_size(),
            "Input feature size does not match the network's input size"
        );
        (x.dot(&self.params.w1) + &self.params.b1).mapv(|z| z.max(0.0))
    }

    /// Regularized loss on a batch, computed with the inference-mode
    /// forward pass (no dropout). Used for validation tracking.
    pub fn loss(&self, x: &Array2<f32>, y: &Array1<usize>, reg: f32) -> f32 {
        assert_eq!(y.len(), x.nrows(), "Label count does not match batch size");

        let probs = softmax(&self.forward(x));
        cross_entropy(&probs, y) + 0.5 * reg * self.params.weight_squared_sum()
    }

    /// Regularized loss and analytic gradients for one training batch.
    ///
    /// When dropout is enabled the hidden activations are multiplied by a
    /// fresh Bernoulli mask scaled by `1 / (1 - rate)`. The ReLU gradient
    /// gate below uses the (masked) activation rather than the
    /// pre-activation, so dropped units contribute no gradient.
    pub fn loss_and_grads<R: Rng>(
        &self,
        x: &Array2<f32>,
        y: &Array1<usize>,
        reg: f32,
        dropout: DropoutConfig,
        rng: &mut R,
    ) -> (f32, GradientSet) {
        let n = x.nrows();
        assert_eq!(y.len(), n, "Label count does not match batch size");

        let mut hidden = self.hidden_activation(x);
        if dropout.enabled && dropout.rate > 0.0 {
            let keep = 1.0 - dropout.rate;
            let scale = 1.0 / keep;
            hidden.mapv_inplace(|h| {
                if rng.random::<f32>() < keep {
                    h * scale
                } else {
                    0.0
                }
            });
        }
        let scores = hidden.dot(&self.params.w2) + &self.params.b2;

        let probs = softmax(&scores);
        let data_loss = cross_entropy(&probs, y);
        let loss = data_loss + 0.5 * reg * self.params.weight_squared_sum();

        // Backward pass. Subtracting the one-hot labels from the softmax
        // output gives the gradient on the scores directly.
        let mut dscores = probs;
        for (i, &class) in y.iter().enumerate() {
            dscores[[i, class]] -= 1.0;
        }
        dscores /= n as f32;

        let mut dw2 = hidden.t().dot(&dscores);
        let db2 = dscores.sum_axis(Axis(0));

        let mut dhidden = dscores.dot(&self.params.w2.t());
        Zip::from(&mut dhidden).and(&hidden).for_each(|dh, &h| {
            if h <= 0.0 {
                *dh = 0.0;
            }
        });

        let db1 = dhidden.sum_axis(Axis(0));
        let mut dw1 = x.t().dot(&dhidden);

        dw1.scaled_add(reg, &self.params.w1);
        dw2.scaled_add(reg, &self.params.w2);

        let grads = GradientSet {
            w1: dw1,
            b1: db1,
            w2: dw2,
            b2: db2,
        };
        (loss, grads)
    }

    /// Train with minibatch stochastic gradient descent.
    ///
    /// Batches are sampled uniformly with replacement, so coverage of the
    /// training set within an epoch is only statistical. At every epoch
    /// boundary the loop records train accuracy on the current minibatch,
    /// validation accuracy and loss on the full held-out set, decays the
    /// learning rate, and checks the early-stopping patience counter.
    /// Parameters are updated in place; the returned history holds the
    /// per-step loss and per-epoch metric sequences.
    pub fn train<R: Rng>(
        &mut self,
        x: &Array2<f32>,
        y: &Array1<usize>,
        x_val: &Array2<f32>,
        y_val: &Array1<usize>,
        config: &TrainConfig,
        rng: &mut R,
    ) -> TrainingHistory {
        assert_eq!(y.len(), x.nrows(), "Label count does not match training set size");
        assert_eq!(
            y_val.len(),
            x_val.nrows(),
            "Label count does not match validation set size"
        );
        if let Some(rate) = config.random_flip {
            assert!(
                (0.0..=1.0).contains(&rate),
                "Random flip rate must be in [0, 1]"
            );
        }

        let num_train = x.nrows();
        let iterations_per_epoch = (num_train / config.batch_size).max(1);

        let mut history = TrainingHistory::default();
        let mut learning_rate = config.learning_rate;

        let mut best_val_acc = f32::NEG_INFINITY;
        let mut best_params: Option<ParameterSet> = None;
        let mut patience = EARLY_STOPPING_PATIENCE;

        print_epoch_header();
        println!("{}", "=".repeat(101));

        let mut epoch_start = Instant::now();
        let mut average_train_loss = 0.0;
        for it in 0..config.num_iters {
            let (mut x_batch, y_batch) = sample_batch(x, y, config.batch_size, rng);

            if let Some(rate) = config.random_flip {
                flip_random_rows(&mut x_batch, rate, rng);
            }

            let (loss, grads) = self.loss_and_grads(&x_batch, &y_batch, config.reg, config.dropout, rng);
            history.loss.push(loss);
            average_train_loss += loss;

            self.params.sgd_step(&grads, learning_rate);

            if config.verbose && it % 100 == 0 {
                println!("iteration {} / {}: loss {}", it, config.num_iters, loss);
            }

            // Every epoch, check train and val accuracy and decay the
            // learning rate.
            if it % iterations_per_epoch == 0 {
                let duration = epoch_start.elapsed().as_secs_f32();
                epoch_start = Instant::now();
                let epoch = it / iterations_per_epoch;

                // Train accuracy is measured on the current minibatch only,
                // not a full sweep over the training set.
                let train_acc = accuracy(&self.predict(&x_batch), &y_batch);
                let val_acc = accuracy(&self.predict(x_val), y_val);
                let val_loss = self.loss(x_val, y_val, config.reg);

                // The first boundary reports the raw loss of iteration 0.
                if epoch > 0 {
                    average_train_loss /= iterations_per_epoch as f32;
                }

                print_epoch_summary(epoch, average_train_loss, train_acc, val_loss, val_acc, duration);

                history.train_acc.push(train_acc);
                history.val_acc.push(val_acc);
                history.val_loss.push(val_loss);
                average_train_loss = 0.0;

                let mut stop = false;
                if val_acc > best_val_acc {
                    best_val_acc = val_acc;
                    best_params = Some(self.params.clone());
                    patience = EARLY_STOPPING_PATIENCE;
                } else {
                    patience -= 1;
                    if patience <= 0 {
                        stop = true;
                    }
                }

                learning_rate *= config.learning_rate_decay;

                if stop {
                    println!(
                        "> Early stopping after {} epochs of no improvements.",
                        EARLY_STOPPING_PATIENCE
                    );
                    println!(
                        "> Restoring params of best model with validation accuracy of: {}",
                        best_val_acc
                    );
                    if let Some(best) = best_params.take() {
                        self.params = best;
                    }
                    break;
                }
            }
        }
        println!("{}", "=".repeat(101));

        history
    }

    /// Predicted class index for each row of `x`.
    ///
    /// The softmax normalization is monotonic, so the arg-max would be the
    /// same on the raw scores; it is kept for numerical parity with the
    /// loss path.
    pub fn predict(&self, x: &Array2<f32>) -> Array1<usize> {
        let probs = softmax(&self.forward(x));
        Array1::from_iter(probs.rows().into_iter().map(argmax))
    }
}

/// Sample a minibatch of the given size uniformly with replacement.
fn sample_batch<R: Rng>(
    x: &Array2<f32>,
    y: &Array1<usize>,
    batch_size: usize,
    rng: &mut R,
) -> (Array2<f32>, Array1<usize>) {
    let num_train = x.nrows();
    let indices: Vec<usize> = (0..batch_size)
        .map(|_| rng.random_range(0..num_train))
        .collect();

    (x.select(Axis(0), &indices), y.select(Axis(0), &indices))
}

/// Replace `max(1, round(batch_size * rate))` distinct rows of the batch
/// with their horizontal mirror (features reversed along the column axis).
fn flip_random_rows<R: Rng>(x_batch: &mut Array2<f32>, rate: f32, rng: &mut R) {
    let batch_size = x_batch.nrows();
    let num_to_flip = ((batch_size as f32 * rate).round() as usize).max(1);

    for row in index::sample(rng, batch_size, num_to_flip) {
        let flipped = x_batch.row(row).slice(s![..;-1]).to_owned();
        x_batch.row_mut(row).assign(&flipped);
    }
}

fn accuracy(predictions: &Array1<usize>, labels: &Array1<usize>) -> f32 {
    let correct = predictions
        .iter()
        .zip(labels.iter())
        .filter(|(p, l)| p == l)
        .count();
    correct as f32 / labels.len() as f32
}

fn print_epoch_header() {
    println!("Epoch\tTrain Loss\tTrain accuracy\t\tTest Loss\tTest accuracy\tDuration");
}

fn print_epoch_summary(
    epoch: usize,
    train_loss: f32,
    train_acc: f32,
    val_loss: f32,
    val_acc: f32,
    duration: f32,
) {
    // Print the table header again after every 100th epoch.
    if epoch % 100 == 0 && epoch > 0 {
        print_epoch_header();
    }
    println!(
        "{}\t{:.5}\t\t{:.2}%\t\t\t{:.5}\t\t{:.2}%\t\t{:.3}",
        epoch,
        train_loss,
        train_acc * 100.0,
        val_loss,
        val_acc * 100.0,
        duration
    );
}
