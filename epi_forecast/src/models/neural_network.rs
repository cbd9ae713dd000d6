//! Feed-forward sequence regression
//!
//! A two-layer network (`input_size -> hidden_size -> 1`, ReLU in between)
//! learns to predict the next value from a sliding window of previous
//! values. It is trained full-batch with Adam on mean squared error for a
//! fixed number of epochs and then rolled forward autoregressively.
//!
//! The band uses the in-sample mean absolute error of the trained network,
//! which underestimates out-of-sample error, so the bounds are optimistic.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastBand, ForecastModel, TrainedForecastModel};
use epi_math::{mean_absolute_error, mean_squared_error};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Uniform;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;

/// Sliding-window feed-forward regressor
#[derive(Debug, Clone)]
pub struct FeedForwardRegressor {
    /// Name of the model
    name: String,
    input_size: usize,
    hidden_size: usize,
    epochs: usize,
    learning_rate: f64,
    seed: u64,
}

impl FeedForwardRegressor {
    /// Create a regressor with the default learning rate (0.01) and seed
    pub fn new(input_size: usize, hidden_size: usize, epochs: usize) -> Result<Self> {
        if input_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Input window size must be positive".to_string(),
            ));
        }
        if hidden_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Hidden layer size must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!(
                "Feed-Forward Regressor (window={}, hidden={})",
                input_size, hidden_size
            ),
            input_size,
            hidden_size,
            epochs,
            learning_rate: 0.01,
            seed: 42,
        })
    }

    /// Set the Adam learning rate
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Result<Self> {
        if !(learning_rate > 0.0) || !learning_rate.is_finite() {
            return Err(ForecastError::InvalidParameter(
                "Learning rate must be positive".to_string(),
            ));
        }
        self.learning_rate = learning_rate;
        Ok(self)
    }

    /// Set the seed used for weight initialisation
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Sliding-window training pairs: `input_size` values predict the next one
    fn training_pairs(&self, values: &[f64]) -> (Vec<Vec<f64>>, Vec<f64>) {
        values
            .windows(self.input_size + 1)
            .map(|w| (w[..self.input_size].to_vec(), w[self.input_size]))
            .unzip()
    }
}

/// Parameters of the two-layer network stored in one flat vector:
/// `w1 (hidden x input) | b1 (hidden) | w2 (hidden) | b2`
#[derive(Debug, Clone)]
struct Network {
    input_size: usize,
    hidden_size: usize,
    params: Vec<f64>,
}

impl Network {
    fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let param_count = hidden_size * input_size + 2 * hidden_size + 1;
        let mut params = Vec::with_capacity(param_count);

        // Uniform(-1/sqrt(fan_in), 1/sqrt(fan_in)) for each layer
        let hidden_bound = 1.0 / (input_size as f64).sqrt();
        let output_bound = 1.0 / (hidden_size as f64).sqrt();
        let hidden_init = Uniform::new(-hidden_bound, hidden_bound);
        let output_init = Uniform::new(-output_bound, output_bound);

        for _ in 0..hidden_size * input_size + hidden_size {
            params.push(rng.sample(&hidden_init));
        }
        for _ in 0..hidden_size + 1 {
            params.push(rng.sample(&output_init));
        }

        Self {
            input_size,
            hidden_size,
            params,
        }
    }

    fn b1_offset(&self) -> usize {
        self.hidden_size * self.input_size
    }

    fn w2_offset(&self) -> usize {
        self.b1_offset() + self.hidden_size
    }

    fn b2_offset(&self) -> usize {
        self.w2_offset() + self.hidden_size
    }

    /// Pre-activations of the hidden layer
    fn hidden(&self, input: &[f64]) -> Vec<f64> {
        let b1 = self.b1_offset();
        (0..self.hidden_size)
            .map(|h| {
                let row = &self.params[h * self.input_size..(h + 1) * self.input_size];
                self.params[b1 + h] + row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>()
            })
            .collect()
    }

    fn predict(&self, input: &[f64]) -> f64 {
        let w2 = self.w2_offset();
        let output: f64 = self
            .hidden(input)
            .iter()
            .enumerate()
            .map(|(h, z)| self.params[w2 + h] * z.max(0.0))
            .sum();
        output + self.params[self.b2_offset()]
    }

    /// Gradient of the mean squared error over the batch
    fn gradients(&self, inputs: &[Vec<f64>], targets: &[f64]) -> Vec<f64> {
        let mut grads = vec![0.0; self.params.len()];
        let (b1, w2, b2) = (self.b1_offset(), self.w2_offset(), self.b2_offset());
        let scale = 2.0 / inputs.len() as f64;

        for (input, &target) in inputs.iter().zip(targets) {
            let hidden = self.hidden(input);
            let output: f64 = hidden
                .iter()
                .enumerate()
                .map(|(h, z)| self.params[w2 + h] * z.max(0.0))
                .sum::<f64>()
                + self.params[b2];
            let d_output = scale * (output - target);

            grads[b2] += d_output;
            for (h, &z) in hidden.iter().enumerate() {
                grads[w2 + h] += d_output * z.max(0.0);
                if z > 0.0 {
                    let d_hidden = d_output * self.params[w2 + h];
                    grads[b1 + h] += d_hidden;
                    for (k, &x) in input.iter().enumerate() {
                        grads[h * self.input_size + k] += d_hidden * x;
                    }
                }
            }
        }

        grads
    }
}

/// Adam optimiser state
#[derive(Debug)]
struct Adam {
    learning_rate: f64,
    first_moment: Vec<f64>,
    second_moment: Vec<f64>,
    step: i32,
}

impl Adam {
    fn new(learning_rate: f64, param_count: usize) -> Self {
        Self {
            learning_rate,
            first_moment: vec![0.0; param_count],
            second_moment: vec![0.0; param_count],
            step: 0,
        }
    }

    fn step(&mut self, params: &mut [f64], grads: &[f64]) {
        self.step += 1;
        let correction1 = 1.0 - ADAM_BETA1.powi(self.step);
        let correction2 = 1.0 - ADAM_BETA2.powi(self.step);

        for (i, (param, &grad)) in params.iter_mut().zip(grads).enumerate() {
            self.first_moment[i] = ADAM_BETA1 * self.first_moment[i] + (1.0 - ADAM_BETA1) * grad;
            self.second_moment[i] =
                ADAM_BETA2 * self.second_moment[i] + (1.0 - ADAM_BETA2) * grad * grad;

            let m_hat = self.first_moment[i] / correction1;
            let v_hat = self.second_moment[i] / correction2;
            *param -= self.learning_rate * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
        }
    }
}

#[derive(Debug, Clone)]
enum NetworkFit {
    /// Too little history to build a single training window
    Flat { last_value: f64 },
    Trained {
        network: Network,
        /// Last `input_size` observed values
        window: Vec<f64>,
        /// In-sample mean absolute error
        mae: f64,
        initial_loss: f64,
        final_loss: f64,
    },
}

/// Trained feed-forward regressor
#[derive(Debug, Clone)]
pub struct TrainedFeedForward {
    /// Name of the model
    name: String,
    fit: NetworkFit,
}

impl ForecastModel for FeedForwardRegressor {
    type Trained = TrainedFeedForward;

    fn train(&self, series: &TimeSeries) -> Result<Self::Trained> {
        let values = series.values();

        if values.len() < self.input_size + 1 {
            return Ok(TrainedFeedForward {
                name: self.name.clone(),
                fit: NetworkFit::Flat {
                    last_value: series.last_value(),
                },
            });
        }

        let (inputs, targets) = self.training_pairs(values);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut network = Network::new(self.input_size, self.hidden_size, &mut rng);
        let mut optimizer = Adam::new(self.learning_rate, network.params.len());

        let batch_loss = |network: &Network| -> Result<f64> {
            let predictions: Vec<f64> = inputs.iter().map(|x| network.predict(x)).collect();
            Ok(mean_squared_error(&predictions, &targets)?)
        };

        let initial_loss = batch_loss(&network)?;
        for _ in 0..self.epochs {
            let grads = network.gradients(&inputs, &targets);
            optimizer.step(&mut network.params, &grads);
        }
        let final_loss = batch_loss(&network)?;

        let predictions: Vec<f64> = inputs.iter().map(|x| network.predict(x)).collect();
        let mae = mean_absolute_error(&predictions, &targets)?;
        if !mae.is_finite() {
            return Err(ForecastError::ModelError(
                "Network training diverged".to_string(),
            ));
        }

        tracing::debug!(
            samples = inputs.len(),
            epochs = self.epochs,
            initial_loss,
            final_loss,
            mae,
            "Trained feed-forward regressor"
        );

        Ok(TrainedFeedForward {
            name: self.name.clone(),
            fit: NetworkFit::Trained {
                network,
                window: values[values.len() - self.input_size..].to_vec(),
                mae,
                initial_loss,
                final_loss,
            },
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedFeedForward {
    /// In-sample mean absolute error, if a network was trained
    pub fn training_mae(&self) -> Option<f64> {
        match &self.fit {
            NetworkFit::Trained { mae, .. } => Some(*mae),
            NetworkFit::Flat { .. } => None,
        }
    }

    /// Training loss before and after optimisation
    pub fn loss_history(&self) -> Option<(f64, f64)> {
        match &self.fit {
            NetworkFit::Trained {
                initial_loss,
                final_loss,
                ..
            } => Some((*initial_loss, *final_loss)),
            NetworkFit::Flat { .. } => None,
        }
    }
}

impl TrainedForecastModel for TrainedFeedForward {
    fn forecast(&self, horizon: usize) -> Result<ForecastBand> {
        match &self.fit {
            NetworkFit::Flat { last_value } => Ok(ForecastBand::flat(*last_value, horizon)),
            NetworkFit::Trained {
                network,
                window,
                mae,
                ..
            } => {
                let mut window = window.clone();
                let mut values = Vec::with_capacity(horizon);

                for _ in 0..horizon {
                    let prediction = network.predict(&window);
                    let prediction = if prediction.is_finite() {
                        prediction.max(0.0)
                    } else {
                        0.0
                    };
                    values.push(prediction);

                    window.remove(0);
                    window.push(prediction);
                }

                Ok(ForecastBand::widening(values, *mae))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
