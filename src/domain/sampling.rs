//! Synthetic path generation from a price series.
//!
//! Every path starts at the last observed value of the target column and
//! advances by cumulative sums of i.i.d. increments. Out-of-range requests
//! return `None` rather than an error.

use crate::domain::error::TicksimError;
use crate::domain::price_series::{PriceSeries, RawColumn};
use rand::Rng;
use rand::distributions::{Distribution, Open01, Uniform};
use rand_distr::Normal;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Valid forward step counts (path length including the starting value).
pub const STEPS_RANGE: Range<usize> = 2..255;
/// Valid path counts.
pub const SAMPLES_RANGE: Range<usize> = 1..10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingMethod {
    /// Mean 0, scale = std of returns.
    Normal,
    /// Location 0, scale = std of returns.
    Laplace,
    /// `[0, max - min]` of the target column. Paths never decrease.
    Uniform,
}

impl fmt::Display for SamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SamplingMethod::Normal => "normal",
            SamplingMethod::Laplace => "laplace",
            SamplingMethod::Uniform => "uniform",
        })
    }
}

impl FromStr for SamplingMethod {
    type Err = TicksimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" | "gaussian" => Ok(SamplingMethod::Normal),
            "laplace" => Ok(SamplingMethod::Laplace),
            "uniform" => Ok(SamplingMethod::Uniform),
            _ => Err(TicksimError::UnknownSamplingMethod {
                value: s.trim().to_string(),
            }),
        }
    }
}

enum Increment {
    Normal(Normal<f64>),
    Laplace { scale: f64 },
    Uniform(Uniform<f64>),
}

impl Increment {
    fn for_series(method: SamplingMethod, series: &PriceSeries, column: RawColumn) -> Option<Self> {
        match method {
            SamplingMethod::Normal => Normal::new(0.0, series.returns_std())
                .ok()
                .map(Increment::Normal),
            SamplingMethod::Laplace => {
                let scale = series.returns_std();
                scale.is_finite().then_some(Increment::Laplace { scale })
            }
            SamplingMethod::Uniform => {
                let values = series.column(column);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let width = max - min;
                width
                    .is_finite()
                    .then(|| Increment::Uniform(Uniform::new_inclusive(0.0, width)))
            }
        }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Increment::Normal(dist) => dist.sample(rng),
            Increment::Laplace { scale } => {
                // inverse CDF, u in (-0.5, 0.5)
                let draw: f64 = Open01.sample(rng);
                let u = draw - 0.5;
                -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
            }
            Increment::Uniform(dist) => dist.sample(rng),
        }
    }
}

/// `samples` paths of `steps` values each.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePaths {
    pub paths: Vec<Vec<f64>>,
}

impl SamplePaths {
    /// `(samples, steps)`
    pub fn shape(&self) -> (usize, usize) {
        (
            self.paths.len(),
            self.paths.first().map_or(0, Vec::len),
        )
    }

    /// Each path prefixed with the full history of `column`, giving shape
    /// `(samples, series.len() + steps)`.
    pub fn with_history(&self, series: &PriceSeries, column: RawColumn) -> Vec<Vec<f64>> {
        let history = series.column(column);
        self.paths
            .iter()
            .map(|path| history.iter().chain(path.iter()).copied().collect())
            .collect()
    }
}

/// Generate synthetic continuations of `column`.
///
/// Returns `None` when `steps` or `samples` is out of range, the series is
/// empty, or the distribution cannot be built from the history.
pub fn sample_paths<R: Rng + ?Sized>(
    series: &PriceSeries,
    method: SamplingMethod,
    steps: usize,
    column: RawColumn,
    samples: usize,
    rng: &mut R,
) -> Option<SamplePaths> {
    if !STEPS_RANGE.contains(&steps) || !SAMPLES_RANGE.contains(&samples) {
        tracing::debug!(steps, samples, "sampling request out of range");
        return None;
    }
    let start = series.last(column)?;
    let increment = Increment::for_series(method, series, column)?;

    let paths = (0..samples)
        .map(|_| {
            let mut value = start;
            let mut path = Vec::with_capacity(steps);
            path.push(value);
            for _ in 1..steps {
                value += increment.draw(rng);
                path.push(value);
            }
            path
        })
        .collect();

    Some(SamplePaths { paths })
}
