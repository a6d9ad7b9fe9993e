//! Utility functions shared by the pipeline stages.

pub mod stats;

pub use stats::{
    mad_to_sigma, mean, median, median_abs_deviation, population_variance, robust_std, std_dev,
    variance,
};
