//! Bottleneck analysis
//! Scores benchmark measurements against baselines and ranks resource axes

pub mod classifier;
pub mod types;

pub use classifier::BottleneckClassifier;
pub use types::{
    AxisScore, Baseline, BenchmarkMeasurement, BottleneckVerdict, ClassifierConfig, ExcludedAxis,
    ResourceAxis,
};
