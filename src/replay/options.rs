use crate::shape::Shape;

/// How the streaming infeed, if any, gets its value shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InfeedMode {
    /// No streaming input is supplied.
    #[default]
    None,
    /// Stream values of exactly this shape.
    Explicit(Shape),
    /// Derive the shape from the program's infeed operation. The program
    /// must declare zero or one infeed ops; more is a configuration error.
    Infer,
}

/// Per-invocation replay configuration. Immutable for the duration of
/// one replay.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Replace recorded arguments with synthetic ones.
    pub use_fake_data: bool,
    /// Fetch and report the final run's result. Skipping the fetch can
    /// be a significant speedup when only timing matters.
    pub print_result: bool,
    /// Number of sequential execution runs; must be at least 1.
    pub num_runs: usize,
    /// Number of values the feed worker pushes into the infeed channel.
    pub num_infeeds: usize,
    pub infeed: InfeedMode,
    /// Enable detailed profiling on the final run only.
    pub profile_last_run: bool,
    /// Seed for the synthetic value generator.
    pub fake_seed: u64,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            use_fake_data: false,
            print_result: true,
            num_runs: 1,
            num_infeeds: 10,
            infeed: InfeedMode::None,
            profile_last_run: false,
            fake_seed: 0,
        }
    }
}
