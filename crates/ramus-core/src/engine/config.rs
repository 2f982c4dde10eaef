use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("parameter `{name}` must be positive (got {value})")]
    NotPositive { name: &'static str, value: f64 },

    #[error("parameter `{name}` must not be negative (got {value})")]
    Negative { name: &'static str, value: f64 },
}

/// Immutable search tunables, fixed at construction of an
/// [`Optimizer`](crate::search::Optimizer).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Main log-likelihood convergence epsilon.
    pub lh_epsilon: f64,
    /// Epsilon for the triplet branch-length optimization performed around
    /// candidate regraft points inside an SPR round. Deliberately loose.
    pub lh_epsilon_brlen_triplet: f64,
    /// User-fixed fast-SPR radius; `None` autodetects it from the data.
    pub spr_radius: Option<usize>,
    /// Subtree cutoff factor for SPR candidate filtering.
    pub spr_cutoff: f64,
    /// Log-likelihood epsilon for NNI rounds.
    pub nni_epsilon: f64,
    /// Tolerance for NNI rounds.
    pub nni_tolerance: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            lh_epsilon: 0.1,
            lh_epsilon_brlen_triplet: 1000.0,
            spr_radius: None,
            spr_cutoff: 1.0,
            nni_epsilon: 0.1,
            nni_tolerance: 0.1,
        }
    }
}

impl SearchOptions {
    pub fn builder() -> SearchOptionsBuilder {
        SearchOptionsBuilder::default()
    }
}

#[derive(Default)]
pub struct SearchOptionsBuilder {
    options: SearchOptions,
}

impl SearchOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lh_epsilon(mut self, epsilon: f64) -> Self {
        self.options.lh_epsilon = epsilon;
        self
    }
    pub fn lh_epsilon_brlen_triplet(mut self, epsilon: f64) -> Self {
        self.options.lh_epsilon_brlen_triplet = epsilon;
        self
    }
    pub fn spr_radius(mut self, radius: Option<usize>) -> Self {
        self.options.spr_radius = radius;
        self
    }
    pub fn spr_cutoff(mut self, cutoff: f64) -> Self {
        self.options.spr_cutoff = cutoff;
        self
    }
    pub fn nni_epsilon(mut self, epsilon: f64) -> Self {
        self.options.nni_epsilon = epsilon;
        self
    }
    pub fn nni_tolerance(mut self, tolerance: f64) -> Self {
        self.options.nni_tolerance = tolerance;
        self
    }

    pub fn build(self) -> Result<SearchOptions, ConfigError> {
        let opts = self.options;
        for (name, value) in [
            ("lh_epsilon", opts.lh_epsilon),
            ("lh_epsilon_brlen_triplet", opts.lh_epsilon_brlen_triplet),
            ("nni_epsilon", opts.nni_epsilon),
            ("nni_tolerance", opts.nni_tolerance),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        if opts.spr_cutoff < 0.0 {
            return Err(ConfigError::Negative {
                name: "spr_cutoff",
                value: opts.spr_cutoff,
            });
        }
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_pass_validation() {
        let opts = SearchOptions::builder().build().unwrap();
        assert_eq!(opts, SearchOptions::default());
    }

    #[test]
    fn builder_overrides_are_applied() {
        let opts = SearchOptions::builder()
            .lh_epsilon(0.01)
            .spr_radius(Some(10))
            .spr_cutoff(2.0)
            .build()
            .unwrap();
        assert_eq!(opts.lh_epsilon, 0.01);
        assert_eq!(opts.spr_radius, Some(10));
        assert_eq!(opts.spr_cutoff, 2.0);
    }

    #[test]
    fn non_positive_epsilon_is_rejected() {
        let err = SearchOptions::builder().lh_epsilon(0.0).build().unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotPositive {
                name: "lh_epsilon",
                value: 0.0
            }
        );
    }

    #[test]
    fn negative_cutoff_is_rejected() {
        let err = SearchOptions::builder()
            .spr_cutoff(-1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Negative { name: "spr_cutoff", .. }));
    }
}
