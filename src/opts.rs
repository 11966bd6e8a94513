use crate::router::DEFAULT_CONFIDENCE_THRESHOLD;

/// Options that control how images are routed and how batches are scheduled.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// The CLI is responsible for mapping user input into this type so that:
/// - the library remains reusable outside of a CLI context
/// - other frontends (services, tests, batch jobs) can construct options programmatically
#[derive(Debug, Clone)]
pub struct Opts {
    /// Minimum classifier confidence for trusting its primary label.
    ///
    /// Below this, an image is treated as undetermined and goes to the cloud transcriber even if
    /// the raw label says "handwritten".
    pub confidence_threshold: f32,

    /// Number of images processed concurrently in batch mode.
    ///
    /// `1` keeps the strictly sequential behavior. `0` means one worker per CPU.
    pub jobs: usize,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            jobs: 1,
        }
    }
}

impl Opts {
    /// The effective worker count for batch processing (never zero).
    pub fn worker_count(&self) -> usize {
        match self.jobs {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sequential_with_half_confidence() {
        let opts = Opts::default();
        assert_eq!(opts.confidence_threshold, 0.5);
        assert_eq!(opts.worker_count(), 1);
    }

    #[test]
    fn zero_jobs_means_one_per_cpu() {
        let opts = Opts {
            jobs: 0,
            ..Opts::default()
        };
        assert!(opts.worker_count() >= 1);
    }
}
