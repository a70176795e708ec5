use crate::constants::MAX_THREADS;

pub struct SearchOptions {
    pub tt_mb_size: usize,
    pub n_threads: usize,
    pub multi_pv: usize,
}

impl SearchOptions {
    /// Create search options with the desired transposition-table size
    /// while relying on defaults for other parameters.
    #[must_use]
    pub fn new(tt_mb_size: usize) -> Self {
        SearchOptions {
            tt_mb_size,
            ..Default::default()
        }
    }

    /// Override the number of search threads when the default CPU count
    /// is not appropriate for the caller.
    #[must_use]
    pub fn with_threads(mut self, n_threads: Option<usize>) -> Self {
        if let Some(value) = n_threads {
            self.n_threads = value.clamp(1, MAX_THREADS);
        }
        self
    }

    /// Number of principal variations to report per iteration.
    #[must_use]
    pub fn with_multi_pv(mut self, multi_pv: usize) -> Self {
        self.multi_pv = multi_pv.max(1);
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            tt_mb_size: 64,
            n_threads: num_cpus::get(),
            multi_pv: 1,
        }
    }
}
