//! Scoped rayon pools honoring the configured parallelism hint.

use crate::{Result, ScoreError};

/// Run `f` inside a rayon pool sized by `n_jobs`. A hint <= 0 uses all
/// available cores (rayon's default sizing).
pub fn run_in_pool<T, F>(n_jobs: i32, f: F) -> Result<T>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    let threads = if n_jobs > 0 { n_jobs as usize } else { 0 };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| ScoreError::Parallel(e.to_string()))?;
    Ok(pool.install(f))
}
