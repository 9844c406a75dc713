//! Order-preserving map over a batch, parallel with the `threading` feature.

#[cfg(feature = "threading")]
use rayon::prelude::*;

/// Applies `f` to `0..n` and collects the outputs in index order.
#[cfg(feature = "threading")]
pub(crate) fn map_indexed<R, F>(n: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize) -> R + Sync + Send,
{
    (0..n).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "threading"))]
pub(crate) fn map_indexed<R, F>(n: usize, f: F) -> Vec<R>
where
    F: Fn(usize) -> R,
{
    (0..n).map(f).collect()
}
