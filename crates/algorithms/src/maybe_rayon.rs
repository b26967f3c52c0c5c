//! `into_par_iter()` for the distance transform's index ranges.
//!
//! Both passes walk `0..n` over columns or rows. Built with `parallel`, that
//! range is a rayon iterator; built without it, the range is returned as is
//! and the passes run on the calling thread with identical results.

#[cfg(feature = "parallel")]
pub(crate) use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
pub(crate) trait IntoParallelIterator {
    type Iter: Iterator;

    fn into_par_iter(self) -> Self::Iter;
}

#[cfg(not(feature = "parallel"))]
impl IntoParallelIterator for std::ops::Range<usize> {
    type Iter = Self;

    fn into_par_iter(self) -> Self {
        self
    }
}
