use crate::error::FetchError;
use crate::model::{RangeQuery, ResultPage};

/// Executes one bounded query against the portal.
///
/// Implementations return an empty page (not an error) for a range with no
/// notices. Callers never pass `end < start`; [`RangeQuery::new`] enforces it.
pub trait RangeFetcher {
    fn fetch(&mut self, query: &RangeQuery) -> Result<ResultPage, FetchError>;
}

impl<F: RangeFetcher + ?Sized> RangeFetcher for &mut F {
    fn fetch(&mut self, query: &RangeQuery) -> Result<ResultPage, FetchError> {
        (**self).fetch(query)
    }
}

impl<F: RangeFetcher + ?Sized> RangeFetcher for Box<F> {
    fn fetch(&mut self, query: &RangeQuery) -> Result<ResultPage, FetchError> {
        (**self).fetch(query)
    }
}
