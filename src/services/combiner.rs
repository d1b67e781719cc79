use crate::domain::{AggregateResult, ProviderName, ResultItem};

/// Merges per-provider result lists into one aggregate.
///
/// Lists are stored under their provider's key exactly as given; item order
/// within a list is never changed.
pub fn combine<I>(per_provider: I) -> AggregateResult
where
    I: IntoIterator<Item = (ProviderName, Vec<ResultItem>)>,
{
    let mut aggregate = AggregateResult::new();
    for (provider, items) in per_provider {
        aggregate.insert(provider, items);
    }
    aggregate
}
