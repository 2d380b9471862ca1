use crate::constants::http::{HEADER_DATA_AGE, HEADER_DATA_STALE};
use crate::transport::HttpResponse;
use crate::types::FreshnessMetadata;

/// Read freshness metadata from a successful response's headers
///
/// Staleness is never inferred client-side: only an explicit
/// `X-Data-Stale: true` marks the data stale. The age is kept only for
/// stale data.
pub fn extract(res: &HttpResponse) -> FreshnessMetadata {
    let is_stale = res
        .header(HEADER_DATA_STALE)
        .map(|v| v.trim() == "true")
        .unwrap_or(false);

    if !is_stale {
        return FreshnessMetadata::fresh();
    }

    let data_age = res
        .header(HEADER_DATA_AGE)
        .and_then(|v| v.trim().parse::<u64>().ok());

    FreshnessMetadata { is_stale, data_age }
}
