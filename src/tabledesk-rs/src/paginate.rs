//! Auto-pagination.
//!
//! The service has no "has more" flag, so the end of data is detected from
//! the page length alone: an empty page, or a page shorter than the page
//! size. A final page of exactly 500 records costs one extra, empty probe.
//!
//! Pages are always requested at the service maximum; a `top` set on the
//! base query does not cap the total.

use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tabledesk_core::request::Target;
use tabledesk_core::{QueryIntent, MAX_PAGE_SIZE};
use tracing::debug;

use crate::client::Client;
use crate::Result;

pub(crate) fn pages<T>(
    client: Client,
    target: Target,
    base: QueryIntent,
) -> impl Stream<Item = Result<Vec<T>>> + Send + 'static
where
    T: DeserializeOwned + Send + 'static,
{
    async_stream::stream! {
        let page_size = MAX_PAGE_SIZE;
        let mut offset = base.skip();

        loop {
            let intent = base.page(offset, page_size);
            let page: Vec<T> = match client.select(&target, &intent).await {
                Ok(page) => page,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let len = page.len();
            debug!(table = %target, offset, records = len, "Fetched page");
            if len == 0 {
                break;
            }

            yield Ok(page);

            if len < page_size as usize {
                break;
            }
            offset += u64::from(page_size);
        }
    }
}

/// Drain a page stream, stopping at the first error
pub(crate) async fn collect<T, S>(pages: S) -> Result<Vec<T>>
where
    S: Stream<Item = Result<Vec<T>>>,
{
    let mut pages = Box::pin(pages);
    let mut records = Vec::new();
    while let Some(page) = pages.next().await {
        records.extend(page?);
    }
    Ok(records)
}
