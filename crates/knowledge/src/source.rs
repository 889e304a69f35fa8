//! Ticket source abstraction and pagination.

use crate::progress::ProgressReporter;
use crate::types::TicketRecord;
use async_trait::async_trait;
use triage_core::{AppError, AppResult};

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct TicketPage {
    pub tickets: Vec<TicketRecord>,

    /// Total matches reported by the source
    pub total: usize,
}

/// A paginated ticket search endpoint.
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetch tickets `start_at..start_at + max_results` for `query`.
    async fn search_page(&self, query: &str, start_at: usize, max_results: usize)
        -> AppResult<TicketPage>;
}

/// Fetch every ticket matching `query`.
///
/// Stops once the accumulated count reaches the reported total or a page
/// comes back empty. Any page failure aborts the whole fetch.
#[tracing::instrument(skip(source, progress), fields(source = source.name()))]
pub async fn fetch_all(
    source: &dyn TicketSource,
    query: &str,
    page_size: usize,
    progress: &ProgressReporter,
) -> AppResult<Vec<TicketRecord>> {
    if page_size == 0 {
        return Err(AppError::Config("Page size must be greater than zero".to_string()));
    }

    let mut tickets: Vec<TicketRecord> = Vec::new();

    loop {
        let start_at = tickets.len();
        let page = source
            .search_page(query, start_at, page_size)
            .await
            .map_err(|e| match e {
                AppError::Source(_) => e,
                other => AppError::Source(other.to_string()),
            })?;

        let received = page.tickets.len();
        tickets.extend(page.tickets);

        tracing::debug!(
            "Fetched page at {}: {} tickets (total reported {})",
            start_at,
            received,
            page.total
        );
        progress.fetch(tickets.len() as u64, Some(page.total as u64));

        if received == 0 || tickets.len() >= page.total {
            break;
        }
    }

    tracing::info!("Fetched {} tickets from {}", tickets.len(), source.name());
    Ok(tickets)
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory source serving a fixed ticket list.
    pub struct FakeSource {
        tickets: Mutex<Vec<TicketRecord>>,
        /// Reported total; defaults to the list length
        pub total_override: Option<usize>,
        /// Fail the request for this page start
        pub fail_at: Option<usize>,
        pub calls: AtomicUsize,
    }

    impl FakeSource {
        pub fn new(tickets: Vec<TicketRecord>) -> Self {
            Self {
                tickets: Mutex::new(tickets),
                total_override: None,
                fail_at: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn set_tickets(&self, tickets: Vec<TicketRecord>) {
            *self.tickets.lock().unwrap() = tickets;
        }
    }

    #[async_trait]
    impl TicketSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn search_page(
            &self,
            _query: &str,
            start_at: usize,
            max_results: usize,
        ) -> AppResult<TicketPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some(start_at) {
                return Err(AppError::Source("503 Service Unavailable".to_string()));
            }

            let tickets = self.tickets.lock().unwrap();
            let page = tickets
                .iter()
                .skip(start_at)
                .take(max_results)
                .cloned()
                .collect();
            Ok(TicketPage {
                tickets: page,
                total: self.total_override.unwrap_or(tickets.len()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::FakeSource;
    use super::*;
    use std::sync::atomic::Ordering;

    fn tickets(n: usize) -> Vec<TicketRecord> {
        (1..=n).map(|i| TicketRecord::new(format!("OPS-{}", i))).collect()
    }

    #[tokio::test]
    async fn test_fetch_all_paginates_to_total() {
        let source = FakeSource::new(tickets(7));
        let fetched = fetch_all(&source, "project = OPS", 3, &ProgressReporter::noop())
            .await
            .unwrap();

        assert_eq!(fetched.len(), 7);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(fetched[6].ticket_id, "OPS-7");
    }

    #[tokio::test]
    async fn test_fetch_all_stops_on_empty_page() {
        let mut source = FakeSource::new(tickets(4));
        source.total_override = Some(100);

        let fetched = fetch_all(&source, "q", 3, &ProgressReporter::noop())
            .await
            .unwrap();

        assert_eq!(fetched.len(), 4);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_all_empty_result() {
        let source = FakeSource::new(Vec::new());
        let fetched = fetch_all(&source, "q", 50, &ProgressReporter::noop())
            .await
            .unwrap();
        assert!(fetched.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_page_failure_aborts() {
        let mut source = FakeSource::new(tickets(5));
        source.fail_at = Some(2);

        let err = fetch_all(&source, "q", 2, &ProgressReporter::noop())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Source(_)));
    }
}
