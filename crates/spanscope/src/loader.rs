use spanscope_protocol::TracePayload;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::FetchTicket;
use crate::store::{FetchError, SpanStore};

/// A finished fetch, paired with the ticket it was started for
pub type FetchOutcome = (FetchTicket, Result<TracePayload, FetchError>);

/// Runs trace fetches on the tokio runtime and reports them on a channel.
///
/// At most one fetch is in flight: starting a new one aborts the previous
/// task. Aborting is only an optimization, the session still checks tickets.
pub struct TraceLoader<S> {
    store: Arc<S>,
    tx: mpsc::UnboundedSender<FetchOutcome>,
    in_flight: Option<JoinHandle<()>>,
}

impl<S: SpanStore> TraceLoader<S> {
    pub fn new(store: Arc<S>) -> (Self, mpsc::UnboundedReceiver<FetchOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let loader = Self {
            store,
            tx,
            in_flight: None,
        };
        (loader, rx)
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fetch the trace named by `ticket`. Must be called within a tokio runtime.
    pub fn fetch(&mut self, ticket: FetchTicket) {
        self.cancel();

        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = store.fetch_trace(ticket.trace_id()).await;
            if tx.send((ticket, result)).is_err() {
                tracing::debug!("trace loader receiver dropped");
            }
        }));
    }

    /// Abort the in-flight fetch, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                tracing::debug!("aborting in-flight trace fetch");
            }
            handle.abort();
        }
    }
}

impl<S> Drop for TraceLoader<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
