//! Event engine: one task consumes the host's typed event stream and
//! dispatches each event to the ledger, the correlator, or the hand-off
//! client.
//!
//! Ledger mutations and their store mirroring finish before the next event
//! is taken, so a download event always sees every earlier request event in
//! the durable snapshot. Hand-offs run concurrently in a `JoinSet` so a slow
//! agent never stalls event handling.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::HandoffConfig;
use crate::correlate::{correlate_from_store, Correlation};
use crate::events::{DownloadItem, DownloadTrigger, HeadersSent, HostEvent, RequestInitiated, ResponseStarted};
use crate::handoff::{DownloadSink, DownloadState, HandoffClient, HandoffReport, Transport};
use crate::ledger::{EnrichOutcome, RequestLedger, RequestRecord};
use crate::store::{load_ledger, save_ledger, DurableStore};

/// Engine settings fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub ledger_capacity: usize,
    pub capture_async_requests: bool,
    pub trigger: DownloadTrigger,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            ledger_capacity: crate::ledger::DEFAULT_CAPACITY,
            capture_async_requests: false,
            trigger: DownloadTrigger::Named,
        }
    }
}

impl EngineOptions {
    pub fn from_config(cfg: &HandoffConfig, trigger: DownloadTrigger) -> Self {
        Self {
            ledger_capacity: cfg.effective_ledger_capacity(),
            capture_async_requests: cfg.capture_async_requests,
            trigger,
        }
    }
}

/// Hand-off outcome counts for one `run`. Reports themselves are logged and
/// dropped as they finish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub handed_off: usize,
    pub left_to_browser: usize,
}

impl RunSummary {
    pub fn record(&mut self, report: &HandoffReport) {
        match report.state {
            DownloadState::Cancelled => self.handed_off += 1,
            _ => self.left_to_browser += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.handed_off + self.left_to_browser
    }
}

pub struct Engine<S, T, K> {
    ledger: RequestLedger,
    store: S,
    client: HandoffClient<T>,
    sink: Arc<K>,
    options: EngineOptions,
    pending: JoinSet<HandoffReport>,
}

enum Step {
    Event(Option<HostEvent>),
    Finished(Result<HandoffReport, tokio::task::JoinError>),
}

impl<S, T, K> Engine<S, T, K>
where
    S: DurableStore,
    T: Transport,
    K: DownloadSink,
{
    pub fn new(store: S, client: HandoffClient<T>, sink: Arc<K>, options: EngineOptions) -> Self {
        Self {
            ledger: RequestLedger::new(options.ledger_capacity),
            store,
            client,
            sink,
            options,
            pending: JoinSet::new(),
        }
    }

    /// Seed the in-memory ledger from the durable snapshot, so a restarted
    /// bridge keeps the window it had. Unreadable snapshots start empty.
    pub async fn restore(&mut self) {
        match load_ledger(&self.store).await {
            Ok(records) => {
                self.ledger = RequestLedger::from_snapshot(records, self.options.ledger_capacity);
                tracing::debug!(records = self.ledger.len(), "ledger restored from store");
            }
            Err(e) => tracing::warn!("ledger snapshot unreadable, starting empty: {:#}", e),
        }
    }

    pub fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Hand-offs started but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub async fn handle(&mut self, event: HostEvent) {
        match event {
            HostEvent::RequestInitiated(ev) => self.on_request_initiated(ev).await,
            HostEvent::HeadersSent(ev) => self.on_headers_sent(ev).await,
            HostEvent::ResponseStarted(ev) => self.on_response_started(ev).await,
            HostEvent::DownloadNamed(_) | HostEvent::DownloadCreated(_) => {
                match self.options.trigger.select(&event) {
                    Some(item) => {
                        let item = item.clone();
                        self.on_download(item).await;
                    }
                    None => tracing::trace!("download event not used by {:?} trigger", self.options.trigger),
                }
            }
        }
    }

    pub async fn on_request_initiated(&mut self, ev: RequestInitiated) {
        if !ev.resource_type.is_captured(self.options.capture_async_requests) {
            return;
        }
        let record = RequestRecord::initiated(ev.url, ev.method, ev.request_body);
        if let Some(evicted) = self.ledger.record_request(record) {
            tracing::trace!(url = %evicted.url, "ledger full, evicted oldest record");
        }
        self.persist().await;
    }

    pub async fn on_headers_sent(&mut self, ev: HeadersSent) {
        if !ev.resource_type.is_captured(self.options.capture_async_requests) {
            return;
        }
        let outcome = self.ledger.attach_headers(&ev.url, ev.request_headers);
        self.after_enrich(&ev.url, outcome).await;
    }

    pub async fn on_response_started(&mut self, ev: ResponseStarted) {
        if !ev.resource_type.is_captured(self.options.capture_async_requests) {
            return;
        }
        let outcome = self.ledger.record_response(&ev.url, &ev.response_headers);
        if outcome.is_updated() {
            tracing::debug!(url = %ev.url, "range support observed, marking non-sequential");
        }
        self.after_enrich(&ev.url, outcome).await;
    }

    async fn after_enrich(&mut self, url: &str, outcome: EnrichOutcome) {
        match outcome {
            EnrichOutcome::Updated => self.persist().await,
            EnrichOutcome::Unchanged => {}
            EnrichOutcome::NoMatch => tracing::debug!(url, "no ledger record for event, dropped"),
        }
    }

    async fn persist(&self) {
        if let Err(e) = save_ledger(&self.store, &self.ledger.snapshot()).await {
            tracing::warn!("persist ledger snapshot: {:#}", e);
        }
    }

    /// Correlate a download against the durable snapshot and start its
    /// hand-off. Returns `Skipped` for blob sources, else `Correlated`.
    pub async fn on_download(&mut self, item: DownloadItem) -> DownloadState {
        tracing::debug!(download_id = item.id, state = DownloadState::Named.as_str(), url = %item.resolved_url());
        let descriptor = match correlate_from_store(&self.store, &item).await {
            Correlation::Skipped => return DownloadState::Skipped,
            Correlation::Matched(d) => d,
            Correlation::Missed(d) => {
                tracing::debug!(download_id = item.id, "no ledger record for download, best-effort hand-off");
                d
            }
        };
        tracing::debug!(
            download_id = item.id,
            state = DownloadState::Correlated.as_str(),
            method = %descriptor.method,
            sequential = descriptor.sequential
        );

        let client = self.client.clone();
        let sink = Arc::clone(&self.sink);
        let download_id = item.id;
        self.pending
            .spawn(async move { client.hand_off(&descriptor, download_id, sink.as_ref()).await });
        DownloadState::Correlated
    }

    /// Wait for every in-flight hand-off.
    pub async fn drain(&mut self) -> Vec<HandoffReport> {
        let mut reports = Vec::new();
        while let Some(joined) = self.pending.join_next().await {
            if let Some(report) = reap(joined) {
                reports.push(report);
            }
        }
        reports
    }

    /// Consume events until the sender side closes, then wait for the
    /// remaining hand-offs.
    pub async fn run(mut self, mut events: mpsc::Receiver<HostEvent>) -> RunSummary {
        let mut summary = RunSummary::default();
        loop {
            let step = tokio::select! {
                event = events.recv() => Step::Event(event),
                Some(joined) = self.pending.join_next(), if !self.pending.is_empty() => Step::Finished(joined),
            };
            match step {
                Step::Event(Some(event)) => self.handle(event).await,
                Step::Event(None) => break,
                Step::Finished(joined) => {
                    if let Some(report) = reap(joined) {
                        summary.record(&report);
                    }
                }
            }
        }
        while let Some(joined) = self.pending.join_next().await {
            if let Some(report) = reap(joined) {
                summary.record(&report);
            }
        }
        summary
    }
}

fn reap(joined: Result<HandoffReport, tokio::task::JoinError>) -> Option<HandoffReport> {
    match joined {
        Ok(report) => {
            tracing::debug!(
                download_id = report.download_id,
                url = %report.url,
                state = report.state.as_str(),
                failure = ?report.failure,
                "hand-off finished"
            );
            Some(report)
        }
        Err(e) => {
            tracing::error!("hand-off task failed: {}", e);
            None
        }
    }
}
