use crate::controller::{Calculator, ControllerState, FieldUpdate, FormController, FormFields, Outcome};
use crate::feeds::quote_api::QuoteSource;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};

// ── Messages OUT to the browser ──

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "form")]
    Form(FormView),
}

/// Everything the page needs to draw itself.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FormView {
    pub fields: FormFields,
    pub state: ControllerState,
    pub has_triggered: bool,
    pub output: String,
    pub spot: Option<f64>,
}

impl FormView {
    pub fn of(ctl: &FormController) -> Self {
        Self {
            fields: ctl.fields().clone(),
            state: ctl.state(),
            has_triggered: ctl.has_triggered(),
            output: ctl.output().to_string(),
            spot: ctl.last_spot(),
        }
    }
}

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub calculations_triggered: AtomicU64,
    pub prices_computed: AtomicU64,
    pub lookup_failures: AtomicU64,
    pub pricing_failures: AtomicU64,
    pub field_edits: AtomicU64,
    pub ws_messages_sent: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            calculations_triggered: AtomicU64::new(0),
            prices_computed: AtomicU64::new(0),
            lookup_failures: AtomicU64::new(0),
            pricing_failures: AtomicU64::new(0),
            field_edits: AtomicU64::new(0),
            ws_messages_sent: AtomicU64::new(0),
        }
    }

    fn record(&self, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Priced { .. } => &self.prices_computed,
            Outcome::LookupFailed(_) => &self.lookup_failures,
            Outcome::PricingFailed { .. } => &self.pricing_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ── Application shared state (channels, not locks) ──

pub struct AppState<Q: QuoteSource> {
    // Form state. Only held for in-memory updates, never across the lookup.
    controller: Mutex<FormController>,

    calculator: Calculator<Q>,

    // At most one calculation in flight; later triggers queue here.
    calc_gate: Mutex<()>,

    // Controller -> readers: latest form (watch = single producer, multi consumer)
    pub snapshot_tx: watch::Sender<FormView>,
    pub snapshot_rx: watch::Receiver<FormView>,

    // Controller -> browsers: event stream (broadcast for WS clients)
    pub ws_tx: broadcast::Sender<WsMessage>,

    pub counters: PerfCounters,
}

impl<Q: QuoteSource> AppState<Q> {
    pub fn new(default_ticker: &str, quotes: Q) -> Arc<Self> {
        let (ws_tx, _) = broadcast::channel(256);
        let controller = FormController::new(FormFields::with_ticker(default_ticker));
        let (snapshot_tx, snapshot_rx) = watch::channel(FormView::of(&controller));

        Arc::new(Self {
            controller: Mutex::new(controller),
            calculator: Calculator::new(quotes),
            calc_gate: Mutex::new(()),
            snapshot_tx,
            snapshot_rx,
            ws_tx,
            counters: PerfCounters::new(),
        })
    }

    /// Latest published form. Never waits on a calculation.
    pub fn snapshot(&self) -> FormView {
        self.snapshot_rx.borrow().clone()
    }

    /// Apply a field edit and publish. Does not recompute.
    pub async fn edit(&self, update: FieldUpdate) -> FormView {
        self.counters.field_edits.fetch_add(1, Ordering::Relaxed);
        let mut ctl = self.controller.lock().await;
        ctl.update_fields(update);
        self.publish(&ctl)
    }

    /// One trigger. `update`, when present, is applied under the same lock
    /// that snapshots the fields, so the calculation sees it.
    pub async fn trigger(&self, update: Option<FieldUpdate>) -> FormView {
        self.counters.calculations_triggered.fetch_add(1, Ordering::Relaxed);
        let _gate = self.calc_gate.lock().await;

        let fields = {
            let mut ctl = self.controller.lock().await;
            if let Some(u) = update {
                ctl.update_fields(u);
            }
            let fields = ctl.begin();
            self.publish(&ctl);
            fields
        };

        let outcome = self.calculator.run(&fields).await;
        self.counters.record(&outcome);

        let mut ctl = self.controller.lock().await;
        ctl.finish(&outcome);
        self.publish(&ctl)
    }

    // Called with the controller lock held so publishes stay in order.
    fn publish(&self, ctl: &FormController) -> FormView {
        let view = FormView::of(ctl);
        self.snapshot_tx.send_replace(view.clone());
        self.broadcast(WsMessage::Form(view.clone()));
        view
    }

    #[inline]
    pub fn broadcast(&self, msg: WsMessage) {
        self.counters.ws_messages_sent.fetch_add(1, Ordering::Relaxed);
        let _ = self.ws_tx.send(msg);
    }
}
