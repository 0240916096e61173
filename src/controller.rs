use crate::errors::{PricerError, PricerResult};
use crate::feeds::quote_api::QuoteSource;
use crate::models::black_scholes::BlackScholes;
use crate::models::{OptionKind, PricingModel, PricingRequest};
use tracing::Instrument;

// ── Controller State Machine ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    Idle,
    Computing,
}

// ── Bound form values ──

/// The six editable fields. Numeric fields may be empty, like an HTML
/// number input. `option_kind` holds the raw dropdown value and is only
/// parsed when pricing.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FormFields {
    pub ticker: String,
    pub strike: Option<f64>,
    pub time_to_expiry: Option<f64>,
    pub risk_free_rate: Option<f64>,
    pub volatility: Option<f64>,
    pub option_kind: String,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            ticker: "AAPL".into(),
            strike: Some(110.0),
            time_to_expiry: Some(1.0),
            risk_free_rate: Some(0.05),
            volatility: Some(0.2),
            option_kind: "call".into(),
        }
    }
}

impl FormFields {
    pub fn with_ticker(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            ..Self::default()
        }
    }

    fn to_request(&self) -> PricerResult<PricingRequest> {
        Ok(PricingRequest {
            ticker: self.ticker.clone(),
            strike: required("strike price", self.strike)?,
            time_to_expiry: required("time to expiration", self.time_to_expiry)?,
            risk_free_rate: required("risk-free rate", self.risk_free_rate)?,
            volatility: required("volatility", self.volatility)?,
            option_kind: self.option_kind.parse::<OptionKind>()?,
        })
    }
}

fn required(name: &str, value: Option<f64>) -> PricerResult<f64> {
    value.ok_or_else(|| PricerError::Computation(format!("{name} is required")))
}

/// A partial edit. Absent keys leave the field unchanged; an explicit
/// `null` on a numeric key empties it.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct FieldUpdate {
    pub ticker: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub strike: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub time_to_expiry: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub risk_free_rate: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub volatility: Option<Option<f64>>,
    pub option_kind: Option<String>,
}

fn nullable<'de, D>(de: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    <Option<f64> as serde::Deserialize>::deserialize(de).map(Some)
}

// ── Rendered output ──

/// What the output area shows. `Display` yields the exact user-visible text.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Prompt,
    LookupFailed(String),
    PricingFailed(String),
    Price { kind: OptionKind, price: f64 },
}

impl std::fmt::Display for Rendered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prompt => write!(f, "Enter values and press Calculate."),
            Self::LookupFailed(e) => write!(f, "Error fetching stock price: {e}"),
            Self::PricingFailed(e) => write!(f, "Error calculating option price: {e}"),
            Self::Price { kind, price } => write!(f, "The {kind} Option Price is: ${price:.2}"),
        }
    }
}

// ── Calculation outcome ──

/// Result of one lookup + pricing pass. Every trigger ends in exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Priced { kind: OptionKind, price: f64, spot: f64 },
    LookupFailed(String),
    PricingFailed { spot: f64, detail: String },
}

impl Outcome {
    pub fn spot(&self) -> Option<f64> {
        match self {
            Self::Priced { spot, .. } | Self::PricingFailed { spot, .. } => Some(*spot),
            Self::LookupFailed(_) => None,
        }
    }

    pub fn rendered(&self) -> Rendered {
        match self {
            Self::Priced { kind, price, .. } => Rendered::Price { kind: *kind, price: *price },
            Self::LookupFailed(e) => Rendered::LookupFailed(e.clone()),
            Self::PricingFailed { detail, .. } => Rendered::PricingFailed(detail.clone()),
        }
    }
}

// ── Controller ──

/// Owns the form fields and the rendered output. Field edits never
/// recompute. A trigger is split in two so no lock is held during the
/// quote lookup: `begin` snapshots the fields and enters Computing,
/// `finish` stores the outcome and returns to Idle.
#[derive(Debug, Clone)]
pub struct FormController {
    fields: FormFields,
    state: ControllerState,
    has_triggered: bool,
    output: Rendered,
    last_spot: Option<f64>,
}

impl FormController {
    pub fn new(fields: FormFields) -> Self {
        Self {
            fields,
            state: ControllerState::Idle,
            has_triggered: false,
            output: Rendered::Prompt,
            last_spot: None,
        }
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn has_triggered(&self) -> bool {
        self.has_triggered
    }

    pub fn output(&self) -> &Rendered {
        &self.output
    }

    pub fn last_spot(&self) -> Option<f64> {
        self.last_spot
    }

    /// Apply a field edit. The output is left as-is.
    pub fn update_fields(&mut self, update: FieldUpdate) {
        if let Some(t) = update.ticker {
            self.fields.ticker = t;
        }
        if let Some(v) = update.strike {
            self.fields.strike = v;
        }
        if let Some(v) = update.time_to_expiry {
            self.fields.time_to_expiry = v;
        }
        if let Some(v) = update.risk_free_rate {
            self.fields.risk_free_rate = v;
        }
        if let Some(v) = update.volatility {
            self.fields.volatility = v;
        }
        if let Some(k) = update.option_kind {
            self.fields.option_kind = k;
        }
    }

    /// Idle -> Computing. Returns the field values as of the trigger.
    pub fn begin(&mut self) -> FormFields {
        self.has_triggered = true;
        self.state = ControllerState::Computing;
        self.fields.clone()
    }

    /// Computing -> Idle, rendering the outcome.
    pub fn finish(&mut self, outcome: &Outcome) {
        self.output = outcome.rendered();
        self.last_spot = outcome.spot();
        self.state = ControllerState::Idle;
    }
}

// ── Calculator ──

/// Quote lookup + Black-Scholes over a field snapshot. Holds no form
/// state, so it runs without the controller lock.
pub struct Calculator<Q: QuoteSource> {
    quotes: Q,
    model: BlackScholes,
}

impl<Q: QuoteSource> Calculator<Q> {
    pub fn new(quotes: Q) -> Self {
        Self {
            quotes,
            model: BlackScholes::new(),
        }
    }

    pub async fn run(&self, fields: &FormFields) -> Outcome {
        let calc_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("calculate", %calc_id, ticker = %fields.ticker);
        self.calculate(fields).instrument(span).await
    }

    async fn calculate(&self, fields: &FormFields) -> Outcome {
        tracing::info!(kind = %fields.option_kind, "calculation triggered");

        let spot = match self.quotes.fetch_latest_close(&fields.ticker).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "stock price fetch failed");
                return Outcome::LookupFailed(e.to_string());
            }
        };

        match self.price(fields, spot) {
            Ok((kind, price)) => {
                tracing::info!(model = self.model.name(), spot = spot, price = price, "option priced");
                Outcome::Priced { kind, price, spot }
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "option pricing failed");
                Outcome::PricingFailed { spot, detail: e.to_string() }
            }
        }
    }

    fn price(&self, fields: &FormFields, spot: f64) -> PricerResult<(OptionKind, f64)> {
        let req = fields.to_request()?;
        let price = self.model.price(&req, spot)?;
        Ok((req.option_kind, price))
    }
}
