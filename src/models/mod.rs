pub mod black_scholes;

use crate::errors::{PricerError, PricerResult};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "Call"),
            Self::Put => write!(f, "Put"),
        }
    }
}

impl FromStr for OptionKind {
    type Err = PricerError;

    /// Accepts the dropdown values "call" / "put", case-insensitively.
    fn from_str(s: &str) -> PricerResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            _ => Err(PricerError::Computation(format!(
                "Invalid option type '{s}'. Use 'call' or 'put'."
            ))),
        }
    }
}

/// One trigger's worth of pricing inputs, minus the spot price which is
/// fetched at trigger time. Discarded after rendering.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PricingRequest {
    pub ticker: String,
    pub strike: f64,
    pub time_to_expiry: f64,
    pub risk_free_rate: f64,
    pub volatility: f64,
    pub option_kind: OptionKind,
}

/// All pricing models implement this trait.
/// price() must be a pure function: deterministic output from inputs only.
/// Send + Sync required for use behind the shared controller.
pub trait PricingModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Theoretical option value for `req` given the underlying's `spot`.
    /// Invalid inputs are a Computation error, never NaN or infinity.
    fn price(&self, req: &PricingRequest, spot: f64) -> PricerResult<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("call".parse::<OptionKind>().unwrap(), OptionKind::Call);
        assert_eq!("Put".parse::<OptionKind>().unwrap(), OptionKind::Put);
        assert_eq!(" PUT ".parse::<OptionKind>().unwrap(), OptionKind::Put);
    }

    #[test]
    fn test_parse_kind_rejects_unknown() {
        let err = "straddle".parse::<OptionKind>().unwrap_err();
        assert!(matches!(err, PricerError::Computation(_)));
        assert!(err.to_string().contains("'straddle'"), "got: {err}");
    }

    #[test]
    fn test_kind_display_capitalized() {
        assert_eq!(OptionKind::Call.to_string(), "Call");
        assert_eq!(OptionKind::Put.to_string(), "Put");
    }
}
