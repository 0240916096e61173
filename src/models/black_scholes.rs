use crate::errors::{PricerError, PricerResult};
use crate::models::{OptionKind, PricingModel, PricingRequest};
use statrs::distribution::{ContinuousCDF, Normal};

/// Black-Scholes European option pricing.
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
///
/// Call = S*Phi(d1) - K*exp(-rT)*Phi(d2)
/// Put  = K*exp(-rT)*Phi(-d2) - S*Phi(-d1)
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new() -> Self {
        Self {
            normal: Normal::standard(),
        }
    }

    /// (d1, d2) for already-validated inputs.
    #[inline]
    pub fn d1_d2(spot: f64, strike: f64, t: f64, r: f64, sigma: f64) -> (f64, f64) {
        let sigma_sqrt_t = sigma * t.sqrt();
        let d1 = ((spot / strike).ln() + (r + 0.5 * sigma * sigma) * t) / sigma_sqrt_t;
        (d1, d1 - sigma_sqrt_t)
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingModel for BlackScholes {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    fn price(&self, req: &PricingRequest, spot: f64) -> PricerResult<f64> {
        validate(req, spot)?;

        let t = req.time_to_expiry;
        let r = req.risk_free_rate;
        let (d1, d2) = Self::d1_d2(spot, req.strike, t, r, req.volatility);
        let discounted_strike = req.strike * (-r * t).exp();

        let price = match req.option_kind {
            OptionKind::Call => spot * self.normal.cdf(d1) - discounted_strike * self.normal.cdf(d2),
            OptionKind::Put => discounted_strike * self.normal.cdf(-d2) - spot * self.normal.cdf(-d1),
        };

        if !price.is_finite() {
            return Err(PricerError::Computation(format!(
                "non-finite {} price: {price}",
                req.option_kind
            )));
        }

        Ok(price)
    }
}

fn validate(req: &PricingRequest, spot: f64) -> PricerResult<()> {
    positive("spot price", spot)?;
    positive("strike price", req.strike)?;
    positive("time to expiration", req.time_to_expiry)?;
    positive("volatility", req.volatility)?;
    if !req.risk_free_rate.is_finite() {
        return Err(PricerError::Computation(format!(
            "risk-free rate must be finite, got {}",
            req.risk_free_rate
        )));
    }
    Ok(())
}

fn positive(name: &str, value: f64) -> PricerResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PricerError::Computation(format!(
            "{name} must be positive, got {value}"
        )))
    }
}
