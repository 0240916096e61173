use crate::controller::FieldUpdate;
use crate::feeds::quote_api::QuoteSource;
use crate::state::{AppState, FormView};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use portable_atomic::Ordering::Relaxed;
use std::sync::Arc;

/// GET /api/form -- latest form snapshot (from watch channel, no lock)
pub async fn get_form<Q: QuoteSource + 'static>(
    State(state): State<Arc<AppState<Q>>>,
) -> Json<FormView> {
    Json(state.snapshot())
}

/// POST /api/fields -- edit bound values (never recomputes)
pub async fn update_fields<Q: QuoteSource + 'static>(
    State(state): State<Arc<AppState<Q>>>,
    Json(update): Json<FieldUpdate>,
) -> Json<FormView> {
    Json(state.edit(update).await)
}

/// POST /api/calculate -- the trigger: fetch spot, price, render.
/// An optional JSON body carries the field values as of the click.
pub async fn calculate<Q: QuoteSource + 'static>(
    State(state): State<Arc<AppState<Q>>>,
    body: Bytes,
) -> Result<Json<FormView>, (StatusCode, String)> {
    let update = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let update: FieldUpdate = serde_json::from_slice(&body)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid field values: {e}")))?;
        Some(update)
    };

    Ok(Json(state.trigger(update).await))
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters<Q: QuoteSource + 'static>(
    State(state): State<Arc<AppState<Q>>>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "calculations_triggered": state.counters.calculations_triggered.load(Relaxed),
        "prices_computed": state.counters.prices_computed.load(Relaxed),
        "lookup_failures": state.counters.lookup_failures.load(Relaxed),
        "pricing_failures": state.counters.pricing_failures.load(Relaxed),
        "field_edits": state.counters.field_edits.load(Relaxed),
        "ws_messages_sent": state.counters.ws_messages_sent.load(Relaxed),
    }))
}

#[cfg(test)]
mod tests {
    use crate::controller::tests::StubQuotes;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn send(app: axum::Router, req: Request<Body>) -> serde_json::Value {
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::post(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_form_starts_with_prompt() {
        let state = AppState::new("AAPL", StubQuotes::price(110.0));
        let app = crate::server::router(state, "static");
        let form = send(app, get("/api/form")).await;
        assert_eq!(form["output"], "Enter values and press Calculate.");
        assert_eq!(form["state"], "idle");
        assert_eq!(form["has_triggered"], false);
        assert_eq!(form["fields"]["ticker"], "AAPL");
        assert_eq!(form["fields"]["option_kind"], "call");
    }

    #[tokio::test]
    async fn test_calculate_renders_price() {
        let state = AppState::new("AAPL", StubQuotes::price(110.0));
        let app = crate::server::router(state.clone(), "static");
        let form = send(app.clone(), post_empty("/api/calculate")).await;
        assert_eq!(form["output"], "The Call Option Price is: $11.50");
        assert_eq!(form["spot"], 110.0);
        assert_eq!(form["has_triggered"], true);

        let counters = send(app, get("/api/counters")).await;
        assert_eq!(counters["calculations_triggered"], 1);
        assert_eq!(counters["prices_computed"], 1);
    }

    #[tokio::test]
    async fn test_field_edit_keeps_output() {
        let state = AppState::new("AAPL", StubQuotes::price(100.0));
        let app = crate::server::router(state, "static");
        let form = send(
            app.clone(),
            post_json("/api/fields", r#"{"ticker":"MSFT","strike":100,"option_kind":"put"}"#),
        )
        .await;
        assert_eq!(form["output"], "Enter values and press Calculate.");
        assert_eq!(form["fields"]["ticker"], "MSFT");

        let form = send(app, post_empty("/api/calculate")).await;
        assert_eq!(form["output"], "The Put Option Price is: $5.57");
    }

    #[tokio::test]
    async fn test_calculate_body_applies_fields_before_pricing() {
        let state = AppState::new("AAPL", StubQuotes::price(100.0));
        let app = crate::server::router(state, "static");
        let body = r#"{"ticker":"MSFT","strike":100,"time_to_expiry":1,
            "risk_free_rate":0.05,"volatility":0.2,"option_kind":"put"}"#;
        let form = send(app.clone(), post_json("/api/calculate", body)).await;
        assert_eq!(form["output"], "The Put Option Price is: $5.57");
        assert_eq!(form["fields"]["ticker"], "MSFT");

        let form = send(app, get("/api/form")).await;
        assert_eq!(form["fields"]["option_kind"], "put");
        assert_eq!(form["state"], "idle");
    }

    #[tokio::test]
    async fn test_calculate_rejects_malformed_body() {
        let state = AppState::new("AAPL", StubQuotes::price(100.0));
        let app = crate::server::router(state, "static");
        let resp = app.oneshot(post_json("/api/calculate", "{not json")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_form_and_fields_respond_during_slow_lookup() {
        let quotes = StubQuotes::price(110.0).slow(std::time::Duration::from_secs(1));
        let state = AppState::new("AAPL", quotes);
        let app = crate::server::router(state, "static");

        let calc = tokio::spawn(send(app.clone(), post_empty("/api/calculate")));
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let limit = std::time::Duration::from_millis(300);
        let form = tokio::time::timeout(limit, send(app.clone(), get("/api/form")))
            .await
            .expect("GET /api/form waited on the lookup");
        assert_eq!(form["state"], "computing");

        let form = tokio::time::timeout(limit, send(app.clone(), post_json("/api/fields", r#"{"volatility":0.3}"#)))
            .await
            .expect("POST /api/fields waited on the lookup");
        assert_eq!(form["fields"]["volatility"], 0.3);

        let done = calc.await.unwrap();
        assert_eq!(done["output"], "The Call Option Price is: $11.50");
        assert_eq!(done["state"], "idle");
    }

    #[tokio::test]
    async fn test_lookup_failure_counted() {
        let state = AppState::new("ZZZZ", StubQuotes::failing("no price data found for ZZZZ"));
        let app = crate::server::router(state, "static");
        let form = send(app.clone(), post_empty("/api/calculate")).await;
        assert_eq!(form["output"], "Error fetching stock price: no price data found for ZZZZ");

        let counters = send(app, get("/api/counters")).await;
        assert_eq!(counters["lookup_failures"], 1);
        assert_eq!(counters["prices_computed"], 0);
    }
}
