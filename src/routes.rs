//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (applied in order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Sets X-Request-Id if missing
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← Span with request_id, client_ip, country
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ Propagate ID     │ ← Copies X-Request-Id to the response
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │      CORS        │ ← Cross-origin headers
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │      GeoIP       │ ← X-GeoIP-* headers, GeoRecord extension
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! # Routes
//!
//! - `/health` - Health and database metadata
//! - `/whoami` - The caller's enrichment
//! - `/lookup/{ip}` - Enrichment of an arbitrary address

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderName, Request};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, field, info, info_span};

use crate::handlers;
use crate::middleware::{GeoIpLayer, TrustedProxyConfig};
use crate::state::AppState;

/// Header name for request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the application router with all routes and middleware configured.
///
/// # Middleware Configuration
///
/// - **GeoIP**: forwarded header, trusted proxies and response headers
///   from the config, sharing the engine held in `state`
/// - **CORS**: Configured from `cors_allowed_origins`
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    // =========================================================================
    // Build Router with Routes
    // =========================================================================
    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/whoami", get(handlers::whoami))
        .route("/lookup/{ip}", get(handlers::lookup));

    // =========================================================================
    // Apply Middleware Stack (order matters - applied bottom to top)
    // =========================================================================

    // 1. GeoIP enrichment
    if config.proxy_validation_enabled() {
        info!(
            trusted_proxies = config.trusted_proxies.len(),
            "Forwarded-for chain restricted to trusted proxies"
        );
    } else {
        info!("Forwarded-for chain trusted from every peer (TRUSTED_PROXIES not set)");
    }
    router = router.layer(
        GeoIpLayer::new(state.enricher.clone())
            .forwarded_header(config.forwarded_header.clone())
            .trusted_proxies(TrustedProxyConfig::new(&config.trusted_proxies))
            .response_headers(config.response_headers),
    );

    // 2. CORS
    router = router.layer(build_cors_layer(&config.cors_allowed_origins));

    // 3. Request ID propagation to the response
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    router = router.layer(PropagateRequestIdLayer::new(request_id_header.clone()));

    // 4. Tracing
    router = router.layer(TraceLayer::new_for_http().make_span_with(make_request_span));

    // 5. Request ID generation (outermost, so the span can see it)
    router = router.layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid));

    router.with_state(state)
}

/// Per-request span. `client_ip` and `country` are filled in by the GeoIP
/// middleware once the request is enriched.
fn make_request_span(req: &Request<Body>) -> Span {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info_span!(
        "request",
        method = %req.method(),
        uri = %req.uri(),
        request_id = %request_id,
        client_ip = field::Empty,
        country = field::Empty,
    )
}

/// Build CORS layer from configuration.
///
/// # Arguments
///
/// * `allowed_origins` - List of allowed origins, or `["*"]` for any origin
///
/// # Security Note
///
/// Using `*` (any origin) is convenient for development but should be
/// avoided in production. Specify explicit origins instead.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    // Check if we should allow any origin
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Parse specific origins
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::net::SocketAddr;

    use axum::extract::ConnectInfo;
    use axum::http::StatusCode;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::geoip::GeoEnricher;
    use crate::geoip::fields;
    use crate::geoip::testing::{StubDatabase, mountain_view};

    fn router(config: Config) -> Router {
        let enricher =
            GeoEnricher::with_database(StubDatabase::default().with("8.8.8.8", mountain_view()));
        build_router(AppState::new(enricher, config))
    }

    fn request(uri: &str, peer: &str) -> Request<Body> {
        let mut req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    async fn json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_build_cors_layer_any() {
        let origins = vec!["*".to_string()];
        let _layer = build_cors_layer(&origins);
    }

    #[test]
    fn test_build_cors_layer_specific() {
        let origins = vec![
            "https://example.com".to_string(),
            "https://app.example.com".to_string(),
        ];
        let _layer = build_cors_layer(&origins);
    }

    #[tokio::test]
    async fn test_health_has_request_id() {
        let response = router(Config::default())
            .oneshot(request("/health", "127.0.0.1:4000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let body = json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"]["database_type"], "Stub-City");
    }

    #[tokio::test]
    async fn test_client_request_id_is_propagated() {
        let mut req = request("/health", "127.0.0.1:4000");
        req.headers_mut()
            .insert(REQUEST_ID_HEADER, "my-correlation-id".parse().unwrap());

        let response = router(Config::default()).oneshot(req).await.unwrap();

        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            "my-correlation-id"
        );
    }

    #[tokio::test]
    async fn test_whoami_through_full_stack() {
        let mut req = request("/whoami", "10.0.0.2:4000");
        req.headers_mut()
            .insert("x-forwarded-for", "8.8.8.8".parse().unwrap());

        let response = router(Config::default()).oneshot(req).await.unwrap();
        assert!(response.headers().get(fields::COUNTRY_CODE).is_none());

        let body = json(response).await;
        assert_eq!(body["enriched"], true);
        assert_eq!(body["location"]["country_iso_code"], "US");
        assert_eq!(body["location"]["client_ip"], "8.8.8.8");
    }

    #[tokio::test]
    async fn test_response_headers_from_config() {
        let config = Config {
            response_headers: true,
            ..Config::default()
        };

        let response = router(config)
            .oneshot(request("/health", "8.8.8.8:4000"))
            .await
            .unwrap();

        assert_eq!(response.headers().get(fields::COUNTRY_CODE).unwrap(), "US");
        assert_eq!(
            response.headers().get(fields::CLIENT_IP).unwrap(),
            "8.8.8.8"
        );
    }

    #[tokio::test]
    async fn test_whoami_reports_skip_reason() {
        let mut req = request("/whoami", "10.0.0.2:4000");
        req.headers_mut()
            .insert("x-forwarded-for", "unknown".parse().unwrap());

        let body = json(router(Config::default()).oneshot(req).await.unwrap()).await;

        assert_eq!(body["enriched"], false);
        assert_eq!(body["skipped"]["error"], "address_parse");
    }
}
