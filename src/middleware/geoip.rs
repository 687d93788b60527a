//! GeoIP enrichment middleware.
//!
//! Runs the enrichment pipeline for every request that reaches the router:
//!
//! ```text
//! Request ─► strip client X-GeoIP-* ─► RequestMetadata ─► resolve ─► enrich
//!                                                                     │
//!          ┌────────────────────────── ok ─────────────────────────────┤
//!          ▼                                                           │ err
//!   X-GeoIP-* request headers                                          ▼
//!   GeoRecord extension                              EnrichmentSkipped extension
//!   span fields (client_ip, country)                 warn log
//!   X-GeoIP-* response headers (optional)
//! ```
//!
//! A failed enrichment never fails the request. The handler still runs,
//! without geo headers, and can inspect [`EnrichmentSkipped`] to learn why.
//! The request is not passed on untouched, though: client-sent `X-GeoIP-*`
//! headers are removed before resolution, so they are gone on failure too.
//!
//! # Example
//!
//! ```rust,ignore
//! let enricher = Arc::new(GeoEnricher::open("/etc/geoip/GeoLite2-City.mmdb")?);
//! let app = Router::new()
//!     .route("/", get(handler))
//!     .layer(GeoIpLayer::new(enricher).response_headers(true));
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderName, Request, Response};
use tower::{Layer, Service};
use tracing::{Span, debug, warn};

use super::ip::{X_FORWARDED_FOR, request_metadata};
use super::trusted_proxy::TrustedProxyConfig;
use crate::geoip::fields::{self, GeoField};
use crate::geoip::{GeoEnricher, GeoIpError, GeoRecord, RequestMetadata, resolve};
use crate::metrics;

/// Request extension recording why a request was not enriched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentSkipped(pub GeoIpError);

/// Tower layer attaching geo enrichment to every request.
#[derive(Clone)]
pub struct GeoIpLayer {
    enricher: Arc<GeoEnricher>,
    forwarded_header: HeaderName,
    trusted_proxies: Arc<TrustedProxyConfig>,
    response_headers: bool,
}

impl GeoIpLayer {
    /// Layer reading `X-Forwarded-For`, trusting every peer, request headers only.
    pub fn new(enricher: Arc<GeoEnricher>) -> Self {
        Self {
            enricher,
            forwarded_header: HeaderName::from_static(X_FORWARDED_FOR),
            trusted_proxies: Arc::new(TrustedProxyConfig::default()),
            response_headers: false,
        }
    }

    /// Read the forwarded-for chain from `header` instead.
    pub fn forwarded_header(mut self, header: HeaderName) -> Self {
        self.forwarded_header = header;
        self
    }

    /// Only honor the forwarded-for chain from these peers.
    pub fn trusted_proxies(mut self, trusted_proxies: TrustedProxyConfig) -> Self {
        self.trusted_proxies = Arc::new(trusted_proxies);
        self
    }

    /// Also copy the enrichment fields onto the response.
    pub fn response_headers(mut self, enabled: bool) -> Self {
        self.response_headers = enabled;
        self
    }
}

impl<S> Layer<S> for GeoIpLayer {
    type Service = GeoIpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GeoIpService {
            inner,
            layer: self.clone(),
        }
    }
}

/// Service produced by [`GeoIpLayer`].
#[derive(Clone)]
pub struct GeoIpService<S> {
    inner: S,
    layer: GeoIpLayer,
}

impl<S> Service<Request<Body>> for GeoIpService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        // Client-supplied values must never reach the handler as if we set them
        fields::strip_from_headers(req.headers_mut());

        let metadata = request_metadata(
            &req,
            &self.layer.forwarded_header,
            &self.layer.trusted_proxies,
        );

        let response_fields = match enrich_request(&self.layer.enricher, &metadata) {
            Ok(record) => {
                let rendered = fields::render(&record);
                let skipped = fields::apply_to_headers(&rendered, req.headers_mut());
                if !skipped.is_empty() {
                    warn!(
                        client_ip = %record.client_ip,
                        headers = ?skipped,
                        "Skipped enrichment headers with invalid values"
                    );
                }
                req.extensions_mut().insert(record);
                self.layer.response_headers.then_some(rendered)
            }
            Err(e) => {
                req.extensions_mut().insert(EnrichmentSkipped(e));
                None
            }
        };

        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = inner.call(req).await?;

            if let Some(rendered) = response_fields {
                copy_to_response(&rendered, &mut response);
            }

            Ok(response)
        })
    }
}

/// Resolve and enrich one request, recording logs and metrics.
///
/// This is the boundary where pipeline errors are absorbed: failures are
/// logged at `warn`, counted, and returned for the caller to attach to the
/// request.
pub fn enrich_request(
    enricher: &GeoEnricher,
    metadata: &RequestMetadata,
) -> Result<GeoRecord, GeoIpError> {
    let ip = match resolve(metadata) {
        Ok(ip) => ip,
        Err(e) => {
            warn!(
                error = %e,
                remote_address = %metadata.remote_address,
                forwarded_for = ?metadata.forwarded_for,
                "Unable to resolve client address"
            );
            metrics::record_enrichment(metrics::outcome::RESOLVE_ERROR);
            return Err(e);
        }
    };

    let start = Instant::now();
    let result = enricher.enrich_with_outcome(ip);
    metrics::record_lookup_duration(start.elapsed().as_secs_f64());

    match result {
        Ok((record, outcome)) => {
            let span = Span::current();
            span.record("client_ip", record.client_ip.as_str());
            span.record("country", record.country_iso_code.as_str());

            debug!(
                client_ip = %record.client_ip,
                country = %record.country_iso_code,
                city = %record.city_name,
                outcome = outcome.as_str(),
                "Request enriched"
            );
            metrics::record_enrichment(outcome.as_str());
            Ok(record)
        }
        Err(e) => {
            warn!(error = %e, client_ip = %ip, "GeoIP lookup failed");
            metrics::record_enrichment(metrics::outcome::LOOKUP_ERROR);
            Err(e)
        }
    }
}

fn copy_to_response(rendered: &[GeoField], response: &mut Response<Body>) {
    // Values already passed header validation on the request side
    fields::apply_to_headers(rendered, response.headers_mut());
}
