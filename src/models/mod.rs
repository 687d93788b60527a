mod api;

pub use api::{
    DatabaseStatus, EnrichmentSkippedResponse, GeoLocationResponse, HealthResponse,
    LookupResponse, WhoAmIResponse,
};
