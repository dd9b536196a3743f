use async_trait::async_trait;

/// Reverse-geocodes GPS coordinates to a "City, Country" label (§4.6
/// digital-footprint block). Not among the external collaborators spec §6
/// defines a contract for — implementers may wire a real provider; the
/// renderer degrades to coordinates-only when this returns `None` or the
/// caller's 3 s deadline (§4.6) elapses first.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Option<String>;
}

/// Default resolver: no provider configured, always falls through to
/// coordinates-only rendering.
pub struct NoopGeoResolver;

#[async_trait]
impl GeoResolver for NoopGeoResolver {
    async fn reverse_geocode(&self, _lat: f64, _lon: f64) -> Option<String> {
        None
    }
}
