//! User location resolution for the coffee finder.
//!
//! The pipeline asks a [`Geolocator`] for the user's position exactly once
//! per session. Two sources exist: IP geolocation through the IpApi service
//! ([`IpGeolocator`]) and a position pinned in `config.toml` ([`FixedLocation`]).
//! Neither falls back to a made-up position; a failed lookup is reported as
//! [`FinderError::LocationUnavailable`].

use async_trait::async_trait;
use ipgeolocate::{Locator, Service};
use tracing::{error, info};

use crate::config::LocationConfig;
use crate::error::FinderError;
use crate::models::Coordinates;

/// A single-shot source of the user's current coordinates.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Resolves the user's position.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::LocationUnavailable`] when the provider refuses,
    /// fails, or answers with coordinates that cannot be used.
    async fn locate(&self) -> Result<Coordinates, FinderError>;
}

/// Resolves the user's approximate location via IP geolocation.
///
/// Uses the [IpApi](https://ip-api.com/) service. An empty `ip` asks the
/// service about the caller's own public address.
pub struct IpGeolocator {
    ip: String,
}

impl IpGeolocator {
    pub fn new(ip: impl Into<String>) -> Self {
        Self { ip: ip.into() }
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn locate(&self) -> Result<Coordinates, FinderError> {
        let loc = Locator::get(&self.ip, Service::IpApi).await.map_err(|e| {
            error!("Error using geolocation service: {}", e);
            FinderError::LocationUnavailable(e.to_string())
        })?;

        let coords = parse_coordinates(&loc.latitude, &loc.longitude)?;
        info!(
            latitude = coords.latitude,
            longitude = coords.longitude,
            "Geolocation successful"
        );
        Ok(coords)
    }
}

/// A position pinned in configuration. Never fails.
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl Geolocator for FixedLocation {
    async fn locate(&self) -> Result<Coordinates, FinderError> {
        info!(
            latitude = self.0.latitude,
            longitude = self.0.longitude,
            "Using configured location"
        );
        Ok(self.0)
    }
}

/// Picks the geolocator described by the `[location]` section.
pub fn from_config(config: &LocationConfig) -> Box<dyn Geolocator> {
    if config.auto_locate {
        Box::new(IpGeolocator::new(config.lookup_ip.clone()))
    } else {
        Box::new(FixedLocation(Coordinates::new(
            config.manual_lat,
            config.manual_lon,
        )))
    }
}

fn parse_coordinates(lat: &str, lon: &str) -> Result<Coordinates, FinderError> {
    let parse = |raw: &str, what: &str, limit: f64| {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.abs() <= limit)
            .ok_or_else(|| {
                FinderError::LocationUnavailable(format!("provider sent {what} {raw:?}"))
            })
    };
    Ok(Coordinates::new(
        parse(lat, "latitude", 90.0)?,
        parse(lon, "longitude", 180.0)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_strings() {
        let coords = parse_coordinates("37.7749", " -122.4194").unwrap();
        assert_eq!(coords, Coordinates::new(37.7749, -122.4194));
    }

    #[test]
    fn rejects_empty_and_out_of_range_values() {
        assert!(matches!(
            parse_coordinates("", "10"),
            Err(FinderError::LocationUnavailable(_))
        ));
        assert!(matches!(
            parse_coordinates("91", "10"),
            Err(FinderError::LocationUnavailable(_))
        ));
        assert!(matches!(
            parse_coordinates("10", "NaN"),
            Err(FinderError::LocationUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn fixed_location_returns_configured_point() {
        let geo = FixedLocation(Coordinates::new(1.0, 2.0));
        assert_eq!(geo.locate().await.unwrap(), Coordinates::new(1.0, 2.0));
    }

    #[tokio::test]
    async fn manual_config_selects_fixed_location() {
        let config = LocationConfig {
            auto_locate: false,
            lookup_ip: String::new(),
            manual_lat: 48.8566,
            manual_lon: 2.3522,
        };
        let geo = from_config(&config);
        assert_eq!(
            geo.locate().await.unwrap(),
            Coordinates::new(48.8566, 2.3522)
        );
    }
}
