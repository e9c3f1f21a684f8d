use serde::{Deserialize, Deserializer, Serialize};

/// Fill color of a shop bubble/marker.
pub const SHOP_COLOR: &str = "#03dac6";
/// Fill color of the synthetic user bubble/marker.
pub const USER_COLOR: &str = "#3700b3";
pub const USER_LABEL: &str = "User";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Credential for the shop endpoint. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthToken(<{} chars>)", self.0.len())
    }
}

/// Body of `POST /tokens`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Which of the API's `x`/`y` fields holds the latitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopAxes {
    /// `x` is latitude, `y` is longitude.
    #[default]
    XLatitude,
    /// `x` is longitude, `y` is latitude.
    XLongitude,
}

/// One coffee shop as served by `GET /coffee_shops`.
///
/// Fields the finder does not use are kept in `extra` so the record can be
/// handed on unchanged. `distance` is filled in once the user's position is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopRecord {
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub x: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ShopRecord {
    pub fn coordinates(&self, axes: ShopAxes) -> Coordinates {
        match axes {
            ShopAxes::XLatitude => Coordinates::new(self.x, self.y),
            ShopAxes::XLongitude => Coordinates::new(self.y, self.x),
        }
    }
}

// The shop API has served coordinates both as JSON numbers and as strings.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    let value = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n,
        NumberOrString::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom)?,
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(format!(
            "coordinate must be finite, got {value}"
        )))
    }
}

/// A shop selected for display, closest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedShop {
    pub label: String,
    pub coordinates: Coordinates,
    pub distance_km: f64,
}

/// What the presenter draws: one bubble or map pin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub color: String,
    /// `None` serializes as `false`, the "no tooltip" value of the chart contract.
    #[serde(serialize_with = "tooltip_or_false")]
    pub custom_tooltip: Option<String>,
    pub value: u32,
}

impl Marker {
    pub fn shop(shop: &RankedShop) -> Self {
        Self {
            label: shop.label.clone(),
            latitude: shop.coordinates.latitude,
            longitude: shop.coordinates.longitude,
            color: SHOP_COLOR.to_string(),
            custom_tooltip: Some(format!("{} km", shop.distance_km)),
            value: 1,
        }
    }

    pub fn user(coords: Coordinates) -> Self {
        Self {
            label: USER_LABEL.to_string(),
            latitude: coords.latitude,
            longitude: coords.longitude,
            color: USER_COLOR.to_string(),
            custom_tooltip: None,
            value: 1,
        }
    }

    pub fn is_user(&self) -> bool {
        self.custom_tooltip.is_none() && self.label == USER_LABEL
    }
}

fn tooltip_or_false<S>(tooltip: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match tooltip {
        Some(text) => serializer.serialize_str(text),
        None => serializer.serialize_bool(false),
    }
}
