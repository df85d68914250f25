use serde::{Deserialize, Serialize};

/// Delivery location as stored on orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Location payload as it arrives from the map picker.
///
/// Two shapes are in circulation. Convert to [`GeoLocation`] right away;
/// nothing past the request boundary handles this type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawGeolocation {
    Nested {
        coordinates: Coordinates,
        #[serde(default)]
        address: Option<String>,
    },
    Flat {
        lat: f64,
        lng: f64,
        #[serde(default)]
        address: Option<String>,
    },
}

impl From<RawGeolocation> for GeoLocation {
    fn from(raw: RawGeolocation) -> Self {
        let (lat, lng, address) = match raw {
            RawGeolocation::Nested {
                coordinates,
                address,
            } => (coordinates.lat, coordinates.lng, address),
            RawGeolocation::Flat { lat, lng, address } => (lat, lng, address),
        };
        GeoLocation {
            lat,
            lng,
            address: address.filter(|a| !a.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_both_shapes_normalize_to_the_same_value() {
        let nested: RawGeolocation = serde_json::from_value(json!({
            "coordinates": {"lat": -17.39, "lng": -66.15},
            "address": "Av. Heroinas 123"
        }))
        .unwrap();
        let flat: RawGeolocation = serde_json::from_value(json!({
            "lat": -17.39, "lng": -66.15, "address": "Av. Heroinas 123"
        }))
        .unwrap();

        assert_eq!(GeoLocation::from(nested), GeoLocation::from(flat));
    }

    #[test]
    fn test_blank_address_is_dropped() {
        let raw: RawGeolocation =
            serde_json::from_value(json!({"lat": 1.0, "lng": 2.0, "address": "  "})).unwrap();
        assert_eq!(GeoLocation::from(raw).address, None);
    }

    #[test]
    fn test_missing_coordinates_is_rejected() {
        let raw = serde_json::from_value::<RawGeolocation>(json!({"address": "nowhere"}));
        assert!(raw.is_err());
    }
}
