//! Tri-layer delivery estimation:
//! 1. geocode the shipping address (full address, then city/state/pincode,
//!    then bare pincode) via Nominatim,
//! 2. route store → customer via OSRM,
//! 3. fall back to haversine distance with an urban-tortuosity factor when
//!    routing is unavailable.
//!
//! Geocoding failures degrade to a "could not map this location" response
//! rather than an error; the endpoint must never 5xx because a third-party
//! mapping service is down.

use crate::config::AppConfig;
use crate::errors::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const OSRM_URL: &str = "http://router.project-osrm.org/route/v1/driving";
const USER_AGENT: &str = "makermart-backend/0.1";

const PROCESSING_MINUTES: f64 = 45.0;
const TRAFFIC_BUFFER_MINUTES: f64 = 15.0;
/// Straight-line to road-distance factor for urban areas.
const URBAN_TORTUOSITY: f64 = 1.4;
/// Average speed assumed by the geometric fallback, km/h.
const FALLBACK_SPEED_KMH: f64 = 30.0;

#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
  #[serde(default)]
  pub address_line1: String,
  #[serde(default)]
  pub city: String,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub pincode: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DeliveryEstimate {
  Allowed {
    allowed: bool,
    distance_km: f64,
    estimated_hours: i64,
    details: String,
    method: String,
  },
  Refused {
    allowed: bool,
    reason: String,
  },
}

impl DeliveryEstimate {
  fn refused(reason: impl Into<String>) -> Self {
    DeliveryEstimate::Refused {
      allowed: false,
      reason: reason.into(),
    }
  }
}

pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
  const EARTH_RADIUS_KM: f64 = 6371.0;
  let phi1 = lat1.to_radians();
  let phi2 = lat2.to_radians();
  let dphi = (lat2 - lat1).to_radians();
  let dlambda = (lon2 - lon1).to_radians();

  let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
  let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
  EARTH_RADIUS_KM * c
}

/// Geocoding queries in decreasing precision, each paired with the label
/// reported back as the estimate's method. Empty components are skipped;
/// the full-address candidate requires an address line (a query made of
/// region components alone is a region geocode, not an exact one).
pub fn candidate_queries(addr: &AddressInput) -> Vec<(String, &'static str)> {
  let full: Vec<&str> = [
    addr.address_line1.as_str(),
    addr.city.as_str(),
    addr.state.as_str(),
    addr.pincode.as_str(),
  ]
  .into_iter()
  .filter(|p| !p.is_empty())
  .collect();
  let region: Vec<&str> = [addr.city.as_str(), addr.state.as_str(), addr.pincode.as_str()]
    .into_iter()
    .filter(|p| !p.is_empty())
    .collect();

  let full_query = if addr.address_line1.is_empty() {
    String::new()
  } else {
    full.join(", ")
  };

  let mut queries: Vec<(String, &'static str)> = Vec::new();
  for (candidate, label) in [
    (full_query, "exact_geocode"),
    (region.join(", "), "region_geocode"),
    (addr.pincode.clone(), "pincode_geocode"),
  ] {
    if !candidate.is_empty() && !queries.iter().any(|(q, _)| q == &candidate) {
      queries.push((candidate, label));
    }
  }
  queries
}

// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
  lat: String,
  lon: String,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
  distance: f64, // meters
  duration: f64, // seconds
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
  code: String,
  #[serde(default)]
  routes: Vec<OsrmRoute>,
}

async fn geocode(http: &reqwest::Client, query: &str) -> Option<(f64, f64)> {
  let resp = http
    .get(NOMINATIM_URL)
    .header("User-Agent", USER_AGENT)
    .query(&[("q", query), ("format", "json"), ("limit", "1")])
    .send()
    .await
    .ok()?;
  if !resp.status().is_success() {
    return None;
  }
  let places: Vec<NominatimPlace> = resp.json().await.ok()?;
  let place = places.into_iter().next()?;
  Some((place.lat.parse().ok()?, place.lon.parse().ok()?))
}

async fn osrm_route(http: &reqwest::Client, from: (f64, f64), to: (f64, f64)) -> Option<(f64, f64)> {
  // OSRM takes lon,lat pairs.
  let url = format!(
    "{}/{},{};{},{}?overview=false",
    OSRM_URL, from.1, from.0, to.1, to.0
  );
  let resp = http
    .get(&url)
    .timeout(std::time::Duration::from_secs(3))
    .send()
    .await
    .ok()?;
  if !resp.status().is_success() {
    return None;
  }
  let parsed: OsrmResponse = resp.json().await.ok()?;
  if parsed.code != "Ok" {
    return None;
  }
  let route = parsed.routes.into_iter().next()?;
  Some((route.distance / 1000.0, route.duration / 60.0))
}

/// Final arithmetic of the estimate, kept pure for testing: applies the
/// radius limit, adds processing and traffic buffers, rounds up to whole
/// hours with a floor of one.
pub fn finalize_estimate(distance_km: f64, drive_minutes: f64, radius_limit_km: f64, method: String) -> DeliveryEstimate {
  if distance_km > radius_limit_km {
    return DeliveryEstimate::refused(format!(
      "Delivery radius exceeded ({}km). Limit {}km.",
      distance_km as i64, radius_limit_km as i64
    ));
  }

  let total_minutes = drive_minutes + PROCESSING_MINUTES + TRAFFIC_BUFFER_MINUTES;
  let mut total_hours = (total_minutes / 60.0).ceil() as i64;
  if total_hours < 1 {
    total_hours = 1;
  }

  DeliveryEstimate::Allowed {
    allowed: true,
    distance_km: (distance_km * 10.0).round() / 10.0,
    estimated_hours: total_hours,
    details: format!(
      "{} hrs ({} mins drive + prep time)",
      total_hours, drive_minutes as i64
    ),
    method,
  }
}

#[instrument(name = "geo::estimate_delivery", skip(http, config, addr))]
pub async fn estimate_delivery(
  http: &reqwest::Client,
  config: &AppConfig,
  addr: &AddressInput,
) -> Result<DeliveryEstimate> {
  // Store origin: try a live geocode, fall back to the configured
  // coordinates so a Nominatim outage never blocks estimation.
  let store_coords = match geocode(http, &config.store_address).await {
    Some(coords) => coords,
    None => (config.store_lat, config.store_lon),
  };

  // Customer location: decreasing-precision candidates.
  let mut user_coords = None;
  let mut geocode_method = "none";
  for (query, label) in candidate_queries(addr) {
    if let Some(coords) = geocode(http, &query).await {
      user_coords = Some(coords);
      geocode_method = label;
      break;
    }
  }
  let Some(user_coords) = user_coords else {
    info!("All geocoding attempts failed for the given address.");
    return Ok(DeliveryEstimate::refused("Could not map this location."));
  };

  // Routing, geometric fallback when OSRM is unavailable.
  let (distance_km, drive_minutes, route_method) = match osrm_route(http, store_coords, user_coords).await {
    Some((km, minutes)) => (km, minutes, "osrm_route"),
    None => {
      warn!("OSRM routing unavailable; using geometric fallback.");
      let km = haversine_km(store_coords.0, store_coords.1, user_coords.0, user_coords.1) * URBAN_TORTUOSITY;
      let minutes = km / FALLBACK_SPEED_KMH * 60.0;
      (km, minutes, "math")
    }
  };

  Ok(finalize_estimate(
    distance_km,
    drive_minutes,
    config.delivery_radius_km,
    format!("{} + {}", geocode_method, route_method),
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn addr(line1: &str, city: &str, state: &str, pincode: &str) -> AddressInput {
    AddressInput {
      address_line1: line1.to_string(),
      city: city.to_string(),
      state: state.to_string(),
      pincode: pincode.to_string(),
    }
  }

  #[test]
  fn haversine_matches_known_distances() {
    // Chennai -> Bengaluru, roughly 290 km great-circle.
    let d = haversine_km(13.0827, 80.2707, 12.9716, 77.5946);
    assert!((d - 290.0).abs() < 10.0, "got {}", d);
    // Zero distance.
    assert!(haversine_km(13.0, 80.0, 13.0, 80.0) < 1e-9);
  }

  #[test]
  fn candidate_queries_decrease_in_precision() {
    let queries = candidate_queries(&addr("12 Anna Salai", "Chennai", "TN", "600002"));
    assert_eq!(
      queries,
      vec![
        ("12 Anna Salai, Chennai, TN, 600002".to_string(), "exact_geocode"),
        ("Chennai, TN, 600002".to_string(), "region_geocode"),
        ("600002".to_string(), "pincode_geocode"),
      ]
    );
  }

  #[test]
  fn candidate_queries_skip_empty_components_and_duplicates() {
    let queries = candidate_queries(&addr("", "", "", ""));
    assert!(queries.is_empty());

    // Only a pincode: a single candidate, labelled as such.
    let queries = candidate_queries(&addr("", "", "", "600002"));
    assert_eq!(queries, vec![("600002".to_string(), "pincode_geocode")]);
  }

  #[test]
  fn missing_address_line_reports_a_region_geocode() {
    // Without an address line the most precise candidate is built from
    // region components and must carry the region label.
    let queries = candidate_queries(&addr("", "Chennai", "TN", "600002"));
    assert_eq!(
      queries,
      vec![
        ("Chennai, TN, 600002".to_string(), "region_geocode"),
        ("600002".to_string(), "pincode_geocode"),
      ]
    );
  }

  #[test]
  fn estimates_beyond_the_radius_are_refused() {
    match finalize_estimate(120.0, 200.0, 100.0, "test".into()) {
      DeliveryEstimate::Refused { allowed, reason } => {
        assert!(!allowed);
        assert!(reason.contains("120km"));
      }
      other => panic!("expected refusal, got {:?}", other),
    }
  }

  #[test]
  fn estimate_hours_round_up_with_a_floor_of_one() {
    // 0 drive minutes + 60 buffer minutes = exactly 1 hour.
    match finalize_estimate(1.0, 0.0, 100.0, "test".into()) {
      DeliveryEstimate::Allowed { estimated_hours, .. } => assert_eq!(estimated_hours, 1),
      other => panic!("expected allowed, got {:?}", other),
    }
    // 90 drive minutes + 60 buffer = 2.5h -> rounds up to 3.
    match finalize_estimate(40.0, 90.0, 100.0, "test".into()) {
      DeliveryEstimate::Allowed {
        estimated_hours,
        distance_km,
        ..
      } => {
        assert_eq!(estimated_hours, 3);
        assert!((distance_km - 40.0).abs() < 1e-9);
      }
      other => panic!("expected allowed, got {:?}", other),
    }
  }

  #[test]
  fn osrm_response_parses_and_gates_on_code() {
    let ok: OsrmResponse = serde_json::from_str(
      r#"{"code":"Ok","routes":[{"distance":12345.0,"duration":1800.0,"legs":[]}]}"#,
    )
    .unwrap();
    assert_eq!(ok.code, "Ok");
    assert_eq!(ok.routes.len(), 1);
    assert!((ok.routes[0].distance - 12345.0).abs() < 1e-9);

    let err: OsrmResponse = serde_json::from_str(r#"{"code":"NoRoute"}"#).unwrap();
    assert_eq!(err.code, "NoRoute");
    assert!(err.routes.is_empty());
  }

  #[test]
  fn nominatim_string_coordinates_parse() {
    let places: Vec<NominatimPlace> =
      serde_json::from_str(r#"[{"lat":"13.1067","lon":"80.1444","display_name":"Ayapakkam"}]"#).unwrap();
    let lat: f64 = places[0].lat.parse().unwrap();
    assert!((lat - 13.1067).abs() < 1e-9);
  }
}
