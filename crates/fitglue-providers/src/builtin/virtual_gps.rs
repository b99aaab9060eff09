// ABOUTME: Virtual GPS provider synthesizing a 1 Hz trace along a named route
// ABOUTME: Route polylines are scaled to the session distance, wrapping the loop
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use async_trait::async_trait;

use fitglue_core::models::ProviderKind;

use crate::contract::{
    ConfigField, EnrichContext, EnrichmentProvider, EnrichmentResult, FieldType, ProviderError,
    ProviderManifest,
};

/// Mean earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A named loop of waypoints the synthetic trace follows
struct Route {
    name: &'static str,
    waypoints: &'static [(f64, f64)],
}

/// Loop around Hyde Park, London (~4 km)
const LONDON: Route = Route {
    name: "london",
    waypoints: &[
        (51.507_30, -0.165_70),
        (51.509_00, -0.170_50),
        (51.509_60, -0.175_60),
        (51.507_90, -0.181_20),
        (51.505_60, -0.183_00),
        (51.502_90, -0.180_10),
        (51.502_40, -0.173_50),
        (51.502_70, -0.167_20),
        (51.504_40, -0.163_30),
        (51.506_10, -0.162_80),
    ],
};

/// Loop around the Bois de Boulogne, Paris (~5 km)
const PARIS: Route = Route {
    name: "paris",
    waypoints: &[
        (48.862_20, 2.249_50),
        (48.866_10, 2.245_90),
        (48.869_80, 2.247_80),
        (48.871_50, 2.253_40),
        (48.869_40, 2.259_60),
        (48.864_90, 2.262_30),
        (48.860_70, 2.259_90),
        (48.858_90, 2.254_10),
        (48.859_80, 2.250_60),
    ],
};

/// Central Park loop, New York (~5 km)
const NEW_YORK: Route = Route {
    name: "new-york",
    waypoints: &[
        (40.768_00, -73.981_50),
        (40.774_60, -73.976_70),
        (40.781_20, -73.971_90),
        (40.785_30, -73.965_30),
        (40.781_90, -73.958_30),
        (40.774_80, -73.963_10),
        (40.768_30, -73.967_90),
        (40.764_60, -73.974_10),
    ],
};

const ROUTES: &[&Route] = &[&LONDON, &PARIS, &NEW_YORK];

/// Synthesizes per-second latitude/longitude streams along a named route,
/// scaled so the covered distance matches the session's total distance.
pub struct VirtualGpsProvider;

impl VirtualGpsProvider {
    /// Create the virtual-GPS provider
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for VirtualGpsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnrichmentProvider for VirtualGpsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::VirtualGps
    }

    fn manifest(&self) -> ProviderManifest {
        ProviderManifest {
            kind: ProviderKind::VirtualGps,
            display_name: "Virtual GPS".into(),
            description: "Synthesizes a GPS trace along a named route for indoor workouts".into(),
            icon: "map-pin".into(),
            fields: vec![ConfigField::required(
                "route",
                "Route",
                FieldType::Select {
                    options: ROUTES.iter().map(|route| route.name.to_owned()).collect(),
                },
            )],
        }
    }

    async fn enrich(
        &self,
        ctx: EnrichContext<'_>,
    ) -> Result<Option<EnrichmentResult>, ProviderError> {
        let Some(session) = ctx.activity.session.as_ref() else {
            return Ok(None);
        };
        let seconds = session.elapsed_whole_seconds() as usize;
        if seconds < 2 || session.total_distance <= 0.0 {
            tracing::debug!("virtual gps skipped: no duration or distance to trace");
            return Ok(None);
        }

        let route_name = ctx.config.get("route").map(String::as_str).unwrap_or("london");
        let route = ROUTES
            .iter()
            .find(|route| route.name == route_name)
            .unwrap_or(&&LONDON);

        let (latitudes, longitudes) = trace_route(route, session.total_distance, seconds);
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("virtualGps.route".to_owned(), route.name.to_owned());
        metadata.insert(
            "virtualGps.distanceMeters".to_owned(),
            format!("{:.0}", session.total_distance),
        );

        Ok(Some(EnrichmentResult {
            latitude_stream: Some(latitudes),
            longitude_stream: Some(longitudes),
            tags: vec!["virtual-gps".to_owned()],
            metadata,
            ..EnrichmentResult::default()
        }))
    }
}

/// Great-circle distance between two waypoints in meters
#[must_use]
pub fn haversine_m(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat_a, lng_a) = (a.0.to_radians(), a.1.to_radians());
    let (lat_b, lng_b) = (b.0.to_radians(), b.1.to_radians());
    let d_lat = lat_b - lat_a;
    let d_lng = lng_b - lng_a;
    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Walk `route` as a closed loop, emitting `seconds` evenly spaced positions
/// covering `total_distance` meters.
fn trace_route(route: &Route, total_distance: f64, seconds: usize) -> (Vec<f64>, Vec<f64>) {
    let points = route.waypoints;
    let segment_count = points.len();
    let mut cumulative = Vec::with_capacity(segment_count + 1);
    cumulative.push(0.0);
    for index in 0..segment_count {
        let from = points[index];
        let to = points[(index + 1) % segment_count];
        let last = *cumulative.last().unwrap_or(&0.0);
        cumulative.push(last + haversine_m(from, to));
    }
    let loop_length = *cumulative.last().unwrap_or(&1.0);

    let mut latitudes = Vec::with_capacity(seconds);
    let mut longitudes = Vec::with_capacity(seconds);
    for step in 0..seconds {
        let along = total_distance * step as f64 / (seconds - 1) as f64;
        let wrapped = along % loop_length;
        let (lat, lng) = position_at(points, &cumulative, wrapped);
        latitudes.push(lat);
        longitudes.push(lng);
    }
    (latitudes, longitudes)
}

fn position_at(points: &[(f64, f64)], cumulative: &[f64], distance: f64) -> (f64, f64) {
    let segment = cumulative
        .windows(2)
        .position(|window| distance >= window[0] && distance <= window[1])
        .unwrap_or(points.len() - 1);
    let from = points[segment];
    let to = points[(segment + 1) % points.len()];
    let segment_length = cumulative[segment + 1] - cumulative[segment];
    if segment_length <= 0.0 {
        return from;
    }
    let fraction = (distance - cumulative[segment]) / segment_length;
    (
        from.0 + (to.0 - from.0) * fraction,
        from.1 + (to.1 - from.1) * fraction,
    )
}
