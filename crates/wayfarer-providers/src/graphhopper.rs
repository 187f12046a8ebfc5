//! Graphhopper API client
//!
//! Wraps the Graphhopper routing services - directions, isochrones, and
//! distance matrix - on top of the shared request engine. Each operation
//! takes its required arguments positionally and everything optional through
//! a per-operation options struct, validated against the documented value
//! allow-lists before any request is built.

use serde_json::Value;
use std::sync::Arc;

use wayfarer_core::{
    ApiError, ApiResponse, ClientConfig, Error, RateLimitMarker, RequestSpec, Result, Router,
    Transport,
};

use crate::convert;

/// Hosted Graphhopper endpoint; using it requires an API key.
pub const DEFAULT_BASE_URL: &str = "https://graphhopper.com/api/1";

/// Road classes the `avoid` option recognizes.
pub const AVOID_FEATURES: &[&str] = &["ferry", "motorway", "toll", "tunnel", "ford"];

/// Arrays the matrix response can include.
pub const OUT_ARRAYS: &[&str] = &["weights", "times", "distances"];

/// Flags rate-limit notices the hosted API embeds in response bodies,
/// independent of the status code it happens to send them with.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphhopperRateLimit;

impl RateLimitMarker for GraphhopperRateLimit {
    fn is_rate_limited(&self, body: &Value) -> bool {
        body.get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.contains("API limit"))
            .unwrap_or(false)
    }
}

/// Client for the Graphhopper routing APIs.
pub struct Graphhopper {
    router: Router,
}

impl Graphhopper {
    /// Client against the hosted API with default settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new(DEFAULT_BASE_URL).with_api_key(api_key))
    }

    /// Client from explicit configuration. Self-hosted servers may omit the
    /// API key; the hosted endpoint rejects that at construction time.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let config = config.with_hosted_url(DEFAULT_BASE_URL);
        let router =
            Router::new(config)?.with_rate_limit_marker(Arc::new(GraphhopperRateLimit));
        Ok(Self { router })
    }

    /// Client wired to a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let config = config.with_hosted_url(DEFAULT_BASE_URL);
        let router = Router::with_transport(config, transport)?
            .with_rate_limit_marker(Arc::new(GraphhopperRateLimit));
        Ok(Self { router })
    }

    /// Get directions between coordinates in visiting order.
    ///
    /// `coordinates` are (longitude, latitude) pairs; at least two are
    /// required by the API.
    pub async fn directions(
        &self,
        coordinates: &[(f64, f64)],
        profile: &str,
        options: &DirectionsOptions,
    ) -> Result<ApiResponse> {
        let mut params = vec![("profile".to_string(), profile.to_string())];

        for coordinate in coordinates {
            params.push(("point".to_string(), convert::format_coordinate(coordinate)));
        }

        self.append_key(&mut params);

        if let Some(format) = &options.format {
            params.push(("type".to_string(), format.clone()));
        }
        if let Some(optimize) = options.optimize {
            params.push(("optimize".to_string(), convert::format_bool(optimize)));
        }
        if let Some(instructions) = options.instructions {
            params.push(("instructions".to_string(), convert::format_bool(instructions)));
        }
        if let Some(locale) = &options.locale {
            params.push(("locale".to_string(), locale.clone()));
        }
        if let Some(elevation) = options.elevation {
            params.push(("elevation".to_string(), convert::format_bool(elevation)));
        }
        if let Some(points_encoded) = options.points_encoded {
            params.push((
                "points_encoded".to_string(),
                convert::format_bool(points_encoded),
            ));
        }
        if let Some(calc_points) = options.calc_points {
            params.push(("calc_points".to_string(), convert::format_bool(calc_points)));
        }
        if let Some(debug) = options.debug {
            params.push(("debug".to_string(), convert::format_bool(debug)));
        }
        if let Some(point_hint) = options.point_hint {
            params.push(("point_hint".to_string(), convert::format_bool(point_hint)));
        }

        // The options below only take effect once contraction hierarchies
        // are disabled.
        if let Some(details) = &options.details {
            for detail in details {
                params.push(("details".to_string(), detail.clone()));
            }
        }
        if let Some(ch_disable) = options.ch_disable {
            params.push(("ch.disable".to_string(), convert::format_bool(ch_disable)));
        }
        if let Some(weighting) = &options.weighting {
            params.push(("weighting".to_string(), weighting.clone()));
        }
        if let Some(heading) = &options.heading {
            params.push(("heading".to_string(), convert::delimit_list(heading, ",")));
        }
        if let Some(heading_penalty) = options.heading_penalty {
            params.push(("heading_penalty".to_string(), heading_penalty.to_string()));
        }
        if let Some(pass_through) = options.pass_through {
            params.push(("pass_through".to_string(), convert::format_bool(pass_through)));
        }
        if let Some(block_area) = &options.block_area {
            params.push(("block_area".to_string(), block_area.clone()));
        }
        if let Some(avoid) = &options.avoid {
            validate_allowed("avoid", avoid, AVOID_FEATURES)?;
            params.push(("avoid".to_string(), convert::delimit_list(avoid, ";")));
        }
        if let Some(algorithm) = &options.algorithm {
            algorithm.append_params(&mut params);
        }

        self.router
            .request(
                RequestSpec::get("/route")
                    .with_query(params)
                    .dry_run(options.dry_run),
            )
            .await
    }

    /// Get isochrones (or equidistants) for time or distance limits around
    /// one (longitude, latitude) coordinate.
    pub async fn isochrones(
        &self,
        coordinate: &(f64, f64),
        profile: &str,
        options: &IsochronesOptions,
    ) -> Result<ApiResponse> {
        let mut params = vec![
            ("profile".to_string(), profile.to_string()),
            ("point".to_string(), convert::format_coordinate(coordinate)),
        ];

        self.append_key(&mut params);

        if let Some(distance_limit) = options.distance_limit {
            params.push(("distance_limit".to_string(), distance_limit.to_string()));
        }
        if let Some(time_limit) = options.time_limit {
            params.push(("time_limit".to_string(), time_limit.to_string()));
        }
        if let Some(buckets) = options.buckets {
            params.push(("buckets".to_string(), buckets.to_string()));
        }
        if let Some(reverse_flow) = options.reverse_flow {
            params.push(("reverse_flow".to_string(), convert::format_bool(reverse_flow)));
        }
        if let Some(debug) = options.debug {
            params.push(("debug".to_string(), convert::format_bool(debug)));
        }

        self.router
            .request(
                RequestSpec::get("/isochrone")
                    .with_query(params)
                    .dry_run(options.dry_run),
            )
            .await
    }

    /// Get travel distance and time for a matrix of origins and
    /// destinations.
    ///
    /// Without `sources`/`destinations` every coordinate is both origin and
    /// destination (NxN). With either set, the indices select rows/columns
    /// out of `coordinates` and are bounds-checked before any request is
    /// built; an omitted side defaults to all coordinates.
    pub async fn distance_matrix(
        &self,
        coordinates: &[(f64, f64)],
        profile: &str,
        options: &MatrixOptions,
    ) -> Result<ApiResponse> {
        let mut params = vec![("profile".to_string(), profile.to_string())];

        self.append_key(&mut params);

        if options.sources.is_none() && options.destinations.is_none() {
            for coordinate in coordinates {
                params.push(("point".to_string(), convert::format_coordinate(coordinate)));
            }
        } else {
            let from_points =
                select_coordinates(coordinates, options.sources.as_deref(), "sources")?;
            let to_points =
                select_coordinates(coordinates, options.destinations.as_deref(), "destinations")?;

            for coordinate in from_points {
                params.push(("from_point".to_string(), convert::format_coordinate(coordinate)));
            }
            for coordinate in to_points {
                params.push(("to_point".to_string(), convert::format_coordinate(coordinate)));
            }
        }

        if let Some(out_array) = &options.out_array {
            validate_allowed("out_array", out_array, OUT_ARRAYS)?;
            for entry in out_array {
                params.push(("out_array".to_string(), entry.clone()));
            }
        }
        if let Some(debug) = options.debug {
            params.push(("debug".to_string(), convert::format_bool(debug)));
        }

        self.router
            .request(
                RequestSpec::get("/matrix")
                    .with_query(params)
                    .dry_run(options.dry_run),
            )
            .await
    }

    fn append_key(&self, params: &mut Vec<(String, String)>) {
        if let Some(key) = &self.router.config().api_key {
            params.push(("key".to_string(), key.clone()));
        }
    }
}

/// Optional parameters for [`Graphhopper::directions`].
///
/// Every field maps to one query parameter; unset fields are omitted so the
/// API falls back to its own defaults.
#[derive(Debug, Clone, Default)]
pub struct DirectionsOptions {
    /// Response format, sent as `type` (e.g. `json`)
    pub format: Option<String>,
    /// Reorder via-points for minimum overall time
    pub optimize: Option<bool>,
    /// Include turn-by-turn instructions
    pub instructions: Option<bool>,
    /// Locale for instruction text (e.g. `pt_PT`)
    pub locale: Option<String>,
    /// Include elevation as a third coordinate dimension
    pub elevation: Option<bool>,
    /// Encode returned points as a polyline string
    pub points_encoded: Option<bool>,
    /// Calculate route geometry at all
    pub calc_points: Option<bool>,
    /// Pretty-print the response
    pub debug: Option<bool>,
    /// Prefer named streets for snapping
    pub point_hint: Option<bool>,
    /// Path detail keys, sent as repeated `details` parameters
    pub details: Option<Vec<String>>,
    /// Disable contraction hierarchies, sent as `ch.disable`
    pub ch_disable: Option<bool>,
    /// Route weighting (`fastest`, `shortest`, `short_fastest`)
    pub weighting: Option<String>,
    /// Favoured headings in degrees, one per point or one for the start
    pub heading: Option<Vec<u32>>,
    /// Time penalty in seconds for omitting a heading
    pub heading_penalty: Option<u32>,
    /// Avoid u-turns at via-points
    pub pass_through: Option<bool>,
    /// Block access around a point, circle, or rectangle
    pub block_area: Option<String>,
    /// Road classes to avoid; each must be in [`AVOID_FEATURES`]
    pub avoid: Option<Vec<String>>,
    /// Alternative routing algorithm and its sub-options
    pub algorithm: Option<Algorithm>,
    /// Assemble the request without sending it
    pub dry_run: bool,
}

/// Alternative routing algorithms recognized by the directions API. The
/// enum doubles as the allow-list: anything else is unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum Algorithm {
    /// Round trip of approximately the given length from the start point
    RoundTrip {
        /// Approximate round-trip length in meters
        distance: Option<u32>,
        /// Seed for varying the generated loop
        seed: Option<u64>,
    },
    /// Alternative routes next to the optimal one
    AlternativeRoute {
        /// Maximum number of paths to compute
        max_paths: Option<u32>,
        /// How much longer alternatives may be than the optimum
        max_weight_factor: Option<f64>,
        /// How much alternatives may share with the optimum
        max_share_factor: Option<f64>,
    },
}

impl Algorithm {
    fn append_params(&self, params: &mut Vec<(String, String)>) {
        match self {
            Algorithm::RoundTrip { distance, seed } => {
                params.push(("algorithm".to_string(), "round_trip".to_string()));
                if let Some(distance) = distance {
                    params.push(("round_trip.distance".to_string(), distance.to_string()));
                }
                if let Some(seed) = seed {
                    params.push(("round_trip.seed".to_string(), seed.to_string()));
                }
            }
            Algorithm::AlternativeRoute {
                max_paths,
                max_weight_factor,
                max_share_factor,
            } => {
                params.push(("algorithm".to_string(), "alternative_route".to_string()));
                if let Some(max_paths) = max_paths {
                    params.push((
                        "alternative_route.max_paths".to_string(),
                        max_paths.to_string(),
                    ));
                }
                if let Some(max_weight_factor) = max_weight_factor {
                    params.push((
                        "alternative_route.max_weight_factor".to_string(),
                        convert::format_float(*max_weight_factor),
                    ));
                }
                if let Some(max_share_factor) = max_share_factor {
                    params.push((
                        "alternative_route.max_share_factor".to_string(),
                        convert::format_float(*max_share_factor),
                    ));
                }
            }
        }
    }
}

/// Optional parameters for [`Graphhopper::isochrones`].
#[derive(Debug, Clone, Default)]
pub struct IsochronesOptions {
    /// Travel distance limit in meters
    pub distance_limit: Option<u32>,
    /// Travel time limit in seconds
    pub time_limit: Option<u32>,
    /// Number of sub-interval polygons
    pub buckets: Option<u32>,
    /// Flow from the polygon toward the point instead of outward
    pub reverse_flow: Option<bool>,
    /// Pretty-print the response
    pub debug: Option<bool>,
    /// Assemble the request without sending it
    pub dry_run: bool,
}

/// Optional parameters for [`Graphhopper::distance_matrix`].
#[derive(Debug, Clone, Default)]
pub struct MatrixOptions {
    /// Indices into `coordinates` used as origins
    pub sources: Option<Vec<usize>>,
    /// Indices into `coordinates` used as destinations
    pub destinations: Option<Vec<usize>>,
    /// Response arrays to include; each must be in [`OUT_ARRAYS`]
    pub out_array: Option<Vec<String>>,
    /// Pretty-print the response
    pub debug: Option<bool>,
    /// Assemble the request without sending it
    pub dry_run: bool,
}

fn validate_allowed(field: &str, values: &[String], allowed: &[&str]) -> Result<()> {
    for value in values {
        if !allowed.contains(&value.as_str()) {
            return Err(Error::Api(ApiError::invalid_request(format!(
                "unrecognized {} value {:?}; expected one of {:?}",
                field, value, allowed
            ))));
        }
    }
    Ok(())
}

fn select_coordinates<'a>(
    coordinates: &'a [(f64, f64)],
    indices: Option<&[usize]>,
    field: &str,
) -> Result<Vec<&'a (f64, f64)>> {
    match indices {
        None => Ok(coordinates.iter().collect()),
        Some(indices) => indices
            .iter()
            .map(|&idx| {
                coordinates.get(idx).ok_or_else(|| {
                    Error::Api(ApiError::invalid_request(format!(
                        "{} index {} out of range for {} coordinates",
                        field,
                        idx,
                        coordinates.len()
                    )))
                })
            })
            .collect(),
    }
}
