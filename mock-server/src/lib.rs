use std::{collections::HashMap, str::FromStr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

pub const DEFAULT_SYSTEMS: usize = 250;
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 200;
pub const DEFAULT_DISTANCE_LY: f64 = 25.0;
pub const LIGHT_YEARS_PER_PARSEC: f64 = 3.26156;

pub const SPECTRAL_CLASSES: [&str; 11] = ["O", "B", "A", "F", "G", "K", "M", "L", "T", "Y", "U"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Star {
    pub id: u64,
    pub name: String,
    pub proper_name: Option<String>,
    pub is_primary: bool,
    pub hip: Option<u64>,
    pub hd: Option<u64>,
    pub hr: Option<u64>,
    pub gl: Option<String>,
    pub bayer_flamsteed: Option<String>,
    pub right_ascension: Option<f64>,
    pub right_ascension_degrees: Option<f64>,
    pub declination: Option<f64>,
    pub distance_parsecs: Option<f64>,
    pub proper_motion_ra: Option<f64>,
    pub proper_motion_dec: Option<f64>,
    pub radial_velocity: Option<f64>,
    pub apparent_magnitude: Option<f64>,
    pub absolute_magnitude: Option<f64>,
    pub spectral_type: Option<String>,
    pub spectral_class: String,
    pub color_index: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub luminosity: Option<f64>,
    pub variable_type: Option<String>,
    pub variable_min: Option<f64>,
    pub variable_max: Option<f64>,
    pub constellation: Option<String>,
    pub star_system_id: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StarSystem {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_star: Option<Star>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_stars: Option<Vec<Star>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Distance {
    pub parsecs: f64,
    pub light_years: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NearbyStarSystem {
    pub system: StarSystem,
    pub distance: Distance,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_entries: u64,
    pub total_pages: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub errors: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// A star system with all of its stars, the first one being the primary.
#[derive(Clone, Debug)]
pub struct SystemRecord {
    pub id: u64,
    pub name: String,
    pub stars: Vec<Star>,
}

impl SystemRecord {
    fn primary(&self) -> Option<&Star> {
        self.stars.iter().find(|s| s.is_primary)
    }

    fn spectral_class(&self) -> Option<&str> {
        self.primary().map(|s| s.spectral_class.as_str())
    }

    fn position(&self) -> Option<(f64, f64, f64)> {
        let star = self.primary()?;
        Some((star.x?, star.y?, star.z?))
    }

    fn summary(&self) -> StarSystem {
        StarSystem {
            id: self.id,
            name: self.name.clone(),
            star_count: Some(self.stars.len() as u32),
            primary_star: self.primary().cloned(),
            secondary_stars: None,
        }
    }

    fn detail(&self) -> StarSystem {
        StarSystem {
            secondary_stars: Some(self.stars.iter().filter(|s| !s.is_primary).cloned().collect()),
            ..self.summary()
        }
    }
}

/// Read-only catalog served by the mock API.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub systems: Vec<SystemRecord>,
}

impl Catalog {
    /// Deterministic catalog of `count` systems with ids `1..=count`.
    ///
    /// Primary spectral classes cycle through O, B, A, ... U, systems hold
    /// one to three stars, and system 1 sits at the origin.
    pub fn seeded(count: usize) -> Self {
        let mut next_star_id = 1;
        let systems = (0..count)
            .map(|i| {
                let id = i as u64 + 1;
                let name = if i == 0 {
                    "Sol".to_string()
                } else {
                    format!("System {id}")
                };
                let (x, y, z) = if i == 0 {
                    (0.0, 0.0, 0.0)
                } else {
                    (
                        ((i * 37) % 41) as f64 * 0.5 - 10.0,
                        ((i * 53) % 43) as f64 * 0.5 - 10.5,
                        ((i * 71) % 47) as f64 * 0.5 - 11.5,
                    )
                };
                let class = SPECTRAL_CLASSES[i % SPECTRAL_CLASSES.len()];
                let stars = (0..1 + i % 3)
                    .map(|n| {
                        let star = seeded_star(next_star_id, id, &name, n, class, (x, y, z));
                        next_star_id += 1;
                        star
                    })
                    .collect();
                SystemRecord { id, name, stars }
            })
            .collect();
        Self { systems }
    }

    pub fn system(&self, id: u64) -> Option<&SystemRecord> {
        self.systems.iter().find(|s| s.id == id)
    }

    pub fn star(&self, id: u64) -> Option<&Star> {
        self.systems
            .iter()
            .flat_map(|s| s.stars.iter())
            .find(|s| s.id == id)
    }
}

fn seeded_star(
    id: u64,
    system_id: u64,
    system_name: &str,
    index: usize,
    class: &str,
    (x, y, z): (f64, f64, f64),
) -> Star {
    let distance = (x * x + y * y + z * z).sqrt();
    let suffix = ['A', 'B', 'C'][index % 3];
    Star {
        id,
        name: format!("{system_name} {suffix}"),
        proper_name: (index == 0 && system_id == 1).then(|| "Sun".to_string()),
        is_primary: index == 0,
        hip: None,
        hd: None,
        hr: None,
        gl: None,
        bayer_flamsteed: None,
        right_ascension: None,
        right_ascension_degrees: None,
        declination: None,
        distance_parsecs: Some(distance),
        proper_motion_ra: None,
        proper_motion_dec: None,
        radial_velocity: None,
        apparent_magnitude: None,
        absolute_magnitude: None,
        spectral_type: Some(format!("{class}{}V", index % 10)),
        spectral_class: if index == 0 { class.to_string() } else { "M".to_string() },
        color_index: None,
        x: Some(x),
        y: Some(y),
        z: Some(z),
        luminosity: None,
        variable_type: None,
        variable_min: None,
        variable_max: None,
        constellation: None,
        star_system_id: system_id,
    }
}

pub type Db = Arc<Catalog>;

pub fn app() -> Router {
    app_with_catalog(Catalog::seeded(DEFAULT_SYSTEMS))
}

pub fn app_with_catalog(catalog: Catalog) -> Router {
    let db: Db = Arc::new(catalog);
    let api = Router::new()
        .route("/star_systems", get(list_star_systems))
        .route("/star_systems/{id}", get(get_star_system))
        .route("/star_systems/{id}/nearby", get(nearby_star_systems))
        .route("/stars/{id}", get(get_star))
        .route("/outage", get(outage))
        .with_state(db);
    Router::new().nest("/api/v1", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_catalog(listener: TcpListener, catalog: Catalog) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_catalog(catalog)).await
}

struct ApiFailure(StatusCode, String);

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            errors: ErrorDetail { detail: self.1 },
        };
        (self.0, Json(body)).into_response()
    }
}

fn unprocessable(detail: impl Into<String>) -> ApiFailure {
    ApiFailure(StatusCode::UNPROCESSABLE_ENTITY, detail.into())
}

fn not_found() -> ApiFailure {
    ApiFailure(StatusCode::NOT_FOUND, "Not Found".to_string())
}

fn param<T: FromStr>(raw: &HashMap<String, String>, key: &str) -> Result<Option<T>, ApiFailure> {
    match raw.get(key) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| unprocessable(format!("invalid {key}: {value}"))),
    }
}

struct ListQuery {
    page: u32,
    page_size: u32,
    spectral_class: Option<String>,
    min_stars: Option<u32>,
    max_stars: Option<u32>,
}

impl ListQuery {
    fn parse(raw: &HashMap<String, String>) -> Result<Self, ApiFailure> {
        let page: u32 = param(raw, "page")?.unwrap_or(1);
        if page < 1 {
            return Err(unprocessable("page must be greater than or equal to 1"));
        }
        let page_size: u32 = param(raw, "page_size")?.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(unprocessable(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let spectral_class: Option<String> = param(raw, "spectral_class")?;
        if let Some(class) = &spectral_class {
            if !SPECTRAL_CLASSES.contains(&class.as_str()) {
                return Err(unprocessable(format!("invalid spectral_class: {class}")));
            }
        }
        let min_stars: Option<u32> = param(raw, "min_stars")?;
        let max_stars: Option<u32> = param(raw, "max_stars")?;
        if min_stars == Some(0) || max_stars == Some(0) {
            return Err(unprocessable("min_stars and max_stars must be at least 1"));
        }
        Ok(Self {
            page,
            page_size,
            spectral_class,
            min_stars,
            max_stars,
        })
    }

    fn matches(&self, system: &SystemRecord) -> bool {
        let count = system.stars.len() as u32;
        self.spectral_class
            .as_deref()
            .is_none_or(|class| system.spectral_class() == Some(class))
            && self.min_stars.is_none_or(|min| count >= min)
            && self.max_stars.is_none_or(|max| count <= max)
    }

    fn paginate<T>(&self, items: Vec<T>) -> ListResponse<T> {
        let total_entries = items.len() as u64;
        let total_pages = (total_entries.div_ceil(u64::from(self.page_size)) as u32).max(1);
        let start = (self.page as usize - 1) * self.page_size as usize;
        let data = items
            .into_iter()
            .skip(start)
            .take(self.page_size as usize)
            .collect();
        ListResponse {
            data,
            meta: PaginationMeta {
                page: self.page,
                page_size: self.page_size,
                total_entries,
                total_pages,
            },
        }
    }
}

async fn list_star_systems(
    State(db): State<Db>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ListResponse<StarSystem>>, ApiFailure> {
    let query = ListQuery::parse(&raw)?;
    let matching: Vec<StarSystem> = db
        .systems
        .iter()
        .filter(|s| query.matches(s))
        .map(SystemRecord::summary)
        .collect();
    let response = query.paginate(matching);
    debug!(
        page = response.meta.page,
        total_entries = response.meta.total_entries,
        "list star systems"
    );
    Ok(Json(response))
}

async fn get_star_system(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<DataResponse<StarSystem>>, ApiFailure> {
    let system = db.system(id).ok_or_else(not_found)?;
    Ok(Json(DataResponse {
        data: system.detail(),
    }))
}

async fn get_star(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<DataResponse<Star>>, ApiFailure> {
    let star = db.star(id).ok_or_else(not_found)?;
    Ok(Json(DataResponse { data: star.clone() }))
}

async fn nearby_star_systems(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ListResponse<NearbyStarSystem>>, ApiFailure> {
    let query = ListQuery::parse(&raw)?;
    let max_ly: f64 = param(&raw, "distance")?.unwrap_or(DEFAULT_DISTANCE_LY);
    if !(0.1..=100.0).contains(&max_ly) {
        return Err(unprocessable("distance must be between 0.1 and 100"));
    }
    let origin = db.system(id).ok_or_else(not_found)?;
    let (ox, oy, oz) = origin
        .position()
        .ok_or_else(|| unprocessable("origin star system has no known position"))?;

    let mut nearby: Vec<NearbyStarSystem> = db
        .systems
        .iter()
        .filter(|s| s.id != origin.id && query.matches(s))
        .filter_map(|s| {
            let (x, y, z) = s.position()?;
            let parsecs = ((x - ox).powi(2) + (y - oy).powi(2) + (z - oz).powi(2)).sqrt();
            let light_years = parsecs * LIGHT_YEARS_PER_PARSEC;
            (light_years <= max_ly).then(|| NearbyStarSystem {
                system: s.summary(),
                distance: Distance {
                    parsecs,
                    light_years,
                },
            })
        })
        .collect();
    nearby.sort_by(|a, b| {
        a.distance
            .parsecs
            .total_cmp(&b.distance.parsecs)
            .then(a.system.id.cmp(&b.system.id))
    });
    Ok(Json(query.paginate(nearby)))
}

async fn outage() -> (StatusCode, Html<&'static str>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Html("<html><body><h1>503 Service Unavailable</h1></body></html>"),
    )
}
