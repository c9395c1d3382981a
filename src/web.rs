use std::path::PathBuf;
use std::sync::Mutex;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::allocate::{run_allocation, Scope};
use crate::catalog::RoomCatalog;
use crate::config::AllocatorConfig;
use crate::error::AllocationError;
use crate::preferences::{
    append_oasis_preference_csv, append_team_preference_csv, format_preferred_days,
    parse_preferred_days, OasisPreference, TeamPreference,
};
use crate::store::MemoryStore;
use crate::week::{weekday_label, Week};

/// Shared application state. The store is the in-memory stand-in for the
/// database; the Mutex also serializes concurrent admin triggers.
pub struct AppState {
    pub store: Mutex<MemoryStore>,
    pub catalog: RoomCatalog,
    pub config: AllocatorConfig,
    pub admin_password: String,
    pub team_csv: PathBuf,
    pub oasis_csv: PathBuf,
}

#[derive(Deserialize)]
pub struct TeamFormRequest {
    pub team_name: String,
    pub contact_person: Option<String>,
    pub team_size: u32,
    /// Day labels, e.g. ["Monday", "Wednesday"]
    pub preferred_days: Vec<String>,
}

#[derive(Deserialize)]
pub struct OasisFormRequest {
    pub person_name: String,
    pub preferred_days: Vec<String>,
}

#[derive(Deserialize)]
pub struct AllocateRequest {
    pub week_anchor: NaiveDate,
    pub scope: Scope,
    /// Omit for a fresh fairness rotation; pin for a reproducible re-run.
    pub seed: Option<u64>,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub preferences: bool,
    #[serde(default)]
    pub allocations: bool,
}

#[derive(Deserialize)]
pub struct GridQuery {
    pub week_anchor: NaiveDate,
}

#[derive(Serialize)]
struct TeamPrefView {
    team: String,
    contact: Option<String>,
    size: u32,
    days: String,
}

#[derive(Serialize)]
struct OasisPrefView {
    person: String,
    days: String,
}

#[derive(Serialize)]
struct GridCell {
    day: String,
    occupants: String,
}

#[derive(Serialize)]
struct GridRow {
    resource: String,
    cells: Vec<GridCell>,
}

/// Validates a team form submission
fn validate_team_form(req: &TeamFormRequest, config: &AllocatorConfig) -> Result<(), String> {
    if req.team_name.trim().is_empty() {
        return Err("Team name is required".to_string());
    }
    if req.team_size < 1 {
        return Err("Team size must be at least 1".to_string());
    }
    if req.preferred_days.is_empty() {
        return Err("At least one preferred day is required".to_string());
    }
    if req.preferred_days.len() > config.team_day_count {
        return Err(format!(
            "At most {} preferred days can be selected",
            config.team_day_count
        ));
    }
    Ok(())
}

/// Validates an oasis form submission
fn validate_oasis_form(req: &OasisFormRequest, config: &AllocatorConfig) -> Result<(), String> {
    if req.person_name.trim().is_empty() {
        return Err("Name is required".to_string());
    }
    if req.preferred_days.is_empty() {
        return Err("At least one preferred day is required".to_string());
    }
    if req.preferred_days.len() > config.max_oasis_days {
        return Err(format!(
            "At most {} preferred days can be selected",
            config.max_oasis_days
        ));
    }
    Ok(())
}

fn parse_day_labels(labels: &[String]) -> Result<Vec<chrono::Weekday>, String> {
    let joined = labels.join(",");
    let (days, bad) = parse_preferred_days(&joined);
    if !bad.is_empty() {
        return Err(format!("Unknown day label(s): {}", bad.join(", ")));
    }
    Ok(days)
}

fn is_admin(req: &HttpRequest, state: &AppState) -> bool {
    req.headers()
        .get("X-Admin-Password")
        .and_then(|v| v.to_str().ok())
        .map(|p| p == state.admin_password)
        .unwrap_or(false)
}

// Team preference submission endpoint
async fn submit_team(
    req: web::Json<TeamFormRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if let Err(e) = validate_team_form(&req, &state.config) {
        return Ok(HttpResponse::BadRequest()
            .json(serde_json::json!({"success": false, "error": e})));
    }
    let days = match parse_day_labels(&req.preferred_days) {
        Ok(days) => days,
        Err(e) => {
            return Ok(HttpResponse::BadRequest()
                .json(serde_json::json!({"success": false, "error": e})))
        }
    };
    let pref = TeamPreference {
        occupant_id: req.team_name.trim().to_string(),
        contact: req.contact_person.clone().filter(|c| !c.trim().is_empty()),
        party_size: req.team_size,
        preferred_days: days,
        submitted_at: Utc::now(),
    };

    let mut store = state.store.lock().unwrap();
    if let Err(e) = store.upsert_team_preference(pref.clone(), state.config.team_day_count) {
        return Ok(HttpResponse::BadRequest()
            .json(serde_json::json!({"success": false, "error": e})));
    }
    drop(store);

    // Keep the CSV in sync so submissions survive a restart
    if let Err(e) = append_team_preference_csv(&state.team_csv, &pref) {
        tracing::error!("failed to persist team submission: {}", e);
        return Ok(HttpResponse::InternalServerError()
            .json(serde_json::json!({"success": false, "error": e.to_string()})));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

// Oasis sign-up endpoint
async fn submit_oasis(
    req: web::Json<OasisFormRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if let Err(e) = validate_oasis_form(&req, &state.config) {
        return Ok(HttpResponse::BadRequest()
            .json(serde_json::json!({"success": false, "error": e})));
    }
    let days = match parse_day_labels(&req.preferred_days) {
        Ok(days) => days,
        Err(e) => {
            return Ok(HttpResponse::BadRequest()
                .json(serde_json::json!({"success": false, "error": e})))
        }
    };
    let pref = OasisPreference {
        occupant_id: req.person_name.trim().to_string(),
        preferred_days: days,
        submitted_at: Utc::now(),
    };

    let mut store = state.store.lock().unwrap();
    if let Err(e) = store.upsert_oasis_preference(pref.clone(), state.config.max_oasis_days) {
        return Ok(HttpResponse::BadRequest()
            .json(serde_json::json!({"success": false, "error": e})));
    }
    drop(store);

    if let Err(e) = append_oasis_preference_csv(&state.oasis_csv, &pref) {
        tracing::error!("failed to persist oasis submission: {}", e);
        return Ok(HttpResponse::InternalServerError()
            .json(serde_json::json!({"success": false, "error": e.to_string()})));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

// Current submissions, for the admin panel
async fn get_preferences(state: web::Data<AppState>) -> Result<HttpResponse> {
    let store = state.store.lock().unwrap();
    let teams: Vec<TeamPrefView> = store
        .team_preferences()
        .iter()
        .map(|p| TeamPrefView {
            team: p.occupant_id.clone(),
            contact: p.contact.clone(),
            size: p.party_size,
            days: format_preferred_days(&p.preferred_days),
        })
        .collect();
    let oasis: Vec<OasisPrefView> = store
        .oasis_preferences()
        .iter()
        .map(|p| OasisPrefView {
            person: p.occupant_id.clone(),
            days: format_preferred_days(&p.preferred_days),
        })
        .collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({"teams": teams, "oasis": oasis})))
}

// Admin trigger: run the allocator for a week and scope
async fn allocate(
    http_req: HttpRequest,
    req: web::Json<AllocateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&http_req, &state) {
        return Ok(HttpResponse::Unauthorized()
            .json(serde_json::json!({"success": false, "error": "Unauthorized"})));
    }
    let seed = req.seed.unwrap_or_else(rand::random);

    let mut store = state.store.lock().unwrap();
    match run_allocation(
        &mut store,
        &state.catalog,
        &state.config,
        req.week_anchor,
        req.scope,
        seed,
    ) {
        Ok(report) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "written": report.written,
            "replaced": report.replaced,
            "unplaced": report.unplaced,
            "seed": seed,
        }))),
        Err(e @ AllocationError::Validation(_)) => Ok(HttpResponse::BadRequest()
            .json(serde_json::json!({"success": false, "error": e.to_string()}))),
        Err(e) => Ok(HttpResponse::InternalServerError()
            .json(serde_json::json!({"success": false, "error": e.to_string()}))),
    }
}

// Admin reset of preferences and/or allocations
async fn reset(
    http_req: HttpRequest,
    req: web::Json<ResetRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&http_req, &state) {
        return Ok(HttpResponse::Unauthorized()
            .json(serde_json::json!({"success": false, "error": "Unauthorized"})));
    }
    let mut store = state.store.lock().unwrap();
    if req.preferences {
        store.reset_preferences();
        for path in [&state.team_csv, &state.oasis_csv] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!("could not remove {}: {}", path.display(), e);
                }
            }
        }
    }
    if req.allocations {
        store.reset_allocations();
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

// The resource × weekday grid consumers pivot into a dashboard
async fn get_grid(
    query: web::Query<GridQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let week = match Week::from_anchor(query.week_anchor) {
        Ok(week) => week,
        Err(e) => {
            return Ok(HttpResponse::BadRequest()
                .json(serde_json::json!({"error": e.to_string()})))
        }
    };
    let store = state.store.lock().unwrap();
    let assignments = store.assignments_on(&week.dates());

    let rows: Vec<GridRow> = state
        .catalog
        .project_rooms
        .iter()
        .chain(state.catalog.pools.iter())
        .map(|room| {
            let cells = week
                .days()
                .iter()
                .map(|&(day, date)| {
                    let occupants: Vec<&str> = assignments
                        .iter()
                        .filter(|a| a.resource_name == room.name && a.date == date)
                        .map(|a| a.occupant_id.as_str())
                        .collect();
                    GridCell {
                        day: weekday_label(day).to_string(),
                        occupants: if occupants.is_empty() {
                            "Vacant".to_string()
                        } else {
                            occupants.join(", ")
                        },
                    }
                })
                .collect();
            GridRow {
                resource: room.name.clone(),
                cells,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "week_anchor": query.week_anchor,
        "rows": rows,
    })))
}

pub async fn start_server(
    port: u16,
    admin_password: String,
    catalog: RoomCatalog,
    config: AllocatorConfig,
    store: MemoryStore,
    team_csv: PathBuf,
    oasis_csv: PathBuf,
) -> std::io::Result<()> {
    let app_state = web::Data::new(AppState {
        store: Mutex::new(store),
        catalog,
        config,
        admin_password,
        team_csv,
        oasis_csv,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .route("/api/preferences", web::post().to(submit_team))
            .route("/api/preferences", web::get().to(get_preferences))
            .route("/api/oasis", web::post().to(submit_oasis))
            .route("/api/allocate", web::post().to(allocate))
            .route("/api/reset", web::post().to(reset))
            .route("/api/grid", web::get().to(get_grid))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
