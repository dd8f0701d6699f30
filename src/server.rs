use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path as AxumPath, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::access::Caller;
use crate::analytics::{self, MapPoint, RegionCounts, SpecialtyCounts};
use crate::catalog::{CatalogStore, SqliteCatalog};
use crate::cli::ServeArgs;
use crate::export::{XLSX_CONTENT_TYPE, export_file_name};
use crate::filter::FilterParams;
use crate::model::{Clinic, NewClinic};
use crate::service::{self, ServiceError};
use crate::storage::StoragePaths;

const API_KEY_HEADER: &str = "x-api-key";
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone)]
struct AppState {
    catalog: Arc<Mutex<SqliteCatalog>>,
    admin_key: Option<Arc<str>>,
}

impl AppState {
    fn new(catalog: SqliteCatalog, admin_key: Option<String>) -> Self {
        Self {
            catalog: Arc::new(Mutex::new(catalog)),
            admin_key: admin_key.map(Arc::from),
        }
    }

    fn caller(&self, headers: &HeaderMap) -> Caller {
        let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
        Caller::from_api_key(provided, self.admin_key.as_deref())
    }
}

pub async fn run(opts: ServeArgs) -> anyhow::Result<()> {
    let paths = StoragePaths::new(&opts.data_dir);
    let catalog = paths
        .open_catalog()
        .with_context(|| format!("open catalog at {}", paths.catalog_path.display()))?;
    tracing::info!(
        "Catalog {} holds {} clinics",
        paths.catalog_path.display(),
        catalog.count()?
    );

    let admin_key = opts.admin_key.filter(|k| !k.is_empty());
    if admin_key.is_none() {
        tracing::warn!("No admin key configured; catalog changes over HTTP are disabled");
    }

    let app = router(AppState::new(catalog, admin_key));

    let addr: SocketAddr = format!("{}:{}", opts.host, opts.port)
        .parse()
        .context("parse host:port")?;

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/clinics", get(api_list_clinics).post(api_create_clinic))
        .route(
            "/api/clinics/:id",
            put(api_update_clinic).delete(api_delete_clinic),
        )
        .route("/api/stats", get(api_stats))
        .route("/api/analytics/regions", get(api_region_stats))
        .route("/api/analytics/specialties", get(api_specialty_stats))
        .route("/api/analytics/taiwan_map", get(api_taiwan_map))
        .route("/api/export", get(api_export))
        .route(
            "/api/import",
            post(api_import).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .layer(cors)
        .with_state(state)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Permission => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_)
            | ServiceError::Format(_)
            | ServiceError::NothingToExport => StatusCode::BAD_REQUEST,
            ServiceError::Storage(_) | ServiceError::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        let body = json!({ "success": false, "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

// Extractor rejections keep the JSON error body instead of axum's plain text.
impl From<JsonRejection> for ServiceError {
    fn from(r: JsonRejection) -> Self {
        ServiceError::Validation(r.body_text())
    }
}

impl From<PathRejection> for ServiceError {
    fn from(r: PathRejection) -> Self {
        ServiceError::Validation(r.body_text())
    }
}

impl From<MultipartRejection> for ServiceError {
    fn from(r: MultipartRejection) -> Self {
        ServiceError::Format(r.body_text())
    }
}

/// Wire shape of a clinic; timestamps render as `YYYY-MM-DD HH:MM:SS`.
#[derive(Debug, Serialize)]
struct ClinicView {
    id: i64,
    region: Option<String>,
    district: Option<String>,
    name: String,
    health_mall: String,
    hundred_position: String,
    media_items: Option<String>,
    specialties: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    contact_person: Option<String>,
    business_hours: Option<String>,
    note: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl From<Clinic> for ClinicView {
    fn from(c: Clinic) -> Self {
        Self {
            id: c.id,
            region: c.region,
            district: c.district,
            name: c.name,
            health_mall: c.health_mall,
            hundred_position: c.hundred_position,
            media_items: c.media_items,
            specialties: c.specialties,
            address: c.address,
            phone: c.phone,
            contact_person: c.contact_person,
            business_hours: c.business_hours,
            note: c.note,
            created_at: c.created_at.map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            updated_at: c.updated_at.map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn api_list_clinics(
    State(st): State<AppState>,
    Query(p): Query<FilterParams>,
) -> Result<Json<Vec<ClinicView>>, ServiceError> {
    let catalog = st.catalog.lock().await;
    let clinics = service::list_clinics(&*catalog, &p)?;
    Ok(Json(clinics.into_iter().map(ClinicView::from).collect()))
}

async fn api_create_clinic(
    State(st): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<NewClinic>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let caller = st.caller(&headers);
    service::require_admin(&caller)?;
    let Json(body) = body?;
    let mut catalog = st.catalog.lock().await;
    let id = service::create_clinic(&mut *catalog, &caller, &body)?;
    Ok(Json(json!({ "success": true, "id": id })))
}

async fn api_update_clinic(
    State(st): State<AppState>,
    id: Result<AxumPath<i64>, PathRejection>,
    headers: HeaderMap,
    body: Result<Json<NewClinic>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let caller = st.caller(&headers);
    service::require_admin(&caller)?;
    let AxumPath(id) = id?;
    let Json(body) = body?;
    let mut catalog = st.catalog.lock().await;
    service::update_clinic(&mut *catalog, &caller, id, &body)?;
    Ok(Json(json!({ "success": true })))
}

async fn api_delete_clinic(
    State(st): State<AppState>,
    id: Result<AxumPath<i64>, PathRejection>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let caller = st.caller(&headers);
    service::require_admin(&caller)?;
    let AxumPath(id) = id?;
    let mut catalog = st.catalog.lock().await;
    service::delete_clinic(&mut *catalog, &caller, id)?;
    Ok(Json(json!({ "success": true })))
}

async fn api_stats(State(st): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let catalog = st.catalog.lock().await;
    Ok(Json(service::stats(&*catalog)?))
}

async fn all_clinics(st: &AppState) -> Result<Vec<Clinic>, ServiceError> {
    let catalog = st.catalog.lock().await;
    Ok(catalog.list_all()?)
}

async fn api_region_stats(
    State(st): State<AppState>,
) -> Result<Json<RegionCounts>, ServiceError> {
    let clinics = all_clinics(&st).await?;
    Ok(Json(analytics::region_counts(&clinics)))
}

async fn api_specialty_stats(
    State(st): State<AppState>,
) -> Result<Json<SpecialtyCounts>, ServiceError> {
    let clinics = all_clinics(&st).await?;
    Ok(Json(analytics::specialty_counts(&clinics)))
}

async fn api_taiwan_map(State(st): State<AppState>) -> Result<Json<Vec<MapPoint>>, ServiceError> {
    let clinics = all_clinics(&st).await?;
    Ok(Json(analytics::map_points(&analytics::region_counts(
        &clinics,
    ))))
}

async fn api_export(
    State(st): State<AppState>,
    Query(p): Query<FilterParams>,
) -> Result<Response, ServiceError> {
    let bytes = {
        let catalog = st.catalog.lock().await;
        service::export_clinics(&*catalog, &p)?
    };
    let file_name = export_file_name(chrono::Local::now().naive_local());
    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];
    Ok((StatusCode::OK, headers, bytes).into_response())
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, ServiceError> {
    let bad_upload = |e: axum::extract::multipart::MultipartError| {
        ServiceError::Format(format!("invalid upload: {e}"))
    };
    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(bad_upload)?;
        return Ok(Some(Upload {
            file_name,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

async fn api_import(
    State(st): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let caller = st.caller(&headers);
    service::require_admin(&caller)?;
    let mut multipart = multipart?;

    let Some(upload) = read_upload(&mut multipart).await? else {
        return Err(ServiceError::Format("no file uploaded".into()));
    };

    let mut catalog = st.catalog.lock().await;
    let outcome =
        service::import_clinics(&mut *catalog, &caller, &upload.file_name, &upload.bytes)?;
    Ok(Json(json!({
        "success": true,
        "imported": outcome.imported,
        "errors": outcome.errors,
    })))
}
