//! Catalog operations as seen by API and CLI callers.
//!
//! Mutations take the request's [`Caller`] and refuse to touch the store
//! unless it holds the admin role.

use crate::access::Caller;
use crate::analytics::{self, CatalogStats};
use crate::catalog::{CatalogError, CatalogStore};
use crate::export::encode_clinics;
use crate::filter::{ClinicFilter, EXPORT, FilterParams, LISTING};
use crate::import::{ImportError, ImportOutcome, import_workbook};
use crate::model::{Clinic, NewClinic};

pub const IMPORT_EXTENSION: &str = ".xlsx";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("permission denied: administrator role required")]
    Permission,
    #[error("clinic {0} not found")]
    NotFound(i64),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Format(String),
    #[error("no clinics match the export filters")]
    NothingToExport,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("failed to build spreadsheet: {0}")]
    Encode(String),
}

impl From<CatalogError> for ServiceError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Storage(other.to_string()),
        }
    }
}

impl From<ImportError> for ServiceError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::Format(msg) => ServiceError::Format(msg),
            ImportError::Storage(inner) => ServiceError::Storage(inner.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub fn require_admin(caller: &Caller) -> ServiceResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Permission)
    }
}

fn require_name(fields: &NewClinic) -> ServiceResult<()> {
    if fields.name.trim().is_empty() {
        return Err(ServiceError::Validation("clinic name is required".into()));
    }
    Ok(())
}

pub fn list_clinics<S: CatalogStore>(
    store: &S,
    params: &FilterParams,
) -> ServiceResult<Vec<Clinic>> {
    let filter = ClinicFilter::build(params, LISTING);
    Ok(filter.apply(store.list_all()?))
}

pub fn create_clinic<S: CatalogStore>(
    store: &mut S,
    caller: &Caller,
    fields: &NewClinic,
) -> ServiceResult<i64> {
    require_admin(caller)?;
    require_name(fields)?;
    let id = store.create(fields)?;
    tracing::info!("created clinic id={id}");
    Ok(id)
}

pub fn update_clinic<S: CatalogStore>(
    store: &mut S,
    caller: &Caller,
    id: i64,
    fields: &NewClinic,
) -> ServiceResult<()> {
    require_admin(caller)?;
    require_name(fields)?;
    store.update(id, fields)?;
    tracing::info!("updated clinic id={id}");
    Ok(())
}

pub fn delete_clinic<S: CatalogStore>(
    store: &mut S,
    caller: &Caller,
    id: i64,
) -> ServiceResult<()> {
    require_admin(caller)?;
    store.delete(id)?;
    tracing::info!("deleted clinic id={id}");
    Ok(())
}

pub fn stats<S: CatalogStore>(store: &S) -> ServiceResult<CatalogStats> {
    let total = store.count()?;
    Ok(analytics::catalog_stats(total, &store.list_all()?))
}

/// Encodes the records matching the export filters; an empty match is an error.
pub fn export_clinics<S: CatalogStore>(
    store: &S,
    params: &FilterParams,
) -> ServiceResult<Vec<u8>> {
    let clinics = ClinicFilter::build(params, EXPORT).apply(store.list_all()?);
    if clinics.is_empty() {
        return Err(ServiceError::NothingToExport);
    }
    tracing::info!("exporting {} clinics", clinics.len());
    encode_clinics(&clinics).map_err(|e| ServiceError::Encode(e.to_string()))
}

pub fn import_clinics<S: CatalogStore>(
    store: &mut S,
    caller: &Caller,
    file_name: &str,
    bytes: &[u8],
) -> ServiceResult<ImportOutcome> {
    require_admin(caller)?;
    if file_name.is_empty() {
        return Err(ServiceError::Format("no file selected".into()));
    }
    if !file_name.ends_with(IMPORT_EXTENSION) {
        return Err(ServiceError::Format(format!(
            "only {IMPORT_EXTENSION} files are accepted"
        )));
    }
    import_workbook(store, bytes).map_err(|e| {
        tracing::warn!("import of {file_name} failed: {e}");
        e.into()
    })
}
