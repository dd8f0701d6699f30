use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;

use crate::access::Caller;
use crate::analytics::{self, CatalogStats, RegionCounts, SpecialtyCounts};
use crate::catalog::CatalogStore;
use crate::cli::{ExportArgs, ImportArgs, StatsArgs};
use crate::export::export_file_name;
use crate::filter::FilterParams;
use crate::service;
use crate::storage::StoragePaths;

pub fn export(opts: ExportArgs) -> anyhow::Result<PathBuf> {
    let paths = StoragePaths::new(&opts.data_dir);
    let catalog = paths
        .open_catalog()
        .with_context(|| format!("open catalog at {}", paths.catalog_path.display()))?;

    let params = FilterParams {
        search: opts.search,
        region: opts.region,
        specialty: opts.specialty,
        media_item: opts.media_item,
    };
    let bytes = service::export_clinics(&catalog, &params)?;

    let out = opts.out.unwrap_or_else(|| {
        PathBuf::from(export_file_name(chrono::Local::now().naive_local()))
    });
    fs::write(&out, &bytes).with_context(|| format!("write {}", out.display()))?;
    tracing::info!("Wrote {} ({} bytes)", out.display(), bytes.len());
    Ok(out)
}

pub fn import(opts: ImportArgs) -> anyhow::Result<()> {
    let paths = StoragePaths::new(&opts.data_dir);
    let mut catalog = paths
        .open_catalog()
        .with_context(|| format!("open catalog at {}", paths.catalog_path.display()))?;

    let bytes = fs::read(&opts.file).with_context(|| format!("read {}", opts.file.display()))?;
    let file_name = opts
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    // Local operators act with the admin role.
    let outcome = service::import_clinics(&mut catalog, &Caller::admin(), file_name, &bytes)?;

    println!("Imported {} clinics", outcome.imported);
    if !outcome.errors.is_empty() {
        println!("{} rows rejected:", outcome.errors.len());
        for e in &outcome.errors {
            println!("  {e}");
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct StatsReport {
    stats: CatalogStats,
    regions: RegionCounts,
    specialties: SpecialtyCounts,
}

fn stats_report<S: CatalogStore>(store: &S) -> anyhow::Result<StatsReport> {
    let stats = service::stats(store)?;
    let clinics = store.list_all()?;
    Ok(StatsReport {
        stats,
        regions: analytics::region_counts(&clinics),
        specialties: analytics::specialty_counts(&clinics),
    })
}

pub fn stats(opts: StatsArgs) -> anyhow::Result<()> {
    let paths = StoragePaths::new(&opts.data_dir);
    let catalog = paths
        .open_catalog()
        .with_context(|| format!("open catalog at {}", paths.catalog_path.display()))?;
    let report = stats_report(&catalog)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
