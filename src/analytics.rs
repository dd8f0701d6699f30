use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Clinic, non_empty, split_tags};

/// Counts labels, remembering the order in which each label first appeared.
#[derive(Debug, Default)]
struct FirstSeenCounter {
    labels: Vec<String>,
    counts: Vec<u64>,
    slot: HashMap<String, usize>,
}

impl FirstSeenCounter {
    fn add(&mut self, label: &str) {
        match self.slot.get(label) {
            Some(&i) => self.counts[i] += 1,
            None => {
                self.slot.insert(label.to_string(), self.labels.len());
                self.labels.push(label.to_string());
                self.counts.push(1);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCounts {
    pub regions: Vec<String>,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecialtyCounts {
    pub specialties: Vec<String>,
    pub counts: Vec<u64>,
}

/// One map feature; `name` is the raw region label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total: u64,
    pub media_clinics: u64,
    pub no_media_clinics: u64,
}

/// Records per region. Records without a region are not counted.
pub fn region_counts(clinics: &[Clinic]) -> RegionCounts {
    let mut counter = FirstSeenCounter::default();
    for region in clinics
        .iter()
        .filter_map(|c| non_empty(c.region.as_deref()))
    {
        counter.add(region);
    }
    RegionCounts {
        regions: counter.labels,
        counts: counter.counts,
    }
}

/// Tag occurrences across all records; a record contributes once per tag.
pub fn specialty_counts(clinics: &[Clinic]) -> SpecialtyCounts {
    let mut counter = FirstSeenCounter::default();
    for raw in clinics.iter().filter_map(|c| c.specialties.as_deref()) {
        for tag in split_tags(raw) {
            counter.add(tag);
        }
    }
    SpecialtyCounts {
        specialties: counter.labels,
        counts: counter.counts,
    }
}

pub fn map_points(regions: &RegionCounts) -> Vec<MapPoint> {
    regions
        .regions
        .iter()
        .zip(&regions.counts)
        .map(|(name, &value)| MapPoint {
            name: name.clone(),
            value,
        })
        .collect()
}

pub fn catalog_stats(total: u64, clinics: &[Clinic]) -> CatalogStats {
    let media_clinics = clinics
        .iter()
        .filter(|c| non_empty(c.media_items.as_deref()).is_some())
        .count() as u64;
    CatalogStats {
        total,
        media_clinics,
        no_media_clinics: total.saturating_sub(media_clinics),
    }
}
