use crate::catalog::CodeCatalog;
use crate::models::{CleanedDemographic, RawDemographicRecord};
use rayon::prelude::*;
use tracing::info;

/// Finds an airport port for a city by substring match on port labels.
///
/// The first port in code-book order whose label contains the city name
/// (case-insensitive) wins. Short city names can match the wrong port; that
/// is accepted.
pub struct PortResolver<'a> {
    catalog: &'a CodeCatalog,
    // (code, uppercased label) in catalog order
    labels: Vec<(&'a str, String)>,
}

impl<'a> PortResolver<'a> {
    pub fn new(catalog: &'a CodeCatalog) -> Self {
        let labels = catalog
            .ports()
            .iter()
            .map(|entry| (entry.code.as_str(), entry.label.to_uppercase()))
            .collect();
        Self { catalog, labels }
    }

    pub fn resolve(&self, city: &str) -> Option<&'a str> {
        let needle = city.trim().to_uppercase();
        if needle.is_empty() {
            return None;
        }
        self.labels
            .iter()
            .find(|(_, label)| label.contains(&needle))
            .map(|(code, _)| *code)
    }

    pub fn resolve_record(&self, record: RawDemographicRecord) -> CleanedDemographic {
        let port = self.resolve(&record.city).map(str::to_string);
        CleanedDemographic { record, port }
    }

    pub fn resolve_all(&self, records: Vec<RawDemographicRecord>) -> Vec<CleanedDemographic> {
        let resolved: Vec<CleanedDemographic> = records
            .into_par_iter()
            .map(|record| self.resolve_record(record))
            .collect();

        let matched = resolved.iter().filter(|r| r.port.is_some()).count();
        info!(
            "Resolved ports for {} of {} demographic rows against {} port labels",
            matched,
            resolved.len(),
            self.catalog.port_count()
        );
        resolved
    }
}
