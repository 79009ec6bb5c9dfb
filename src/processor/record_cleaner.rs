use crate::catalog::CodeCatalog;
use crate::models::{CleanedRecord, RawImmigrationRecord};
use crate::processor::field_normalizer::{
    TransportMode, VisaCategory, code_from_f64, normalize_country, normalize_date,
    normalize_port, UNKNOWN,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Per-field replacements for missing values.
///
/// `departure_date` is intentionally absent: no departure means the person
/// has not left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullPolicy {
    pub state_of_residence: String,
    pub immigrant_age: i64,
    pub airline_code: String,
    pub airline_flight_number: String,
    pub gender: String,
}

impl Default for NullPolicy {
    fn default() -> Self {
        Self {
            state_of_residence: "unknown".to_string(),
            immigrant_age: -1,
            airline_code: UNKNOWN.to_string(),
            airline_flight_number: UNKNOWN.to_string(),
            gender: "X".to_string(),
        }
    }
}

impl NullPolicy {
    pub fn apply(&self, record: &mut CleanedRecord) {
        fill(&mut record.state_of_residence, &self.state_of_residence);
        fill(&mut record.airline_code, &self.airline_code);
        fill(&mut record.airline_flight_number, &self.airline_flight_number);
        fill(&mut record.gender, &self.gender);
        record.immigrant_age.get_or_insert(self.immigrant_age);
    }
}

fn fill(field: &mut Option<String>, default: &str) {
    if field.is_none() {
        *field = Some(default.to_string());
    }
}

/// Blank strings in the extract mean "missing".
fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningStats {
    pub input: usize,
    pub kept: usize,
    pub dropped_non_air: usize,
}

/// Decodes raw arrival filings into air-only cleaned records.
pub struct RecordCleaner<'a> {
    catalog: &'a CodeCatalog,
    null_policy: NullPolicy,
}

impl<'a> RecordCleaner<'a> {
    pub fn new(catalog: &'a CodeCatalog, null_policy: NullPolicy) -> Self {
        Self {
            catalog,
            null_policy,
        }
    }

    /// Decodes one record without filtering or null filling.
    pub fn normalize(&self, raw: &RawImmigrationRecord) -> CleanedRecord {
        let port = non_blank(&raw.i94port);

        CleanedRecord {
            immigration_id: code_from_f64(raw.cicid),
            immigration_year: code_from_f64(raw.i94yr).and_then(|v| i32::try_from(v).ok()),
            immigration_month: code_from_f64(raw.i94mon).and_then(|v| i32::try_from(v).ok()),
            origin_country: normalize_country(self.catalog, code_from_f64(raw.i94res)),
            arrival_port: normalize_port(self.catalog, port.as_deref()),
            arrival_date: normalize_date(raw.arrdate),
            port_type: TransportMode::from_code(code_from_f64(raw.i94mode))
                .label()
                .to_string(),
            state_of_residence: non_blank(&raw.i94addr),
            departure_date: normalize_date(raw.depdate),
            immigrant_age: raw
                .i94bir
                .filter(|age| age.is_finite())
                .map(|age| age.trunc() as i64),
            visitor_type: VisaCategory::from_code(code_from_f64(raw.i94visa))
                .label()
                .to_string(),
            airline_code: non_blank(&raw.airline),
            airline_flight_number: non_blank(&raw.fltno),
            visa_type: non_blank(&raw.visatype),
            gender: non_blank(&raw.gender),
        }
    }

    /// Normalizes, keeps air arrivals only, then fills missing values.
    pub fn clean_record(&self, raw: &RawImmigrationRecord) -> Option<CleanedRecord> {
        let mut record = self.normalize(raw);
        if record.port_type != TransportMode::Air.label() {
            return None;
        }
        self.null_policy.apply(&mut record);
        Some(record)
    }

    /// Cleans a batch in parallel; output keeps input order.
    pub fn clean_all(&self, raw: &[RawImmigrationRecord]) -> (Vec<CleanedRecord>, CleaningStats) {
        let cleaned: Vec<CleanedRecord> = raw
            .par_iter()
            .filter_map(|record| self.clean_record(record))
            .collect();

        let stats = CleaningStats {
            input: raw.len(),
            kept: cleaned.len(),
            dropped_non_air: raw.len() - cleaned.len(),
        };
        info!(
            "Cleaned immigration records: {} in, {} air arrivals kept, {} dropped",
            stats.input, stats.kept, stats.dropped_non_air
        );

        (cleaned, stats)
    }
}
