use crate::catalog::CodeCatalog;
use chrono::{Days, NaiveDate};

pub const OTHER: &str = "Other";
pub const UNKNOWN: &str = "Unknown";
pub const NOT_REPORTED: &str = "Not reported";

/// Day zero of the SAS date offsets used by the I-94 extract.
pub const SAS_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1960, 1, 1) {
    Some(date) => date,
    None => panic!("1960-01-01 is a valid date"),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportMode {
    Air,
    Sea,
    Land,
    NotReported,
}

impl TransportMode {
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => TransportMode::Air,
            Some(2) => TransportMode::Sea,
            Some(3) => TransportMode::Land,
            Some(9) => TransportMode::NotReported,
            _ => TransportMode::NotReported,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransportMode::Air => "Air",
            TransportMode::Sea => "Sea",
            TransportMode::Land => "Land",
            TransportMode::NotReported => NOT_REPORTED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisaCategory {
    Business,
    Pleasure,
    Student,
    Unknown,
}

impl VisaCategory {
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => VisaCategory::Business,
            Some(2) => VisaCategory::Pleasure,
            Some(3) => VisaCategory::Student,
            _ => VisaCategory::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VisaCategory::Business => "Business",
            VisaCategory::Pleasure => "Pleasure",
            VisaCategory::Student => "Student",
            VisaCategory::Unknown => UNKNOWN,
        }
    }
}

/// Converts a float-encoded code to an integer code.
///
/// Non-finite and fractional values are not codes.
pub fn code_from_f64(value: Option<f64>) -> Option<i64> {
    let value = value?;
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < i64::MIN as f64 || value > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

pub fn normalize_country(catalog: &CodeCatalog, raw_code: Option<i64>) -> String {
    raw_code
        .and_then(|code| catalog.country_name(code))
        .unwrap_or(OTHER)
        .to_string()
}

/// Known port codes pass through as codes; the decoded name is only used
/// for city matching.
pub fn normalize_port(catalog: &CodeCatalog, raw_code: Option<&str>) -> String {
    match raw_code {
        Some(code) if catalog.contains_port(code) => code.to_string(),
        _ => OTHER.to_string(),
    }
}

pub fn normalize_transport_mode(raw_code: Option<i64>) -> String {
    TransportMode::from_code(raw_code).label().to_string()
}

pub fn normalize_visa_category(raw_code: Option<i64>) -> String {
    VisaCategory::from_code(raw_code).label().to_string()
}

/// Turns a SAS day offset into an ISO calendar date.
///
/// Fractional offsets are truncated. Offsets outside the representable
/// calendar yield `None`.
pub fn normalize_date(day_offset: Option<f64>) -> Option<String> {
    let offset = day_offset?;
    if !offset.is_finite() {
        return None;
    }
    let days = offset.trunc();
    if days.abs() > u32::MAX as f64 {
        return None;
    }

    let date = if days >= 0.0 {
        SAS_EPOCH.checked_add_days(Days::new(days as u64))
    } else {
        SAS_EPOCH.checked_sub_days(Days::new((-days) as u64))
    }?;

    Some(date.format("%Y-%m-%d").to_string())
}
