use serde::{Deserialize, Serialize};

/// One arrival filing as it comes out of the I-94 extract.
///
/// Numeric columns are stored as floats in the source files, codes included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawImmigrationRecord {
    pub cicid: Option<f64>,
    pub i94yr: Option<f64>,
    pub i94mon: Option<f64>,
    pub i94res: Option<f64>,
    pub i94port: Option<String>,
    pub arrdate: Option<f64>,
    pub i94mode: Option<f64>,
    pub i94addr: Option<String>,
    pub depdate: Option<f64>,
    pub i94bir: Option<f64>,
    pub i94visa: Option<f64>,
    pub airline: Option<String>,
    pub fltno: Option<String>,
    pub visatype: Option<String>,
    pub gender: Option<String>,
}

/// A decoded, air-only arrival record before it receives its surrogate key.
///
/// Fields covered by the null policy stay optional here so the policy can be
/// applied (and re-applied) as a separate step.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRecord {
    pub immigration_id: Option<i64>,
    pub immigration_year: Option<i32>,
    pub immigration_month: Option<i32>,
    pub origin_country: String,
    pub arrival_port: String,
    pub arrival_date: Option<String>,
    pub port_type: String,
    pub state_of_residence: Option<String>,
    pub departure_date: Option<String>,
    pub immigrant_age: Option<i64>,
    pub visitor_type: String,
    pub airline_code: Option<String>,
    pub airline_flight_number: Option<String>,
    pub visa_type: Option<String>,
    pub gender: Option<String>,
}

/// A cleaned record carrying its dense 1-based surrogate key.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedImmigrant {
    pub immigrant_id: u64,
    pub record: CleanedRecord,
}
