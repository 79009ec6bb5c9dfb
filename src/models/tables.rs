use serde::{Deserialize, Serialize};
use std::fmt;

/// The six output tables of the star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Immigrant,
    ImmigrantStats,
    ArrivalInfo,
    ArrivalDate,
    CityPopulation,
    CityDemographics,
}

impl TableName {
    pub const ALL: [TableName; 6] = [
        TableName::Immigrant,
        TableName::ImmigrantStats,
        TableName::ArrivalInfo,
        TableName::ArrivalDate,
        TableName::CityPopulation,
        TableName::CityDemographics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Immigrant => "immigrant",
            TableName::ImmigrantStats => "immigrant_stats",
            TableName::ArrivalInfo => "arrival_info",
            TableName::ArrivalDate => "arrival_date",
            TableName::CityPopulation => "city_population",
            TableName::CityDemographics => "city_demographics",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dimension row: who arrived, where and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmigrantRow {
    pub immigrant_id: u64,
    pub arrival_port: String,
    pub state_of_residence: String,
    pub arrival_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmigrantStatsRow {
    pub immigrant_id: u64,
    pub immigration_id: Option<i64>,
    pub gender: String,
    pub age: i64,
    pub origin_country: String,
    pub visa_type: Option<String>,
    pub visitor_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalInfoRow {
    pub immigrant_id: u64,
    pub port: String,
    pub port_type: String,
    pub airline_code: String,
    pub airline_flight_number: String,
}

/// Calendar breakdown; one row per immigrant, so dates repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalDateRow {
    pub arrival_date: Option<String>,
    pub immigration_year: Option<i32>,
    pub immigration_month: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityPopulationRow {
    pub city: String,
    pub port: Option<String>,
    pub state: String,
    pub male_population: Option<i64>,
    pub female_population: Option<i64>,
    pub total_population: Option<i64>,
    pub foreign_born: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityDemographicsRow {
    pub city: String,
    pub port: Option<String>,
    pub state: String,
    pub race: Option<String>,
    pub n_persons: Option<i64>,
}

/// All six projected tables of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StarSchema {
    pub immigrant: Vec<ImmigrantRow>,
    pub immigrant_stats: Vec<ImmigrantStatsRow>,
    pub arrival_info: Vec<ArrivalInfoRow>,
    pub arrival_date: Vec<ArrivalDateRow>,
    pub city_population: Vec<CityPopulationRow>,
    pub city_demographics: Vec<CityDemographicsRow>,
}

impl StarSchema {
    pub fn row_count(&self, table: TableName) -> usize {
        match table {
            TableName::Immigrant => self.immigrant.len(),
            TableName::ImmigrantStats => self.immigrant_stats.len(),
            TableName::ArrivalInfo => self.arrival_info.len(),
            TableName::ArrivalDate => self.arrival_date.len(),
            TableName::CityPopulation => self.city_population.len(),
            TableName::CityDemographics => self.city_demographics.len(),
        }
    }
}
