use crate::error::{PipelineError, Result};
use crate::models::*;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::info;

/// Projects cleaned records into the dimension and fact tables.
///
/// Every table is a straight column selection over the same source rows, so
/// fact keys always point at dimension rows built in the same call.
pub struct StarSchemaBuilder;

impl StarSchemaBuilder {
    pub fn build(
        &self,
        immigrants: &[CleanedImmigrant],
        demographics: &[CleanedDemographic],
    ) -> StarSchema {
        let schema = StarSchema {
            immigrant: immigrants.iter().map(Self::immigrant_row).collect(),
            immigrant_stats: immigrants.iter().map(Self::immigrant_stats_row).collect(),
            arrival_info: immigrants.iter().map(Self::arrival_info_row).collect(),
            arrival_date: immigrants.iter().map(Self::arrival_date_row).collect(),
            city_population: demographics.iter().map(Self::city_population_row).collect(),
            city_demographics: demographics.iter().map(Self::city_demographics_row).collect(),
        };

        for table in TableName::ALL {
            info!("Projected {} rows into {}", schema.row_count(table), table);
        }
        schema
    }

    fn immigrant_row(immigrant: &CleanedImmigrant) -> ImmigrantRow {
        let record = &immigrant.record;
        ImmigrantRow {
            immigrant_id: immigrant.immigrant_id,
            arrival_port: record.arrival_port.clone(),
            state_of_residence: record.state_of_residence.clone().unwrap_or_default(),
            arrival_date: record.arrival_date.clone(),
        }
    }

    fn immigrant_stats_row(immigrant: &CleanedImmigrant) -> ImmigrantStatsRow {
        let record = &immigrant.record;
        ImmigrantStatsRow {
            immigrant_id: immigrant.immigrant_id,
            immigration_id: record.immigration_id,
            gender: record.gender.clone().unwrap_or_default(),
            age: record.immigrant_age.unwrap_or(-1),
            origin_country: record.origin_country.clone(),
            visa_type: record.visa_type.clone(),
            visitor_type: record.visitor_type.clone(),
        }
    }

    fn arrival_info_row(immigrant: &CleanedImmigrant) -> ArrivalInfoRow {
        let record = &immigrant.record;
        ArrivalInfoRow {
            immigrant_id: immigrant.immigrant_id,
            port: record.arrival_port.clone(),
            port_type: record.port_type.clone(),
            airline_code: record.airline_code.clone().unwrap_or_default(),
            airline_flight_number: record.airline_flight_number.clone().unwrap_or_default(),
        }
    }

    fn arrival_date_row(immigrant: &CleanedImmigrant) -> ArrivalDateRow {
        let record = &immigrant.record;
        ArrivalDateRow {
            arrival_date: record.arrival_date.clone(),
            immigration_year: record.immigration_year,
            immigration_month: record.immigration_month,
        }
    }

    fn city_population_row(demographic: &CleanedDemographic) -> CityPopulationRow {
        let record = &demographic.record;
        CityPopulationRow {
            city: record.city.clone(),
            port: demographic.port.clone(),
            state: record.state.clone(),
            male_population: record.male_population,
            female_population: record.female_population,
            total_population: record.total_population,
            foreign_born: record.foreign_born,
        }
    }

    fn city_demographics_row(demographic: &CleanedDemographic) -> CityDemographicsRow {
        let record = &demographic.record;
        CityDemographicsRow {
            city: record.city.clone(),
            port: demographic.port.clone(),
            state: record.state.clone(),
            race: record.race.clone(),
            n_persons: record.count,
        }
    }

    /// Checks key uniqueness, fact-to-dimension references and non-empty
    /// join keys.
    pub fn verify_referential_integrity(&self, schema: &StarSchema) -> Result<()> {
        let mut ids = HashSet::with_capacity(schema.immigrant.len());
        for row in &schema.immigrant {
            if row.immigrant_id == 0 {
                return Err(PipelineError::integrity(
                    TableName::Immigrant.as_str(),
                    "immigrant_id 0 is not a valid surrogate key",
                ));
            }
            if !ids.insert(row.immigrant_id) {
                return Err(PipelineError::integrity(
                    TableName::Immigrant.as_str(),
                    format!("duplicate immigrant_id {}", row.immigrant_id),
                ));
            }
            if row.arrival_port.is_empty() {
                return Err(PipelineError::integrity(
                    TableName::Immigrant.as_str(),
                    format!("immigrant {} has no arrival_port", row.immigrant_id),
                ));
            }
        }

        let orphan = |table: TableName, id: u64| {
            PipelineError::integrity(
                table.as_str(),
                format!("immigrant_id {} has no dimension row", id),
            )
        };

        for row in &schema.immigrant_stats {
            if !ids.contains(&row.immigrant_id) {
                return Err(orphan(TableName::ImmigrantStats, row.immigrant_id));
            }
        }
        for row in &schema.arrival_info {
            if !ids.contains(&row.immigrant_id) {
                return Err(orphan(TableName::ArrivalInfo, row.immigrant_id));
            }
            if row.port_type.is_empty() {
                return Err(PipelineError::integrity(
                    TableName::ArrivalInfo.as_str(),
                    format!("immigrant {} has no port_type", row.immigrant_id),
                ));
            }
        }

        Ok(())
    }
}

/// Converts one projected table into a DataFrame with a fixed column order.
pub fn table_to_dataframe(schema: &StarSchema, table: TableName) -> PolarsResult<DataFrame> {
    let columns: Vec<Column> = match table {
        TableName::Immigrant => {
            let rows = &schema.immigrant;
            vec![
                column("immigrant_id", rows.iter().map(|r| r.immigrant_id).collect::<Vec<_>>()),
                column("arrival_port", rows.iter().map(|r| r.arrival_port.clone()).collect::<Vec<_>>()),
                column(
                    "state_of_residence",
                    rows.iter().map(|r| r.state_of_residence.clone()).collect::<Vec<_>>(),
                ),
                column("arrival_date", rows.iter().map(|r| r.arrival_date.clone()).collect::<Vec<_>>()),
            ]
        }
        TableName::ImmigrantStats => {
            let rows = &schema.immigrant_stats;
            vec![
                column("immigrant_id", rows.iter().map(|r| r.immigrant_id).collect::<Vec<_>>()),
                column("immigration_id", rows.iter().map(|r| r.immigration_id).collect::<Vec<_>>()),
                column("gender", rows.iter().map(|r| r.gender.clone()).collect::<Vec<_>>()),
                column("age", rows.iter().map(|r| r.age).collect::<Vec<_>>()),
                column("origin_country", rows.iter().map(|r| r.origin_country.clone()).collect::<Vec<_>>()),
                column("visa_type", rows.iter().map(|r| r.visa_type.clone()).collect::<Vec<_>>()),
                column("visitor_type", rows.iter().map(|r| r.visitor_type.clone()).collect::<Vec<_>>()),
            ]
        }
        TableName::ArrivalInfo => {
            let rows = &schema.arrival_info;
            vec![
                column("immigrant_id", rows.iter().map(|r| r.immigrant_id).collect::<Vec<_>>()),
                column("port", rows.iter().map(|r| r.port.clone()).collect::<Vec<_>>()),
                column("port_type", rows.iter().map(|r| r.port_type.clone()).collect::<Vec<_>>()),
                column("airline_code", rows.iter().map(|r| r.airline_code.clone()).collect::<Vec<_>>()),
                column(
                    "airline_flight_number",
                    rows.iter().map(|r| r.airline_flight_number.clone()).collect::<Vec<_>>(),
                ),
            ]
        }
        TableName::ArrivalDate => {
            let rows = &schema.arrival_date;
            vec![
                column("arrival_date", rows.iter().map(|r| r.arrival_date.clone()).collect::<Vec<_>>()),
                column("immigration_year", rows.iter().map(|r| r.immigration_year).collect::<Vec<_>>()),
                column("immigration_month", rows.iter().map(|r| r.immigration_month).collect::<Vec<_>>()),
            ]
        }
        TableName::CityPopulation => {
            let rows = &schema.city_population;
            vec![
                column("city", rows.iter().map(|r| r.city.clone()).collect::<Vec<_>>()),
                column("port", rows.iter().map(|r| r.port.clone()).collect::<Vec<_>>()),
                column("state", rows.iter().map(|r| r.state.clone()).collect::<Vec<_>>()),
                column("male_population", rows.iter().map(|r| r.male_population).collect::<Vec<_>>()),
                column("female_population", rows.iter().map(|r| r.female_population).collect::<Vec<_>>()),
                column("total_population", rows.iter().map(|r| r.total_population).collect::<Vec<_>>()),
                column("foreign_born", rows.iter().map(|r| r.foreign_born).collect::<Vec<_>>()),
            ]
        }
        TableName::CityDemographics => {
            let rows = &schema.city_demographics;
            vec![
                column("city", rows.iter().map(|r| r.city.clone()).collect::<Vec<_>>()),
                column("port", rows.iter().map(|r| r.port.clone()).collect::<Vec<_>>()),
                column("state", rows.iter().map(|r| r.state.clone()).collect::<Vec<_>>()),
                column("race", rows.iter().map(|r| r.race.clone()).collect::<Vec<_>>()),
                column("n_persons", rows.iter().map(|r| r.n_persons).collect::<Vec<_>>()),
            ]
        }
    };

    DataFrame::new(columns)
}

fn column<T, V>(name: &str, values: V) -> Column
where
    Series: NamedFrom<V, T>,
    T: ?Sized,
{
    Series::new(name.into(), values).into()
}
