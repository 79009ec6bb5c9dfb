use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// One row of the US city demographics extract.
///
/// The file repeats the population columns once per race, so the same city
/// appears several times.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDemographicRecord {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Median Age", default)]
    pub median_age: Option<f64>,
    #[serde(rename = "Male Population", default, deserialize_with = "lenient_count")]
    pub male_population: Option<i64>,
    #[serde(rename = "Female Population", default, deserialize_with = "lenient_count")]
    pub female_population: Option<i64>,
    #[serde(rename = "Total Population", default, deserialize_with = "lenient_count")]
    pub total_population: Option<i64>,
    #[serde(rename = "Number of Veterans", default, deserialize_with = "lenient_count")]
    pub number_of_veterans: Option<i64>,
    #[serde(rename = "Foreign-born", default, deserialize_with = "lenient_count")]
    pub foreign_born: Option<i64>,
    #[serde(rename = "Average Household Size", default)]
    pub average_household_size: Option<f64>,
    #[serde(rename = "State Code", default)]
    pub state_code: Option<String>,
    #[serde(rename = "Race", default)]
    pub race: Option<String>,
    #[serde(rename = "Count", default, deserialize_with = "lenient_count")]
    pub count: Option<i64>,
}

/// A demographic row with the airport port resolved from its city name.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedDemographic {
    pub record: RawDemographicRecord,
    pub port: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCount {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Counts are integral but some exports write them as `40601.0`.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let float_count = |f: f64| (f.is_finite() && f.fract() == 0.0).then_some(f as i64);

    match Option::<RawCount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawCount::Int(count)) => Ok(Some(count)),
        Some(RawCount::Float(f)) => float_count(f)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid count {}", f))),
        Some(RawCount::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(float_count))
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid count {:?}", text)))
        }
    }
}
