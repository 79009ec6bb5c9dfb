use i94_pipeline::config::PipelineConfig;
use i94_pipeline::models::TableName;
use i94_pipeline::pipeline::{Pipeline, open_store};
use polars::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CATALOG: &str = "/* I94 labels, trimmed */
value i94cntyl
   117 =  'ECUADOR'
   582 =  'MEXICO Air Sea, and Not Reported (I-94, no land arrivals)'
   999 =  'No Country Code (999)'
;
value $i94prtl
\t'ANC'\t=\t'ANCHORAGE, AK             '
\t'NYC'\t=\t'NEW YORK, NY                  '
\t'XXX'\t=\t'NOT REPORTED/UNKNOWN          '
;
";

const DEMOGRAPHICS: &str = "City;State;Median Age;Male Population;Female Population;Total Population;Number of Veterans;Foreign-born;Average Household Size;State Code;Race;Count
Anchorage;Alaska;32.2;152945;145750;298695;27492;33258;2.77;AK;White;185722
New York;New York;36.0;4081698;4468707;8550405;156961;3212500;2.68;NY;Asian;1304564
Smallville;Kansas;41.0;;;;;;;KS;White;4100.0
";

struct Fixture {
    dir: TempDir,
    config_path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::write(root.join("labels.SAS"), CATALOG).unwrap();
        fs::write(root.join("demographics.csv"), DEMOGRAPHICS).unwrap();
        fs::create_dir_all(root.join("arrivals")).unwrap();
        write_arrivals(&root.join("arrivals/part-0.parquet"), full_arrivals());

        let config_path = root.join("pipeline.toml");
        let config = format!(
            r#"
[input]
immigration = ["{root}/arrivals"]
demographics = "{root}/demographics.csv"
catalog = "{root}/labels.SAS"

[catalog]
countries = {{ start = 2, end = 4 }}
ports = {{ start = 7, end = 9 }}

[output]
target = "local"
local_dir = "{root}/out"
prefix = "star"
max_attempts = 1
"#,
            root = root.display()
        );
        fs::write(&config_path, config).unwrap();

        Self { dir, config_path }
    }

    fn output_root(&self) -> PathBuf {
        self.dir.path().join("out/star")
    }

    fn partition_file(&self, table: TableName) -> PathBuf {
        self.output_root().join(table.as_str()).join("part-00000.json")
    }

    fn read_rows(&self, table: TableName) -> Vec<Value> {
        fs::read_to_string(self.partition_file(table))
            .unwrap()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    async fn run(&self) {
        let config = PipelineConfig::from_file(&self.config_path).unwrap();
        let store = open_store(&config.output).await.unwrap();
        let summary = Pipeline::new(config).run(store).await.unwrap();
        assert_eq!(summary.partitions.len(), TableName::ALL.len());
    }
}

fn full_arrivals() -> DataFrame {
    df!(
        "cicid" => [3.0, 1.0, 2.0, 4.0],
        "i94yr" => [2016.0, 2016.0, 2016.0, 2016.0],
        "i94mon" => [4.0, 4.0, 4.0, 4.0],
        "i94res" => [117.0, 582.0, 999.0, 117.0],
        "i94port" => ["NYC", "ANC", "ZZZ", "NYC"],
        "arrdate" => [20574.0, 20545.0, 20560.0, 20574.0],
        "i94mode" => [1.0, 1.0, 1.0, 2.0],
        "i94addr" => [Some("NY"), None, Some("AK"), None],
        "depdate" => [Some(20580.0), None, None, None],
        "i94bir" => [Some(37.0), Some(52.0), None, Some(8.0)],
        "i94visa" => [2.0, 1.0, 3.0, 2.0],
        "airline" => [Some("AA"), Some("AS"), None, None],
        "fltno" => [Some("00123"), None, None, None],
        "visatype" => ["B2", "B1", "F1", "WT"],
        "gender" => [Some("F"), Some("M"), None, None],
    )
    .unwrap()
}

fn write_arrivals(path: &Path, mut df: DataFrame) {
    let file = fs::File::create(path).unwrap();
    ParquetWriter::new(file).finish(&mut df).unwrap();
}

#[tokio::test]
async fn test_full_run_writes_consistent_star_schema() {
    let fixture = Fixture::new();
    fixture.run().await;

    let mut partitions: Vec<String> = fs::read_dir(fixture.output_root())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    partitions.sort();
    let mut expected: Vec<String> = TableName::ALL.iter().map(|t| t.as_str().to_string()).collect();
    expected.sort();
    assert_eq!(partitions, expected);

    // the sea arrival (cicid 4) is dropped; keys follow cicid order
    let immigrants = fixture.read_rows(TableName::Immigrant);
    assert_eq!(immigrants.len(), 3);
    let ids: Vec<u64> = immigrants
        .iter()
        .map(|row| row["immigrant_id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(immigrants[0]["arrival_port"], "ANC");
    assert_eq!(immigrants[0]["state_of_residence"], "unknown");
    assert_eq!(immigrants[1]["arrival_port"], "Other");
    assert_eq!(immigrants[2]["arrival_port"], "NYC");
    assert_eq!(immigrants[2]["arrival_date"], "2016-04-30");

    let stats = fixture.read_rows(TableName::ImmigrantStats);
    assert_eq!(stats.len(), 3);
    assert_eq!(
        stats[0]["origin_country"],
        "MEXICO Air Sea, and Not Reported (I-94, no land arrivals)"
    );
    assert_eq!(stats[1]["origin_country"], "No Country Code (999)");
    assert_eq!(stats[1]["gender"], "X");
    assert_eq!(stats[1]["age"], -1);
    assert_eq!(stats[1]["visitor_type"], "Student");
    assert_eq!(stats[2]["visitor_type"], "Pleasure");

    let arrivals = fixture.read_rows(TableName::ArrivalInfo);
    assert_eq!(arrivals.len(), 3);
    assert!(arrivals.iter().all(|row| row["port_type"] == "Air"));
    assert_eq!(arrivals[1]["airline_code"], "Unknown");

    let cities = fixture.read_rows(TableName::CityPopulation);
    assert_eq!(cities.len(), 3);
    assert_eq!(cities[0]["port"], "ANC");
    assert_eq!(cities[1]["port"], "NYC");
    assert!(cities[2]["port"].is_null());

    let demographics = fixture.read_rows(TableName::CityDemographics);
    assert_eq!(demographics[2]["n_persons"], 4100);
}

#[tokio::test]
async fn test_rerun_is_byte_identical() {
    let fixture = Fixture::new();
    fixture.run().await;
    let first: Vec<Vec<u8>> = TableName::ALL
        .iter()
        .map(|&table| fs::read(fixture.partition_file(table)).unwrap())
        .collect();

    fixture.run().await;
    let second: Vec<Vec<u8>> = TableName::ALL
        .iter()
        .map(|&table| fs::read(fixture.partition_file(table)).unwrap())
        .collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_smaller_rerun_leaves_no_stale_rows() {
    let fixture = Fixture::new();
    fixture.run().await;
    assert_eq!(fixture.read_rows(TableName::Immigrant).len(), 3);

    let smaller = df!(
        "cicid" => [9.0],
        "i94mode" => [1.0],
        "i94port" => ["NYC"],
        "arrdate" => [20574.0],
    )
    .unwrap();
    write_arrivals(&fixture.dir.path().join("arrivals/part-0.parquet"), smaller);
    fixture.run().await;

    let immigrants = fixture.read_rows(TableName::Immigrant);
    assert_eq!(immigrants.len(), 1);
    assert_eq!(immigrants[0]["immigrant_id"], 1);

    // only the six partition directories, no staging or retired leftovers
    let entries = fs::read_dir(fixture.output_root()).unwrap().count();
    assert_eq!(entries, TableName::ALL.len());
    for table in TableName::ALL {
        let files = fs::read_dir(fixture.output_root().join(table.as_str()))
            .unwrap()
            .count();
        assert_eq!(files, 1, "{} should hold a single file", table);
    }
}

#[tokio::test]
async fn test_malformed_catalog_aborts_before_output() {
    let fixture = Fixture::new();
    fs::write(fixture.dir.path().join("labels.SAS"), "value i94cntyl\n;\n").unwrap();

    let config = PipelineConfig::from_file(&fixture.config_path).unwrap();
    let store = open_store(&config.output).await.unwrap();
    let err = Pipeline::new(config).run(store).await.unwrap_err();

    assert!(err.to_string().contains("catalog"));
    assert!(!fixture.output_root().exists());
}
