//! End-to-end runs of the collocation service against in-memory grids.

use std::fs;
use std::path::Path;

use clap::Parser;
use collocation::{MemoryDataset, MemoryOpener, RunSummary};
use collocator::{Args, RunSettings, ServiceConfig};
use test_utils::{ymd, DatedTree};

const INPUT: &str = "\
Station,Year,Month,Day,LATITUDE,LONGITUDE,CHL
A,2020,3,15,41.0,-8.7,old
B,2020,3,16,41.0,-8.7,old
C,2020,3,15,45.0,-8.7,old
";

struct Fixture {
    plankton: DatedTree,
    optics: DatedTree,
    work: tempfile::TempDir,
    opener: MemoryOpener,
}

impl Fixture {
    fn new() -> Self {
        let plankton = DatedTree::new();
        let optics = DatedTree::new();
        let work = tempfile::tempdir().unwrap();
        fs::write(work.path().join("samples.csv"), INPUT).unwrap();

        let day = ymd(2020, 3, 15);
        let mut opener = MemoryOpener::new();
        opener.insert(
            plankton.touch(day, "20200315_plankton.nc"),
            MemoryDataset::new(vec![41.0, 41.1], vec![-8.7, -8.6]).with_constant("CHL", 0.42),
        );
        opener.insert(
            optics.touch(day, "20200315_optics.nc"),
            MemoryDataset::new(vec![41.0, 41.1], vec![351.3, 351.4])
                .with_constant("BBP", 0.003)
                .with_constant("flags", 8.0),
        );

        Self {
            plankton,
            optics,
            work,
            opener,
        }
    }

    fn path(&self, name: &str) -> String {
        self.work.path().join(name).display().to_string()
    }

    fn settings(&self, extra: &[&str]) -> RunSettings {
        let input = self.path("samples.csv");
        let output = self.path("out/collocated.csv");
        let plankton = self.plankton.base().display().to_string();
        let optics = self.optics.base().display().to_string();

        let mut argv = vec![
            "collocator",
            "--input",
            input.as_str(),
            "--output-csv",
            output.as_str(),
            "--plankton-base-dir",
            plankton.as_str(),
            "--plankton-vars",
            "CHL",
            "--optics-base-dir",
            optics.as_str(),
            "--optics-vars",
            "BBP",
            "flags",
        ];
        argv.extend_from_slice(extra);
        RunSettings::resolve(&Args::parse_from(argv), ServiceConfig::default()).unwrap()
    }

    fn run(&self, settings: &RunSettings) -> RunSummary {
        collocator::run(settings, &self.opener).unwrap()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_run_writes_collocated_table() {
    let fixture = Fixture::new();
    let settings = fixture.settings(&[]);
    let summary = fixture.run(&settings);

    let lines = read_lines(&settings.output_csv);
    assert_eq!(
        lines[0],
        "Station,Year,Month,Day,LATITUDE,LONGITUDE,CHL,BBP,flags_optics"
    );
    // Existing CHL column is overwritten in place
    assert_eq!(lines[1], "A,2020,3,15,41.0,-8.7,0.42,0.003,8");
    // No files for the 16th
    assert_eq!(lines[2], "B,2020,3,16,41.0,-8.7,NaN,NaN,NaN");
    // Too far from the grid
    assert_eq!(lines[3], "C,2020,3,15,45.0,-8.7,NaN,NaN,NaN");
    assert_eq!(lines.len(), 4);

    assert_eq!(summary.samples, 3);
    assert_eq!(summary.day_groups, 2);
    assert!(!summary.cancelled);
    let plankton = summary.product("plankton").unwrap();
    assert_eq!(plankton.days_opened, 1);
    assert_eq!(plankton.days_without_file, 1);
    assert_eq!(plankton.accepted, 1);
    assert_eq!(plankton.rejected, 1);
}

#[test]
fn test_custom_marker_and_summary_json() {
    let fixture = Fixture::new();
    let summary_path = fixture.path("reports/summary.json");
    let settings = fixture.settings(&[
        "--no-data-marker",
        "",
        "--summary-json",
        summary_path.as_str(),
    ]);
    let summary = fixture.run(&settings);

    let lines = read_lines(&settings.output_csv);
    assert_eq!(lines[2], "B,2020,3,16,41.0,-8.7,,,");

    let written: RunSummary =
        serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(written, summary);
}

#[test]
fn test_parallel_run_matches_sequential() {
    let fixture = Fixture::new();
    let sequential = fixture.settings(&[]);
    fixture.run(&sequential);
    let expected = fs::read_to_string(&sequential.output_csv).unwrap();

    let mut parallel = fixture.settings(&["--parallel"]);
    parallel.output_csv = fixture.work.path().join("parallel.csv");
    fixture.run(&parallel);

    assert_eq!(fs::read_to_string(&parallel.output_csv).unwrap(), expected);
}

#[test]
fn test_missing_input_column_is_fatal() {
    let fixture = Fixture::new();
    let settings = fixture.settings(&["--lat-col", "Lat"]);

    let err = collocator::run(&settings, &fixture.opener).unwrap_err();
    assert!(format!("{:#}", err).contains("Lat"));
    assert!(!settings.output_csv.exists());
}
