use std::collections::HashMap;
use std::fs;
use std::path::Path;

use fitness_join::{output, pipeline, PipelineConfig};

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

/// Rows of a CSV file keyed by header name.
fn read_rows(path: &Path) -> Vec<HashMap<String, String>> {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    rdr.records()
        .map(|r| {
            let record = r.unwrap();
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}

fn num(row: &HashMap<String, String>, column: &str) -> Option<f64> {
    row.get(column).and_then(|v| v.parse().ok())
}

fn fixture_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "dailyActivity_merged.csv",
        "Id,ActivityDate,TotalSteps,Calories,SedentaryMinutes,VeryActiveMinutes,LightlyActiveMinutes\n\
         1503960366,4/12/2016,0,4000,1440,0,0\n\
         1503960366,4/13/2016,8000,2200,700,30,200\n\
         1503960366,4/13/2016,9999,9999,1,1,1\n",
    );
    write(
        dir.path(),
        "sleepDay_merged.csv",
        "Id,SleepDay,TotalMinutesAsleep,TotalTimeInBed\n\
         1503960366,4/13/2016 12:00:00 AM,384,407\n\
         1503960366,4/13/2016 11:30:00 PM,999,999\n\
         2026352035,4/12/2016 12:00:00 AM,500,520\n",
    );
    write(
        dir.path(),
        "weightLogInfo_merged.csv",
        "Id,Date,WeightKg\n1503960366,5/2/2016 11:59:59 PM,52.6\n1503960366,garbage,53.0\n",
    );
    write(
        dir.path(),
        "heartrate_seconds_merged.csv",
        "Id,Time,Value\n\
         1503960366,4/13/2016 7:21:00 AM,60\n\
         1503960366,4/13/2016 7:21:05 AM,70\n\
         1503960366,4/13/2016 19:21:10,80\n\
         1503960366,not a time,200\n\
         2026352035,4/12/2016 7:21:00 AM,90\n",
    );
    dir
}

#[test]
fn full_run_writes_expected_tables() {
    let dir = fixture_dir();
    let out_dir = dir.path().join("out");
    let config = PipelineConfig::with_dirs(dir.path(), &out_dir);

    let result = pipeline::run(&config);
    assert_eq!(result.analysis.len(), 2);
    assert_eq!(result.calories_median, Some(3100.0));
    assert_eq!(result.weight.len(), 2);

    output::write_reports(&result, &out_dir).unwrap();

    let all = read_rows(&out_dir.join("analysis_all_rows.csv"));
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["date"], "2016-04-12");
    assert_eq!(all[0]["zero_step_high_cal"], "true");
    assert_eq!(all[0]["valid_row"], "false");
    assert_eq!(all[0]["weekday"], "Tuesday");

    let clean = read_rows(&out_dir.join("clean_daily_sleep.csv"));
    assert_eq!(clean.len(), 1);
    let day = &clean[0];
    assert_eq!(day["Id"], "1503960366");
    assert_eq!(day["date"], "2016-04-13");
    assert_eq!(num(day, "TotalSteps"), Some(8000.0));
    assert_eq!(num(day, "TotalMinutesAsleep"), Some(384.0));
    assert_eq!(num(day, "AvgHR"), Some(70.0));
    assert_eq!(num(day, "MaxHR"), Some(80.0));
    assert_eq!(num(day, "MinHR"), Some(60.0));
    assert_eq!(num(day, "HRCount"), Some(3.0));
    assert_eq!(day["valid_row"], "true");
    assert_eq!(day["steps_bucket"], "5k-10k");

    let heart = read_rows(&out_dir.join("heartrate_daily.csv"));
    assert_eq!(heart.len(), 2);
    assert_eq!(heart[0]["Id"], "1503960366");
    assert_eq!(heart[1]["Id"], "2026352035");

    let by_date = read_rows(&out_dir.join("agg_by_date.csv"));
    assert_eq!(by_date.len(), 1);
    assert_eq!(num(&by_date[0], "Calories"), Some(2200.0));

    let by_weekday = read_rows(&out_dir.join("agg_by_weekday.csv"));
    assert_eq!(by_weekday.len(), 1);
    assert_eq!(by_weekday[0]["weekday"], "Wednesday");

    let segments = read_rows(&out_dir.join("segments_steps.csv"));
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0]["steps_bucket"], "5k-10k");

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("run_summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary["valid_rows"], 1);
    assert_eq!(summary["sources"][2]["unparsed_days"], 1);

    for chart in [
        "steps_over_time.png",
        "calories_vs_steps.png",
        "weekday_bars.png",
        "segments_compare.png",
        "avg_hr_over_time.png",
        "sleep_distribution.png",
        "sedentary_vs_steps.png",
    ] {
        let path = out_dir.join("plots").join(chart);
        assert!(path.exists(), "{} missing", path.display());
    }
    let outputs = summary["outputs"].as_array().unwrap();
    assert_eq!(outputs.len(), 13);
    assert!(outputs.contains(&serde_json::json!("clean_daily_sleep.csv")));
}

#[test]
fn absent_heart_rate_keeps_null_columns() {
    let dir = fixture_dir();
    fs::remove_file(dir.path().join("heartrate_seconds_merged.csv")).unwrap();
    let out_dir = dir.path().join("out");
    let config = PipelineConfig::with_dirs(dir.path(), &out_dir);

    let result = pipeline::run(&config);
    assert!(result.heart_rate_daily.is_empty());
    assert!(result.analysis.iter().all(|r| r.avg_hr.is_none() && r.hr_count.is_none()));
    output::write_reports(&result, &out_dir).unwrap();

    let all = read_rows(&out_dir.join("analysis_all_rows.csv"));
    assert_eq!(all.len(), 2);
    for row in &all {
        for column in ["AvgHR", "MaxHR", "MinHR", "HRCount"] {
            assert_eq!(row[column], "", "{column} should be empty");
        }
    }
    let heart = read_rows(&out_dir.join("heartrate_daily.csv"));
    assert!(heart.is_empty());
}

#[test]
fn every_source_absent_produces_empty_tables() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let config = PipelineConfig::with_dirs(dir.path().join("nowhere"), &out_dir);

    let result = pipeline::run(&config);
    let written = output::write_reports(&result, &out_dir).unwrap();
    assert_eq!(written.len(), 7);
    assert!(written.iter().all(|p| p.extension().unwrap() != "png"));

    let mut rdr = csv::Reader::from_path(out_dir.join("clean_daily_sleep.csv")).unwrap();
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    assert!(headers.contains(&"AvgHR".to_string()));
    assert!(headers.contains(&"valid_row".to_string()));
    assert!(headers.contains(&"steps_bucket".to_string()));
    assert_eq!(rdr.records().count(), 0);
}

#[test]
fn malformed_sleep_file_is_treated_as_absent() {
    let dir = fixture_dir();
    write(dir.path(), "sleepDay_merged.csv", "Id,SleepDay\n1,2,3,4\n");
    let config = PipelineConfig::with_dirs(dir.path(), dir.path().join("out"));

    let result = pipeline::run(&config);
    assert_eq!(result.sources[1].status, "unreadable");
    assert_eq!(result.analysis.len(), 2);
    assert!(result.analysis.iter().all(|r| r.total_minutes_asleep.is_none()));
}

#[test]
fn short_sleep_row_loads_with_null_minutes() {
    let dir = fixture_dir();
    write(
        dir.path(),
        "sleepDay_merged.csv",
        "Id,SleepDay,TotalMinutesAsleep,TotalTimeInBed\n1503960366,4/13/2016 12:00:00 AM\n",
    );
    let config = PipelineConfig::with_dirs(dir.path(), dir.path().join("out"));

    let result = pipeline::run(&config);
    assert_eq!(result.sources[1].status, "loaded");
    assert_eq!(result.sources[1].rows, 1);
    assert_eq!(result.analysis.len(), 2);
    assert!(result.analysis.iter().all(|r| r.total_minutes_asleep.is_none()));
}

#[test]
fn heart_rate_with_activity_second_column() {
    let dir = fixture_dir();
    write(
        dir.path(),
        "heartrate_seconds_merged.csv",
        "Id,ActivitySecond,Value\n1503960366,4/13/2016 07:00:00,65\n",
    );
    let config = PipelineConfig::with_dirs(dir.path(), dir.path().join("out"));

    let result = pipeline::run(&config);
    assert_eq!(result.heart_rate_daily.len(), 1);
    assert_eq!(result.analysis[1].avg_hr, Some(65.0));
}

#[test]
fn reruns_are_byte_identical() {
    let dir = fixture_dir();
    let out_dir = dir.path().join("out");
    let config = PipelineConfig::with_dirs(dir.path(), &out_dir);

    let first = output::write_reports(&pipeline::run(&config), &out_dir).unwrap();
    assert!(first.iter().any(|p| p.ends_with("plots/weekday_bars.png")));
    let snapshot: Vec<Vec<u8>> = first.iter().map(|p| fs::read(p).unwrap()).collect();
    let second = output::write_reports(&pipeline::run(&config), &out_dir).unwrap();

    assert_eq!(first, second);
    for (path, before) in second.iter().zip(snapshot) {
        assert_eq!(fs::read(path).unwrap(), before, "{} changed", path.display());
    }
}
