use clap::Parser;
use std::path::PathBuf;

/// Join Fitbit exports into a per-subject, per-day analysis table
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding the raw Fitbit CSV exports
    #[arg(long, default_value = "data_raw")]
    pub data_dir: PathBuf,

    /// Directory the output tables are written to (files are overwritten)
    #[arg(long, default_value = "files/fitness_result")]
    pub out_dir: PathBuf,

    /// Daily activity file name, relative to --data-dir
    #[arg(long, default_value = "dailyActivity_merged.csv")]
    pub daily_csv: String,

    /// Sleep file name, relative to --data-dir
    #[arg(long, default_value = "sleepDay_merged.csv")]
    pub sleep_csv: String,

    /// Weight log file name, relative to --data-dir
    #[arg(long, default_value = "weightLogInfo_merged.csv")]
    pub weight_csv: String,

    /// Heart-rate seconds file name, relative to --data-dir
    #[arg(long, default_value = "heartrate_seconds_merged.csv")]
    pub heart_csv: String,
}

/// Column names the pipeline projects out of each source.
#[derive(Debug, Clone)]
pub struct ColumnNames {
    pub id: String,
    pub activity_date: String,
    pub sleep_day: String,
    pub weight_date: String,
    /// Probed in order; exports disagree on which one they carry.
    pub heart_time_candidates: Vec<String>,
    pub heart_value: String,
    pub total_steps: String,
    pub calories: String,
    pub sedentary_minutes: String,
    pub very_active_minutes: String,
    pub lightly_active_minutes: String,
    pub total_minutes_asleep: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: "Id".into(),
            activity_date: "ActivityDate".into(),
            sleep_day: "SleepDay".into(),
            weight_date: "Date".into(),
            heart_time_candidates: vec!["Time".into(), "ActivitySecond".into()],
            heart_value: "Value".into(),
            total_steps: "TotalSteps".into(),
            calories: "Calories".into(),
            sedentary_minutes: "SedentaryMinutes".into(),
            very_active_minutes: "VeryActiveMinutes".into(),
            lightly_active_minutes: "LightlyActiveMinutes".into(),
            total_minutes_asleep: "TotalMinutesAsleep".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub daily_path: PathBuf,
    pub sleep_path: PathBuf,
    pub weight_path: PathBuf,
    pub heart_path: PathBuf,
    pub out_dir: PathBuf,
    pub columns: ColumnNames,
}

impl PipelineConfig {
    /// Lay out the four source files under `data_dir` with the standard export names.
    pub fn with_dirs(data_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            daily_path: data_dir.join("dailyActivity_merged.csv"),
            sleep_path: data_dir.join("sleepDay_merged.csv"),
            weight_path: data_dir.join("weightLogInfo_merged.csv"),
            heart_path: data_dir.join("heartrate_seconds_merged.csv"),
            out_dir: out_dir.into(),
            columns: ColumnNames::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_dirs("data_raw", "files/fitness_result")
    }
}

impl From<&Args> for PipelineConfig {
    fn from(args: &Args) -> Self {
        Self {
            daily_path: args.data_dir.join(&args.daily_csv),
            sleep_path: args.data_dir.join(&args.sleep_csv),
            weight_path: args.data_dir.join(&args.weight_csv),
            heart_path: args.data_dir.join(&args.heart_csv),
            out_dir: args.out_dir.clone(),
            columns: ColumnNames::default(),
        }
    }
}
