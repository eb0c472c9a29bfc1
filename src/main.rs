use anyhow::Context;
use clap::Parser;
use log::info;
use std::io::Write;

use fitness_join::config::{Args, PipelineConfig};
use fitness_join::{output, pipeline, LOG_PREFIX};

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}",
                LOG_PREFIX,
                record.level(),
                record.args()
            )
        })
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args = Args::parse();
    let config = PipelineConfig::from(&args);

    let result = pipeline::run(&config);
    let written = output::write_reports(&result, &config.out_dir)
        .with_context(|| format!("Failed to write outputs to {}", config.out_dir.display()))?;

    info!(
        "Done. {} outputs in: {}",
        written.len(),
        config.out_dir.display()
    );
    Ok(())
}
