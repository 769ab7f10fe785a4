use std::env;
use std::path::Path;

use encounter_replay_lib::replay::write_replay_summary;
use encounter_replay_lib::{load_replay, load_settings, ReplaySettings, ReplaySummary};

fn run(args: &[String]) -> Result<(), String> {
    let Some(log_path) = args.get(1) else {
        return Err("Usage: encounter-replay <log file> [settings.json]".to_string());
    };
    let log_path = Path::new(log_path);
    if !log_path.is_file() {
        return Err(format!("Log file not found: {}", log_path.display()));
    }

    let settings = match args.get(2) {
        Some(settings_path) => load_settings(Path::new(settings_path))?,
        None => ReplaySettings::default(),
    };

    let (replay, stats) = load_replay(log_path, &settings);
    tracing::info!(
        participants = replay.participants.len(),
        actions = replay.actions.len(),
        encounters = replay.encounters.len(),
        skipped_lines = stats.malformed_lines + stats.unknown_tag_lines,
        "Replay ready"
    );

    let summary = ReplaySummary::from_replay(&replay);
    if settings.write_summary {
        let sidecar_path = write_replay_summary(log_path, &summary)?;
        tracing::info!(sidecar_path = %sidecar_path.display(), "Wrote replay summary");
    }

    let serialized = serde_json::to_string_pretty(&summary)
        .map_err(|error| format!("Failed to serialize replay summary: {error}"))?;
    println!("{serialized}");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if let Err(error) = run(&args) {
        tracing::error!("{error}");
        std::process::exit(1);
    }
}
