use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use log::LevelFilter;

const LOG_DIR: &str = "logs";
const KEEP_RUNS: usize = 10;

/// Overrides the libdetour level, e.g. `DRIFTER_LOG=info`
const LEVEL_ENV: &str = "DRIFTER_LOG";

/// Routes libdetour and harness records to stdout and to
/// `logs/<report stem>_<timestamp>.log`, so every run's log sits next to
/// the report it produced. Third-party crates only get through at `warn`.
pub fn setup_logging(report_path: &Path) -> Result<PathBuf, fern::InitError> {
    std::fs::create_dir_all(LOG_DIR)?;

    let stem = report_stem(report_path);
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let log_file = Path::new(LOG_DIR).join(format!("{}_{}.log", stem, timestamp));

    let library_level = std::env::var(LEVEL_ENV)
        .ok()
        .and_then(|value| LevelFilter::from_str(&value).ok())
        .unwrap_or(LevelFilter::Trace);

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:<5} [{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for("libdetour", library_level)
        .level_for("drifter", LevelFilter::Debug)
        .chain(std::io::stdout())
        .chain(fern::log_file(&log_file)?)
        .apply()?;

    log::info!(
        "Logging to {} (libdetour at {})",
        log_file.display(),
        library_level
    );

    prune_runs(Path::new(LOG_DIR), &stem, KEEP_RUNS);

    Ok(log_file)
}

fn report_stem(report_path: &Path) -> String {
    report_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("drifter")
        .to_owned()
}

/// Timestamps sort lexically, so the newest runs are the last names
fn prune_runs(dir: &Path, stem: &str, keep: usize) {
    let prefix = format!("{}_", stem);

    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    let mut runs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".log"))
        })
        .collect();

    if runs.len() <= keep {
        return;
    }

    runs.sort();

    for path in &runs[..runs.len() - keep] {
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("Failed to remove old run log {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_named_after_report() {
        assert_eq!(report_stem(Path::new("drifter_report.json")), "drifter_report");
        assert_eq!(report_stem(Path::new("out/nightly.json")), "nightly");
    }

    #[test]
    fn test_prune_keeps_newest_runs_of_this_report() {
        let dir = tempfile::tempdir().unwrap();
        for day in 1..=4 {
            let name = format!("drifter_report_2026-01-0{}_10-00-00.log", day);
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::write(dir.path().join("other_2026-01-01_10-00-00.log"), "").unwrap();

        prune_runs(dir.path(), "drifter_report", 2);

        let mut left: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();

        assert_eq!(
            left,
            vec![
                "drifter_report_2026-01-03_10-00-00.log",
                "drifter_report_2026-01-04_10-00-00.log",
                "other_2026-01-01_10-00-00.log",
            ]
        );
    }
}
