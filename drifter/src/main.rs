mod logging;
mod runner;
mod tests;

use std::{path::Path, time::Instant};

use runner::TestRunner;

const REPORT_PATH: &str = "drifter_report.json";

fn main() -> anyhow::Result<()> {
    let log_file = logging::setup_logging(Path::new(REPORT_PATH))?;

    log::info!("Drifter - libdetour smoke tests starting");

    let start_time = Instant::now();
    let mut runner = TestRunner::new();

    runner.run_test("plain_calls", tests::lifecycle::test_plain_calls);
    runner.run_test("detour_lifecycle", tests::lifecycle::test_detour_lifecycle);
    runner.run_test("toggle_cycles", tests::lifecycle::test_toggle_cycles);
    runner.run_test("unresolved_signature", tests::lifecycle::test_unresolved_signature);
    runner.run_test("call_with_disabled", tests::lifecycle::test_with_disabled);
    runner.run_test("gamedata_resolution", tests::gamedata::test_gamedata_resolution);
    runner.run_test("declared_detours", tests::registry::test_declared_detours);
    runner.run_test("flush_all_detours", tests::registry::test_flush_all_detours);

    let report = runner.generate_report(start_time);

    log::info!(
        "Test Summary: Total: {}, Passed: {}, Failed: {}",
        report.total_tests,
        report.passed,
        report.failed
    );
    log::info!("Execution Time: {}ms", report.execution_time_ms);
    log::info!("Environment: {}", report.environment);

    match report.write(REPORT_PATH) {
        Ok(()) => log::info!(
            "Report saved to: {} (log: {})",
            REPORT_PATH,
            log_file.display()
        ),
        Err(e) => log::error!("Failed to write report: {:#}", e),
    }

    if report.failed > 0 {
        log::error!("Tests failed, exiting with error code");
        std::process::exit(1);
    }

    log::info!("All tests passed successfully");
    Ok(())
}
