use std::{path::Path, time::Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    name: String,
    success: bool,
    error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestReport {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub execution_time_ms: u64,
    pub environment: String,
    pub tests: Vec<TestResult>,
}

impl TestReport {
    pub fn write(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct TestRunner {
    results: Vec<TestResult>,
}

impl TestRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_test<F>(&mut self, name: &str, test_fn: F)
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        log::info!("Starting test: {}", name);

        let test_start = Instant::now();
        let result = match test_fn() {
            Ok(()) => {
                log::info!("Test '{}' PASSED in {:?}", name, test_start.elapsed());
                TestResult {
                    name: name.to_string(),
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                log::error!("Test '{}' FAILED in {:?}: {:#}", name, test_start.elapsed(), e);
                TestResult {
                    name: name.to_string(),
                    success: false,
                    error: Some(format!("{:#}", e)),
                }
            }
        };

        self.results.push(result);
    }

    pub fn generate_report(&self, start_time: Instant) -> TestReport {
        let passed = self.results.iter().filter(|r| r.success).count();
        let failed = self.results.len() - passed;

        TestReport {
            total_tests: self.results.len(),
            passed,
            failed,
            execution_time_ms: start_time.elapsed().as_millis() as u64,
            environment: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            tests: self.results.clone(),
        }
    }
}
