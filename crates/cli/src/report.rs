// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Artifacts written by `vigna test`: `result.json`, `snapshot.json` and
//! JUnit XML.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use vigna_config::{StopReason, TestAssertion, TestLimits};
use vigna_core::snapshot::{MachineSnapshot, RegionSnapshot};
use vigna_core::verify::Violation;

pub const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pass,
    Fail,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Fail => "fail",
            Status::Error => "error",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub result_schema_version: String,
    pub status: Status,
    pub steps_executed: u64,
    pub instructions: u64,
    pub stores: u64,
    pub stop_reason: StopReason,
    pub limits: TestLimits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub assertions: Vec<AssertionResult>,
    pub firmware_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<RegionSnapshot>,
    pub config: TestConfig,
    #[serde(skip)]
    pub duration: std::time::Duration,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AssertionResult {
    pub assertion: TestAssertion,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<ViolationRecord>,
}

/// A [`Violation`] flattened for JSON, with its rendered message alongside.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ViolationRecord {
    pub message: String,
    pub detail: serde_json::Value,
}

impl From<&Violation> for ViolationRecord {
    fn from(v: &Violation) -> Self {
        Self {
            message: v.to_string(),
            detail: serde_json::to_value(v).unwrap_or(serde_json::Value::Null),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestConfig {
    pub firmware: Option<PathBuf>,
    pub core: String,
    pub memory_size: String,
    pub script: PathBuf,
}

impl TestResult {
    /// Result for a run that never started.
    pub fn config_error(message: String, limits: TestLimits, config: TestConfig) -> Self {
        Self {
            result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
            status: Status::Error,
            steps_executed: 0,
            instructions: 0,
            stores: 0,
            stop_reason: StopReason::ConfigError,
            limits,
            message: Some(message),
            assertions: Vec::new(),
            firmware_hash: String::new(),
            output: None,
            config,
            duration: std::time::Duration::ZERO,
        }
    }
}

/// Writes `result.json` (and `snapshot.json` when there is one) into
/// `output_dir`, plus `junit.xml` there and at `junit` if requested.
pub fn write_outputs(
    output_dir: Option<&Path>,
    junit: Option<&Path>,
    result: &TestResult,
    snapshot: Option<&MachineSnapshot>,
) {
    if let Some(dir) = output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            error!("Failed to create output directory {:?}: {}", dir, e);
            return;
        }

        let result_path = dir.join("result.json");
        match serde_json::to_string_pretty(result) {
            Ok(json) => match std::fs::write(&result_path, json) {
                Ok(()) => info!("Wrote test results to {:?}", result_path),
                Err(e) => error!("Failed to write result.json: {}", e),
            },
            Err(e) => error!("Failed to serialize test result: {}", e),
        }

        if let Some(snapshot) = snapshot {
            let snapshot_path = dir.join("snapshot.json");
            match snapshot.to_json() {
                Ok(json) => {
                    if let Err(e) = std::fs::write(&snapshot_path, json) {
                        error!("Failed to write snapshot.json: {}", e);
                    }
                }
                Err(e) => error!("Failed to serialize snapshot: {}", e),
            }
        }

        if let Err(e) = write_junit_xml(&dir.join("junit.xml"), result) {
            error!("Failed to write junit.xml: {}", e);
        }
    }

    if let Some(path) = junit {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let _ = std::fs::create_dir_all(parent);
        }
        match write_junit_xml(path, result) {
            Ok(()) => info!("Wrote JUnit report to {:?}", path),
            Err(e) => error!("Failed to write JUnit report {:?}: {}", path, e),
        }
    }
}

pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Stop reasons that only count as a pass when an `expected_stop_reason`
/// assertion names them.
pub fn stop_requires_assertion(reason: StopReason) -> bool {
    matches!(reason, StopReason::MaxSteps | StopReason::WallTime)
}

fn details(result: &TestResult) -> String {
    let mut d = String::new();
    let _ = writeln!(d, "result_schema_version={}", result.result_schema_version);
    let _ = writeln!(d, "stop_reason={}", result.stop_reason);
    if let Some(msg) = &result.message {
        let _ = writeln!(d, "message={}", msg);
    }
    let _ = writeln!(d, "steps_executed={}", result.steps_executed);
    let _ = writeln!(d, "instructions={}", result.instructions);
    let _ = writeln!(d, "stores={}", result.stores);
    let _ = writeln!(d, "limits:");
    let _ = writeln!(d, "  - max_steps={}", result.limits.max_steps);
    if let Some(v) = result.limits.wall_time_ms {
        let _ = writeln!(d, "  - wall_time_ms={}", v);
    }
    let _ = writeln!(d, "firmware_hash={}", result.firmware_hash);
    if let Some(fw) = &result.config.firmware {
        let _ = writeln!(d, "firmware={}", fw.display());
    }
    let _ = writeln!(d, "core={}", result.config.core);
    let _ = writeln!(d, "script={}", result.config.script.display());
    if let Some(output) = &result.output {
        let used = output.writes.iter().map(|w| w.cell + 1).max().unwrap_or(0);
        let cells: Vec<String> = output.cells[..used.min(output.cells.len())]
            .iter()
            .map(|c| format!("{:#010x}", c))
            .collect();
        let _ = writeln!(d, "output=[{}]", cells.join(", "));
    }
    d
}

pub fn write_junit_xml(path: &Path, result: &TestResult) -> std::io::Result<()> {
    let any_assertion_failed = result.assertions.iter().any(|a| !a.passed);
    let expected_stop_matched = result
        .assertions
        .iter()
        .any(|a| matches!(a.assertion, TestAssertion::ExpectedStopReason(_)) && a.passed);
    let details = details(result);
    let time_secs = result.duration.as_secs_f64();

    let mut tests = 0u64;
    let mut failures = 0u64;
    let mut errors = 0u64;
    let mut testcases = String::new();

    // The "run" testcase carries failures that belong to no single assertion.
    tests += 1;
    let _ = writeln!(
        testcases,
        "  <testcase classname=\"vigna\" name=\"run\" time=\"{:.6}\">",
        time_secs
    );
    match result.status {
        Status::Error => {
            errors += 1;
            let kind = if result.stop_reason == StopReason::ConfigError {
                "config error"
            } else {
                "runtime error"
            };
            let _ = writeln!(
                testcases,
                "    <error message=\"{}\">{}</error>",
                xml_escape(kind),
                xml_escape(&details)
            );
        }
        Status::Fail
            if stop_requires_assertion(result.stop_reason) && !expected_stop_matched =>
        {
            failures += 1;
            let _ = writeln!(
                testcases,
                "    <failure message=\"{}\">{}</failure>",
                xml_escape("stop condition requires expected_stop_reason assertion"),
                xml_escape(&details)
            );
        }
        Status::Fail if !any_assertion_failed => {
            failures += 1;
            let _ = writeln!(
                testcases,
                "    <failure message=\"failure\">{}</failure>",
                xml_escape(&details)
            );
        }
        _ => {}
    }
    testcases.push_str("  </testcase>\n");

    for (idx, a) in result.assertions.iter().enumerate() {
        tests += 1;
        let name = format!("assertion {}: {}", idx + 1, assertion_short_name(&a.assertion));
        let _ = writeln!(
            testcases,
            "  <testcase classname=\"vigna\" name=\"{}\" time=\"0.000000\">",
            xml_escape(&name)
        );
        if !a.passed {
            failures += 1;
            let mut body = format!("{}\n", name);
            for v in &a.violations {
                let _ = writeln!(body, "  - {}", v.message);
            }
            let _ = write!(body, "\n{}", details);
            let _ = writeln!(
                testcases,
                "    <failure message=\"assertion failed\">{}</failure>",
                xml_escape(&body)
            );
        }
        testcases.push_str("  </testcase>\n");
    }

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        xml,
        "<testsuite name=\"vigna\" tests=\"{}\" failures=\"{}\" errors=\"{}\" time=\"{:.6}\">",
        tests, failures, errors, time_secs
    );
    xml.push_str("  <properties>\n");
    for (name, value) in [
        ("result_schema_version", result.result_schema_version.as_str()),
        ("stop_reason", result.stop_reason.as_str()),
        ("firmware_hash", result.firmware_hash.as_str()),
    ] {
        let _ = writeln!(
            xml,
            "    <property name=\"{}\" value=\"{}\"/>",
            name,
            xml_escape(value)
        );
    }
    xml.push_str("  </properties>\n");
    xml.push_str(&testcases);
    xml.push_str("</testsuite>\n");

    std::fs::write(path, xml)
}

pub fn assertion_short_name(assertion: &TestAssertion) -> String {
    match assertion {
        TestAssertion::Fixture(a) => format!("fixture {}", a.fixture),
        TestAssertion::Output(a) => format!(
            "output {} value(s), sentinel {:#010x}",
            a.output.values.len(),
            a.output.sentinel
        ),
        TestAssertion::ExpectedStopReason(a) => {
            format!("expected_stop_reason {}", a.expected_stop_reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigna_config::{FixtureAssertion, StopReasonAssertion};

    fn result(status: Status, stop_reason: StopReason, assertions: Vec<AssertionResult>) -> TestResult {
        TestResult {
            result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
            status,
            steps_executed: 10,
            instructions: 10,
            stores: 2,
            stop_reason,
            limits: TestLimits {
                max_steps: 10,
                wall_time_ms: None,
            },
            message: None,
            assertions,
            firmware_hash: "abc".to_string(),
            output: None,
            config: TestConfig {
                firmware: Some(PathBuf::from("fw.elf")),
                core: "rv32i".to_string(),
                memory_size: "64KiB".to_string(),
                script: PathBuf::from("t.yaml"),
            },
            duration: std::time::Duration::ZERO,
        }
    }

    fn junit(result: &TestResult, name: &str) -> String {
        let path = std::env::temp_dir().join(format!("vigna-{}-{}.xml", name, std::process::id()));
        write_junit_xml(&path, result).unwrap();
        let xml = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        xml
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("<a & 'b'>\""), "&lt;a &amp; &apos;b&apos;&gt;&quot;");
    }

    #[test]
    fn test_junit_failed_assertion() {
        let r = result(
            Status::Fail,
            StopReason::Halted,
            vec![AssertionResult {
                assertion: TestAssertion::Fixture(FixtureAssertion {
                    fixture: "simple_test".to_string(),
                }),
                passed: false,
                violations: vec![ViolationRecord::from(&Violation::MissingCell { cell: 1 })],
            }],
        );
        let xml = junit(&r, "fail");
        assert!(xml.contains("tests=\"2\" failures=\"1\" errors=\"0\""));
        assert!(xml.contains("assertion 1: fixture simple_test"));
        assert!(xml.contains("cell 1 was never written"));
    }

    #[test]
    fn test_junit_unasserted_max_steps() {
        let r = result(Status::Fail, StopReason::MaxSteps, Vec::new());
        let xml = junit(&r, "maxsteps");
        assert!(xml.contains("requires expected_stop_reason"));
        assert!(xml.contains("<property name=\"stop_reason\" value=\"max_steps\"/>"));
    }

    #[test]
    fn test_junit_config_error() {
        let r = result(Status::Error, StopReason::ConfigError, Vec::new());
        let xml = junit(&r, "cfg");
        assert!(xml.contains("<error message=\"config error\">"));
        assert!(xml.contains("errors=\"1\""));
    }

    #[test]
    fn test_result_json_shape() {
        let r = result(
            Status::Pass,
            StopReason::MaxSteps,
            vec![AssertionResult {
                assertion: TestAssertion::ExpectedStopReason(StopReasonAssertion {
                    expected_stop_reason: StopReason::MaxSteps,
                }),
                passed: true,
                violations: Vec::new(),
            }],
        );
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "pass");
        assert_eq!(json["stop_reason"], "max_steps");
        assert_eq!(json["assertions"][0]["assertion"]["expected_stop_reason"], "max_steps");
        assert!(json.get("violations").is_none());
        assert!(json.get("duration").is_none());
    }
}
