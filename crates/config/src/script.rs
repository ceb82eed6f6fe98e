// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Upper bound on `limits.max_steps` accepted from a script.
pub const MAX_ALLOWED_STEPS: u64 = 50_000_000;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestInputs {
    pub firmware: String,
    /// Preset name or path to a `vigna_conf.vh` header.
    #[serde(default)]
    pub core: Option<String>,
    #[serde(default)]
    pub memory_size: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestLimits {
    pub max_steps: u64,
    #[serde(default)]
    pub wall_time_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The core parked itself in its idle loop.
    Halted,
    MaxSteps,
    WallTime,
    MemoryViolation,
    MisalignedAccess,
    DecodeError,
    Ebreak,
    /// The run never started: script, core or firmware could not be loaded.
    ConfigError,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Halted => "halted",
            StopReason::MaxSteps => "max_steps",
            StopReason::WallTime => "wall_time",
            StopReason::MemoryViolation => "memory_violation",
            StopReason::MisalignedAccess => "misaligned_access",
            StopReason::DecodeError => "decode_error",
            StopReason::Ebreak => "ebreak",
            StopReason::ConfigError => "config_error",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExpectedOutput {
    pub values: Vec<i32>,
    pub sentinel: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FixtureAssertion {
    pub fixture: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct OutputAssertion {
    pub output: ExpectedOutput,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StopReasonAssertion {
    pub expected_stop_reason: StopReason,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum TestAssertion {
    Fixture(FixtureAssertion),
    Output(OutputAssertion),
    ExpectedStopReason(StopReasonAssertion),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestScript {
    pub schema_version: String,
    pub inputs: TestInputs,
    pub limits: TestLimits,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

impl TestScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open test script at {:?}", path.as_ref()))?;
        let script: Self =
            serde_yaml::from_reader(f).context("Failed to parse Test Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.inputs.firmware.trim().is_empty() {
            anyhow::bail!("Input 'firmware' path cannot be empty");
        }

        if let Some(core) = &self.inputs.core {
            if core.trim().is_empty() {
                anyhow::bail!("Input 'core' cannot be empty");
            }
        }

        if let Some(size) = &self.inputs.memory_size {
            crate::parse_size(size)
                .with_context(|| format!("Input 'memory_size' is invalid: '{}'", size))?;
        }

        if self.limits.max_steps == 0 {
            anyhow::bail!("Limit 'max_steps' must be greater than zero");
        }

        if self.limits.max_steps > MAX_ALLOWED_STEPS {
            anyhow::bail!(
                "Limit 'max_steps' ({}) exceeds the maximum of {}",
                self.limits.max_steps,
                MAX_ALLOWED_STEPS
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_script() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  firmware: "target/riscv32i-unknown-none-elf/release/sorting_test"
  core: rv32im_zicsr
  memory_size: "64KiB"
limits:
  max_steps: 100000
  wall_time_ms: 5000
assertions:
  - fixture: sorting_test
  - output:
      values: [1, 2, 5, 8, 9]
      sentinel: 0xABCDEF00
  - expected_stop_reason: halted
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().is_ok());
        assert_eq!(script.inputs.core.as_deref(), Some("rv32im_zicsr"));
        assert_eq!(script.limits.max_steps, 100000);
        assert_eq!(script.assertions.len(), 3);

        match &script.assertions[1] {
            TestAssertion::Output(a) => {
                assert_eq!(a.output.values, vec![1, 2, 5, 8, 9]);
                assert_eq!(a.output.sentinel, 0xABCD_EF00);
            }
            other => panic!("unexpected assertion {:?}", other),
        }
        assert!(matches!(
            script.assertions[2],
            TestAssertion::ExpectedStopReason(StopReasonAssertion {
                expected_stop_reason: StopReason::Halted
            })
        ));
    }

    #[test]
    fn test_invalid_version() {
        let yaml = r#"
schema_version: "2.0"
inputs:
  firmware: "fw.elf"
limits:
  max_steps: 100
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }

    #[test]
    fn test_invalid_max_steps() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  firmware: "fw.elf"
limits:
  max_steps: 0
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("max_steps"));
    }

    #[test]
    fn test_max_steps_guard() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  firmware: "fw.elf"
limits:
  max_steps: 60000000
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_empty_firmware() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  firmware: ""
limits:
  max_steps: 100
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("firmware"));
    }

    #[test]
    fn test_bad_memory_size() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  firmware: "fw.elf"
  memory_size: "plenty"
limits:
  max_steps: 100
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("memory_size"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  firmware: "fw.elf"
  chip: "stm32"
limits:
  max_steps: 100
"#;
        assert!(serde_yaml::from_str::<TestScript>(yaml).is_err());
    }

    #[test]
    fn test_stop_reason_names() {
        assert_eq!(StopReason::MisalignedAccess.to_string(), "misaligned_access");
        let parsed: StopReason = serde_yaml::from_str("wall_time").unwrap();
        assert_eq!(parsed, StopReason::WallTime);
    }
}
