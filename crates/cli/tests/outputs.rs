// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod common;

use common::{s, temp_dir, vigna, write_firmware};
use vigna_core::asm::{programs, Assembler, *};

fn read_json(path: &std::path::Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("missing result file");
    serde_json::from_str(&content).expect("invalid JSON")
}

fn spin_forever() -> Vec<u32> {
    let mut a = Assembler::new();
    a.emit(addi(T0, ZERO, 0))
        .label("loop")
        .emit(addi(T0, T0, 1))
        .j("loop");
    a.finish().unwrap()
}

#[test]
fn test_cli_test_mode_outputs() {
    let dir = temp_dir("outputs");
    write_firmware(&dir, "sorting_test.elf", &programs::sorting().unwrap());

    // Firmware path is relative to the script
    let script_path = dir.join("script.yaml");
    std::fs::write(
        &script_path,
        r#"
schema_version: "1.0"
inputs:
  firmware: "sorting_test.elf"
  core: rv32im_zicsr
limits:
  max_steps: 100000
assertions:
  - fixture: sorting_test
  - output:
      values: [1, 2, 5, 8, 9]
      sentinel: 0xABCDEF00
  - expected_stop_reason: halted
"#,
    )
    .unwrap();
    let output_dir = dir.join("artifacts");

    let output = vigna(&[
        "test",
        "--script",
        s(&script_path),
        "--output-dir",
        s(&output_dir),
    ]);
    assert_eq!(output.status.code(), Some(0), "{:?}", output);

    let result = read_json(&output_dir.join("result.json"));
    assert_eq!(result["result_schema_version"], "1.0");
    assert_eq!(result["status"], "pass");
    assert_eq!(result["stop_reason"], "halted");
    assert_eq!(result["firmware_hash"].as_str().unwrap().len(), 64);
    assert!(result["stores"].as_u64().unwrap() >= 6);
    assert!(result["config"]["firmware"]
        .as_str()
        .unwrap()
        .ends_with("sorting_test.elf"));
    assert_eq!(result["assertions"].as_array().unwrap().len(), 3);
    assert!(result["assertions"]
        .as_array()
        .unwrap()
        .iter()
        .all(|a| a["passed"] == true));

    let cells = result["output"]["cells"].as_array().unwrap();
    let expected: [u32; 6] = [1, 2, 5, 8, 9, 0xABCD_EF00];
    for (cell, value) in expected.iter().enumerate() {
        assert_eq!(cells[cell], *value);
    }
    assert_eq!(result["output"]["writes"].as_array().unwrap().len(), 6);

    let snapshot = read_json(&output_dir.join("snapshot.json"));
    assert_eq!(snapshot["cpu"]["registers"].as_array().unwrap().len(), 32);

    let junit = std::fs::read_to_string(output_dir.join("junit.xml")).unwrap();
    assert!(junit.contains("<testsuite name=\"vigna\" tests=\"4\" failures=\"0\" errors=\"0\""));
    assert!(junit.contains("assertion 1: fixture sorting_test"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_test_mode_fixture_mismatch() {
    let dir = temp_dir("mismatch");
    let fw = write_firmware(&dir, "fw.elf", &programs::simple().unwrap());
    let script_path = dir.join("script.yaml");
    std::fs::write(
        &script_path,
        format!(
            r#"
schema_version: "1.0"
inputs:
  firmware: "{}"
limits:
  max_steps: 100000
assertions:
  - fixture: sorting_test
"#,
            s(&fw)
        ),
    )
    .unwrap();
    let output_dir = dir.join("artifacts");

    let output = vigna(&[
        "test",
        "--script",
        s(&script_path),
        "--output-dir",
        s(&output_dir),
    ]);
    assert_eq!(output.status.code(), Some(1));

    let result = read_json(&output_dir.join("result.json"));
    assert_eq!(result["status"], "fail");
    let violations = result["assertions"][0]["violations"].as_array().unwrap();
    assert!(!violations.is_empty());
    assert!(violations
        .iter()
        .any(|v| v["detail"]["kind"] == "value_mismatch"));

    let junit = std::fs::read_to_string(output_dir.join("junit.xml")).unwrap();
    assert!(junit.contains("<failure message=\"assertion failed\">"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_max_steps_requires_assertion() {
    let dir = temp_dir("max-steps");
    let fw = write_firmware(&dir, "spin.elf", &spin_forever());

    let unasserted = dir.join("unasserted.yaml");
    std::fs::write(
        &unasserted,
        r#"
schema_version: "1.0"
inputs:
  firmware: "spin.elf"
limits:
  max_steps: 100
"#,
    )
    .unwrap();
    let output = vigna(&["test", "--script", s(&unasserted)]);
    assert_eq!(output.status.code(), Some(1));

    let asserted = dir.join("asserted.yaml");
    std::fs::write(
        &asserted,
        r#"
schema_version: "1.0"
inputs:
  firmware: "spin.elf"
limits:
  max_steps: 100
assertions:
  - expected_stop_reason: max_steps
"#,
    )
    .unwrap();
    let junit_path = dir.join("reports").join("junit.xml");
    let output = vigna(&[
        "test",
        "--script",
        s(&asserted),
        "--junit",
        s(&junit_path),
    ]);
    assert_eq!(output.status.code(), Some(0));
    let junit = std::fs::read_to_string(&junit_path).unwrap();
    assert!(junit.contains("<property name=\"stop_reason\" value=\"max_steps\"/>"));

    // --max-steps overrides the script
    let output = vigna(&[
        "test",
        "--script",
        s(&asserted),
        "--max-steps",
        "10",
        "-f",
        s(&fw),
        "--output-dir",
        s(&dir.join("override")),
    ]);
    assert_eq!(output.status.code(), Some(0));
    let result = read_json(&dir.join("override").join("result.json"));
    assert_eq!(result["steps_executed"], 10);
    assert_eq!(result["limits"]["max_steps"], 10);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_runtime_error() {
    let dir = temp_dir("runtime-error");
    write_firmware(&dir, "trap.elf", &[NOP, EBREAK]);
    let script_path = dir.join("script.yaml");
    std::fs::write(
        &script_path,
        r#"
schema_version: "1.0"
inputs:
  firmware: "trap.elf"
limits:
  max_steps: 100
"#,
    )
    .unwrap();
    let output_dir = dir.join("artifacts");

    let output = vigna(&[
        "test",
        "--script",
        s(&script_path),
        "--output-dir",
        s(&output_dir),
    ]);
    assert_eq!(output.status.code(), Some(3));

    let result = read_json(&output_dir.join("result.json"));
    assert_eq!(result["status"], "error");
    assert_eq!(result["stop_reason"], "ebreak");
    assert!(result["message"].as_str().unwrap().contains("EBREAK"));

    let junit = std::fs::read_to_string(output_dir.join("junit.xml")).unwrap();
    assert!(junit.contains("<error message=\"runtime error\">"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_config_error_outputs() {
    let dir = temp_dir("config-error");
    let script_path = dir.join("script.yaml");
    std::fs::write(
        &script_path,
        r#"
schema_version: "1.0"
inputs:
  firmware: "does-not-exist.elf"
limits:
  max_steps: 100
"#,
    )
    .unwrap();
    let output_dir = dir.join("artifacts");

    let output = vigna(&[
        "test",
        "--script",
        s(&script_path),
        "--output-dir",
        s(&output_dir),
    ]);
    assert_eq!(output.status.code(), Some(2));

    let result = read_json(&output_dir.join("result.json"));
    assert_eq!(result["status"], "error");
    assert_eq!(result["stop_reason"], "config_error");
    assert!(result["message"]
        .as_str()
        .unwrap()
        .contains("does-not-exist.elf"));
    assert!(!output_dir.join("snapshot.json").exists());

    let junit = std::fs::read_to_string(output_dir.join("junit.xml")).unwrap();
    assert!(junit.contains("<error message=\"config error\">"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_rejects_bad_scripts() {
    let dir = temp_dir("bad-scripts");
    write_firmware(&dir, "simple_test.elf", &programs::simple().unwrap());

    let cases = [
        // Unknown field
        r#"
schema_version: "1.0"
inputs:
  firmware: "simple_test.elf"
  system: "board.yaml"
limits:
  max_steps: 100
"#,
        // Unknown fixture
        r#"
schema_version: "1.0"
inputs:
  firmware: "simple_test.elf"
limits:
  max_steps: 100
assertions:
  - fixture: quicksort
"#,
        // Compressed core cannot be simulated
        r#"
schema_version: "1.0"
inputs:
  firmware: "simple_test.elf"
  core: rv32imc
limits:
  max_steps: 100
"#,
    ];

    for (i, yaml) in cases.iter().enumerate() {
        let path = dir.join(format!("case-{}.yaml", i));
        std::fs::write(&path, yaml).unwrap();
        let output = vigna(&["test", "--script", s(&path)]);
        assert_eq!(output.status.code(), Some(2), "case {}", i);
    }

    let _ = std::fs::remove_dir_all(&dir);
}
