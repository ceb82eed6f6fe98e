// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod common;

use common::{s, stdout, temp_dir, vigna, write_firmware};
use vigna_core::asm::{programs, *};

#[test]
fn test_run_prints_region() {
    let dir = temp_dir("run");
    let fw = write_firmware(&dir, "simple_test.elf", &programs::simple().unwrap());
    let snapshot = dir.join("snapshot.json");

    let output = vigna(&["run", "-f", s(&fw), "--snapshot", s(&snapshot)]);
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("cell[ 0] @ 0x1000 = 0x0000001e (30)"), "{}", text);
    assert!(text.contains("cell[ 3] @ 0x100c = 0xdeadbeef"));
    assert!(text.contains("stop_reason: halted"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&snapshot).unwrap()).unwrap();
    assert_eq!(json["output"]["cells"][1], 15);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_run_with_generated_core_header() {
    let dir = temp_dir("run-vh");
    let fw = write_firmware(&dir, "fibonacci_simple.elf", &programs::fibonacci_stream().unwrap());
    let header = dir.join("vigna_conf.vh");

    let output = vigna(&["config", "--preset", "rv32i", "--output", s(&header)]);
    assert_eq!(output.status.code(), Some(0));

    let output = vigna(&["run", "-f", s(&fw), "--core", s(&header)]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("0x12345678"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_run_decode_error_is_runtime_error() {
    let dir = temp_dir("run-decode");
    let fw = write_firmware(&dir, "bad.elf", &[NOP, 0xFFFF_FFFF]);
    let output = vigna(&["run", "-f", s(&fw)]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stdout(&output).contains("stop_reason: decode_error"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_verify_fixtures() {
    let dir = temp_dir("verify");
    let builds = [
        ("fibonacci_simple.elf", programs::fibonacci_stream().unwrap()),
        ("fibonacci_test.elf", programs::fibonacci_buffered().unwrap()),
        ("simple_test.elf", programs::simple().unwrap()),
        ("sorting_test.elf", programs::sorting().unwrap()),
    ];
    for (name, program) in &builds {
        let fw = write_firmware(&dir, name, &programs::with_entry(program));
        for core in ["rv32i", "rv32im", "rv32im_zicsr"] {
            let output = vigna(&["verify", "-f", s(&fw), "--runs", "3", "--core", core]);
            assert_eq!(output.status.code(), Some(0), "{} on {}: {:?}", name, core, output);
            let text = stdout(&output);
            assert!(text.contains("PASS"), "{}", text);
            assert!(text.contains("identical across 3 runs"));
        }
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_run_image_larger_than_memory_is_config_error() {
    let dir = temp_dir("run-oversize");
    let code = to_bytes(&programs::simple().unwrap());
    let data = [0u8; 16];
    let fw = dir.join("oversize.elf");
    std::fs::write(&fw, elf_image(0, &[(0, code.as_slice()), (0x2000, &data[..])])).unwrap();

    let output = vigna(&["run", "-f", s(&fw), "--memory-size", "4KiB"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("0x2000"), "{}", stderr);

    let output = vigna(&["run", "-f", s(&fw)]);
    assert_eq!(output.status.code(), Some(0));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_verify_wrong_fixture() {
    let dir = temp_dir("verify-wrong");
    let fw = write_firmware(&dir, "fw.elf", &programs::simple().unwrap());

    let output = vigna(&["verify", "-f", s(&fw), "--fixture", "sorting_test"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("FAIL"));

    // No fixture named "fw"
    let output = vigna(&["verify", "-f", s(&fw)]);
    assert_eq!(output.status.code(), Some(2));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_config_header_to_stdout() {
    let output = vigna(&["config", "--preset", "rv32im", "--output", "-"]);
    assert_eq!(output.status.code(), Some(0));
    let header = stdout(&output);
    assert!(header.starts_with("`ifndef VIGNA_CONF_VH"));
    assert!(header.contains("`define VIGNA_CORE_M_EXTENSION\n"));
    assert!(header.contains("//`define VIGNA_CORE_C_EXTENSION\n"));
    assert!(header.trim_end().ends_with("`endif"));
}

#[test]
fn test_config_parse_and_modify() {
    let dir = temp_dir("config-parse");
    let header = dir.join("in.vh");
    let output = vigna(&["config", "--preset", "rv32i", "--output", s(&header)]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("Configuration file generated"));

    let output = vigna(&[
        "config",
        "--parse",
        s(&header),
        "--enable",
        "zicsr_extension",
        "--set",
        "reset_addr=32'h0000_0100",
        "--output",
        "-",
    ]);
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("/* Custom Configuration */"));
    assert!(text.contains("`define VIGNA_CORE_ZICSR_EXTENSION\n"));
    assert!(text.contains("`define VIGNA_CORE_RESET_ADDR 32'h0000_0100\n"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_config_validation() {
    let output = vigna(&["config", "--preset", "rv32im_zicsr", "--validate"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("Configuration is valid!"));

    let output = vigna(&["config", "--enable", "m_fpga_fast", "--validate"]);
    assert_eq!(output.status.code(), Some(2));

    let output = vigna(&["config", "--preset", "rv64gc", "--validate"]);
    assert_eq!(output.status.code(), Some(2));

    let output = vigna(&["config", "--enable", "no_such_option", "--validate"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_config_list() {
    let output = vigna(&["config", "--list"]);
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("rv32imc_zicsr"));
    assert!(text.contains("m_fpga_fast"));
    assert!(text.contains("(requires m_extension)"));
}

#[test]
fn test_image_from_elf() {
    let dir = temp_dir("image-elf");
    let fw = write_firmware(&dir, "fw.elf", &[addi(RA, ZERO, 5), jal(ZERO, 0)]);

    let output = vigna(&["image", "-f", s(&fw)]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "93\n00\n50\n00\n6f\n00\n00\n00\n");

    let out_path = dir.join("fw.hex");
    let output = vigna(&["image", "-f", s(&fw), "--size", "16B", "-o", s(&out_path)]);
    assert_eq!(output.status.code(), Some(0));
    let text = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(text.lines().count(), 16);
    assert_eq!(text.lines().last(), Some("00"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_image_from_objdump() {
    let dir = temp_dir("image-objdump");
    let listing = dir.join("fw.dump");
    std::fs::write(
        &listing,
        "\nDisassembly of section .text:\n\n00000000 <_start>:\n   0:\t00500093          \tli\tra,5\n   4:\t0000006f          \tj\t4 <_start+0x4>\n",
    )
    .unwrap();

    let output = vigna(&["image", "--objdump", s(&listing)]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "93\n00\n50\n00\n6f\n00\n00\n00\n");

    // Exactly one source is required
    let output = vigna(&["image"]);
    assert_eq!(output.status.code(), Some(2));

    let _ = std::fs::remove_dir_all(&dir);
}
