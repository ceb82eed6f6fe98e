// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use vigna_core::asm::{self, elf_image};

/// Fresh scratch directory for one test.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("vigna-cli-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

/// Writes `program` as an ELF loaded at address 0.
pub fn write_firmware(dir: &Path, file_name: &str, program: &[u32]) -> PathBuf {
    let code = asm::to_bytes(program);
    let path = dir.join(file_name);
    std::fs::write(&path, elf_image(0, &[(0, code.as_slice())])).expect("Failed to write ELF");
    path
}

pub fn vigna(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vigna"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

pub fn s(path: &Path) -> &str {
    path.to_str().expect("non-UTF-8 temp path")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
