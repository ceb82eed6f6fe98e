// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod core_config;
pub mod script;

pub use core_config::{CoreConfig, OptionKind, OptionSpec, Preset, Setting, OPTIONS, PRESETS};
pub use script::{
    ExpectedOutput, FixtureAssertion, OutputAssertion, StopReason, StopReasonAssertion,
    TestAssertion, TestInputs, TestLimits, TestScript,
};

use anyhow::Result;

/// Core used when neither the command line nor a test script names one.
pub const DEFAULT_CORE: &str = "rv32im_zicsr";

/// Simulated memory when nothing else is requested.
pub const DEFAULT_MEMORY_SIZE: &str = "64KiB";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown configuration '{0}'")]
    UnknownPreset(String),
    #[error("Unknown core option '{0}'")]
    UnknownOption(String),
    #[error("Option '{0}' takes a value, not a flag")]
    ExpectsValue(String),
    #[error("Option '{0}' is a flag and takes no value")]
    ExpectsFlag(String),
    #[error("'{option}' requires '{requires}' to be enabled")]
    MissingDependency { option: String, requires: String },
    #[error("'{option}' conflicts with '{other}'")]
    Conflict { option: String, other: String },
    #[error("Invalid numeric literal '{0}'")]
    InvalidNumber(String),
    #[error("{0} is not supported by the simulator")]
    Unsupported(String),
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

/// Parses a Verilog or C style integer literal.
///
/// Accepts sized and unsized based literals (`32'h0000_1000`, `'d42`),
/// `0x`/`0b`/`0o` prefixes and plain decimals. Underscores are ignored.
pub fn parse_verilog_number(literal: &str) -> Result<u32, ConfigError> {
    let invalid = || ConfigError::InvalidNumber(literal.to_string());
    let cleaned: String = literal.trim().chars().filter(|&c| c != '_').collect();

    let (radix, digits) = if let Some(pos) = cleaned.find('\'') {
        let width = &cleaned[..pos];
        if !width.is_empty() && width.parse::<u32>().map_err(|_| invalid())? > 32 {
            return Err(invalid());
        }
        let rest = &cleaned[pos + 1..];
        let rest = rest
            .strip_prefix('s')
            .or_else(|| rest.strip_prefix('S'))
            .unwrap_or(rest);
        let mut chars = rest.chars();
        let radix = match chars.next().map(|c| c.to_ascii_lowercase()) {
            Some('h') => 16,
            Some('d') => 10,
            Some('b') => 2,
            Some('o') => 8,
            _ => return Err(invalid()),
        };
        (radix, chars.as_str().to_string())
    } else if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        (16, hex.to_string())
    } else if let Some(bin) = cleaned.strip_prefix("0b") {
        (2, bin.to_string())
    } else if let Some(oct) = cleaned.strip_prefix("0o") {
        (8, oct.to_string())
    } else {
        (10, cleaned.clone())
    };

    if digits.is_empty() {
        return Err(invalid());
    }
    u32::from_str_radix(&digits, radix).map_err(|_| invalid())
}
