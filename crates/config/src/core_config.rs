// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Build options of the Vigna core and the `vigna_conf.vh` header they are
//! rendered into.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{parse_verilog_number, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Flag,
    Value,
}

#[derive(Debug)]
pub struct OptionSpec {
    pub key: &'static str,
    pub define: &'static str,
    pub description: &'static str,
    /// Informational only; unset options render commented out.
    pub default: &'static str,
    pub category: &'static str,
    pub kind: OptionKind,
    pub depends_on: Option<&'static str>,
    pub conflicts: &'static [&'static str],
}

const fn flag(
    key: &'static str,
    define: &'static str,
    description: &'static str,
    default: &'static str,
    category: &'static str,
) -> OptionSpec {
    OptionSpec {
        key,
        define,
        description,
        default,
        category,
        kind: OptionKind::Flag,
        depends_on: None,
        conflicts: &[],
    }
}

pub static OPTIONS: [OptionSpec; 14] = [
    flag(
        "e_extension",
        "VIGNA_CORE_E_EXTENSION",
        "Enable E extension (16 registers instead of 32)",
        "false",
        "Core Architecture",
    ),
    flag(
        "bus_binding",
        "VIGNA_TOP_BUS_BINDING",
        "Enable unified bus (vs separate instruction/data buses)",
        "true",
        "Bus Architecture",
    ),
    OptionSpec {
        kind: OptionKind::Value,
        ..flag(
            "reset_addr",
            "VIGNA_CORE_RESET_ADDR",
            "Core reset address",
            "32'h0000_0000",
            "Memory Configuration",
        )
    },
    flag(
        "stack_reset_enable",
        "VIGNA_CORE_STACK_ADDR_RESET_ENABLE",
        "Enable stack pointer reset (WARNING: doubles area)",
        "false",
        "Memory Configuration",
    ),
    OptionSpec {
        kind: OptionKind::Value,
        depends_on: Some("stack_reset_enable"),
        ..flag(
            "stack_reset_value",
            "VIGNA_CORE_STACK_ADDR_RESET_VALUE",
            "Stack pointer reset value",
            "32'h0000_1000",
            "Memory Configuration",
        )
    },
    flag(
        "two_stage_shift",
        "VIGNA_CORE_TWO_STAGE_SHIFT",
        "Two-stage shift (better timing, larger area)",
        "true",
        "Performance",
    ),
    flag(
        "preload_negative",
        "VIGNA_CORE_PRELOAD_NEGATIVE",
        "Preload negative numbers (better timing, more resources)",
        "true",
        "Performance",
    ),
    flag(
        "alignment",
        "VIGNA_CORE_ALIGNMENT",
        "Enable alignment checks",
        "true",
        "Performance",
    ),
    flag(
        "m_extension",
        "VIGNA_CORE_M_EXTENSION",
        "Enable M extension (multiply/divide)",
        "false",
        "RISC-V Extensions",
    ),
    OptionSpec {
        depends_on: Some("m_extension"),
        ..flag(
            "m_fpga_fast",
            "VIGNA_CORE_M_FPGA_FAST",
            "FPGA-optimized multiply/divide (TODO)",
            "false",
            "RISC-V Extensions",
        )
    },
    flag(
        "c_extension",
        "VIGNA_CORE_C_EXTENSION",
        "Enable C extension (compressed instructions)",
        "false",
        "RISC-V Extensions",
    ),
    flag(
        "zicsr_extension",
        "VIGNA_CORE_ZICSR_EXTENSION",
        "Enable Zicsr extension (control/status registers)",
        "false",
        "RISC-V Extensions",
    ),
    flag(
        "interrupt",
        "VIGNA_CORE_INTERRUPT",
        "Enable interrupt support",
        "false",
        "RISC-V Extensions",
    ),
    flag(
        "axi_lite",
        "VIGNA_AXI_LITE_INTERFACE",
        "Enable AXI4-Lite interface (vs simple interface)",
        "false",
        "Bus Interface",
    ),
];

/// Looks an option up by key. Dashes are accepted in place of underscores.
pub fn option_spec(key: &str) -> Option<&'static OptionSpec> {
    let key = key.replace('-', "_");
    OPTIONS.iter().find(|o| o.key == key)
}

#[derive(Debug)]
pub struct Preset {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Flags switched on; every preset also pins `reset_addr`.
    pub enabled: &'static [&'static str],
    pub reset_addr: &'static str,
}

const BASE_FLAGS: [&str; 4] = [
    "bus_binding",
    "two_stage_shift",
    "preload_negative",
    "alignment",
];

pub static PRESETS: [Preset; 7] = [
    Preset {
        key: "rv32i",
        name: "RV32I Base",
        description: "Minimal RISC-V base configuration",
        enabled: &BASE_FLAGS,
        reset_addr: "32'h0000_0000",
    },
    Preset {
        key: "rv32e",
        name: "RV32E Embedded",
        description: "Embedded configuration with 16 registers",
        enabled: &[
            "e_extension",
            "bus_binding",
            "two_stage_shift",
            "preload_negative",
            "alignment",
        ],
        reset_addr: "32'h0000_0000",
    },
    Preset {
        key: "rv32im",
        name: "RV32IM",
        description: "Base + Multiply/Divide extension",
        enabled: &[
            "bus_binding",
            "two_stage_shift",
            "preload_negative",
            "alignment",
            "m_extension",
        ],
        reset_addr: "32'h0000_0000",
    },
    Preset {
        key: "rv32ic",
        name: "RV32IC",
        description: "Base + Compressed instruction extension",
        enabled: &[
            "bus_binding",
            "two_stage_shift",
            "preload_negative",
            "alignment",
            "c_extension",
        ],
        reset_addr: "32'h0000_0000",
    },
    Preset {
        key: "rv32imc",
        name: "RV32IMC",
        description: "Base + Multiply/Divide + Compressed instructions",
        enabled: &[
            "bus_binding",
            "two_stage_shift",
            "preload_negative",
            "alignment",
            "m_extension",
            "c_extension",
        ],
        reset_addr: "32'h0000_0000",
    },
    Preset {
        key: "rv32im_zicsr",
        name: "RV32IM_Zicsr",
        description: "Base + Multiply/Divide + CSR extension",
        enabled: &[
            "bus_binding",
            "two_stage_shift",
            "preload_negative",
            "alignment",
            "m_extension",
            "interrupt",
            "zicsr_extension",
        ],
        reset_addr: "32'h0000_0000",
    },
    Preset {
        key: "rv32imc_zicsr",
        name: "RV32IMC_Zicsr",
        description: "Full featured configuration",
        enabled: &[
            "bus_binding",
            "two_stage_shift",
            "preload_negative",
            "alignment",
            "m_extension",
            "c_extension",
            "interrupt",
            "zicsr_extension",
        ],
        reset_addr: "32'h0000_0000",
    },
];

impl Preset {
    pub fn find(key: &str) -> Option<&'static Preset> {
        PRESETS.iter().find(|p| p.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    Enabled,
    Disabled,
    Value(String),
}

impl Setting {
    fn is_set(&self) -> bool {
        match self {
            Setting::Enabled => true,
            Setting::Disabled => false,
            Setting::Value(v) => !v.is_empty(),
        }
    }
}

/// A (possibly partial) Vigna core configuration.
///
/// Options never set render commented out, the same as disabled ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreConfig {
    settings: BTreeMap<&'static str, Setting>,
}

impl CoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(key: &str) -> Result<Self, ConfigError> {
        let preset = Preset::find(key).ok_or_else(|| ConfigError::UnknownPreset(key.into()))?;
        let mut config = Self::new();
        for key in preset.enabled {
            config.set(key, Setting::Enabled)?;
        }
        config.set("reset_addr", Setting::Value(preset.reset_addr.to_string()))?;
        Ok(config)
    }

    /// Resolves a preset name, falling back to reading a `.vh` header from disk.
    pub fn resolve(spec: &str) -> Result<Self> {
        if Preset::find(spec).is_some() {
            return Ok(Self::preset(spec)?);
        }
        Self::from_file(spec)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(&path).with_context(|| {
            format!("Failed to read core configuration {:?}", path.as_ref())
        })?;
        Ok(Self::parse(&text))
    }

    pub fn set(&mut self, key: &str, setting: Setting) -> Result<(), ConfigError> {
        let spec = option_spec(key).ok_or_else(|| ConfigError::UnknownOption(key.into()))?;
        match (spec.kind, &setting) {
            (OptionKind::Flag, Setting::Value(_)) => {
                return Err(ConfigError::ExpectsFlag(spec.key.into()))
            }
            (OptionKind::Value, Setting::Enabled) => {
                return Err(ConfigError::ExpectsValue(spec.key.into()))
            }
            _ => {}
        }
        self.settings.insert(spec.key, setting);
        Ok(())
    }

    pub fn enable(&mut self, key: &str) -> Result<(), ConfigError> {
        self.set(key, Setting::Enabled)
    }

    pub fn disable(&mut self, key: &str) -> Result<(), ConfigError> {
        self.set(key, Setting::Disabled)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set(key, Setting::Value(value.to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&Setting> {
        let spec = option_spec(key)?;
        self.settings.get(spec.key)
    }

    pub fn is_enabled(&self, key: &str) -> bool {
        self.get(key).is_some_and(Setting::is_set)
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Setting::Value(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Applies every setting of `other` on top of this configuration.
    pub fn merge(&mut self, other: &CoreConfig) {
        for (key, setting) in &other.settings {
            self.settings.insert(key, setting.clone());
        }
    }

    /// Reports every unmet dependency and conflict, in option table order.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        for spec in &OPTIONS {
            if !self.is_enabled(spec.key) {
                continue;
            }
            if let Some(requires) = spec.depends_on {
                if !self.is_enabled(requires) {
                    errors.push(ConfigError::MissingDependency {
                        option: spec.key.into(),
                        requires: requires.into(),
                    });
                }
            }
            for &other in spec.conflicts {
                if self.is_enabled(other) {
                    errors.push(ConfigError::Conflict {
                        option: spec.key.into(),
                        other: other.into(),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Core reset address; `0` when unset.
    pub fn reset_addr(&self) -> Result<u32, ConfigError> {
        match self.value("reset_addr") {
            Some(v) => parse_verilog_number(v),
            None => Ok(0),
        }
    }

    /// Stack pointer loaded at reset, when the core resets it at all.
    pub fn stack_reset(&self) -> Result<Option<u32>, ConfigError> {
        if !self.is_enabled("stack_reset_enable") {
            return Ok(None);
        }
        let literal = self.value("stack_reset_value").unwrap_or_else(|| {
            option_spec("stack_reset_value")
                .map(|s| s.default)
                .unwrap_or("0")
        });
        parse_verilog_number(literal).map(Some)
    }

    /// Renders the configuration as a `vigna_conf.vh` Verilog header.
    pub fn render(&self, title: &str) -> String {
        let mut out = String::new();
        out.push_str("`ifndef VIGNA_CONF_VH\n");
        out.push_str("`define VIGNA_CONF_VH\n\n");
        out.push_str(&format!("/* {} */\n\n", title));

        let mut categories: Vec<&str> = Vec::new();
        for spec in &OPTIONS {
            if !categories.contains(&spec.category) {
                categories.push(spec.category);
            }
        }

        for category in categories {
            out.push_str(&format!("/* {} */\n", category));
            out.push_str(&format!("/* {} */\n\n", "-".repeat(73)));

            for spec in OPTIONS.iter().filter(|o| o.category == category) {
                out.push_str(&format!("/* {} */\n", spec.description));
                if let Some(requires) = spec.depends_on {
                    if !self.is_enabled(requires) {
                        out.push_str(&format!("/* NOTE: Requires {} to be enabled */\n", requires));
                    }
                }
                match self.settings.get(spec.key) {
                    Some(Setting::Enabled) => out.push_str(&format!("`define {}\n", spec.define)),
                    Some(Setting::Value(v)) if !v.is_empty() => {
                        out.push_str(&format!("`define {} {}\n", spec.define, v))
                    }
                    _ => out.push_str(&format!("//`define {}\n", spec.define)),
                }
                out.push('\n');
            }
            out.push('\n');
        }

        out.push_str("`endif\n");
        out
    }

    /// Recovers settings from an existing header.
    ///
    /// A live `` `define `` enables the option (or carries its value), a
    /// commented-out one disables it, and options that do not appear stay
    /// unset.
    pub fn parse(text: &str) -> Self {
        let mut config = Self::new();

        for line in text.lines() {
            let line = line.trim_end();
            let (commented, rest) = match line.strip_prefix("//") {
                Some(rest) => (true, rest),
                None => (false, line),
            };
            let Some(rest) = rest.strip_prefix("`define") else {
                continue;
            };
            if !rest.starts_with(char::is_whitespace) {
                continue;
            }

            let mut tokens = rest.split_whitespace();
            let Some(define) = tokens.next() else {
                continue;
            };
            let Some(spec) = OPTIONS.iter().find(|o| o.define == define) else {
                continue;
            };

            let setting = if commented {
                Setting::Disabled
            } else {
                match spec.kind {
                    OptionKind::Flag => Setting::Enabled,
                    OptionKind::Value => {
                        let value = tokens.collect::<Vec<_>>().join(" ");
                        if value.is_empty() {
                            continue;
                        }
                        Setting::Value(value)
                    }
                }
            };

            // A live define wins over a commented-out duplicate.
            let live = matches!(
                config.settings.get(spec.key),
                Some(Setting::Enabled | Setting::Value(_))
            );
            if !(commented && live) {
                config.settings.insert(spec.key, setting);
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_is_valid() {
        for preset in &PRESETS {
            let config = CoreConfig::preset(preset.key).unwrap();
            assert!(config.validate().is_ok(), "{} invalid", preset.key);
            assert_eq!(config.reset_addr(), Ok(0));
        }
    }

    #[test]
    fn test_preset_contents() {
        let config = CoreConfig::preset("rv32im_zicsr").unwrap();
        assert!(config.is_enabled("m_extension"));
        assert!(config.is_enabled("zicsr_extension"));
        assert!(config.is_enabled("interrupt"));
        assert!(!config.is_enabled("c_extension"));
        assert!(!config.is_enabled("e_extension"));

        let rv32e = CoreConfig::preset("rv32e").unwrap();
        assert!(rv32e.is_enabled("e_extension"));
    }

    #[test]
    fn test_unknown_preset() {
        assert_eq!(
            CoreConfig::preset("rv64gc"),
            Err(ConfigError::UnknownPreset("rv64gc".into()))
        );
    }

    #[test]
    fn test_kind_mismatch() {
        let mut config = CoreConfig::new();
        assert_eq!(
            config.set_value("m_extension", "1"),
            Err(ConfigError::ExpectsFlag("m_extension".into()))
        );
        assert_eq!(
            config.enable("reset_addr"),
            Err(ConfigError::ExpectsValue("reset_addr".into()))
        );
        assert!(config.disable("reset-addr").is_ok());
    }

    #[test]
    fn test_dependency_errors() {
        let mut config = CoreConfig::preset("rv32i").unwrap();
        config.enable("m_fpga_fast").unwrap();
        config.set_value("stack_reset_value", "32'h0000_2000").unwrap();

        let errors = config.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                ConfigError::MissingDependency {
                    option: "stack_reset_value".into(),
                    requires: "stack_reset_enable".into(),
                },
                ConfigError::MissingDependency {
                    option: "m_fpga_fast".into(),
                    requires: "m_extension".into(),
                },
            ]
        );
        assert_eq!(
            errors[1].to_string(),
            "'m_fpga_fast' requires 'm_extension' to be enabled"
        );
    }

    #[test]
    fn test_stack_reset() {
        let mut config = CoreConfig::new();
        assert_eq!(config.stack_reset(), Ok(None));

        config.enable("stack_reset_enable").unwrap();
        assert_eq!(config.stack_reset(), Ok(Some(0x1000)));

        config.set_value("stack_reset_value", "32'h0001_0000").unwrap();
        assert_eq!(config.stack_reset(), Ok(Some(0x1_0000)));
    }

    #[test]
    fn test_render_layout() {
        let config = CoreConfig::preset("rv32im").unwrap();
        let text = config.render("RV32IM");

        assert!(text.starts_with("`ifndef VIGNA_CONF_VH\n`define VIGNA_CONF_VH\n\n/* RV32IM */\n\n"));
        assert!(text.ends_with("\n`endif\n"));
        assert!(text.contains("/* Core Architecture */\n/* ----"));
        assert!(text.contains(&format!("/* {} */\n\n", "-".repeat(73))));
        assert!(text.contains("/* Enable M extension (multiply/divide) */\n`define VIGNA_CORE_M_EXTENSION\n"));
        assert!(text.contains("//`define VIGNA_CORE_C_EXTENSION\n"));
        assert!(text.contains("`define VIGNA_CORE_RESET_ADDR 32'h0000_0000\n"));
        assert!(text.contains(
            "/* Stack pointer reset value */\n/* NOTE: Requires stack_reset_enable to be enabled */\n//`define VIGNA_CORE_STACK_ADDR_RESET_VALUE\n"
        ));

        let core = text.find("/* Core Architecture */").unwrap();
        let bus = text.find("/* Bus Architecture */").unwrap();
        let iface = text.find("/* Bus Interface */").unwrap();
        assert!(core < bus && bus < iface);
    }

    #[test]
    fn test_render_then_parse_recovers_settings() {
        let mut config = CoreConfig::preset("rv32imc_zicsr").unwrap();
        config.enable("stack_reset_enable").unwrap();
        config.set_value("stack_reset_value", "32'h0000_8000").unwrap();
        config.disable("axi_lite").unwrap();

        let parsed = CoreConfig::parse(&config.render("Custom Configuration"));
        for spec in &OPTIONS {
            assert_eq!(
                parsed.is_enabled(spec.key),
                config.is_enabled(spec.key),
                "{}",
                spec.key
            );
        }
        assert_eq!(parsed.value("stack_reset_value"), Some("32'h0000_8000"));
        assert_eq!(parsed.get("axi_lite"), Some(&Setting::Disabled));
    }

    #[test]
    fn test_parse_handwritten_header() {
        let text = "\
`ifndef VIGNA_CONF_VH
`define VIGNA_CONF_VH
`define VIGNA_CORE_RESET_ADDR 32'h0000_0200
`define VIGNA_CORE_M_EXTENSION
//`define VIGNA_CORE_ZICSR_EXTENSION
`define VIGNA_CORE_M_EXTENSION_EXTRA
`endif
";
        let config = CoreConfig::parse(text);
        assert_eq!(config.reset_addr(), Ok(0x200));
        assert!(config.is_enabled("m_extension"));
        assert_eq!(config.get("zicsr_extension"), Some(&Setting::Disabled));
        assert_eq!(config.get("c_extension"), None);
    }

    #[test]
    fn test_merge_overrides() {
        let mut config = CoreConfig::preset("rv32i").unwrap();
        let mut overrides = CoreConfig::new();
        overrides.enable("m_extension").unwrap();
        overrides.disable("alignment").unwrap();
        config.merge(&overrides);

        assert!(config.is_enabled("m_extension"));
        assert!(!config.is_enabled("alignment"));
        assert!(config.is_enabled("bus_binding"));
    }
}
