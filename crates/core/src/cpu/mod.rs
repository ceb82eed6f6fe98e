// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod riscv;

pub use riscv::RiscV;

use vigna_config::{ConfigError, CoreConfig};

bitflags::bitflags! {
    /// ISA extensions a Vigna build can carry on top of RV32I.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Extensions: u32 {
        /// 16 integer registers instead of 32.
        const E = 1 << 0;
        const M = 1 << 1;
        const C = 1 << 2;
        const ZICSR = 1 << 3;
        const INTERRUPT = 1 << 4;
    }
}

impl Extensions {
    /// `misa` value for an RV32 core with these extensions.
    pub fn misa(self) -> u32 {
        let mut misa = 1 << 30; // MXL = 32
        misa |= if self.contains(Extensions::E) {
            1 << 4
        } else {
            1 << 8
        };
        if self.contains(Extensions::M) {
            misa |= 1 << 12;
        }
        if self.contains(Extensions::C) {
            misa |= 1 << 2;
        }
        misa
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuConfig {
    pub extensions: Extensions,
    pub reset_addr: u32,
    pub stack_reset: Option<u32>,
    pub alignment_checks: bool,
}

impl Default for CpuConfig {
    /// Matches the `rv32im_zicsr` preset.
    fn default() -> Self {
        Self {
            extensions: Extensions::M | Extensions::ZICSR | Extensions::INTERRUPT,
            reset_addr: 0,
            stack_reset: None,
            alignment_checks: true,
        }
    }
}

impl TryFrom<&CoreConfig> for CpuConfig {
    type Error = ConfigError;

    fn try_from(config: &CoreConfig) -> Result<Self, Self::Error> {
        if config.is_enabled("c_extension") {
            return Err(ConfigError::Unsupported(
                "Compressed instruction set (c_extension)".into(),
            ));
        }

        let mut extensions = Extensions::empty();
        for (key, ext) in [
            ("e_extension", Extensions::E),
            ("m_extension", Extensions::M),
            ("zicsr_extension", Extensions::ZICSR),
            ("interrupt", Extensions::INTERRUPT),
        ] {
            extensions.set(ext, config.is_enabled(key));
        }

        Ok(Self {
            extensions,
            reset_addr: config.reset_addr()?,
            stack_reset: config.stack_reset()?,
            alignment_checks: config.is_enabled("alignment"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_preset() {
        let preset = CoreConfig::preset("rv32im_zicsr").unwrap();
        assert_eq!(CpuConfig::try_from(&preset).unwrap(), CpuConfig::default());
    }

    #[test]
    fn test_rv32e_config() {
        let preset = CoreConfig::preset("rv32e").unwrap();
        let config = CpuConfig::try_from(&preset).unwrap();
        assert_eq!(config.extensions, Extensions::E);
        assert!(config.alignment_checks);
    }

    #[test]
    fn test_compressed_rejected() {
        let preset = CoreConfig::preset("rv32imc").unwrap();
        assert!(matches!(
            CpuConfig::try_from(&preset),
            Err(ConfigError::Unsupported(_))
        ));
    }

    #[test]
    fn test_stack_reset_from_header() {
        let mut config = CoreConfig::preset("rv32i").unwrap();
        config.enable("stack_reset_enable").unwrap();
        config.set_value("stack_reset_value", "32'h0000_f000").unwrap();
        config.set_value("reset_addr", "32'h0000_0100").unwrap();
        let cpu = CpuConfig::try_from(&config).unwrap();
        assert_eq!(cpu.stack_reset, Some(0xF000));
        assert_eq!(cpu.reset_addr, 0x100);
    }

    #[test]
    fn test_misa() {
        assert_eq!(Extensions::empty().misa(), 0x4000_0100);
        assert_eq!((Extensions::M | Extensions::ZICSR).misa(), 0x4000_1100);
        assert_eq!(Extensions::E.misa(), 0x4000_0010);
    }
}
