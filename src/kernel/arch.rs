//! CPU architecture names and their kernel source directories.
//!
//! Several architecture variants share one `arch/<dir>` subtree in the kernel
//! sources. The mapping is an exhaustive `match`, so adding a variant without a
//! directory is a compile error rather than a runtime failure.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Architecture detected from a kernel image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchitectureName {
    Mipsle,
    Mipsbe,
    Mips64le,
    Mips64be,
    X86,
    #[serde(rename = "x86_64")]
    X86_64,
    Powerpcbe,
    Powerpcle,
    Armbe,
    Armle,
    Mips16e,
    Superhle,
    Superhbe,
    Aarch64,
    Sparc,
    Arcompact,
}

/// Coarse architecture directory under `arch/` in a kernel tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchDir {
    Mips,
    X86,
    Powerpc,
    Arm,
    Sh,
    Sparc,
    Arc,
}

impl ArchitectureName {
    /// Every architecture the symbol-table extractor can report
    pub const ALL: [ArchitectureName; 16] = [
        ArchitectureName::Mipsle,
        ArchitectureName::Mipsbe,
        ArchitectureName::Mips64le,
        ArchitectureName::Mips64be,
        ArchitectureName::X86,
        ArchitectureName::X86_64,
        ArchitectureName::Powerpcbe,
        ArchitectureName::Powerpcle,
        ArchitectureName::Armbe,
        ArchitectureName::Armle,
        ArchitectureName::Mips16e,
        ArchitectureName::Superhle,
        ArchitectureName::Superhbe,
        ArchitectureName::Aarch64,
        ArchitectureName::Sparc,
        ArchitectureName::Arcompact,
    ];

    /// Source directory used to scope the symbol search
    pub fn arch_dir(self) -> ArchDir {
        match self {
            ArchitectureName::Mipsle
            | ArchitectureName::Mipsbe
            | ArchitectureName::Mips64le
            | ArchitectureName::Mips64be
            | ArchitectureName::Mips16e => ArchDir::Mips,
            ArchitectureName::X86 | ArchitectureName::X86_64 => ArchDir::X86,
            ArchitectureName::Powerpcbe | ArchitectureName::Powerpcle => ArchDir::Powerpc,
            // aarch64 shares the arm directory, matching older trees without arch/arm64
            ArchitectureName::Armbe | ArchitectureName::Armle | ArchitectureName::Aarch64 => {
                ArchDir::Arm
            }
            ArchitectureName::Superhle | ArchitectureName::Superhbe => ArchDir::Sh,
            ArchitectureName::Sparc => ArchDir::Sparc,
            ArchitectureName::Arcompact => ArchDir::Arc,
        }
    }

    /// Canonical lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            ArchitectureName::Mipsle => "mipsle",
            ArchitectureName::Mipsbe => "mipsbe",
            ArchitectureName::Mips64le => "mips64le",
            ArchitectureName::Mips64be => "mips64be",
            ArchitectureName::X86 => "x86",
            ArchitectureName::X86_64 => "x86_64",
            ArchitectureName::Powerpcbe => "powerpcbe",
            ArchitectureName::Powerpcle => "powerpcle",
            ArchitectureName::Armbe => "armbe",
            ArchitectureName::Armle => "armle",
            ArchitectureName::Mips16e => "mips16e",
            ArchitectureName::Superhle => "superhle",
            ArchitectureName::Superhbe => "superhbe",
            ArchitectureName::Aarch64 => "aarch64",
            ArchitectureName::Sparc => "sparc",
            ArchitectureName::Arcompact => "arcompact",
        }
    }
}

impl FromStr for ArchitectureName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ArchitectureName::ALL
            .into_iter()
            .find(|arch| arch.as_str() == wanted)
            .ok_or_else(|| format!("unknown architecture '{}'", s))
    }
}

impl fmt::Display for ArchitectureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ArchDir {
    /// Directory name below `arch/`
    pub fn as_str(self) -> &'static str {
        match self {
            ArchDir::Mips => "mips",
            ArchDir::X86 => "x86",
            ArchDir::Powerpc => "powerpc",
            ArchDir::Arm => "arm",
            ArchDir::Sh => "sh",
            ArchDir::Sparc => "sparc",
            ArchDir::Arc => "arc",
        }
    }
}

impl fmt::Display for ArchDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_is_total_and_non_empty() {
        for arch in ArchitectureName::ALL {
            assert!(!arch.arch_dir().as_str().is_empty(), "{} has no dir", arch);
        }
    }

    #[test]
    fn test_variants_collapse() {
        assert_eq!(ArchitectureName::Mips64be.arch_dir(), ArchDir::Mips);
        assert_eq!(ArchitectureName::Mips16e.arch_dir(), ArchDir::Mips);
        assert_eq!(ArchitectureName::X86_64.arch_dir(), ArchDir::X86);
        assert_eq!(ArchitectureName::Aarch64.arch_dir(), ArchDir::Arm);
        assert_eq!(ArchitectureName::Superhbe.arch_dir(), ArchDir::Sh);
        assert_eq!(ArchitectureName::Arcompact.arch_dir(), ArchDir::Arc);
    }

    #[test]
    fn test_from_str_round_trips_names() {
        for arch in ArchitectureName::ALL {
            assert_eq!(arch.as_str().parse::<ArchitectureName>(), Ok(arch));
        }
        assert!("riscv".parse::<ArchitectureName>().is_err());
    }
}
