//! Kernel image inspection: version banner, architecture and symbol table.
//!
//! Decompression and kallsyms recovery are delegated to an external unpacker
//! (`vmlinux-to-elf` by default) which turns the raw image into an ELF file
//! with a symbol table; that ELF is then read with the `object` crate.

use object::elf::{
    FileHeader32, FileHeader64, EM_386, EM_AARCH64, EM_ARC_COMPACT, EM_ARM, EM_MIPS, EM_PPC,
    EM_PPC64, EM_SH, EM_SPARC, EM_SPARC32PLUS, EM_SPARCV9, EM_X86_64,
};
use object::read::elf::FileHeader;
use object::{Endianness, FileKind, Object, ObjectSection, ObjectSymbol, SymbolKind, SymbolSection};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::config::Settings;
use crate::error::ImageError;
use crate::kernel::arch::ArchitectureName;
use crate::kernel::version::KernelVersion;
use crate::models::Symbol;
use crate::system::run_checked;

static BANNER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Linux version (\d+\.[\d.]*\d)[ -~]+").expect("Invalid banner regex")
});

/// Find the release in the `Linux version X.Y.Z ...` banner
pub fn find_version_banner(bytes: &[u8]) -> Result<KernelVersion, ImageError> {
    let captures = BANNER_REGEX
        .captures(bytes)
        .ok_or(ImageError::BannerNotFound)?;
    let release =
        std::str::from_utf8(&captures[1]).map_err(|_| ImageError::BannerNotFound)?;
    Ok(KernelVersion::parse(release)?)
}

/// Look for the banner in the raw image, then in the unpacked kernel
pub fn locate_version(raw: &[u8], unpacked: &[u8]) -> Result<KernelVersion, ImageError> {
    match find_version_banner(raw) {
        Err(ImageError::BannerNotFound) => {
            log::debug!("[Image] Banner not in raw image, trying unpacked kernel");
            find_version_banner(unpacked)
        }
        other => other,
    }
}

/// `(e_machine, 64-bit class, little endian)` of a parsed ELF header
fn header_fields<H>(header: object::read::Result<&H>) -> Result<(u16, bool, bool), ImageError>
where
    H: FileHeader<Endian = Endianness>,
{
    let header = header.map_err(|e| ImageError::MalformedElf(e.to_string()))?;
    let endian = header
        .endian()
        .map_err(|e| ImageError::MalformedElf(e.to_string()))?;
    Ok((
        header.e_machine(endian),
        header.is_class_64(),
        header.is_little_endian(),
    ))
}

/// Architecture from the ELF identification and `e_machine` fields
pub fn architecture_from_elf(bytes: &[u8]) -> Result<ArchitectureName, ImageError> {
    let (machine, is_64, little_endian) = match FileKind::parse(bytes) {
        Ok(FileKind::Elf32) => header_fields(<FileHeader32<Endianness> as FileHeader>::parse(bytes))?,
        Ok(FileKind::Elf64) => header_fields(<FileHeader64<Endianness> as FileHeader>::parse(bytes))?,
        Ok(other) => {
            return Err(ImageError::MalformedElf(format!(
                "expected an ELF file, found {:?}",
                other
            )))
        }
        Err(e) => return Err(ImageError::MalformedElf(e.to_string())),
    };

    let arch = match (machine, is_64, little_endian) {
        (EM_MIPS, false, true) => ArchitectureName::Mipsle,
        (EM_MIPS, false, false) => ArchitectureName::Mipsbe,
        (EM_MIPS, true, true) => ArchitectureName::Mips64le,
        (EM_MIPS, true, false) => ArchitectureName::Mips64be,
        (EM_386, _, _) => ArchitectureName::X86,
        (EM_X86_64, _, _) => ArchitectureName::X86_64,
        (EM_PPC | EM_PPC64, _, false) => ArchitectureName::Powerpcbe,
        (EM_PPC | EM_PPC64, _, true) => ArchitectureName::Powerpcle,
        (EM_ARM, _, false) => ArchitectureName::Armbe,
        (EM_ARM, _, true) => ArchitectureName::Armle,
        (EM_AARCH64, _, _) => ArchitectureName::Aarch64,
        (EM_SH, _, true) => ArchitectureName::Superhle,
        (EM_SH, _, false) => ArchitectureName::Superhbe,
        (EM_SPARC | EM_SPARC32PLUS | EM_SPARCV9, _, _) => ArchitectureName::Sparc,
        (EM_ARC_COMPACT, _, _) => ArchitectureName::Arcompact,
        (other, _, _) => {
            return Err(ImageError::UnsupportedArchitecture(format!(
                "ELF machine {}",
                other
            )))
        }
    };
    Ok(arch)
}

/// nm-style class marker for a symbol (upper case when global)
fn class_marker<'data, O, S>(file: &O, symbol: &S) -> char
where
    O: Object<'data>,
    S: ObjectSymbol<'data>,
{
    let marker = match symbol.section() {
        SymbolSection::Undefined => 'U',
        SymbolSection::Absolute => 'A',
        SymbolSection::Common => 'C',
        SymbolSection::Section(index) => {
            let section_name = file
                .section_by_index(index)
                .ok()
                .and_then(|section| section.name().ok().map(str::to_string))
                .unwrap_or_default();
            match symbol.kind() {
                SymbolKind::Text => 'T',
                _ if section_name.starts_with(".bss") => 'B',
                _ if section_name.starts_with(".rodata") => 'R',
                _ if section_name.starts_with(".text") => 'T',
                _ => 'D',
            }
        }
        _ => '?',
    };

    if symbol.is_global() {
        marker
    } else {
        marker.to_ascii_lowercase()
    }
}

/// Architecture and raw (marker-prefixed) symbol names from an ELF image
pub fn parse_elf_symbols(bytes: &[u8]) -> Result<(ArchitectureName, Vec<String>), ImageError> {
    let architecture = architecture_from_elf(bytes)?;
    let file =
        object::File::parse(bytes).map_err(|e| ImageError::MalformedElf(e.to_string()))?;

    let mut raw_names = Vec::new();
    for symbol in file.symbols() {
        if matches!(symbol.kind(), SymbolKind::Section | SymbolKind::File) {
            continue;
        }
        let name = match symbol.name() {
            Ok(name) if !name.is_empty() => name,
            _ => continue,
        };
        raw_names.push(format!("{}{}", class_marker(&file, &symbol), name));
    }

    Ok((architecture, raw_names))
}

/// Symbol table recovered from a kernel image
#[derive(Debug, Clone)]
pub struct ExtractedSymbols {
    pub architecture: ArchitectureName,
    /// Names as they appear in the table, each with its class marker
    pub raw_names: Vec<String>,
    /// The decompressed kernel (ELF) bytes
    pub unpacked: Vec<u8>,
}

impl ExtractedSymbols {
    /// Symbols with their class markers stripped, in table order
    pub fn symbols(&self) -> Vec<Symbol> {
        self.raw_names
            .iter()
            .filter_map(|raw| Symbol::from_raw(raw))
            .collect()
    }
}

/// Unpacks a kernel image and recovers its symbol table
#[allow(async_fn_in_trait)]
pub trait SymbolTableExtractor {
    async fn extract(&self, image: &Path) -> Result<ExtractedSymbols, ImageError>;
}

/// [`SymbolTableExtractor`] that runs `<unpacker> <image> <out.elf>`
#[derive(Debug, Clone)]
pub struct ElfConversionExtractor {
    unpacker: String,
    timeout: Duration,
}

impl ElfConversionExtractor {
    pub fn new(unpacker: impl Into<String>, timeout: Duration) -> Self {
        ElfConversionExtractor {
            unpacker: unpacker.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        ElfConversionExtractor::new(settings.unpacker.clone(), settings.unpack_timeout())
    }
}

impl SymbolTableExtractor for ElfConversionExtractor {
    async fn extract(&self, image: &Path) -> Result<ExtractedSymbols, ImageError> {
        let workdir = tempfile::tempdir().map_err(|source| ImageError::Unreadable {
            path: std::env::temp_dir(),
            source,
        })?;
        let elf_path: PathBuf = workdir.path().join("kernel.elf");

        log::info!("[Image] [UNPACK] {} {} -> ELF", self.unpacker, image.display());
        let mut command = Command::new(&self.unpacker);
        command.arg(image).arg(&elf_path);
        run_checked(command, self.timeout).await?;

        let unpacked = fs::read(&elf_path).map_err(|source| ImageError::Unreadable {
            path: elf_path.clone(),
            source,
        })?;
        let (architecture, raw_names) = parse_elf_symbols(&unpacked)?;
        log::info!(
            "[Image] [UNPACK] ✓ {} symbols, architecture {}",
            raw_names.len(),
            architecture
        );

        Ok(ExtractedSymbols {
            architecture,
            raw_names,
            unpacked,
        })
    }
}
