//! Kernel symbol resolution.
//!
//! The RTOS layer publishes the symbol names it needs ([`SymbolRequirement`])
//! and consumes resolved addresses through a [`SymbolTable`]. Resolution
//! itself is an external service behind [`SymbolResolver`]; [`ElfSymbolFile`]
//! is the resolver used when the firmware image is available on disk.

use anyhow::Result;
use object::{Object, ObjectSymbol};
use std::path::Path;

/// One kernel symbol an RTOS needs resolved before it can operate.
#[derive(Debug, Clone, Copy)]
pub struct SymbolRequirement {
    /// Kernel global-variable name.
    pub name: &'static str,
    /// Whether detection may proceed without it.
    pub optional: bool,
}

/// Maps kernel global-variable names to target addresses.
pub trait SymbolResolver {
    /// Resolved address of `name`, or `None` if the symbol is unknown.
    fn lookup_symbol(&self, name: &str) -> Option<u64>;
}

/// Resolved addresses for a fixed requirement list, in declaration order.
///
/// Unresolved symbols are recorded with address zero, matching the wire
/// convention of the resolver service; [`SymbolTable::address`] reports them
/// as absent.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: Vec<(&'static str, u64)>,
}

impl SymbolTable {
    /// Resolve every requirement through `resolver`.
    pub fn resolve(required: &[SymbolRequirement], resolver: &dyn SymbolResolver) -> Self {
        let entries = required
            .iter()
            .map(|req| (req.name, resolver.lookup_symbol(req.name).unwrap_or(0)))
            .collect();
        Self { entries }
    }

    /// Address of `name`, or `None` if it is absent or unresolved.
    pub fn address(&self, name: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, addr)| addr)
            .filter(|&addr| addr != 0)
    }

    /// The resolved entries in declaration order, zeroes included.
    pub fn entries(&self) -> &[(&'static str, u64)] {
        &self.entries
    }
}

/// Symbol resolver backed by a firmware ELF image.
pub struct ElfSymbolFile {
    data: Vec<u8>,
}

impl ElfSymbolFile {
    /// Load the ELF image at `path`, validating that it parses.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        object::File::parse(&*data)
            .map_err(|e| anyhow::anyhow!("Failed to parse ELF {}: {}", path.display(), e))?;
        log::info!("Loaded symbols from {}", path.display());
        Ok(Self { data })
    }
}

impl SymbolResolver for ElfSymbolFile {
    fn lookup_symbol(&self, name: &str) -> Option<u64> {
        let obj = object::File::parse(&*self.data).ok()?;
        for symbol in obj.symbols() {
            if let Ok(sym_name) = symbol.name() {
                if sym_name == name {
                    return Some(symbol.address());
                }
            }
        }
        None
    }
}
