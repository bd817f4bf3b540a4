//! CVERE linear memory: 65 536 word cells under a fixed region policy.
//!
//! Every architectural access goes through one gatekeeper that knows the
//! region table; nothing else in the crate checks addresses. The only way
//! around the gatekeeper is the privileged view the syscall gateway hands
//! to ring-0 handlers.

use core::fmt;
use std::fmt::Display;

use bitflags::bitflags;
use thiserror::Error;
use tracing::debug;

use crate::privilege::Ring;

/// Number of 16-bit cells in the address space
pub const MEMORY_WORDS: usize = 1 << 16;

/// First cell of the reserved region
pub const RESERVED_START: u16 = 0xFFFE;

bitflags! {
    /// Access rights of a memory region
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Access: u8 {
        /// Loads permitted
        const READ = 1 << 0;
        /// Stores permitted
        const WRITE = 1 << 1;
        /// Instruction fetch permitted
        const EXECUTE = 1 << 2;
    }
}

/// The four architectural regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Program code, read and execute only
    Code,
    /// General data
    Data,
    /// Stack storage
    Stack,
    /// Reserved cells holding the initial SP; no architectural access
    Reserved,
}

impl Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegionKind::Code => "code",
            RegionKind::Data => "data",
            RegionKind::Stack => "stack",
            RegionKind::Reserved => "reserved",
        };
        f.write_str(name)
    }
}

/// A fixed span of the address space and its access policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Which architectural region this is
    pub kind: RegionKind,
    /// First cell of the region
    pub start: u16,
    /// Last cell of the region, inclusive
    pub end: u16,
    /// Operations the region permits
    pub access: Access,
    /// Least privileged ring allowed to touch the region
    pub min_ring: Ring,
}

/// The fixed region table. Regions are sorted and cover the whole address
/// space.
pub const REGIONS: [Region; 4] = [
    Region {
        kind: RegionKind::Code,
        start: 0x0000,
        end: 0x00FF,
        access: Access::READ.union(Access::EXECUTE),
        min_ring: Ring::User,
    },
    Region {
        kind: RegionKind::Data,
        start: 0x0100,
        end: 0xEFFF,
        access: Access::READ.union(Access::WRITE),
        min_ring: Ring::User,
    },
    Region {
        kind: RegionKind::Stack,
        start: 0xF000,
        end: 0xFFFD,
        access: Access::READ.union(Access::WRITE),
        min_ring: Ring::User,
    },
    Region {
        kind: RegionKind::Reserved,
        start: 0xFFFE,
        end: 0xFFFF,
        access: Access::empty(),
        min_ring: Ring::Kernel,
    },
];

/// Returns the region containing `addr`
#[must_use]
pub const fn region_at(addr: u16) -> Region {
    let mut i = 0;
    while i < REGIONS.len() - 1 {
        if addr >= REGIONS[i].start && addr <= REGIONS[i].end {
            return REGIONS[i];
        }
        i += 1;
    }
    REGIONS[REGIONS.len() - 1]
}

#[test]
fn region_boundaries() {
    assert_eq!(region_at(0x0000).kind, RegionKind::Code);
    assert_eq!(region_at(0x00FF).kind, RegionKind::Code);
    assert_eq!(region_at(0x0100).kind, RegionKind::Data);
    assert_eq!(region_at(0xEFFF).kind, RegionKind::Data);
    assert_eq!(region_at(0xF000).kind, RegionKind::Stack);
    assert_eq!(region_at(0xFFFD).kind, RegionKind::Stack);
    assert_eq!(region_at(0xFFFE).kind, RegionKind::Reserved);
    assert_eq!(region_at(0xFFFF).kind, RegionKind::Reserved);
}

/// Why a memory access was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryFaultKind {
    /// Read or write denied by region policy or privilege
    ProtectionFault,
    /// Instruction fetch from a region that is not executable
    InvalidAccess,
}

impl Display for MemoryFaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoryFaultKind::ProtectionFault => "protection fault",
            MemoryFaultKind::InvalidAccess => "invalid access",
        };
        f.write_str(name)
    }
}

/// A refused memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at 0x{addr:04X} from ring {ring}")]
pub struct MemoryFault {
    /// What was violated
    pub kind: MemoryFaultKind,
    /// The offending address
    pub addr: u16,
    /// The ring the access was attempted from
    pub ring: Ring,
}

/// A refused program or image load
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The byte image does not divide into 16-bit words
    #[error("image length {len} is not a whole number of 16-bit words")]
    TruncatedWord {
        /// Length of the rejected image in bytes
        len: usize,
    },
    /// The image runs past the end of the address space or the 0xF000 bound
    #[error("{words} words at 0x{base:04X} do not fit below the stack")]
    OutOfBounds {
        /// Requested load address
        base: u16,
        /// Length of the rejected image in words
        words: usize,
    },
    /// The image would overwrite the reserved cells
    #[error("image would overwrite reserved memory at 0x{addr:04X}")]
    ReservedOverlap {
        /// First reserved cell the image would touch
        addr: u16,
    },
    /// Programs must load into a region that permits execution
    #[error("0x{addr:04X} is not executable")]
    NotExecutable {
        /// First non-executable cell the program would occupy
        addr: u16,
    },
}

/// Flat word-addressed storage with region protection
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Box<[u16]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Creates zeroed memory
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_WORDS].into_boxed_slice(),
        }
    }

    /// Loads the cell at `addr`, checked against the region policy
    pub fn load_word(&self, addr: u16, ring: Ring) -> Result<u16, MemoryFault> {
        self.check(Access::READ, addr, ring)?;
        Ok(self.cells[addr as usize])
    }

    /// Stores `value` at `addr`, checked against the region policy
    pub fn store_word(&mut self, addr: u16, value: u16, ring: Ring) -> Result<(), MemoryFault> {
        self.check(Access::WRITE, addr, ring)?;
        self.cells[addr as usize] = value;
        Ok(())
    }

    /// Fetches the instruction word at `addr`; faults with
    /// [`MemoryFaultKind::InvalidAccess`] outside executable regions
    pub fn fetch_instruction(&self, addr: u16, ring: Ring) -> Result<u16, MemoryFault> {
        self.check(Access::EXECUTE, addr, ring)?;
        Ok(self.cells[addr as usize])
    }

    /// Copies a little-endian byte image into memory at `load_addr`.
    ///
    /// Refuses images with an odd byte count, images that overflow the
    /// address space, and images that would touch the reserved cells.
    pub fn load_image(&mut self, bytes: &[u8], load_addr: u16) -> Result<(), LoadError> {
        if bytes.len() % 2 != 0 {
            return Err(LoadError::TruncatedWord { len: bytes.len() });
        }
        let words = bytes.len() / 2;
        let end = load_addr as usize + words;
        if end > MEMORY_WORDS {
            return Err(LoadError::OutOfBounds {
                base: load_addr,
                words,
            });
        }
        if end > RESERVED_START as usize {
            return Err(LoadError::ReservedOverlap {
                addr: RESERVED_START,
            });
        }
        for (i, pair) in bytes.chunks_exact(2).enumerate() {
            self.cells[load_addr as usize + i] = u16::from_le_bytes([pair[0], pair[1]]);
        }
        debug!(load_addr, words, "image loaded");
        Ok(())
    }

    /// Direct read-only view of all cells, for snapshots and diagnostics
    #[must_use]
    pub fn cells(&self) -> &[u16] {
        &self.cells
    }

    // Loader path: the program loader writes code cells the architectural
    // path could never store to.
    pub(crate) fn write_block(&mut self, base: u16, words: &[u16]) {
        let base = base as usize;
        self.cells[base..base + words.len()].copy_from_slice(words);
    }

    // The single gatekeeper. Fetching from a non-executable region is an
    // invalid access; every other refusal is a protection fault.
    fn check(&self, op: Access, addr: u16, ring: Ring) -> Result<(), MemoryFault> {
        let region = region_at(addr);
        if !region.access.contains(op) {
            let kind = if op.contains(Access::EXECUTE) {
                MemoryFaultKind::InvalidAccess
            } else {
                MemoryFaultKind::ProtectionFault
            };
            return Err(MemoryFault { kind, addr, ring });
        }
        if ring > region.min_ring {
            return Err(MemoryFault {
                kind: MemoryFaultKind::ProtectionFault,
                addr,
                ring,
            });
        }
        Ok(())
    }

    pub(crate) fn privileged(&mut self) -> PrivilegedMemory<'_> {
        PrivilegedMemory { memory: self }
    }
}

/// Unrestricted view over memory, created by the syscall gateway for
/// ring-0 handlers only.
///
/// The view may read and write any cell, including code and the reserved
/// region. Dropping it ends the relaxation; it cannot outlive the handler
/// call that received it.
pub struct PrivilegedMemory<'a> {
    memory: &'a mut Memory,
}

impl PrivilegedMemory<'_> {
    /// Loads the cell at `addr` without any region check
    #[must_use]
    pub fn load_word(&self, addr: u16) -> u16 {
        self.memory.cells[addr as usize]
    }

    /// Stores `value` at `addr` without any region check
    pub fn store_word(&mut self, addr: u16, value: u16) {
        self.memory.cells[addr as usize] = value;
    }
}
