#![no_std]

use core::fmt;

pub mod define;
pub mod flash;
pub mod mmio;
pub mod record;
pub mod register_interface;

#[cfg(test)]
mod mock;

use define::{SR, SR_ERRORS};

pub use flash::{Bank, Flash, SequencerConfig};
pub use record::{RecordLayout, RecordStore, StoreLayout};

/// Snapshot of the flash status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFlags(pub u32);

impl StatusFlags {
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Only the error bits, EOP and BSY dropped.
    pub fn errors(self) -> StatusFlags {
        StatusFlags(self.0 & SR_ERRORS)
    }

    pub fn has_errors(self) -> bool {
        self.0 & SR_ERRORS != 0
    }

    pub fn busy(self) -> bool {
        self.0 & SR::BSY as u32 != 0
    }

    pub fn end_of_operation(self) -> bool {
        self.0 & SR::EOP as u32 != 0
    }

    pub fn program_error(self) -> bool {
        self.0 & SR::PROGERR as u32 != 0
    }

    pub fn write_protect_error(self) -> bool {
        self.0 & SR::WRPERR as u32 != 0
    }

    pub fn alignment_error(self) -> bool {
        self.0 & SR::PGAERR as u32 != 0
    }

    pub fn size_error(self) -> bool {
        self.0 & SR::SIZERR as u32 != 0
    }

    pub fn sequence_error(self) -> bool {
        self.0 & SR::PGSERR as u32 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Busy (or EOP) never settled within the poll budget.
    HardwareFault,
    /// The key sequence did not unlock the control register.
    Locked,
    /// Only banks 1 and 2 exist.
    InvalidBank(u8),
    /// Double-word programming needs an 8-byte aligned address.
    Misaligned(u32),
    /// A record does not start its page or shares it with another record.
    InvalidLayout(u32),
    /// The controller flagged the operation; flags were cleared afterwards.
    Program(StatusFlags),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::HardwareFault => write!(f, "flash controller stayed busy"),
            Error::Locked => write!(f, "flash control register is locked"),
            Error::InvalidBank(bank) => write!(f, "invalid flash bank {}", bank),
            Error::Misaligned(address) => {
                write!(f, "address {:08X} is not double-word aligned", address)
            }
            Error::InvalidLayout(base) => write!(f, "record at {:08X} does not own its page", base),
            Error::Program(flags) => write!(f, "flash operation failed, SR={:08X}", flags.0),
        }
    }
}

/// Primitives the record store needs from the flash.
pub trait FlashOperations {
    fn erase_page(&mut self, bank: u8, page: u8) -> Result<(), Error>;
    fn program_double_word(&mut self, address: u32, data: u64) -> Result<(), Error>;
    fn read_double_word(&mut self, address: u32) -> u64;
}
