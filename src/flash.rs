use log::{debug, error};

use crate::define::{
    self, BANK_SIZE, CR, CR_PNB_MASK, CR_PNB_SHIFT, DOUBLE_WORD, FLASH_BASE, KEY, PAGE_SIZE, SR,
};
use crate::register_interface::FlashRegisters;
use crate::{Error, FlashOperations, StatusFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bank {
    /// Selected with BKER cleared.
    One = 1,
    /// Selected with BKER set.
    Two = 2,
}

impl TryFrom<u8> for Bank {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            1 => Ok(Bank::One),
            2 => Ok(Bank::Two),
            _ => Err(Error::InvalidBank(value)),
        }
    }
}

/// Base address of `page` within `bank`.
pub fn page_address(bank: Bank, page: u8) -> u32 {
    FLASH_BASE + (bank as u32 - 1) * BANK_SIZE + page as u32 * PAGE_SIZE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequencerConfig {
    /// Status register reads before a busy wait gives up.
    pub max_polls: u32,
    /// Delay between two status reads, 0 to spin.
    pub poll_delay_us: u32,
    /// Also wait for EOP after busy clears. Needs EOPIE on this controller.
    pub await_eop: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        SequencerConfig {
            max_polls: 100_000,
            poll_delay_us: 0,
            await_eop: false,
        }
    }
}

/// Unlock / erase / program sequencer for the internal flash.
pub struct Flash<R>
where
    R: FlashRegisters,
{
    regs: R,
    config: SequencerConfig,
}

impl<R> Flash<R>
where
    R: FlashRegisters,
{
    pub fn new(regs: R, config: SequencerConfig) -> Self {
        Flash { regs, config }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Give the register handle back.
    pub fn release(self) -> R {
        self.regs
    }

    pub fn status(&mut self) -> StatusFlags {
        StatusFlags(self.regs.read_sr())
    }

    pub fn is_locked(&mut self) -> bool {
        self.regs.read_cr() & CR::LOCK as u32 != 0
    }

    /// Poll until BSY clears.
    pub fn wait_ready(&mut self) -> Result<(), Error> {
        self.poll(|sr| sr & SR::BSY as u32 == 0)
    }

    /// Acknowledge every sticky error flag and EOP.
    pub fn clear_status_flags(&mut self) {
        for flag in define::SR_ACK {
            self.regs.write_sr(flag);
        }
    }

    pub fn unlock(&mut self) -> Result<(), Error> {
        if !self.is_locked() {
            return Ok(());
        }

        self.regs.write_key(KEY::KEY1 as u32);
        self.regs.write_key(KEY::KEY2 as u32);

        if self.is_locked() {
            error!("Flash key sequence rejected");
            return Err(Error::Locked);
        }
        Ok(())
    }

    pub fn lock(&mut self) {
        self.modify_cr(|cr| cr | CR::LOCK as u32);
    }

    /// Lock option byte access. Locked by default after reset.
    pub fn lock_option_bytes(&mut self) {
        self.modify_cr(|cr| cr | CR::OPTLOCK as u32);
    }

    fn modify_cr<F: FnOnce(u32) -> u32>(&mut self, f: F) {
        let cr = self.regs.read_cr();
        self.regs.write_cr(f(cr));
    }

    fn poll<F: Fn(u32) -> bool>(&mut self, done: F) -> Result<(), Error> {
        for _ in 0..self.config.max_polls.max(1) {
            let sr = self.regs.read_sr();
            if done(sr) {
                return Ok(());
            }
            if self.config.poll_delay_us > 0 {
                self.regs.delay(self.config.poll_delay_us);
            }
        }
        error!(
            "Flash operation did not complete after {} polls",
            self.config.max_polls
        );
        Err(Error::HardwareFault)
    }

    /// Unlock, run `operation`, then clear `mode` and relock whatever the outcome.
    fn write_operation<F: FnOnce(&mut Self) -> Result<(), Error>>(
        &mut self,
        mode: CR,
        operation: F,
    ) -> Result<(), Error> {
        self.unlock()?;
        let ret = operation(self);
        let mode = mode as u32;
        self.modify_cr(|cr| cr & !mode);
        self.lock();
        ret
    }

    fn finish_operation(&mut self) -> Result<(), Error> {
        self.wait_ready()?;
        if self.config.await_eop {
            self.poll(|sr| sr & SR::EOP as u32 != 0)?;
        }

        let status = self.status();
        self.clear_status_flags();

        if status.has_errors() {
            error!("Flash operation failed, SR={:08X}", status.bits());
            return Err(Error::Program(status.errors()));
        }
        Ok(())
    }
}

impl<R> FlashOperations for Flash<R>
where
    R: FlashRegisters,
{
    fn erase_page(&mut self, bank: u8, page: u8) -> Result<(), Error> {
        let bank = Bank::try_from(bank)?;
        debug!("Erasing bank {} page {}", bank as u8, page);

        self.write_operation(CR::PER, |s| {
            s.wait_ready()?;
            s.clear_status_flags();
            s.modify_cr(|cr| cr | CR::PER as u32);
            s.modify_cr(|cr| (cr & !CR_PNB_MASK) | ((page as u32) << CR_PNB_SHIFT));
            match bank {
                Bank::One => s.modify_cr(|cr| cr & !(CR::BKER as u32)),
                Bank::Two => s.modify_cr(|cr| cr | CR::BKER as u32),
            }
            s.modify_cr(|cr| cr | CR::STRT as u32);
            s.finish_operation()
        })
    }

    fn program_double_word(&mut self, address: u32, data: u64) -> Result<(), Error> {
        if address % DOUBLE_WORD != 0 {
            error!("Refusing to program unaligned address {:08X}", address);
            return Err(Error::Misaligned(address));
        }
        debug!("Programming {:016X} at {:08X}", data, address);

        self.write_operation(CR::PG, |s| {
            s.wait_ready()?;
            s.clear_status_flags();
            s.modify_cr(|cr| cr | CR::PG as u32);
            s.regs.write_word(address, data as u32);
            s.regs.write_word(address + 4, (data >> 32) as u32);
            s.finish_operation()
        })
    }

    fn read_double_word(&mut self, address: u32) -> u64 {
        self.regs.read_double_word(address)
    }
}
