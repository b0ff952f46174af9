use core::ptr::{read_volatile, write_volatile};

use stm32l4::stm32l4x5::FLASH;

use crate::register_interface::FlashRegisters;

/// STM32L4 flash controller, owning the FLASH peripheral.
pub struct Stm32l4Registers {
    flash: FLASH,
    cycles_per_us: u32,
}

impl Stm32l4Registers {
    pub fn new(flash: FLASH, cycles_per_us: u32) -> Self {
        Stm32l4Registers {
            flash,
            cycles_per_us,
        }
    }

    /// Give the peripheral back.
    pub fn free(self) -> FLASH {
        self.flash
    }
}

impl FlashRegisters for Stm32l4Registers {
    fn read_sr(&mut self) -> u32 {
        self.flash.sr.read().bits()
    }

    fn write_sr(&mut self, value: u32) {
        self.flash.sr.write(|w| unsafe { w.bits(value) });
    }

    fn read_cr(&mut self) -> u32 {
        self.flash.cr.read().bits()
    }

    fn write_cr(&mut self, value: u32) {
        self.flash.cr.write(|w| unsafe { w.bits(value) });
    }

    fn write_key(&mut self, key: u32) {
        self.flash.keyr.write(|w| unsafe { w.bits(key) });
    }

    fn write_word(&mut self, address: u32, word: u32) {
        unsafe { write_volatile(address as *mut u32, word) }
    }

    fn read_double_word(&mut self, address: u32) -> u64 {
        unsafe { read_volatile(address as *const u64) }
    }

    fn delay(&mut self, us: u32) {
        for _ in 0..us.saturating_mul(self.cycles_per_us) {
            core::hint::spin_loop();
        }
    }
}
