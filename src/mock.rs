//! Simulated STM32L4 flash controller for unit tests.

extern crate std;

use std::vec;
use std::vec::Vec;

use crate::define::{BANK_SIZE, CR, CR_PNB_MASK, CR_PNB_SHIFT, FLASH_BASE, KEY, PAGE_SIZE, SR};
use crate::register_interface::FlashRegisters;

const ERASED: u64 = u64::MAX;

pub struct MockFlash {
    pub sr: u32,
    pub cr: u32,
    /// BSY reads left for the running operation.
    pub busy_cycles: u32,
    pub stuck_busy: bool,
    pub reject_keys: bool,
    pub suppress_eop: bool,
    /// (BKER, page) of every erase started.
    pub erases: Vec<(bool, u8)>,
    /// (address, data) of every double word committed.
    pub programs: Vec<(u32, u64)>,
    pub unlocks: usize,
    pub delayed_us: u32,
    busy_left: u32,
    key_stage: u8,
    pending: Option<(u32, u32)>,
    protected: Vec<(u8, u8)>,
    memory: Vec<u64>,
}

impl MockFlash {
    pub fn new() -> Self {
        MockFlash {
            sr: 0,
            cr: CR::LOCK as u32,
            busy_cycles: 2,
            stuck_busy: false,
            reject_keys: false,
            suppress_eop: false,
            erases: Vec::new(),
            programs: Vec::new(),
            unlocks: 0,
            delayed_us: 0,
            busy_left: 0,
            key_stage: 0,
            pending: None,
            protected: Vec::new(),
            memory: vec![ERASED; (2 * BANK_SIZE / 8) as usize],
        }
    }

    pub fn protect(&mut self, bank: u8, page: u8) {
        self.protected.push((bank, page));
    }

    fn locked(&self) -> bool {
        self.cr & CR::LOCK as u32 != 0
    }

    fn index(address: u32) -> usize {
        ((address - FLASH_BASE) / 8) as usize
    }

    fn location(address: u32) -> (u8, u8) {
        let offset = address - FLASH_BASE;
        ((offset / BANK_SIZE + 1) as u8, ((offset % BANK_SIZE) / PAGE_SIZE) as u8)
    }

    fn complete(&mut self, failed: bool) {
        self.busy_left = self.busy_cycles;
        if !failed && !self.suppress_eop {
            self.sr |= SR::EOP as u32;
        }
    }

    fn start_erase(&mut self) {
        let bker = self.cr & CR::BKER as u32 != 0;
        let page = ((self.cr & CR_PNB_MASK) >> CR_PNB_SHIFT) as u8;
        let bank = if bker { 2 } else { 1 };
        self.erases.push((bker, page));

        if self.protected.contains(&(bank, page)) {
            self.sr |= SR::WRPERR as u32;
            self.complete(true);
            return;
        }

        let first = Self::index(FLASH_BASE + (bank as u32 - 1) * BANK_SIZE + page as u32 * PAGE_SIZE);
        let words = (PAGE_SIZE / 8) as usize;
        self.memory[first..first + words].fill(ERASED);
        self.complete(false);
    }

    fn commit(&mut self, address: u32, data: u64) {
        let failed = if self.protected.contains(&Self::location(address)) {
            self.sr |= SR::WRPERR as u32;
            true
        } else if self.memory[Self::index(address)] != ERASED {
            self.sr |= SR::PROGERR as u32;
            true
        } else {
            self.memory[Self::index(address)] = data;
            self.programs.push((address, data));
            false
        };
        self.complete(failed);
    }
}

impl FlashRegisters for MockFlash {
    fn read_sr(&mut self) -> u32 {
        if self.stuck_busy {
            return self.sr | SR::BSY as u32;
        }
        if self.busy_left > 0 {
            self.busy_left -= 1;
            return self.sr | SR::BSY as u32;
        }
        self.sr
    }

    fn write_sr(&mut self, value: u32) {
        self.sr &= !(value & !(SR::BSY as u32));
    }

    fn read_cr(&mut self) -> u32 {
        self.cr
    }

    fn write_cr(&mut self, value: u32) {
        if self.locked() {
            self.cr |= value & (CR::LOCK as u32 | CR::OPTLOCK as u32);
            return;
        }

        self.cr = value & !(CR::STRT as u32);
        if value & CR::LOCK as u32 != 0 {
            self.key_stage = 0;
            self.pending = None;
        }
        if value & CR::STRT as u32 != 0 {
            if value & CR::PER as u32 != 0 {
                self.start_erase();
            } else {
                self.sr |= SR::PGSERR as u32;
            }
        }
    }

    fn write_key(&mut self, key: u32) {
        if self.reject_keys || !self.locked() {
            return;
        }
        if self.key_stage == 0 && key == KEY::KEY1 as u32 {
            self.key_stage = 1;
        } else if self.key_stage == 1 && key == KEY::KEY2 as u32 {
            self.key_stage = 0;
            self.cr &= !(CR::LOCK as u32);
            self.unlocks += 1;
        } else {
            self.key_stage = 0;
        }
    }

    fn write_word(&mut self, address: u32, word: u32) {
        if self.locked() || self.cr & CR::PG as u32 == 0 {
            self.sr |= SR::PGSERR as u32;
            return;
        }
        match self.pending.take() {
            None if address % 8 == 0 => self.pending = Some((address, word)),
            None => self.sr |= SR::PGAERR as u32,
            Some((low_address, low)) if address == low_address + 4 => {
                self.commit(low_address, low as u64 | (word as u64) << 32)
            }
            Some(_) => self.sr |= SR::PGAERR as u32,
        }
    }

    fn read_double_word(&mut self, address: u32) -> u64 {
        self.memory[Self::index(address)]
    }

    fn delay(&mut self, us: u32) {
        self.delayed_us += us;
    }
}
