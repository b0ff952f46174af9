#![allow(non_camel_case_types)]

#[repr(u32)]
pub(crate) enum KEY {
    KEY1 = 0x4567_0123,
    KEY2 = 0xCDEF_89AB,
}

#[repr(u32)]
pub(crate) enum SR {
    EOP = 1 << 0,
    OPERR = 1 << 1,
    PROGERR = 1 << 3,
    WRPERR = 1 << 4,
    PGAERR = 1 << 5,
    SIZERR = 1 << 6,
    PGSERR = 1 << 7,
    MISERR = 1 << 8,
    FASTERR = 1 << 9,
    BSY = 1 << 16,
}

/// Every sticky flag, in the order they are acknowledged.
pub(crate) const SR_ACK: [u32; 9] = [
    SR::PGSERR as u32,
    SR::SIZERR as u32,
    SR::PGAERR as u32,
    SR::WRPERR as u32,
    SR::PROGERR as u32,
    SR::OPERR as u32,
    SR::MISERR as u32,
    SR::FASTERR as u32,
    SR::EOP as u32,
];

pub(crate) const SR_ERRORS: u32 = SR::OPERR as u32
    | SR::PROGERR as u32
    | SR::WRPERR as u32
    | SR::PGAERR as u32
    | SR::SIZERR as u32
    | SR::PGSERR as u32
    | SR::MISERR as u32
    | SR::FASTERR as u32;

#[repr(u32)]
pub(crate) enum CR {
    PG = 1 << 0,
    PER = 1 << 1,
    BKER = 1 << 11,
    STRT = 1 << 16,
    OPTLOCK = 1 << 30,
    LOCK = 1 << 31,
}

pub(crate) const CR_PNB_SHIFT: u32 = 3;
pub(crate) const CR_PNB_MASK: u32 = 0xFF << CR_PNB_SHIFT;

pub const FLASH_BASE: u32 = 0x0800_0000;
pub const PAGE_SIZE: u32 = 2048;
pub const PAGES_PER_BANK: u32 = 256;
pub const BANK_SIZE: u32 = PAGE_SIZE * PAGES_PER_BANK;
pub const DOUBLE_WORD: u32 = 8;
