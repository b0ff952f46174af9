//! Fixed-layout records persisted in dedicated flash pages.
//!
//! Each record owns one page. Values are stored as little-endian groups of
//! four `u16` per double word:
//!
//! ```text
//! word = v0 | v1 << 16 | v2 << 32 | v3 << 48
//! ```
//!
//! This is the on-flash format and must not change, or previously stored
//! records read back scrambled. A partial final word is zero-filled.

use log::{debug, warn};

use crate::define::DOUBLE_WORD;
use crate::flash::{Bank, page_address};
use crate::{Error, FlashOperations};

pub const CLUB_COUNT: usize = 12;
pub const SETTINGS_COUNT: usize = 2;

pub const POSITION_MIN: u16 = 1;
pub const POSITION_MAX: u16 = 12;
pub const DEFAULT_POSITION: u16 = 1;

const VALUES_PER_WORD: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecordLayout {
    /// Address of the first double word, 8-byte aligned.
    pub base: u32,
    pub bank: u8,
    pub page: u8,
}

impl RecordLayout {
    pub const CLUBS: RecordLayout = RecordLayout {
        base: 0x080F_F800,
        bank: 2,
        page: 255,
    };
    pub const SETTINGS: RecordLayout = RecordLayout {
        base: 0x0808_0000,
        bank: 2,
        page: 0,
    };
    pub const POSITION: RecordLayout = RecordLayout {
        base: 0x0808_0800,
        bank: 2,
        page: 1,
    };

    /// The record must start at the first double word of its page.
    pub fn validate(&self) -> Result<(), Error> {
        let bank = Bank::try_from(self.bank)?;
        if self.base % DOUBLE_WORD != 0 {
            return Err(Error::Misaligned(self.base));
        }
        if self.base != page_address(bank, self.page) {
            return Err(Error::InvalidLayout(self.base));
        }
        Ok(())
    }
}

/// Where each record lives. Every record needs a page of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoreLayout {
    pub clubs: RecordLayout,
    pub settings: RecordLayout,
    pub position: RecordLayout,
}

impl StoreLayout {
    /// Check every record and that no two of them share a page.
    pub fn validate(&self) -> Result<(), Error> {
        let records = [self.clubs, self.settings, self.position];
        for (i, record) in records.iter().enumerate() {
            record.validate()?;
            if records[..i]
                .iter()
                .any(|other| (other.bank, other.page) == (record.bank, record.page))
            {
                return Err(Error::InvalidLayout(record.base));
            }
        }
        Ok(())
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        StoreLayout {
            clubs: RecordLayout::CLUBS,
            settings: RecordLayout::SETTINGS,
            position: RecordLayout::POSITION,
        }
    }
}

/// Pack up to four values into one double word, missing slots as zero.
pub fn pack(values: &[u16]) -> u64 {
    values
        .iter()
        .take(VALUES_PER_WORD)
        .enumerate()
        .fold(0, |word, (i, &value)| word | (value as u64) << (16 * i))
}

/// Fill up to four slots of `out` from `word`, lowest bits first.
pub fn unpack(word: u64, out: &mut [u16]) {
    for (i, slot) in out.iter_mut().take(VALUES_PER_WORD).enumerate() {
        *slot = (word >> (16 * i)) as u16;
    }
}

/// Positions outside `POSITION_MIN..=POSITION_MAX`, erased flash included,
/// read back as `DEFAULT_POSITION`.
pub fn sanitize_position(raw: u16) -> u16 {
    if (POSITION_MIN..=POSITION_MAX).contains(&raw) {
        raw
    } else {
        DEFAULT_POSITION
    }
}

fn read_record<F: FlashOperations>(flash: &mut F, layout: &RecordLayout, out: &mut [u16]) {
    let mut address = layout.base;
    for chunk in out.chunks_mut(VALUES_PER_WORD) {
        unpack(flash.read_double_word(address), chunk);
        address += DOUBLE_WORD;
    }
}

fn write_record<F: FlashOperations>(
    flash: &mut F,
    layout: &RecordLayout,
    values: &[u16],
) -> Result<(), Error> {
    flash.erase_page(layout.bank, layout.page)?;

    let mut address = layout.base;
    for chunk in values.chunks(VALUES_PER_WORD) {
        flash.program_double_word(address, pack(chunk))?;
        address += DOUBLE_WORD;
    }
    Ok(())
}

/// Clubs, settings and position records on top of a flash sequencer.
pub struct RecordStore<F>
where
    F: FlashOperations,
{
    flash: F,
    layout: StoreLayout,
}

impl<F> RecordStore<F>
where
    F: FlashOperations,
{
    pub fn new(flash: F) -> Self {
        RecordStore {
            flash,
            layout: StoreLayout::default(),
        }
    }

    /// Use a custom layout, rejected unless every record owns its page.
    pub fn with_layout(flash: F, layout: StoreLayout) -> Result<Self, Error> {
        layout.validate()?;
        Ok(RecordStore { flash, layout })
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn release(self) -> F {
        self.flash
    }

    pub fn read_clubs(&mut self, clubs: &mut [u16; CLUB_COUNT]) {
        read_record(&mut self.flash, &self.layout.clubs, clubs);
    }

    pub fn write_clubs(&mut self, clubs: &[u16; CLUB_COUNT]) -> Result<(), Error> {
        debug!("Writing club table");
        write_record(&mut self.flash, &self.layout.clubs, clubs)
    }

    pub fn read_settings(&mut self, settings: &mut [u16; SETTINGS_COUNT]) {
        read_record(&mut self.flash, &self.layout.settings, settings);
    }

    pub fn write_settings(&mut self, settings: &[u16; SETTINGS_COUNT]) -> Result<(), Error> {
        debug!("Writing settings {} {}", settings[0], settings[1]);
        write_record(&mut self.flash, &self.layout.settings, settings)
    }

    /// Stored position, self-healed to `DEFAULT_POSITION` when out of range.
    pub fn read_position(&mut self) -> u16 {
        let mut raw = [0u16; 1];
        read_record(&mut self.flash, &self.layout.position, &mut raw);

        let position = sanitize_position(raw[0]);
        if position != raw[0] {
            warn!(
                "Stored position {} out of range, using {}",
                raw[0], DEFAULT_POSITION
            );
        }
        position
    }

    /// Stores `position` as given; out-of-range values heal on read.
    pub fn write_position(&mut self, position: u16) -> Result<(), Error> {
        debug!("Writing position {}", position);
        write_record(&mut self.flash, &self.layout.position, &[position])
    }
}
