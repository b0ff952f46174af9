/// Access to the flash controller registers and the flash array.
///
/// The sequencer owns one implementation exclusively; nothing else may touch
/// the controller while it is held.
pub trait FlashRegisters {
    fn read_sr(&mut self) -> u32;
    fn write_sr(&mut self, value: u32);
    fn read_cr(&mut self) -> u32;
    fn write_cr(&mut self, value: u32);
    fn write_key(&mut self, key: u32);

    /// Store one 32-bit word into the flash array.
    fn write_word(&mut self, address: u32, word: u32);

    /// Load the aligned double word at `address`.
    fn read_double_word(&mut self, address: u32) -> u64;

    fn delay(&mut self, us: u32);
}
