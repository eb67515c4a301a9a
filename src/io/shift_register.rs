// This file is part of cia64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

/// Serial shift register. The CNT clock itself is generated by the controller
/// pipeline; this unit tracks register contents, the bit counters and the
/// levels the chip drives on the CNT and SP pins in output mode.
pub struct ShiftRegister {
    sdr: u8,
    counter: u8,
    input_bits: u8,
    cnt_out: bool,
    sp_out: bool,
}

impl ShiftRegister {
    pub fn new() -> Self {
        Self {
            sdr: 0,
            counter: 0,
            input_bits: 0,
            cnt_out: true,
            sp_out: true,
        }
    }

    pub fn reset(&mut self) {
        self.sdr = 0;
        self.counter = 0;
        self.input_bits = 0;
        self.cnt_out = true;
        self.sp_out = true;
    }

    pub fn get_value(&self) -> u8 {
        self.sdr
    }

    pub fn load(&mut self, value: u8) {
        self.sdr = value;
    }

    pub fn get_counter(&self) -> u8 {
        self.counter
    }

    pub fn is_cnt_out(&self) -> bool {
        self.cnt_out
    }

    pub fn is_sp_out(&self) -> bool {
        self.sp_out
    }

    pub fn set_cnt_out(&mut self, level: bool) {
        self.cnt_out = level;
    }

    /// Starts an output transfer of the loaded value, MSB first.
    pub fn begin_output(&mut self) {
        self.counter = 8;
    }

    /// Shifts the next bit onto the SP pin. Called on the rising CNT edge.
    pub fn shift_out(&mut self) {
        self.sp_out = self.sdr.get_bit(7);
        self.sdr <<= 1;
    }

    /// Consumes one output bit. Called on the falling CNT edge.
    pub fn step_output(&mut self) {
        self.counter -= 1;
    }

    /// Shifts an input bit in from the SP pin. Returns true when a full byte
    /// has been gathered.
    pub fn shift_in(&mut self, bit: bool) -> bool {
        self.sdr = (self.sdr << 1) | u8::from(bit);
        self.input_bits += 1;
        if self.input_bits == 8 {
            self.input_bits = 0;
            true
        } else {
            false
        }
    }

    /// Discards any transfer in progress. Flipping the direction bit on the
    /// real chip aborts the transfer without raising an interrupt.
    pub fn abort(&mut self) {
        self.counter = 0;
        self.input_bits = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_out_msb_first() {
        let mut ser = ShiftRegister::new();
        ser.load(0x80);
        ser.begin_output();
        ser.shift_out();
        assert!(ser.is_sp_out());
        ser.shift_out();
        assert!(!ser.is_sp_out());
    }

    #[test]
    fn shift_in_reports_full_byte() {
        let mut ser = ShiftRegister::new();
        for _ in 0..7 {
            assert!(!ser.shift_in(true));
        }
        assert!(ser.shift_in(false));
        assert_eq!(0xfe, ser.get_value());
    }

    #[test]
    fn abort_clears_counters() {
        let mut ser = ShiftRegister::new();
        ser.begin_output();
        ser.shift_in(true);
        ser.abort();
        assert_eq!(0, ser.get_counter());
        assert!(ser.shift_in(true) == false);
    }
}
