// This file is part of cia64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::LogLevel;

/// CPU interrupt line shared between multiple sources. The line is low
/// (asserted) while any source bit is set; a source pulling an already low
/// line does not produce a new edge.
pub struct IrqLine {
    kind: &'static str,
    signal: u8,
}

impl IrqLine {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, signal: 0 }
    }

    pub fn is_low(&self) -> bool {
        self.signal != 0
    }

    pub fn reset(&mut self) {
        self.signal = 0;
    }

    pub fn set_low(&mut self, source: usize, value: bool) {
        if log_enabled!(LogLevel::Trace) {
            trace!(
                target: "cia::int",
                "{}.{} {}",
                self.kind,
                source,
                if value { "pulled" } else { "released" }
            );
        }
        self.signal.set_bit(source, value);
    }
}
