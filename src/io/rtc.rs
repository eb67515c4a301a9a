// This file is part of cia64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::cmp::PartialEq;

use crate::util::bcd_inc;

/// Time of day clock. All four registers hold raw BCD; the chip never
/// validates nibbles, so out-of-range values are stored and carried as-is.
/// Hours keep the AM/PM flag in bit 7.
///
/// Two latch mechanisms, independent of each other:
/// - reading hours freezes a snapshot of all four registers until tenths are
///   read, so a multi-register read cannot straddle a carry;
/// - writing hours stops the counter until tenths are written, so a
///   multi-register write cannot be overtaken by a tick.
pub struct Rtc {
    enabled: bool,
    frozen: bool,
    tenth: u8,
    seconds: u8,
    minutes: u8,
    hours: u8,
    frozen_tenth: u8,
    frozen_seconds: u8,
    frozen_minutes: u8,
    frozen_hours: u8,
}

impl Rtc {
    pub fn new() -> Rtc {
        Rtc {
            enabled: true,
            frozen: false,
            tenth: 0x00,
            seconds: 0x00,
            minutes: 0x00,
            hours: 0x01,
            frozen_tenth: 0x00,
            frozen_seconds: 0x00,
            frozen_minutes: 0x00,
            frozen_hours: 0x01,
        }
    }

    pub fn reset(&mut self) {
        self.enabled = true;
        self.frozen = false;
        self.tenth = 0x00;
        self.seconds = 0x00;
        self.minutes = 0x00;
        self.hours = 0x01;
        self.frozen_tenth = 0x00;
        self.frozen_seconds = 0x00;
        self.frozen_minutes = 0x00;
        self.frozen_hours = 0x01;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Reading tenths releases the read latch.
    pub fn read_tenth(&mut self) -> u8 {
        if self.frozen {
            self.frozen = false;
            self.frozen_tenth
        } else {
            self.tenth
        }
    }

    pub fn read_seconds(&self) -> u8 {
        if self.frozen {
            self.frozen_seconds
        } else {
            self.seconds
        }
    }

    pub fn read_minutes(&self) -> u8 {
        if self.frozen {
            self.frozen_minutes
        } else {
            self.minutes
        }
    }

    /// Reading hours latches a snapshot of all four registers.
    pub fn read_hours(&mut self) -> u8 {
        if !self.frozen {
            self.frozen = true;
            self.frozen_tenth = self.tenth;
            self.frozen_seconds = self.seconds;
            self.frozen_minutes = self.minutes;
            self.frozen_hours = self.hours;
        }
        self.frozen_hours
    }

    pub fn set_tenth(&mut self, value: u8) {
        self.tenth = value & 0x0f;
    }

    pub fn set_seconds(&mut self, value: u8) {
        self.seconds = value & 0x7f;
    }

    pub fn set_minutes(&mut self, value: u8) {
        self.minutes = value & 0x7f;
    }

    pub fn set_hours(&mut self, value: u8) {
        self.hours = value & 0x9f;
    }

    pub fn tick(&mut self) {
        if !self.enabled {
            return;
        }
        if self.tenth != 0x09 {
            self.tenth = (self.tenth + 1) & 0x0f;
            return;
        }
        self.tenth = 0x00;
        if self.seconds != 0x59 {
            self.seconds = bcd_inc(self.seconds) & 0x7f;
            return;
        }
        self.seconds = 0x00;
        if self.minutes != 0x59 {
            self.minutes = bcd_inc(self.minutes) & 0x7f;
            return;
        }
        self.minutes = 0x00;
        let pm = self.hours & 0x80;
        match self.hours & 0x1f {
            // AM/PM flips on the 11 -> 12 transition, not on 12 -> 1.
            0x11 => self.hours = (pm ^ 0x80) | 0x12,
            0x12 => self.hours = pm | 0x01,
            h => self.hours = pm | (bcd_inc(h) & 0x1f),
        }
    }
}

impl PartialEq for Rtc {
    fn eq(&self, other: &Rtc) -> bool {
        self.tenth == other.tenth
            && self.seconds == other.seconds
            && self.minutes == other.minutes
            && self.hours == other.hours
    }
}
