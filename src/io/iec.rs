// This file is part of cia64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use log::LogLevel;

// Spec: https://www.c64-wiki.com/index.php/Serial_Port_(IEC)

/// Serial bus arbiter. ATN, CLK and DATA are open collector lines shared by
/// the CIA side, one device endpoint and passive pull-ups: a line is high iff
/// every driver with the line configured as output drives high. Port pins
/// connect to the lines through inverters on both endpoints, so a latched 1
/// pulls the line low.
pub struct IecBus {
    drive_connected: bool,
    // Line levels
    atn_line: bool,
    clock_line: bool,
    data_line: bool,
    // CIA2 port A pins
    cia_atn_pin: bool,
    cia_atn_is_output: bool,
    cia_clock_pin: bool,
    cia_clock_is_output: bool,
    cia_data_pin: bool,
    cia_data_is_output: bool,
    // Device pins
    device_atn_pin: bool,
    device_atn_is_output: bool,
    device_clock_pin: bool,
    device_clock_is_output: bool,
    device_data_pin: bool,
    device_data_is_output: bool,
    // Level changes since the outer scheduler last looked
    bus_activity: u32,
}

impl IecBus {
    pub fn new() -> Self {
        Self {
            drive_connected: false,
            atn_line: true,
            clock_line: true,
            data_line: true,
            cia_atn_pin: true,
            cia_atn_is_output: false,
            cia_clock_pin: true,
            cia_clock_is_output: false,
            cia_data_pin: true,
            cia_data_is_output: false,
            device_atn_pin: true,
            device_atn_is_output: false,
            device_clock_pin: true,
            device_clock_is_output: false,
            device_data_pin: true,
            device_data_is_output: false,
            bus_activity: 0,
        }
    }

    pub fn reset(&mut self) {
        self.atn_line = true;
        self.clock_line = true;
        self.data_line = true;
        self.cia_atn_pin = true;
        self.cia_atn_is_output = false;
        self.cia_clock_pin = true;
        self.cia_clock_is_output = false;
        self.cia_data_pin = true;
        self.cia_data_is_output = false;
        self.device_atn_pin = true;
        self.device_atn_is_output = false;
        self.device_clock_pin = true;
        self.device_clock_is_output = false;
        self.device_data_pin = true;
        self.device_data_is_output = false;
        self.bus_activity = 0;
    }

    pub fn connect_drive(&mut self) {
        self.drive_connected = true;
        self.update_lines();
    }

    pub fn disconnect_drive(&mut self) {
        self.drive_connected = false;
        self.update_lines();
    }

    pub fn is_drive_connected(&self) -> bool {
        self.drive_connected
    }

    pub fn get_atn_line(&self) -> bool {
        self.atn_line
    }

    pub fn get_clock_line(&self) -> bool {
        self.clock_line
    }

    pub fn get_data_line(&self) -> bool {
        self.data_line
    }

    /// Number of line level changes observed so far. The outer scheduler
    /// polls this to decide whether the drive needs to run.
    pub fn get_bus_activity(&self) -> u32 {
        self.bus_activity
    }

    pub fn clear_bus_activity(&mut self) {
        self.bus_activity = 0;
    }

    /// Invoked by CIA 2 whenever its port A latch or direction changes.
    /// PA3 = ATN out, PA4 = CLK out, PA5 = DATA out.
    pub fn update_cia_pins(&mut self, cia_data: u8, cia_direction: u8) {
        self.cia_atn_is_output = cia_direction & 0x08 != 0;
        self.cia_clock_is_output = cia_direction & 0x10 != 0;
        self.cia_data_is_output = cia_direction & 0x20 != 0;
        self.cia_atn_pin = cia_data & 0x08 == 0;
        self.cia_clock_pin = cia_data & 0x10 == 0;
        self.cia_data_pin = cia_data & 0x20 == 0;
        self.update_lines();
    }

    /// Invoked by the drive whenever its port latch or direction changes.
    /// PB1 = DATA out, PB3 = CLK out, PB4 = ATN acknowledge.
    pub fn update_device_pins(&mut self, device_data: u8, device_direction: u8) {
        self.device_atn_is_output = device_direction & 0x10 != 0;
        self.device_clock_is_output = device_direction & 0x08 != 0;
        self.device_data_is_output = device_direction & 0x02 != 0;
        self.device_atn_pin = device_data & 0x10 == 0;
        self.device_clock_pin = device_data & 0x08 == 0;
        self.device_data_pin = device_data & 0x02 == 0;
        self.update_lines();
    }

    fn update_lines(&mut self) {
        let old_atn = self.atn_line;
        let old_clock = self.clock_line;
        let old_data = self.data_line;

        // Only the bus controller drives ATN.
        self.atn_line = !self.cia_atn_is_output || self.cia_atn_pin;
        self.clock_line = !self.cia_clock_is_output || self.cia_clock_pin;
        self.data_line = !self.cia_data_is_output || self.cia_data_pin;
        if self.drive_connected {
            self.clock_line &= !self.device_clock_is_output || self.device_clock_pin;
            self.data_line &= !self.device_data_is_output || self.device_data_pin;
            // Auto acknowledge: with the atn pin driven high, the device
            // hardware answers a low ATN line by pulling DATA low.
            if self.device_atn_is_output && self.device_atn_pin && !self.atn_line {
                self.data_line = false;
            }
        }

        if old_atn != self.atn_line || old_clock != self.clock_line || old_data != self.data_line
        {
            self.bus_activity = self.bus_activity.wrapping_add(1);
            if log_enabled!(LogLevel::Trace) {
                trace!(
                    target: "cia::iec",
                    "atn {} clk {} data {}",
                    self.atn_line as u8,
                    self.clock_line as u8,
                    self.data_line as u8
                );
            }
        }
    }
}
