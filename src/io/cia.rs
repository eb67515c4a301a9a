// This file is part of cia64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::LogLevel;

use crate::factory::Chip;
use crate::util::{new_shared, IoPort, IrqLine, Pin, Shared, SharedCell};

use super::cycle_counter::{event, CycleCounter};
use super::iec::IecBus;
use super::rtc::Rtc;
use super::shift_register::ShiftRegister;
use super::timer;
use super::timer::Timer;

// Spec: 6526 COMPLEX INTERFACE ADAPTER (CIA) Datasheet
// Spec: https://www.c64-wiki.com/index.php/CIA
// http://www.unusedino.de/ec64/technical/project64/mapping_c64.html

#[derive(Copy, Clone, PartialEq)]
pub enum Mode {
    Cia1 = 0,
    Cia2 = 1,
}

impl Mode {
    pub fn irq_source(self) -> usize {
        self as usize
    }
}

/// Behavior switches for the timing corner cases the datasheet leaves open.
/// The defaults reproduce the silicon behavior this core is validated
/// against.
#[derive(Clone, Copy)]
pub struct TimingOptions {
    /// Clear the count pipeline on every counter reload, even when the
    /// reload comes from a force load strobe that leaves the timer stopped.
    pub force_load_delay_always: bool,
    /// Gate cascaded timer B counting on the CNT level in source mode 11.
    /// Disabled, mode 11 counts every timer A underflow like mode 10.
    pub cnt_gated_cascade: bool,
}

impl Default for TimingOptions {
    fn default() -> Self {
        Self {
            force_load_delay_always: true,
            cnt_gated_cascade: true,
        }
    }
}

pub mod reg {
    pub const PRA: u8 = 0x00;
    pub const PRB: u8 = 0x01;
    pub const DDRA: u8 = 0x02;
    pub const DDRB: u8 = 0x03;
    pub const TALO: u8 = 0x04;
    pub const TAHI: u8 = 0x05;
    pub const TBLO: u8 = 0x06;
    pub const TBHI: u8 = 0x07;
    pub const TODTS: u8 = 0x08;
    pub const TODSEC: u8 = 0x09;
    pub const TODMIN: u8 = 0x0a;
    pub const TODHR: u8 = 0x0b;
    pub const SDR: u8 = 0x0c;
    pub const ICR: u8 = 0x0d;
    pub const CRA: u8 = 0x0e;
    pub const CRB: u8 = 0x0f;
}

pub struct Cia {
    // Dependencies
    mode: Mode,
    options: TimingOptions,
    joystick_1: Option<SharedCell<u8>>,
    joystick_2: Option<SharedCell<u8>>,
    keyboard_matrix: Option<Shared<[u8; 16]>>,
    iec_bus: Option<Shared<IecBus>>,
    // Functional Units
    pipeline: CycleCounter,
    timer_a: Timer,
    timer_b: Timer,
    serial: ShiftRegister,
    tod_alarm: Rtc,
    tod_clock: Rtc,
    tod_set_alarm: bool,
    tod_alarm_match: bool,
    // Interrupts
    icr: u8,
    imr: u8,
    // Port B timer outputs
    pb67_timer_mode: u8,
    pb67_timer_out: u8,
    pb67_toggle: u8,
    // I/O
    cnt_pin: Shared<Pin>,
    sp_pin: Shared<Pin>,
    flag_pin: Shared<Pin>,
    irq_line: Shared<IrqLine>,
    port_a: Shared<IoPort>,
    port_b: Shared<IoPort>,
}

impl Cia {
    #![cfg_attr(feature = "cargo-clippy", allow(clippy::too_many_arguments))]
    pub fn new(
        mode: Mode,
        joystick_1: Option<SharedCell<u8>>,
        joystick_2: Option<SharedCell<u8>>,
        keyboard_matrix: Option<Shared<[u8; 16]>>,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        flag_pin: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        iec_bus: Option<Shared<IecBus>>,
    ) -> Self {
        Self {
            mode,
            options: TimingOptions::default(),
            joystick_1,
            joystick_2,
            keyboard_matrix,
            iec_bus,
            pipeline: CycleCounter::new(event::DELAY_MASK),
            timer_a: Timer::new(timer::Mode::TimerA),
            timer_b: Timer::new(timer::Mode::TimerB),
            serial: ShiftRegister::new(),
            tod_alarm: Rtc::new(),
            tod_clock: Rtc::new(),
            tod_set_alarm: false,
            tod_alarm_match: true,
            icr: 0,
            imr: 0,
            pb67_timer_mode: 0,
            pb67_timer_out: 0,
            pb67_toggle: 0,
            cnt_pin: new_shared(Pin::new_high()),
            sp_pin: new_shared(Pin::new_high()),
            flag_pin,
            irq_line,
            port_a,
            port_b,
        }
    }

    pub fn set_timing_options(&mut self, options: TimingOptions) {
        self.options = options;
    }

    /// CNT is a real chip pin shared with the user port and the other CIA.
    pub fn get_cnt_pin(&self) -> Shared<Pin> {
        self.cnt_pin.clone()
    }

    pub fn get_sp_pin(&self) -> Shared<Pin> {
        self.sp_pin.clone()
    }

    /// External 10 Hz input driving the time of day counter.
    pub fn increment_tod(&mut self) {
        self.tod_clock.tick();
        self.check_tod_alarm();
    }

    fn check_tod_alarm(&mut self) {
        let matched = self.tod_clock == self.tod_alarm;
        if matched && !self.tod_alarm_match {
            self.pipeline.feed(event::TOD_INT0);
        }
        self.tod_alarm_match = matched;
    }

    // -- Ports

    fn read_cia1_port_a(&self) -> u8 {
        let active_columns = self.port_b.borrow().get_value();
        let keyboard_state = self.scan_keyboard_active_cols(active_columns);
        let joystick_state = self.scan_joystick(&self.joystick_2);
        let result = self.port_a.borrow().get_value_2(keyboard_state);
        result & joystick_state
    }

    fn read_cia1_port_b(&self) -> u8 {
        let active_rows = self.port_a.borrow().get_value();
        let keyboard_state = self.scan_keyboard_active_rows(active_rows);
        let joystick_state = self.scan_joystick(&self.joystick_1);
        let result = self.port_b.borrow().get_value_2(keyboard_state);
        self.override_pb67(result) & joystick_state
    }

    fn read_cia2_port_a(&self) -> u8 {
        let result = self.port_a.borrow().get_value();
        if let Some(ref iec_bus) = self.iec_bus {
            let iec_bus = iec_bus.borrow();
            result & 0x3f
                | if iec_bus.get_clock_line() { 0x40 } else { 0x00 }
                | if iec_bus.get_data_line() { 0x80 } else { 0x00 }
        } else {
            result
        }
    }

    fn read_cia2_port_b(&self) -> u8 {
        let result = self.port_b.borrow().get_value();
        self.override_pb67(result)
    }

    /*
    http://unusedino.de/ec64/technical/misc/cia6526/timers.html
    A control bit allows the timer output to appear on a PORT B output line
    (PB6 for TIMER A and PB7 for TIMER B). This function overrides the DDRB
    control bit and forces the appropriate PB line to an output.
    */
    fn override_pb67(&self, value: u8) -> u8 {
        let mut result = value;
        if self.pb67_timer_mode.get_bit(6) {
            result.set_bit(6, self.pb67_timer_out.get_bit(6));
        }
        if self.pb67_timer_mode.get_bit(7) {
            result.set_bit(7, self.pb67_timer_out.get_bit(7));
        }
        result
    }

    fn scan_joystick(&self, joystick: &Option<SharedCell<u8>>) -> u8 {
        if let Some(ref state) = *joystick {
            !state.get()
        } else {
            0xff
        }
    }

    fn scan_keyboard_active_cols(&self, active_columns: u8) -> u8 {
        if let Some(matrix) = self.keyboard_matrix.as_ref() {
            let mut result = 0xff;
            for col in 0..8 as usize {
                if active_columns.get_bit(col) == false {
                    result &= matrix.borrow()[8 + col];
                }
            }
            result
        } else {
            0xff
        }
    }

    fn scan_keyboard_active_rows(&self, active_rows: u8) -> u8 {
        if let Some(matrix) = self.keyboard_matrix.as_ref() {
            let mut result = 0xff;
            for row in 0..8 as usize {
                if active_rows.get_bit(row) == false {
                    result &= matrix.borrow()[row];
                }
            }
            result
        } else {
            0xff
        }
    }

    fn update_iec_pins(&self) {
        if self.mode == Mode::Cia2 {
            if let Some(ref iec_bus) = self.iec_bus {
                let port_a = self.port_a.borrow();
                iec_bus
                    .borrow_mut()
                    .update_cia_pins(port_a.get_output(), port_a.get_direction());
            }
        }
    }

    // -- Interrupts

    fn assert_interrupt(&mut self) {
        self.icr.set_bit(7, true);
        self.irq_line
            .borrow_mut()
            .set_low(self.mode.irq_source(), true);
    }

    fn release_interrupt(&mut self) {
        self.icr.set_bit(7, false);
        self.irq_line
            .borrow_mut()
            .set_low(self.mode.irq_source(), false);
    }

    // -- Timers

    fn reload_timer_a(&mut self) {
        self.timer_a.reload();
        if self.options.force_load_delay_always || self.timer_a.is_started() {
            // the timer pauses for one cycle after a reload
            self.pipeline.remove(event::COUNT_A2);
        }
    }

    fn reload_timer_b(&mut self) {
        self.timer_b.reload();
        if self.options.force_load_delay_always || self.timer_b.is_started() {
            self.pipeline.remove(event::COUNT_B2);
        }
    }

    fn write_control_a(&mut self, value: u8) {
        if value.get_bit(0) {
            self.pipeline.feed(event::COUNT_A1 | event::COUNT_A0);
            self.pipeline.autofeed(event::COUNT_A0, true);
            if !self.timer_a.is_started() {
                // the toggle output is forced high whenever the timer starts
                self.pb67_toggle |= 0x40;
            }
        } else {
            self.pipeline.remove(event::COUNT_A1 | event::COUNT_A0);
            self.pipeline.autofeed(event::COUNT_A0, false);
        }
        if value.get_bit(5) {
            // CNT sourced counting is injected per edge, not fed
            self.pipeline.remove(event::COUNT_A1 | event::COUNT_A0);
            self.pipeline.autofeed(event::COUNT_A0, false);
        }
        self.pipeline.autofeed(event::ONE_SHOT_A0, value.get_bit(3));
        if value.get_bit(1) {
            self.pb67_timer_mode |= 0x40;
            if !value.get_bit(2) {
                if !self.pipeline.has_cycle(event::PB6_LOW1) {
                    self.pb67_timer_out &= !0x40;
                } else {
                    self.pb67_timer_out |= 0x40;
                }
            } else {
                self.pb67_timer_out = (self.pb67_timer_out & !0x40) | (self.pb67_toggle & 0x40);
            }
        } else {
            self.pb67_timer_mode &= !0x40;
        }
        if value.get_bit(4) {
            self.pipeline.feed(event::LOAD_A0);
        }
        if (value ^ self.timer_a.get_config()) & 0x40 != 0 {
            // direction flip aborts a serial transfer in progress
            self.pipeline.remove(
                event::SER_LOAD0
                    | event::SER_LOAD1
                    | event::SER_CLK0
                    | event::SER_CLK1
                    | event::SER_CLK2
                    | event::SER_CLK3,
            );
            self.pipeline.autofeed(event::SER_LOAD0, false);
            self.pipeline.autofeed(event::SER_CLK0, false);
            self.serial.abort();
        }
        self.timer_a.set_config(value);
    }

    fn write_control_b(&mut self, value: u8) {
        if value.get_bit(0) {
            self.pipeline.feed(event::COUNT_B1 | event::COUNT_B0);
            self.pipeline.autofeed(event::COUNT_B0, true);
            if !self.timer_b.is_started() {
                self.pb67_toggle |= 0x80;
            }
        } else {
            self.pipeline.remove(event::COUNT_B1 | event::COUNT_B0);
            self.pipeline.autofeed(event::COUNT_B0, false);
        }
        if value & 0x60 != 0 {
            // only system clock sourced counting runs off the feed
            self.pipeline.remove(event::COUNT_B1 | event::COUNT_B0);
            self.pipeline.autofeed(event::COUNT_B0, false);
        }
        self.pipeline.autofeed(event::ONE_SHOT_B0, value.get_bit(3));
        if value.get_bit(1) {
            self.pb67_timer_mode |= 0x80;
            if !value.get_bit(2) {
                if !self.pipeline.has_cycle(event::PB7_LOW1) {
                    self.pb67_timer_out &= !0x80;
                } else {
                    self.pb67_timer_out |= 0x80;
                }
            } else {
                self.pb67_timer_out = (self.pb67_timer_out & !0x80) | (self.pb67_toggle & 0x80);
            }
        } else {
            self.pb67_timer_mode &= !0x80;
        }
        if value.get_bit(4) {
            self.pipeline.feed(event::LOAD_B0);
        }
        self.timer_b.set_config(value);
    }

    // -- Serial port

    fn clock_serial(&mut self, timer_a_output: bool) {
        // In output mode timer A underflows generate the CNT clock, two
        // underflows per shifted bit.
        if timer_a_output && self.timer_a.is_serial_output() {
            if self.serial.get_counter() > 0 {
                self.pipeline.toggle_feed(event::SER_CLK0);
            } else if self.pipeline.has_cycle(event::SER_LOAD1) {
                self.pipeline.remove(event::SER_LOAD0 | event::SER_LOAD1);
                self.pipeline.autofeed(event::SER_LOAD0, false);
                self.serial.begin_output();
                // the transfer opens with the low clock phase so that every
                // data bit gets a full rising edge on the pin
                self.serial.set_cnt_out(false);
                self.pipeline.toggle_feed(event::SER_CLK0);
            }
        }
        if self.serial.get_counter() > 0 {
            match self.pipeline.get_cycles() & (event::SER_CLK2 | event::SER_CLK1) {
                event::SER_CLK1 => {
                    // rising CNT edge shifts the next bit onto SP
                    self.serial.set_cnt_out(true);
                    self.serial.shift_out();
                    if self.serial.get_counter() == 1 {
                        self.pipeline.feed(event::SER_INT0);
                    }
                }
                event::SER_CLK2 => {
                    self.serial.set_cnt_out(false);
                    self.serial.step_output();
                }
                _ => {}
            }
        }
        // In input mode an external CNT edge samples SP two cycles later.
        if self.pipeline.has_cycle(event::CNT2) && !self.timer_a.is_serial_output() {
            let bit = self.sp_pin.borrow().is_high();
            if self.serial.shift_in(bit) {
                self.pipeline.feed(event::SER_INT0);
            }
        }
        // In output mode the chip owns both pins
        if self.timer_a.is_serial_output() {
            self.cnt_pin
                .borrow_mut()
                .set_active(self.serial.is_cnt_out());
            self.sp_pin.borrow_mut().set_active(self.serial.is_sp_out());
        }
    }
}

impl Chip for Cia {
    fn clock(&mut self) {
        // Sample chip pins, consuming pending edges
        let (cnt_rising, cnt_high) = {
            let mut pin = self.cnt_pin.borrow_mut();
            let edge = pin.is_rising();
            let level = pin.is_high();
            pin.settle();
            (edge, level)
        };
        let flag_falling = {
            let mut pin = self.flag_pin.borrow_mut();
            let edge = pin.is_falling();
            pin.settle();
            edge
        };
        if cnt_rising {
            if self.timer_a.is_started() && self.timer_a.input() == timer::Input::External {
                self.pipeline.feed(event::COUNT_A1);
            }
            if self.timer_b.is_started() && self.timer_b.input() == timer::Input::External {
                self.pipeline.feed(event::COUNT_B1);
            }
            self.pipeline.feed(event::CNT0);
        }

        // Timer A
        if self.pipeline.has_cycle(event::COUNT_A3) {
            self.timer_a.count_down();
        }
        // a reload arriving in the same cycle pre-empts the underflow
        let timer_a_output = self.timer_a.is_zero()
            && self.pipeline.has_cycle(event::COUNT_A2)
            && !self.pipeline.has_cycle(event::LOAD_A1);
        if timer_a_output {
            if self.pipeline.has_cycle_or_feed(event::ONE_SHOT_A0) {
                self.timer_a.stop();
                self.pipeline
                    .remove(event::COUNT_A2 | event::COUNT_A1 | event::COUNT_A0);
                self.pipeline.autofeed(event::COUNT_A0, false);
            }
            match self.timer_b.input() {
                timer::Input::TimerA => {
                    if self.timer_b.is_started() {
                        self.pipeline.feed(event::COUNT_B1);
                    }
                }
                timer::Input::TimerAWithCnt => {
                    if self.timer_b.is_started()
                        && (cnt_high || !self.options.cnt_gated_cascade)
                    {
                        self.pipeline.feed(event::COUNT_B1);
                    }
                }
                _ => {}
            }
            self.pipeline.feed(event::LOAD_A1);
        }
        if self.pipeline.has_cycle(event::LOAD_A1) {
            self.reload_timer_a();
        }

        // Timer B
        if self.pipeline.has_cycle(event::COUNT_B3) {
            self.timer_b.count_down();
        }
        let timer_b_output = self.timer_b.is_zero()
            && self.pipeline.has_cycle(event::COUNT_B2)
            && !self.pipeline.has_cycle(event::LOAD_B1);
        if timer_b_output {
            if self.pipeline.has_cycle_or_feed(event::ONE_SHOT_B0) {
                self.timer_b.stop();
                self.pipeline
                    .remove(event::COUNT_B2 | event::COUNT_B1 | event::COUNT_B0);
                self.pipeline.autofeed(event::COUNT_B0, false);
            }
            self.pipeline.feed(event::LOAD_B1);
        }
        if self.pipeline.has_cycle(event::LOAD_B1) {
            self.reload_timer_b();
        }

        // Serial port
        self.clock_serial(timer_a_output);

        // Timer A output to PB6
        if timer_a_output {
            self.pb67_toggle ^= 0x40;
            if self.timer_a.is_pb_on() {
                if !self.timer_a.is_pb_toggle() {
                    // high for exactly one cycle
                    self.pb67_timer_out |= 0x40;
                    self.pipeline.feed(event::PB6_LOW0);
                    self.pipeline.remove(event::PB6_LOW1);
                } else {
                    self.pb67_timer_out ^= 0x40;
                }
            }
        }
        // Timer B output to PB7
        if timer_b_output {
            self.pb67_toggle ^= 0x80;
            if self.timer_b.is_pb_on() {
                if !self.timer_b.is_pb_toggle() {
                    self.pb67_timer_out |= 0x80;
                    self.pipeline.feed(event::PB7_LOW0);
                    self.pipeline.remove(event::PB7_LOW1);
                } else {
                    self.pb67_timer_out ^= 0x80;
                }
            }
        }
        if self.pipeline.has_cycle(event::PB6_LOW1) {
            self.pb67_timer_out &= !0x40;
        }
        if self.pipeline.has_cycle(event::PB7_LOW1) {
            self.pb67_timer_out &= !0x80;
        }

        // Interrupt logic
        /*
        Any interrupt will set the corresponding bit in the DATA
        register. Any interrupt which is enabled by the MASK
        register will set the IR bit (MSB) of the DATA register
        and bring the IRQ pin low.
        */
        if self.pipeline.has_cycle(event::INTERRUPT1) {
            self.assert_interrupt();
        }
        if timer_a_output {
            self.icr |= 0x01;
            if self.imr & 0x01 != 0 {
                self.pipeline.feed(event::INTERRUPT0);
            }
        }
        if timer_b_output && !self.pipeline.has_cycle(event::READ_ICR0) {
            // an underflow in the shadow of an ICR read is lost
            self.icr |= 0x02;
            if self.imr & 0x02 != 0 {
                self.pipeline.feed(event::INTERRUPT0);
            }
        }
        if self.pipeline.has_cycle(event::TOD_INT0) {
            self.icr |= 0x04;
            if self.imr & 0x04 != 0 {
                self.pipeline.feed(event::INTERRUPT0);
            }
        }
        if self.pipeline.has_cycle(event::SER_INT2) {
            self.icr |= 0x08;
            if self.imr & 0x08 != 0 {
                self.pipeline.feed(event::INTERRUPT0);
            }
        }
        if flag_falling {
            self.icr |= 0x10;
            if self.imr & 0x10 != 0 {
                self.pipeline.feed(event::INTERRUPT0);
            }
        }
        if self.pipeline.has_cycle(event::SET_ICR1) {
            self.assert_interrupt();
        }

        // Continuous feeds follow the control registers
        self.pipeline.autofeed(
            event::COUNT_A0,
            self.timer_a.is_started() && self.timer_a.input() == timer::Input::SystemClock,
        );
        self.pipeline.autofeed(
            event::COUNT_B0,
            self.timer_b.is_started() && self.timer_b.input() == timer::Input::SystemClock,
        );
        self.pipeline
            .autofeed(event::ONE_SHOT_A0, self.timer_a.is_one_shot());
        self.pipeline
            .autofeed(event::ONE_SHOT_B0, self.timer_b.is_one_shot());

        self.pipeline.clock();
    }

    fn clock_delta(&mut self, delta: u32) {
        for _i in 0..delta {
            self.clock();
        }
    }

    fn reset(&mut self) {
        /*
        A low on the RES pin resets all internal registers.The
        port pins are set as inputs and port registers to zero
        (although a read of the ports will return all highs
        because of passive pullups).The timer control registers
        are set to zero and the timer latches to all ones. All other
        registers are reset to zero.
        */
        self.pipeline.reset();
        self.timer_a.reset();
        self.timer_b.reset();
        self.serial.reset();
        self.tod_alarm.reset();
        self.tod_clock.reset();
        self.tod_set_alarm = false;
        self.tod_alarm_match = true;
        self.icr = 0;
        self.imr = 0;
        self.pb67_timer_mode = 0;
        self.pb67_timer_out = 0;
        self.pb67_toggle = 0;
        {
            let mut cnt_pin = self.cnt_pin.borrow_mut();
            cnt_pin.set_active(true);
            cnt_pin.settle();
        }
        {
            let mut sp_pin = self.sp_pin.borrow_mut();
            sp_pin.set_active(true);
            sp_pin.settle();
        }
        {
            let mut flag_pin = self.flag_pin.borrow_mut();
            flag_pin.set_active(false);
            flag_pin.settle();
        }
        self.port_a.borrow_mut().reset();
        self.port_b.borrow_mut().reset();
        self.update_iec_pins();
        self.irq_line
            .borrow_mut()
            .set_low(self.mode.irq_source(), false);
    }

    // I/O

    fn read(&mut self, reg: u8) -> u8 {
        // registers mirror through the whole 256 byte window
        let reg = reg & 0x0f;
        let value = match reg {
            reg::PRA => match self.mode {
                Mode::Cia1 => self.read_cia1_port_a(),
                Mode::Cia2 => self.read_cia2_port_a(),
            },
            reg::PRB => match self.mode {
                Mode::Cia1 => self.read_cia1_port_b(),
                Mode::Cia2 => self.read_cia2_port_b(),
            },
            reg::DDRA => self.port_a.borrow().get_direction(),
            reg::DDRB => self.port_b.borrow().get_direction(),
            reg::TALO => self.timer_a.get_counter_lo(),
            reg::TAHI => self.timer_a.get_counter_hi(),
            reg::TBLO => self.timer_b.get_counter_lo(),
            reg::TBHI => self.timer_b.get_counter_hi(),
            reg::TODTS => self.tod_clock.read_tenth(),
            reg::TODSEC => self.tod_clock.read_seconds(),
            reg::TODMIN => self.tod_clock.read_minutes(),
            reg::TODHR => self.tod_clock.read_hours(),
            reg::SDR => self.serial.get_value(),
            reg::ICR => {
                /*
                In a multi-chip system, the IR bit can be polled to detect which chip has generated
                an interrupt request. The interrupt DATA register
                is cleared and the IRQ line returns high following a
                read of the DATA register.
                */
                let data = self.icr;
                self.icr = 0;
                self.release_interrupt();
                self.pipeline.remove(
                    event::INTERRUPT0 | event::INTERRUPT1 | event::SET_ICR0 | event::SET_ICR1,
                );
                self.pipeline.feed(event::READ_ICR0);
                data
            }
            reg::CRA => self.timer_a.get_config(),
            reg::CRB => {
                let mut config = self.timer_b.get_config();
                config.set_bit(7, self.tod_set_alarm);
                config
            }
            _ => panic!("invalid reg {}", reg),
        };
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "cia::reg", "Read 0x{:02x} = 0x{:02x}", reg, value);
        }
        value
    }

    fn write(&mut self, reg: u8, value: u8) {
        let reg = reg & 0x0f;
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "cia::reg", "Write 0x{:02x} = 0x{:02x}", reg, value);
        }
        match reg {
            reg::PRA => {
                self.port_a.borrow_mut().set_value(value);
                self.update_iec_pins();
            }
            reg::PRB => {
                self.port_b.borrow_mut().set_value(value);
            }
            reg::DDRA => {
                self.port_a.borrow_mut().set_direction(value);
                self.update_iec_pins();
            }
            reg::DDRB => {
                self.port_b.borrow_mut().set_direction(value);
            }
            reg::TALO => {
                self.timer_a.set_latch_lo(value);
            }
            reg::TAHI => {
                self.timer_a.set_latch_hi(value);
                if !self.timer_a.is_started() {
                    self.pipeline.feed(event::LOAD_A0);
                }
            }
            reg::TBLO => {
                self.timer_b.set_latch_lo(value);
            }
            reg::TBHI => {
                self.timer_b.set_latch_hi(value);
                if !self.timer_b.is_started() {
                    self.pipeline.feed(event::LOAD_B0);
                }
            }
            reg::TODTS => {
                if !self.tod_set_alarm {
                    self.tod_clock.set_tenth(value);
                    self.tod_clock.set_enabled(true);
                } else {
                    self.tod_alarm.set_tenth(value);
                }
                self.check_tod_alarm();
            }
            reg::TODSEC => {
                if !self.tod_set_alarm {
                    self.tod_clock.set_seconds(value);
                } else {
                    self.tod_alarm.set_seconds(value);
                }
                self.check_tod_alarm();
            }
            reg::TODMIN => {
                if !self.tod_set_alarm {
                    self.tod_clock.set_minutes(value);
                } else {
                    self.tod_alarm.set_minutes(value);
                }
                self.check_tod_alarm();
            }
            reg::TODHR => {
                if !self.tod_set_alarm {
                    self.tod_clock.set_enabled(false);
                    self.tod_clock.set_hours(value);
                } else {
                    self.tod_alarm.set_hours(value);
                }
                self.check_tod_alarm();
            }
            reg::SDR => {
                self.serial.load(value);
                if self.timer_a.is_serial_output() {
                    self.pipeline.feed(event::SER_LOAD0);
                    self.pipeline.autofeed(event::SER_LOAD0, true);
                }
            }
            reg::ICR => {
                /*
                The MASK register provides convenient control of
                individual mask bits. When writing to the MASK register,
                if bit 7 (SET/CLEAR) of the data written is a ZERO,
                any mask bit written with a one will be cleared, while
                those mask bits written with a zero will be unaffected. If
                bit 7 of the data written is a ONE, any mask bit written
                with a one will be set, while those mask bits written with
                a zero will be unaffected. In order for an interrupt flag to
                set IR and generate an Interrupt Request, the corresponding
                MASK bit must be set.
                */
                if value.get_bit(7) {
                    self.imr |= value & 0x1f;
                } else {
                    self.imr &= !(value & 0x1f);
                }
                if self.icr & self.imr & 0x1f != 0 {
                    if !self.icr.get_bit(7) {
                        self.pipeline.feed(event::SET_ICR0);
                    }
                } else {
                    self.release_interrupt();
                    self.pipeline.remove(event::SET_ICR0 | event::SET_ICR1);
                }
            }
            reg::CRA => {
                self.write_control_a(value);
            }
            reg::CRB => {
                self.write_control_b(value);
                self.tod_set_alarm = value.get_bit(7);
            }
            _ => panic!("invalid reg {}", reg),
        }
    }
}
