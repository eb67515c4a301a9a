// This file is part of cia64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

pub type Observer = Box<dyn Fn(u8)>;

// direction - (where 1 is an output, and 0 is an input).

pub struct IoPort {
    direction: u8,
    input: u8,
    output: u8,
    observer: Option<Observer>,
}

impl IoPort {
    pub fn new(direction: u8, input: u8) -> Self {
        Self {
            direction,
            input,
            output: 0,
            observer: None,
        }
    }

    pub fn get_direction(&self) -> u8 {
        self.direction
    }

    /// Raw output latch, unmasked by direction. The IEC arbiter needs the
    /// latch and the direction separately since an input pin releases the
    /// bus line regardless of the latched value.
    pub fn get_output(&self) -> u8 {
        self.output
    }

    pub fn get_value(&self) -> u8 {
        (self.output & self.direction) | (self.input & !self.direction)
    }

    pub fn get_value_2(&self, input: u8) -> u8 {
        (self.output & self.direction) | (input & !self.direction)
    }

    pub fn set_direction(&mut self, direction: u8) {
        self.direction = direction;
        self.notify_observer();
    }

    pub fn set_observer(&mut self, observer: Observer) {
        self.observer = Some(observer);
    }

    pub fn set_value(&mut self, value: u8) {
        self.output = value;
        self.notify_observer();
    }

    pub fn reset(&mut self) {
        self.direction = 0x00;
        self.input = 0xff;
        self.output = 0x00;
        self.notify_observer();
    }

    fn notify_observer(&self) {
        if let Some(ref observer) = self.observer {
            observer(self.get_value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_merges_output_and_input() {
        let mut port = IoPort::new(0x0f, 0xff);
        port.set_value(0x55);
        assert_eq!(0xf5, port.get_value());
    }

    #[test]
    fn reset_restores_pullups() {
        let mut port = IoPort::new(0xff, 0x00);
        port.set_value(0xaa);
        port.reset();
        assert_eq!(0x00, port.get_direction());
        assert_eq!(0xff, port.get_value());
    }
}
