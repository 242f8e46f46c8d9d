//! Firmata message encoding for the servo subset of the protocol.
//!
//! Only outbound messages are built here; the board never answers in this
//! direction of use.

pub const ANALOG_MESSAGE: u8 = 0xE0;
pub const START_SYSEX: u8 = 0xF0;
pub const END_SYSEX: u8 = 0xF7;
pub const SERVO_CONFIG: u8 = 0x70;
pub const EXTENDED_ANALOG: u8 = 0x6F;

/// Default servo pulse range in microseconds (Arduino Servo library).
pub const DEFAULT_MIN_PULSE: u16 = 544;
pub const DEFAULT_MAX_PULSE: u16 = 2400;

/// Split a 14-bit value into two 7-bit data bytes (LSB first).
pub fn to_two_bytes(value: u16) -> [u8; 2] {
    [(value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
}

fn sysex(command: u8, data: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(data.len() + 3);
    msg.push(START_SYSEX);
    msg.push(command);
    msg.extend_from_slice(data);
    msg.push(END_SYSEX);
    msg
}

/// `SERVO_CONFIG` sysex: attaches a servo to `pin` with the given pulse range.
pub fn servo_config(pin: u8, min_pulse: u16, max_pulse: u16) -> Vec<u8> {
    let [min_lsb, min_msb] = to_two_bytes(min_pulse);
    let [max_lsb, max_msb] = to_two_bytes(max_pulse);
    sysex(SERVO_CONFIG, &[pin & 0x7F, min_lsb, min_msb, max_lsb, max_msb])
}

/// Servo position write. Pins 0-15 fit in an `ANALOG_MESSAGE`; higher pins
/// need the `EXTENDED_ANALOG` sysex.
pub fn servo_write(pin: u8, degrees: u8) -> Vec<u8> {
    let [lsb, msb] = to_two_bytes(degrees as u16);
    if pin < 16 {
        vec![ANALOG_MESSAGE | pin, lsb, msb]
    } else {
        sysex(EXTENDED_ANALOG, &[pin & 0x7F, lsb, msb])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_two_bytes() {
        assert_eq!(to_two_bytes(0), [0, 0]);
        assert_eq!(to_two_bytes(180), [0x34, 0x01]);
        assert_eq!(to_two_bytes(544), [0x20, 0x04]);
        assert_eq!(to_two_bytes(2400), [0x60, 0x12]);
    }

    #[test]
    fn test_servo_config() {
        assert_eq!(
            servo_config(9, DEFAULT_MIN_PULSE, DEFAULT_MAX_PULSE),
            vec![0xF0, 0x70, 9, 0x20, 0x04, 0x60, 0x12, 0xF7]
        );
    }

    #[test]
    fn test_servo_write_analog_message() {
        assert_eq!(servo_write(10, 90), vec![0xEA, 90, 0]);
        assert_eq!(servo_write(12, 180), vec![0xEC, 0x34, 0x01]);
    }

    #[test]
    fn test_servo_write_extended_analog() {
        assert_eq!(servo_write(20, 45), vec![0xF0, 0x6F, 20, 45, 0, 0xF7]);
    }
}
