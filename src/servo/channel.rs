use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// アクチュエータのチャンネル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServoChannel {
    Shoulder,
    Elbow,
    Wrist,
    /// 配線上は存在するが、角度は計算しない
    Hand,
}

impl ServoChannel {
    pub const ALL: [ServoChannel; 4] = [
        ServoChannel::Shoulder,
        ServoChannel::Elbow,
        ServoChannel::Wrist,
        ServoChannel::Hand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ServoChannel::Shoulder => "shoulder",
            ServoChannel::Elbow => "elbow",
            ServoChannel::Wrist => "wrist",
            ServoChannel::Hand => "hand",
        }
    }
}

impl fmt::Display for ServoChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ServoChannel {
    type Err = ChannelSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServoChannel::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ChannelSpecError::UnknownChannel(s.to_string()))
    }
}

/// サーボへの指令値（度, 0〜180）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoCommand {
    pub channel: ServoChannel,
    pub value: u8,
}

impl ServoCommand {
    pub const MAX_DEGREES: i32 = 180;

    /// 範囲外の値は 0〜180 に収める
    pub fn new(channel: ServoChannel, degrees: i32) -> Self {
        Self {
            channel,
            value: degrees.clamp(0, Self::MAX_DEGREES) as u8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelSpecError {
    #[error("malformed pin spec '{0}' (expected e.g. 'd:9:s')")]
    Malformed(String),
    #[error("pin spec '{0}' is not a digital servo pin")]
    NotServo(String),
    #[error("pin {0} is assigned to more than one channel")]
    DuplicatePin(u8),
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinType {
    Analog,
    Digital,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
    Pwm,
    Servo,
}

/// `"d:9:s"` 形式のピン指定（種別:番号:モード）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct ChannelSpec {
    pub pin_type: PinType,
    pub pin: u8,
    pub mode: PinMode,
}

impl ChannelSpec {
    pub fn servo(pin: u8) -> Self {
        Self {
            pin_type: PinType::Digital,
            pin,
            mode: PinMode::Servo,
        }
    }

    pub fn is_servo(&self) -> bool {
        self.pin_type == PinType::Digital && self.mode == PinMode::Servo
    }
}

impl FromStr for ChannelSpec {
    type Err = ChannelSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ChannelSpecError::Malformed(s.to_string());
        let parts: Vec<&str> = s.trim().split(':').collect();
        let [kind, pin, mode] = parts.as_slice() else {
            return Err(malformed());
        };

        let pin_type = match *kind {
            "a" => PinType::Analog,
            "d" => PinType::Digital,
            _ => return Err(malformed()),
        };
        let pin: u8 = pin.parse().map_err(|_| malformed())?;
        // Firmata のピン番号は 7bit
        if pin > 127 {
            return Err(malformed());
        }
        let mode = match *mode {
            "i" => PinMode::Input,
            "o" => PinMode::Output,
            "p" => PinMode::Pwm,
            "s" => PinMode::Servo,
            _ => return Err(malformed()),
        };

        Ok(Self { pin_type, pin, mode })
    }
}

impl TryFrom<String> for ChannelSpec {
    type Error = ChannelSpecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.pin_type {
            PinType::Analog => 'a',
            PinType::Digital => 'd',
        };
        let mode = match self.mode {
            PinMode::Input => 'i',
            PinMode::Output => 'o',
            PinMode::Pwm => 'p',
            PinMode::Servo => 's',
        };
        write!(f, "{}:{}:{}", kind, self.pin, mode)
    }
}

/// 4チャンネル分のピン割り当て（検証済み）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap {
    pins: [u8; 4],
}

impl ChannelMap {
    pub fn new(
        shoulder: ChannelSpec,
        elbow: ChannelSpec,
        wrist: ChannelSpec,
        hand: ChannelSpec,
    ) -> Result<Self, ChannelSpecError> {
        let specs = [shoulder, elbow, wrist, hand];
        for spec in &specs {
            if !spec.is_servo() {
                return Err(ChannelSpecError::NotServo(spec.to_string()));
            }
        }
        for (i, a) in specs.iter().enumerate() {
            if specs[i + 1..].iter().any(|b| b.pin == a.pin) {
                return Err(ChannelSpecError::DuplicatePin(a.pin));
            }
        }
        Ok(Self {
            pins: specs.map(|s| s.pin),
        })
    }

    pub fn pin(&self, channel: ServoChannel) -> u8 {
        match channel {
            ServoChannel::Shoulder => self.pins[0],
            ServoChannel::Elbow => self.pins[1],
            ServoChannel::Wrist => self.pins[2],
            ServoChannel::Hand => self.pins[3],
        }
    }
}

impl Default for ChannelMap {
    /// d:9, d:10, d:11, d:12
    fn default() -> Self {
        Self { pins: [9, 10, 11, 12] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_servo_spec() {
        let spec: ChannelSpec = "d:9:s".parse().unwrap();
        assert_eq!(spec, ChannelSpec::servo(9));
        assert!(spec.is_servo());
        assert_eq!(spec.to_string(), "d:9:s");
    }

    #[test]
    fn test_parse_other_modes() {
        let spec: ChannelSpec = "a:0:i".parse().unwrap();
        assert_eq!(spec.pin_type, PinType::Analog);
        assert_eq!(spec.mode, PinMode::Input);
        assert!(!spec.is_servo());

        let spec: ChannelSpec = "d:3:p".parse().unwrap();
        assert_eq!(spec.mode, PinMode::Pwm);
    }

    #[test]
    fn test_parse_malformed() {
        for bad in ["", "d:9", "x:9:s", "d:nine:s", "d:9:z", "d:9:s:1", "d:300:s"] {
            assert!(
                matches!(bad.parse::<ChannelSpec>(), Err(ChannelSpecError::Malformed(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_channel_map_default_pins() {
        let map = ChannelMap::default();
        assert_eq!(map.pin(ServoChannel::Shoulder), 9);
        assert_eq!(map.pin(ServoChannel::Elbow), 10);
        assert_eq!(map.pin(ServoChannel::Wrist), 11);
        assert_eq!(map.pin(ServoChannel::Hand), 12);
    }

    #[test]
    fn test_channel_map_pin_per_channel() {
        let map = ChannelMap::new(
            ChannelSpec::servo(5),
            ChannelSpec::servo(3),
            ChannelSpec::servo(20),
            ChannelSpec::servo(7),
        )
        .unwrap();
        assert_eq!(map.pin(ServoChannel::Shoulder), 5);
        assert_eq!(map.pin(ServoChannel::Elbow), 3);
        assert_eq!(map.pin(ServoChannel::Wrist), 20);
        assert_eq!(map.pin(ServoChannel::Hand), 7);
    }

    #[test]
    fn test_channel_map_rejects_duplicates() {
        let result = ChannelMap::new(
            ChannelSpec::servo(9),
            ChannelSpec::servo(10),
            ChannelSpec::servo(9),
            ChannelSpec::servo(12),
        );
        assert_eq!(result, Err(ChannelSpecError::DuplicatePin(9)));
    }

    #[test]
    fn test_channel_map_rejects_non_servo() {
        let result = ChannelMap::new(
            ChannelSpec::servo(9),
            "d:10:o".parse().unwrap(),
            ChannelSpec::servo(11),
            ChannelSpec::servo(12),
        );
        assert!(matches!(result, Err(ChannelSpecError::NotServo(_))));
    }

    #[test]
    fn test_servo_command_clamps() {
        assert_eq!(ServoCommand::new(ServoChannel::Elbow, 90).value, 90);
        assert_eq!(ServoCommand::new(ServoChannel::Elbow, -5).value, 0);
        assert_eq!(ServoCommand::new(ServoChannel::Elbow, 400).value, 180);
    }

    #[test]
    fn test_channel_from_str() {
        assert_eq!("Elbow".parse::<ServoChannel>(), Ok(ServoChannel::Elbow));
        assert!("knee".parse::<ServoChannel>().is_err());
    }
}
