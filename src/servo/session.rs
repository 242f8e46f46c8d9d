use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, warn};

use super::channel::{ChannelMap, ChannelSpecError, ServoChannel, ServoCommand};
use super::firmata;

#[derive(Debug, Error)]
pub enum ActuatorError {
    /// 接続失敗はプロセス全体にとって致命的（再試行しない）
    #[error("failed to connect to actuator transport at {address}")]
    Connection {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Channel(#[from] ChannelSpecError),
}

/// サーボのパルス幅と起動時の初期角度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoParams {
    pub min_pulse: u16,
    pub max_pulse: u16,
    pub initial_angle: u8,
}

impl Default for ServoParams {
    fn default() -> Self {
        Self {
            min_pulse: firmata::DEFAULT_MIN_PULSE,
            max_pulse: firmata::DEFAULT_MAX_PULSE,
            initial_angle: 0,
        }
    }
}

/// Firmata ボードへの1本の接続と、4チャンネル分のピン割り当て
///
/// チャンネルは `open` で一度だけ設定し、以降は再設定しない。
pub struct ActuatorSession<W: Write> {
    link: W,
    channels: ChannelMap,
    failed_writes: u64,
}

impl<W: Write> ActuatorSession<W> {
    /// 全チャンネルに SERVO_CONFIG と初期角度を送る
    pub fn open(
        mut link: W,
        address: &str,
        channels: ChannelMap,
        params: ServoParams,
    ) -> Result<Self, ActuatorError> {
        let connection = |source: io::Error| ActuatorError::Connection {
            address: address.to_string(),
            source,
        };

        for channel in ServoChannel::ALL {
            let pin = channels.pin(channel);
            link.write_all(&firmata::servo_config(pin, params.min_pulse, params.max_pulse))
                .map_err(connection)?;
            link.write_all(&firmata::servo_write(pin, params.initial_angle))
                .map_err(connection)?;
            debug!(%channel, pin, "servo channel bound");
        }
        link.flush().map_err(connection)?;

        Ok(Self {
            link,
            channels,
            failed_writes: 0,
        })
    }

    pub fn pin(&self, channel: ServoChannel) -> u8 {
        self.channels.pin(channel)
    }

    /// 書き込み失敗の累計
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }

    /// 指令値を送る（応答は待たない）
    ///
    /// 書き込みに失敗してもエラーは返さず、ログに残すだけ。
    pub fn send(&mut self, command: ServoCommand) {
        let pin = self.channels.pin(command.channel);
        let msg = firmata::servo_write(pin, command.value);
        let result = self.link.write_all(&msg).and_then(|_| self.link.flush());
        if let Err(e) = result {
            self.failed_writes += 1;
            // 連続失敗でログが溢れないよう、初回と100回ごとだけ出す
            if self.failed_writes == 1 || self.failed_writes % 100 == 0 {
                warn!(
                    channel = %command.channel,
                    failures = self.failed_writes,
                    "servo write failed: {}",
                    e
                );
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn link(&self) -> &W {
        &self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servo::channel::ChannelSpec;

    struct BrokenLink;

    impl Write for BrokenLink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// open 後に書き込みだけ失敗するリンク
    struct FlakyLink {
        written: Vec<u8>,
        fail: bool,
    }

    impl Write for FlakyLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "timeout"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_open_configures_all_channels() {
        let session = ActuatorSession::open(
            Vec::new(),
            "test",
            ChannelMap::default(),
            ServoParams::default(),
        )
        .unwrap();

        let mut expected = Vec::new();
        for pin in [9u8, 10, 11, 12] {
            expected.extend(firmata::servo_config(pin, 544, 2400));
            expected.extend(firmata::servo_write(pin, 0));
        }
        assert_eq!(session.link(), &expected);
    }

    #[test]
    fn test_open_uses_params() {
        let params = ServoParams {
            min_pulse: 600,
            max_pulse: 2300,
            initial_angle: 90,
        };
        let map = ChannelMap::new(
            ChannelSpec::servo(2),
            ChannelSpec::servo(3),
            ChannelSpec::servo(4),
            ChannelSpec::servo(5),
        )
        .unwrap();
        let session = ActuatorSession::open(Vec::new(), "test", map, params).unwrap();

        let link = session.link();
        assert_eq!(&link[..8], firmata::servo_config(2, 600, 2300).as_slice());
        assert_eq!(&link[8..11], &[0xE2, 90, 0]);
        assert_eq!(session.pin(ServoChannel::Hand), 5);
    }

    #[test]
    fn test_open_connection_error() {
        let result = ActuatorSession::open(
            BrokenLink,
            "/dev/ttyACM0",
            ChannelMap::default(),
            ServoParams::default(),
        );
        match result {
            Err(ActuatorError::Connection { address, .. }) => assert_eq!(address, "/dev/ttyACM0"),
            _ => panic!("expected connection error"),
        }
    }

    #[test]
    fn test_send_writes_analog_message() {
        let mut session =
            ActuatorSession::open(Vec::new(), "test", ChannelMap::default(), ServoParams::default())
                .unwrap();
        let setup_len = session.link().len();

        session.send(ServoCommand::new(ServoChannel::Elbow, 90));
        session.send(ServoCommand::new(ServoChannel::Wrist, 135));

        assert_eq!(
            &session.link()[setup_len..],
            &[0xEA, 90, 0, 0xEB, 135 & 0x7F, 1]
        );
    }

    #[test]
    fn test_send_failure_is_not_surfaced() {
        let link = FlakyLink {
            written: Vec::new(),
            fail: false,
        };
        let mut session =
            ActuatorSession::open(link, "test", ChannelMap::default(), ServoParams::default())
                .unwrap();
        session.link.fail = true;

        session.send(ServoCommand::new(ServoChannel::Shoulder, 10));
        session.send(ServoCommand::new(ServoChannel::Shoulder, 20));
        assert_eq!(session.failed_writes(), 2);
    }
}
