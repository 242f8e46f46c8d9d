use std::io;
use std::thread;
use std::time::Duration;

use serialport::SerialPort;
use tracing::info;

use super::session::{ActuatorError, ActuatorSession};
use crate::config::ServoConfig;

pub type SerialSession = ActuatorSession<Box<dyn SerialPort>>;

/// シリアルポートを開き、ボードのリセット完了を待ってからチャンネルを設定する
pub fn open_serial(config: &ServoConfig) -> Result<SerialSession, ActuatorError> {
    let channels = config.channel_map()?;
    let port = serialport::new(&config.port, config.baud_rate)
        .timeout(Duration::from_millis(config.write_timeout_ms))
        .open()
        .map_err(|e| ActuatorError::Connection {
            address: config.port.clone(),
            source: io::Error::from(e),
        })?;
    info!(port = %config.port, baud = config.baud_rate, "serial port opened");

    // ポートを開くと Arduino がリセットされる
    if config.setup_wait_ms > 0 {
        info!("waiting {}ms for the board to boot", config.setup_wait_ms);
        thread::sleep(Duration::from_millis(config.setup_wait_ms));
    }

    ActuatorSession::open(port, &config.port, channels, config.params())
}
