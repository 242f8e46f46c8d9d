pub mod channel;
pub mod firmata;
#[cfg(feature = "serial")]
pub mod serial;
pub mod session;

pub use channel::{ChannelMap, ChannelSpec, ChannelSpecError, ServoChannel, ServoCommand};
#[cfg(feature = "serial")]
pub use serial::{open_serial, SerialSession};
pub use session::{ActuatorError, ActuatorSession, ServoParams};
