/// Bit-banged I2C through the pigpio zip engine.
///
/// A zip frame is a byte string of commands executed by the daemon in one go:
/// - 0: End (stop processing the frame)
/// - 1: Escape (next command takes 16-bit arguments)
/// - 2: Start condition
/// - 3: Stop condition
/// - 4 P: set the 7-bit target address to P
/// - 5 lsb msb: set flags
/// - 6 P: read P bytes
/// - 7 P ...: write P bytes
///
/// Each I2C transaction needs an open session on (SDA, SCL); sessions are
/// short-lived and only exist inside `Session`.

mod frame;
mod session;

pub use self::frame::{
	Frame,
	OP_ADDRESS,
	OP_END,
	OP_READ,
	OP_START,
	OP_STOP,
	OP_WRITE,
};

pub use self::session::Session;
