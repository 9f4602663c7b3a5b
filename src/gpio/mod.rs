/// GPIO access as provided by the pigpio daemon.
///
/// Everything the VCT bridge needs from the host side: pin direction and
/// pull resistors, plain level reads/writes, and the "bit-bang I2C" engine
/// which runs whole I2C transactions (encoded as zip command frames, see
/// `crate::i2c::Frame`) on two arbitrary pins.
///
/// The driver is passed around explicitly; there is no global handle.

#[cfg(test)]
pub mod mock;
mod pigpiod;

use std::fmt;

pub use self::pigpiod::{
	Pigpiod,
	PigpioError,
	Transport,
	DEFAULT_HOST,
	DEFAULT_PORT,
};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Pin(pub u8);

impl fmt::Display for Pin {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "GPIO{}", self.0)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Level {
	Low,
	High,
}

impl From<bool> for Level {
	fn from(v: bool) -> Self {
		match v {
			false => Level::Low,
			true => Level::High,
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Mode {
	Input,
	Output,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Pull {
	Off,
	Down,
	Up,
}

pub trait GpioDriver {
	fn set_mode(&mut self, pin: Pin, mode: Mode) -> crate::AResult<()>;

	fn set_pull(&mut self, pin: Pin, pull: Pull) -> crate::AResult<()>;

	// also switches the pin to output
	fn write(&mut self, pin: Pin, level: Level) -> crate::AResult<()>;

	fn read(&mut self, pin: Pin) -> crate::AResult<Level>;

	/// Claim `sda` and `scl` for bit-banged I2C at `baud` bits per second.
	///
	/// The session is identified by its `sda` pin afterwards.
	fn bb_i2c_open(&mut self, sda: Pin, scl: Pin, baud: u32) -> crate::AResult<()>;

	/// Execute a zip command frame, returning the bytes read by it.
	fn bb_i2c_zip(&mut self, sda: Pin, frame: &[u8]) -> crate::AResult<Vec<u8>>;

	fn bb_i2c_close(&mut self, sda: Pin) -> crate::AResult<()>;

	// driver teardown; the handle must not be used afterwards
	fn stop(&mut self) -> crate::AResult<()>;
}

impl<D: GpioDriver + ?Sized> GpioDriver for &mut D {
	fn set_mode(&mut self, pin: Pin, mode: Mode) -> crate::AResult<()> {
		(**self).set_mode(pin, mode)
	}

	fn set_pull(&mut self, pin: Pin, pull: Pull) -> crate::AResult<()> {
		(**self).set_pull(pin, pull)
	}

	fn write(&mut self, pin: Pin, level: Level) -> crate::AResult<()> {
		(**self).write(pin, level)
	}

	fn read(&mut self, pin: Pin) -> crate::AResult<Level> {
		(**self).read(pin)
	}

	fn bb_i2c_open(&mut self, sda: Pin, scl: Pin, baud: u32) -> crate::AResult<()> {
		(**self).bb_i2c_open(sda, scl, baud)
	}

	fn bb_i2c_zip(&mut self, sda: Pin, frame: &[u8]) -> crate::AResult<Vec<u8>> {
		(**self).bb_i2c_zip(sda, frame)
	}

	fn bb_i2c_close(&mut self, sda: Pin) -> crate::AResult<()> {
		(**self).bb_i2c_close(sda)
	}

	fn stop(&mut self) -> crate::AResult<()> {
		(**self).stop()
	}
}
