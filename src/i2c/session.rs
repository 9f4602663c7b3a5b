use crate::gpio::{
	GpioDriver,
	Level,
	Pin,
};

use super::Frame;

/// Open bit-bang I2C session on (`sda`, `scl`).
///
/// Use `close` to see whether releasing the pins worked; dropping an open
/// session closes it too but can only log failures.
pub struct Session<'a, D: GpioDriver + ?Sized + 'a> {
	driver: &'a mut D,
	sda: Pin,
	scl: Pin,
	open: bool,
}

impl<'a, D: GpioDriver + ?Sized> Session<'a, D> {
	pub fn open(driver: &'a mut D, sda: Pin, scl: Pin, baud: u32) -> crate::AResult<Self> {
		with_context!(("couldn't open bit-bang I2C on {}/{} at {} baud", sda, scl, baud),
			driver.bb_i2c_open(sda, scl, baud)
		)?;
		debug!("opened bit-bang I2C on {}/{}", sda, scl);
		Ok(Session {
			driver,
			sda,
			scl,
			open: true,
		})
	}

	pub fn zip(&mut self, frame: &Frame) -> crate::AResult<Vec<u8>> {
		debug!("zip {:?}", frame);
		let sda = self.sda;
		let driver = &mut *self.driver;
		with_context!(("zip {:?} failed", frame),
			driver.bb_i2c_zip(sda, frame.as_bytes())
		)
	}

	/// Whether both SDA and SCL are currently released (HIGH).
	pub fn bus_idle(&mut self) -> crate::AResult<bool> {
		Ok(self.driver.read(self.sda)? == Level::High && self.driver.read(self.scl)? == Level::High)
	}

	pub fn close(mut self) -> crate::AResult<()> {
		self.open = false;
		self.driver.bb_i2c_close(self.sda)?;
		debug!("closed bit-bang I2C on {}/{}", self.sda, self.scl);
		Ok(())
	}
}

impl<'a, D: GpioDriver + ?Sized> Drop for Session<'a, D> {
	fn drop(&mut self) {
		if self.open {
			if let Err(e) = self.driver.bb_i2c_close(self.sda) {
				warn!("Couldn't close bit-bang I2C on {}: {}", self.sda, e);
			}
		}
	}
}
