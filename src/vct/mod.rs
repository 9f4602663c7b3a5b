/// Access to a VCT49xl over a shared, bit-banged I2C bus.
///
/// The VCT runs its own I2C master on the same lines; the host keeps it off
/// the bus by pulling the inhibit pin ("FA1") low for the duration of a
/// `Transaction`. All memory access goes through a `Transaction`, so it is
/// impossible to touch the bus without owning it.
///
/// Memory is addressed by (I2C address, offset): every 7-bit address maps a
/// 256-byte page. A byte is read by writing its offset, then reading one byte
/// back; each of these runs in a fresh bit-bang session.

mod arbiter;
mod client;
mod config;

use crate::gpio::GpioDriver;
use crate::interrupt::Interrupt;
use crate::number::DeviceAddress;

pub use self::arbiter::Arbiter;
pub use self::client::{
	Client,
	PAGE_SIZE,
};
pub use self::config::{
	Config,
	WaitIdle,
};

/// Driver plus pin setup for one VCT.
///
/// `shutdown` hands the bus back and stops the driver; dropping without
/// `shutdown` does the same but only logs failures.
pub struct Vct<D: GpioDriver> {
	driver: D,
	arbiter: Arbiter,
	client: Client,
	released: bool,
}

impl<D: GpioDriver> Vct<D> {
	pub fn open(mut driver: D, config: &Config, interrupt: Interrupt) -> crate::AResult<Self> {
		config.validate()?;

		let arbiter = Arbiter {
			pin: config.inhibit,
			start_delay: config.start_delay,
			end_delay: config.end_delay,
			interrupt,
		};
		let client = Client {
			sda: config.sda,
			scl: config.scl,
			speed: config.speed,
			read_delay: config.read_delay,
			page_delay: config.page_delay,
			ddp_address: config.ddp_address,
			wait_idle: config.wait_idle,
			interrupt,
		};

		let setup = with_context!("couldn't configure GPIO pins", {
			arbiter.setup(&mut driver)?;
			client.setup(&mut driver)
		});
		if let Err(e) = setup {
			if let Err(e) = driver.stop() {
				warn!("Couldn't stop GPIO driver: {}", e);
			}
			return Err(e);
		}

		Ok(Vct {
			driver,
			arbiter,
			client,
			released: false,
		})
	}

	pub fn driver(&self) -> &D {
		&self.driver
	}

	/// Take the bus away from the VCT's own master.
	pub fn transaction(&mut self) -> crate::AResult<Transaction<'_, D>> {
		self.arbiter.start(&mut self.driver)?;
		Ok(Transaction {
			vct: self,
			finished: false,
		})
	}

	fn release(&mut self) -> crate::AResult<()> {
		self.released = true;

		let mut first_error = None;
		if let Err(e) = self.arbiter.release(&mut self.driver) {
			warn!("Couldn't release inhibit pin {}: {}", self.arbiter.pin, e);
			first_error = Some(e);
		}
		if let Err(e) = self.driver.stop() {
			warn!("Couldn't stop GPIO driver: {}", e);
			first_error = first_error.or(Some(e));
		}

		match first_error {
			None => Ok(()),
			Some(e) => Err(e),
		}
	}

	pub fn shutdown(mut self) -> crate::AResult<()> {
		self.release()
	}
}

impl<D: GpioDriver> Drop for Vct<D> {
	fn drop(&mut self) {
		if !self.released {
			// failures were logged already
			let _ = self.release();
		}
	}
}

/// Bus ownership; the inhibit pin stays low until `finish` or drop.
pub struct Transaction<'a, D: GpioDriver + 'a> {
	vct: &'a mut Vct<D>,
	finished: bool,
}

impl<'a, D: GpioDriver> Transaction<'a, D> {
	pub fn read_byte(&mut self, address: DeviceAddress, offset: u8) -> crate::AResult<Vec<u8>> {
		let vct = &mut *self.vct;
		vct.client.read_byte(&mut vct.driver, address, offset)
	}

	pub fn write_byte(&mut self, address: DeviceAddress, offset: u8, value: u8) -> crate::AResult<Vec<u8>> {
		let vct = &mut *self.vct;
		vct.client.write_byte(&mut vct.driver, address, offset, value)
	}

	pub fn read_range(&mut self, address: DeviceAddress, offset_start: u8, offset_end: u8) -> crate::AResult<Vec<Vec<u8>>> {
		let vct = &mut *self.vct;
		vct.client.read_range(&mut vct.driver, address, offset_start, offset_end)
	}

	pub fn read_pages(&mut self, page_start: DeviceAddress, page_end: DeviceAddress) -> crate::AResult<Vec<Vec<Vec<u8>>>> {
		let vct = &mut *self.vct;
		vct.client.read_pages(&mut vct.driver, page_start, page_end)
	}

	pub fn write_ddp(&mut self, sub_address: u8, high: u8, low: u8) -> crate::AResult<Vec<u8>> {
		let vct = &mut *self.vct;
		vct.client.write_ddp(&mut vct.driver, sub_address, high, low)
	}

	pub fn finish(mut self) -> crate::AResult<()> {
		self.finished = true;
		let vct = &mut *self.vct;
		vct.arbiter.end(&mut vct.driver)
	}
}

impl<'a, D: GpioDriver> Drop for Transaction<'a, D> {
	fn drop(&mut self) {
		if !self.finished {
			let vct = &mut *self.vct;
			if let Err(e) = vct.arbiter.end(&mut vct.driver) {
				warn!("Couldn't hand bus back: {}", e);
			}
		}
	}
}
