use std::time::Duration;

use crate::gpio::{
	GpioDriver,
	Level,
	Mode,
	Pin,
	Pull,
};
use crate::interrupt::{
	Interrupt,
	reliable_sleep,
};

/// Owner of the inhibit pin.
///
/// LOW keeps the VCT's own master off the shared bus; HIGH (or a released,
/// pulled-up input) hands the bus back.
#[derive(Clone, Copy, Debug)]
pub struct Arbiter {
	pub pin: Pin,
	pub start_delay: Duration,
	pub end_delay: Duration,
	pub interrupt: Interrupt,
}

impl Arbiter {
	/// Inhibit the other master and give it `start_delay` to let go of the bus.
	pub fn start<D: GpioDriver + ?Sized>(&self, driver: &mut D) -> crate::AResult<()> {
		with_context!(("couldn't pull inhibit pin {} low", self.pin),
			driver.write(self.pin, Level::Low)
		)?;
		debug!("inhibit pin {} low", self.pin);

		if let Err(e) = self.interrupt.sleep(self.start_delay) {
			if let Err(e) = driver.write(self.pin, Level::High) {
				warn!("Couldn't release inhibit pin {}: {}", self.pin, e);
			}
			return Err(e);
		}
		Ok(())
	}

	/// Wait `end_delay`, then let the other master back.
	///
	/// Not interruptible: this runs while unwinding from an interrupt.
	pub fn end<D: GpioDriver + ?Sized>(&self, driver: &mut D) -> crate::AResult<()> {
		reliable_sleep(self.end_delay);
		with_context!(("couldn't pull inhibit pin {} high", self.pin),
			driver.write(self.pin, Level::High)
		)?;
		debug!("inhibit pin {} high", self.pin);
		Ok(())
	}

	pub fn setup<D: GpioDriver + ?Sized>(&self, driver: &mut D) -> crate::AResult<()> {
		driver.set_pull(self.pin, Pull::Up)?;
		Ok(())
	}

	/// Stop driving the pin at all; the pull-up keeps it HIGH.
	pub fn release<D: GpioDriver + ?Sized>(&self, driver: &mut D) -> crate::AResult<()> {
		driver.write(self.pin, Level::High)?;
		driver.set_mode(self.pin, Mode::Input)?;
		driver.set_pull(self.pin, Pull::Up)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::AtomicBool;
	use crate::gpio::mock::{
		Event,
		MockGpio,
	};
	use crate::interrupt::is_interrupted;

	fn arbiter(interrupt: Interrupt) -> Arbiter {
		Arbiter {
			pin: Pin(17),
			start_delay: Duration::from_millis(0),
			end_delay: Duration::from_millis(0),
			interrupt,
		}
	}

	#[test]
	fn start_then_end_rests_high_without_bus_traffic() {
		let mut gpio = MockGpio::new();
		let arbiter = arbiter(Interrupt::never());
		arbiter.start(&mut gpio).unwrap();
		assert_eq!(gpio.level(Pin(17)), Some(Level::Low));
		arbiter.end(&mut gpio).unwrap();
		assert_eq!(gpio.events, vec![
			Event::Write(Pin(17), Level::Low),
			Event::Write(Pin(17), Level::High),
		]);
	}

	#[test]
	fn interrupted_start_hands_bus_back() {
		static FLAG: AtomicBool = AtomicBool::new(true);
		let mut gpio = MockGpio::new();
		let arbiter = Arbiter {
			start_delay: Duration::from_secs(5),
			..arbiter(Interrupt::from_flag(&FLAG))
		};
		let err = arbiter.start(&mut gpio).unwrap_err();
		assert!(is_interrupted(&err));
		assert_eq!(gpio.level(Pin(17)), Some(Level::High));
	}

	#[test]
	fn release_leaves_pulled_up_input() {
		let mut gpio = MockGpio::new();
		arbiter(Interrupt::never()).release(&mut gpio).unwrap();
		assert_eq!(gpio.events, vec![
			Event::Write(Pin(17), Level::High),
			Event::Mode(Pin(17), Mode::Input),
			Event::Pull(Pin(17), Pull::Up),
		]);
	}
}
