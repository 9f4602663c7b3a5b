use std::time::{
	Duration,
	Instant,
};

use crate::gpio::{
	GpioDriver,
	Pin,
};
use crate::i2c::{
	Frame,
	Session,
};
use crate::interrupt::Interrupt;
use crate::number::DeviceAddress;

use super::WaitIdle;

pub const PAGE_SIZE: usize = 0x100;

/// Byte-level access to VCT memory.
///
/// Every operation opens its own bit-bang session and closes it again; the
/// caller must own the bus (see `Arbiter`) for the whole call.
#[derive(Clone, Copy, Debug)]
pub struct Client {
	pub sda: Pin,
	pub scl: Pin,
	pub speed: u32,
	pub read_delay: Duration,
	pub page_delay: Duration,
	pub ddp_address: DeviceAddress,
	pub wait_idle: Option<WaitIdle>,
	pub interrupt: Interrupt,
}

impl Client {
	pub fn setup<D: GpioDriver + ?Sized>(&self, driver: &mut D) -> crate::AResult<()> {
		use crate::gpio::{Mode, Pull};

		for &pin in [self.sda, self.scl].iter() {
			driver.set_pull(pin, Pull::Up)?;
			driver.set_mode(pin, Mode::Input)?;
		}
		Ok(())
	}

	fn session<'a, D: GpioDriver + ?Sized>(&self, driver: &'a mut D) -> crate::AResult<Session<'a, D>> {
		Session::open(driver, self.sda, self.scl, self.speed)
	}

	fn wait_for_idle<D: GpioDriver + ?Sized>(&self, session: &mut Session<D>, wait: WaitIdle) -> crate::AResult<()> {
		let started = Instant::now();
		loop {
			if session.bus_idle()? {
				return Ok(());
			}
			ensure!(started.elapsed() < wait.timeout,
				"bus not idle after {:?}: SDA/SCL still held low", wait.timeout
			);
			self.interrupt.sleep(wait.interval)?;
		}
	}

	/// Select `offset` in page `address` and read the byte back.
	pub fn read_byte<D: GpioDriver + ?Sized>(&self, driver: &mut D, address: DeviceAddress, offset: u8) -> crate::AResult<Vec<u8>> {
		self.interrupt.check()?;
		let mut session = self.session(driver)?;
		if let Some(wait) = self.wait_idle {
			self.wait_for_idle(&mut session, wait)?;
		}

		session.zip(&Frame::new().address(address.get()).start().write(&[offset]).stop())?;
		if self.read_delay > Duration::from_millis(0) {
			self.interrupt.sleep(self.read_delay)?;
		}
		let data = session.zip(&Frame::new().address(address.get()).start().read(1).stop().end())?;
		session.close()?;

		Ok(data)
	}

	pub fn write_byte<D: GpioDriver + ?Sized>(&self, driver: &mut D, address: DeviceAddress, offset: u8, value: u8) -> crate::AResult<Vec<u8>> {
		self.interrupt.check()?;
		let mut session = self.session(driver)?;
		let ack = session.zip(&Frame::new().address(address.get()).start().write(&[offset, value]).stop().end())?;
		session.close()?;

		Ok(ack)
	}

	/// Read `offset_start..=offset_end`, one session per byte.
	pub fn read_range<D: GpioDriver + ?Sized>(&self, driver: &mut D, address: DeviceAddress, offset_start: u8, offset_end: u8) -> crate::AResult<Vec<Vec<u8>>> {
		let mut data = Vec::new();
		for offset in offset_start..=offset_end {
			let value = with_context!(("reading {}:{:02x}", address, offset),
				self.read_byte(&mut *driver, address, offset)
			)?;
			data.push(value);
		}
		Ok(data)
	}

	/// Read whole pages `page_start..=page_end`.
	pub fn read_pages<D: GpioDriver + ?Sized>(&self, driver: &mut D, page_start: DeviceAddress, page_end: DeviceAddress) -> crate::AResult<Vec<Vec<Vec<u8>>>> {
		let mut pages = Vec::new();
		for page in DeviceAddress::range_inclusive(page_start, page_end) {
			info!("reading page {}", page);
			pages.push(self.read_range(driver, page, 0x00, 0xff)?);
			self.interrupt.sleep(self.page_delay)?;
		}
		Ok(pages)
	}

	/// Write the 16-bit DDP register `sub_address` (high byte first).
	///
	/// The frame is fixed as `address, STOP, write 3, STOP, END`: there is no
	/// START opcode before the payload.
	pub fn write_ddp<D: GpioDriver + ?Sized>(&self, driver: &mut D, sub_address: u8, high: u8, low: u8) -> crate::AResult<Vec<u8>> {
		self.interrupt.check()?;
		let mut session = self.session(driver)?;
		let ack = session.zip(&Frame::new().address(self.ddp_address.get()).stop().write(&[sub_address, high, low]).stop().end())?;
		session.close()?;

		Ok(ack)
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
	use crate::vct::Config;

	fn client(interrupt: Interrupt) -> Client {
		let config = Config::immediate();
		Client {
			sda: config.sda,
			scl: config.scl,
			speed: config.speed,
			read_delay: config.read_delay,
			page_delay: config.page_delay,
			ddp_address: config.ddp_address,
			wait_idle: None,
			interrupt,
		}
	}

	fn addr(a: u8) -> DeviceAddress {
		DeviceAddress::new(a).unwrap()
	}

	#[test]
	fn read_byte_frames() {
		let mut gpio = MockGpio::new().with_pattern_page(0x50);
		let data = client(Interrupt::never()).read_byte(&mut gpio, addr(0x50), 0x10).unwrap();
		assert_eq!(data, vec![0x10 ^ 0x50]);
		assert_eq!(gpio.events, vec![
			Event::Open(Pin(2), Pin(3), 40000),
			Event::Zip(Pin(2), vec![4, 0x50, 2, 7, 1, 0x10, 3]),
			Event::Zip(Pin(2), vec![4, 0x50, 2, 6, 1, 3, 0]),
			Event::Close(Pin(2)),
		]);
	}

	#[test]
	fn write_byte_frame() {
		let mut gpio = MockGpio::new();
		let client = client(Interrupt::never());
		client.write_byte(&mut gpio, addr(0x50), 0x20, 0xa5).unwrap();
		assert_eq!(gpio.zips(), vec![vec![4, 0x50, 2, 7, 2, 0x20, 0xa5, 3, 0]]);
		assert_eq!(client.read_byte(&mut gpio, addr(0x50), 0x20).unwrap(), vec![0xa5]);
	}

	#[test]
	fn ddp_frame_uses_fixed_address() {
		let mut gpio = MockGpio::new();
		client(Interrupt::never()).write_ddp(&mut gpio, 0x12, 0x34, 0x56).unwrap();
		assert_eq!(gpio.zips(), vec![vec![4, 0x45, 3, 7, 3, 0x12, 0x34, 0x56, 3, 0]]);
		assert!(!gpio.has_open_session());
	}

	#[test]
	fn range_matches_single_reads() {
		let mut gpio = MockGpio::new().with_pattern_page(0x50);
		let client = client(Interrupt::never());
		let range = client.read_range(&mut gpio, addr(0x50), 0xfa, 0xff).unwrap();
		assert_eq!(range.len(), 6);
		for (i, value) in range.iter().enumerate() {
			let single = client.read_byte(&mut gpio, addr(0x50), 0xfa + i as u8).unwrap();
			assert_eq!(value, &single);
		}
		// one session per byte
		let opens = gpio.events.iter().filter(|e| match e { Event::Open(..) => true, _ => false }).count();
		assert_eq!(opens, 12);
	}

	#[test]
	fn empty_range() {
		let mut gpio = MockGpio::new();
		assert!(client(Interrupt::never()).read_range(&mut gpio, addr(0x50), 0x10, 0x0f).unwrap().is_empty());
		assert!(gpio.events.is_empty());
	}

	#[test]
	fn pages_match_ranges() {
		let mut gpio = MockGpio::new().with_pattern_page(0x20).with_pattern_page(0x21);
		let client = client(Interrupt::never());
		let pages = client.read_pages(&mut gpio, addr(0x20), addr(0x21)).unwrap();
		assert_eq!(pages.len(), 2);
		for (i, page) in pages.iter().enumerate() {
			assert_eq!(page.len(), PAGE_SIZE);
			assert_eq!(page, &client.read_range(&mut gpio, addr(0x20 + i as u8), 0x00, 0xff).unwrap());
		}
	}

	#[test]
	fn waits_for_idle_bus() {
		let mut gpio = MockGpio::new().with_pattern_page(0x50);
		gpio.busy_reads = 3;
		let client = Client {
			wait_idle: Some(WaitIdle::with_timeout(Duration::from_secs(1))),
			..client(Interrupt::never())
		};
		assert_eq!(client.read_byte(&mut gpio, addr(0x50), 1).unwrap(), vec![1 ^ 0x50]);
		// three LOW polls on SDA, then SDA and SCL HIGH
		let reads = gpio.events.iter().filter(|e| match e { Event::Read(_) => true, _ => false }).count();
		assert_eq!(reads, 5);
	}

	#[test]
	fn idle_wait_times_out() {
		let mut gpio = MockGpio::new();
		gpio.busy_reads = usize::max_value();
		let client = Client {
			wait_idle: Some(WaitIdle::with_timeout(Duration::from_millis(5))),
			..client(Interrupt::never())
		};
		assert!(client.read_byte(&mut gpio, addr(0x50), 1).is_err());
		assert!(gpio.zips().is_empty());
		assert!(!gpio.has_open_session());
	}

	#[test]
	fn interrupt_stops_range() {
		static FLAG: AtomicBool = AtomicBool::new(false);
		let mut gpio = MockGpio::new();
		gpio.interrupt_after = Some((4, &FLAG));
		let err = client(Interrupt::from_flag(&FLAG)).read_range(&mut gpio, addr(0x50), 0x00, 0xff).unwrap_err();
		assert!(is_interrupted(&err));
		// two bytes made it, then the check before the third byte fired
		assert_eq!(gpio.zips().len(), 4);
		assert!(!gpio.has_open_session());
	}
}
