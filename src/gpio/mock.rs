//! Recording driver emulating a VCT's page memory behind the zip engine.

use std::collections::HashMap;
use std::sync::atomic::{
	AtomicBool,
	Ordering,
};

use super::{
	GpioDriver,
	Level,
	Mode,
	Pin,
	Pull,
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Event {
	Mode(Pin, Mode),
	Pull(Pin, Pull),
	Write(Pin, Level),
	Read(Pin),
	Open(Pin, Pin, u32),
	Zip(Pin, Vec<u8>),
	Close(Pin),
	Stop,
}

pub struct MockGpio {
	pub events: Vec<Event>,
	pub memory: HashMap<u8, [u8; 256]>,
	// number of pin reads returning LOW before the bus looks idle
	pub busy_reads: usize,
	pub fail_zip: bool,
	pub fail_mode: bool,
	// writes beyond this many fail
	pub fail_writes_after: Option<usize>,
	// raise the flag once this many zips went through
	pub interrupt_after: Option<(usize, &'static AtomicBool)>,
	pointer: Option<(u8, u8)>,
	open: Vec<Pin>,
	zips: usize,
	writes: usize,
}

impl MockGpio {
	pub fn new() -> Self {
		MockGpio {
			events: Vec::new(),
			memory: HashMap::new(),
			busy_reads: 0,
			fail_zip: false,
			fail_mode: false,
			fail_writes_after: None,
			interrupt_after: None,
			pointer: None,
			open: Vec::new(),
			zips: 0,
			writes: 0,
		}
	}

	/// Page `address` filled with `offset ^ address`.
	pub fn with_pattern_page(mut self, address: u8) -> Self {
		let mut page = [0u8; 256];
		for (offset, byte) in page.iter_mut().enumerate() {
			*byte = offset as u8 ^ address;
		}
		self.memory.insert(address, page);
		self
	}

	pub fn level(&self, pin: Pin) -> Option<Level> {
		self.events.iter().rev().filter_map(|e| match *e {
			Event::Write(p, level) if p == pin => Some(level),
			_ => None,
		}).next()
	}

	pub fn zips(&self) -> Vec<Vec<u8>> {
		self.events.iter().filter_map(|e| match e {
			Event::Zip(_, frame) => Some(frame.clone()),
			_ => None,
		}).collect()
	}

	pub fn has_open_session(&self) -> bool {
		!self.open.is_empty()
	}

	fn execute(&mut self, frame: &[u8]) -> crate::AResult<Vec<u8>> {
		let mut address = None;
		let mut result = Vec::new();
		let mut ops = frame.iter().cloned();
		while let Some(op) = ops.next() {
			match op {
				0 => break,
				2 | 3 => (),
				4 => address = ops.next(),
				6 => {
					let len = ops.next().ok_or_else(|| format_err!("truncated read"))?;
					let (page, mut offset) = self.pointer.ok_or_else(|| format_err!("read without offset"))?;
					for _ in 0..len {
						result.push(self.memory.get(&page).map_or(0xff, |m| m[offset as usize]));
						offset = offset.wrapping_add(1);
					}
				},
				7 => {
					let page = address.ok_or_else(|| format_err!("write without address"))?;
					let len = ops.next().ok_or_else(|| format_err!("truncated write"))?;
					let data: Vec<u8> = ops.by_ref().take(len as usize).collect();
					ensure!(len > 0 && data.len() == len as usize, "bad write payload");
					let offset = data[0];
					self.pointer = Some((page, offset));
					if data.len() > 1 {
						let memory = self.memory.entry(page).or_insert([0u8; 256]);
						for (i, &b) in data[1..].iter().enumerate() {
							memory[offset.wrapping_add(i as u8) as usize] = b;
						}
					}
				},
				op => bail!("unsupported zip op {}", op),
			}
		}
		Ok(result)
	}
}

impl GpioDriver for MockGpio {
	fn set_mode(&mut self, pin: Pin, mode: Mode) -> crate::AResult<()> {
		ensure!(!self.fail_mode, "set_mode on {} failed", pin);
		self.events.push(Event::Mode(pin, mode));
		Ok(())
	}

	fn set_pull(&mut self, pin: Pin, pull: Pull) -> crate::AResult<()> {
		self.events.push(Event::Pull(pin, pull));
		Ok(())
	}

	fn write(&mut self, pin: Pin, level: Level) -> crate::AResult<()> {
		self.writes += 1;
		if let Some(after) = self.fail_writes_after {
			ensure!(self.writes <= after, "write to {} failed", pin);
		}
		self.events.push(Event::Write(pin, level));
		Ok(())
	}

	fn read(&mut self, pin: Pin) -> crate::AResult<Level> {
		self.events.push(Event::Read(pin));
		if self.busy_reads > 0 {
			self.busy_reads -= 1;
			return Ok(Level::Low);
		}
		Ok(Level::High)
	}

	fn bb_i2c_open(&mut self, sda: Pin, scl: Pin, baud: u32) -> crate::AResult<()> {
		ensure!(!self.open.contains(&sda), "{} already open", sda);
		self.events.push(Event::Open(sda, scl, baud));
		self.open.push(sda);
		Ok(())
	}

	fn bb_i2c_zip(&mut self, sda: Pin, frame: &[u8]) -> crate::AResult<Vec<u8>> {
		ensure!(self.open.contains(&sda), "{} not open", sda);
		ensure!(!self.fail_zip, "zip failed");
		self.events.push(Event::Zip(sda, frame.to_vec()));
		self.zips += 1;
		if let Some((after, flag)) = self.interrupt_after {
			if self.zips >= after {
				flag.store(true, Ordering::SeqCst);
			}
		}
		self.execute(frame)
	}

	fn bb_i2c_close(&mut self, sda: Pin) -> crate::AResult<()> {
		self.events.push(Event::Close(sda));
		self.open.retain(|&p| p != sda);
		Ok(())
	}

	fn stop(&mut self) -> crate::AResult<()> {
		self.events.push(Event::Stop);
		Ok(())
	}
}
