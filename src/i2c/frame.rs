use std::fmt;

pub const OP_END: u8 = 0;
pub const OP_START: u8 = 2;
pub const OP_STOP: u8 = 3;
pub const OP_ADDRESS: u8 = 4;
pub const OP_READ: u8 = 6;
pub const OP_WRITE: u8 = 7;

#[derive(Clone, PartialEq, Eq, Default)]
pub struct Frame(Vec<u8>);

impl Frame {
	pub fn new() -> Self {
		Frame(Vec::new())
	}

	pub fn address(mut self, address: u8) -> Self {
		assert!(address < 0x80, "I2C address must be 7-bit");
		self.0.push(OP_ADDRESS);
		self.0.push(address);
		self
	}

	pub fn start(mut self) -> Self {
		self.0.push(OP_START);
		self
	}

	pub fn stop(mut self) -> Self {
		self.0.push(OP_STOP);
		self
	}

	pub fn end(mut self) -> Self {
		self.0.push(OP_END);
		self
	}

	// lengths above 255 would need escaped (16-bit) arguments
	pub fn write(mut self, data: &[u8]) -> Self {
		assert!(!data.is_empty() && data.len() <= 0xff);
		self.0.push(OP_WRITE);
		self.0.push(data.len() as u8);
		self.0.extend_from_slice(data);
		self
	}

	pub fn read(mut self, len: u8) -> Self {
		assert!(len > 0);
		self.0.push(OP_READ);
		self.0.push(len);
		self
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::Debug for Frame {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_list().entries(self.0.iter().map(|b| format!("{:#04x}", b))).finish()
	}
}
