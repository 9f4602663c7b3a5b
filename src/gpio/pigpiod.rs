use std::fmt;
use std::io::{
	self,
	Read,
	Write,
};
use std::net::{
	Shutdown,
	TcpStream,
	ToSocketAddrs,
};
use std::time::Duration;

use failure::Fail;

use super::{
	GpioDriver,
	Level,
	Mode,
	Pin,
	Pull,
};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8888;

const CMD_MODES: u32 = 0;
const CMD_PUD: u32 = 2;
const CMD_READ: u32 = 3;
const CMD_WRITE: u32 = 4;
const CMD_BI2CC: u32 = 89;
const CMD_BI2CO: u32 = 90;
const CMD_BI2CZ: u32 = 91;

fn command_name(cmd: u32) -> &'static str {
	match cmd {
		CMD_MODES => "set_mode",
		CMD_PUD => "set_pull_up_down",
		CMD_READ => "read",
		CMD_WRITE => "write",
		CMD_BI2CC => "bb_i2c_close",
		CMD_BI2CO => "bb_i2c_open",
		CMD_BI2CZ => "bb_i2c_zip",
		_ => "unknown command",
	}
}

/* pigpiod talks little endian on the wire */

fn le_u32_to_bytes(val: u32) -> [u8; 4] {
	[
		val as u8,
		(val >> 8) as u8,
		(val >> 16) as u8,
		(val >> 24) as u8,
	]
}

fn le_u32_from_bytes(val: &[u8]) -> u32 {
	(val[0] as u32)
	| (val[1] as u32) << 8
	| (val[2] as u32) << 16
	| (val[3] as u32) << 24
}

/// Negative status returned by the daemon.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PigpioError {
	pub command: &'static str,
	pub code: i32,
}

impl PigpioError {
	pub fn description(&self) -> &'static str {
		match self.code {
			-1 => "initialisation failed",
			-2 => "GPIO not 0-31",
			-3 => "GPIO not 0-53",
			-4 => "mode not 0-7",
			-5 => "level not 0-1",
			-6 => "pud not 0-2",
			-41 => "GPIO operation not permitted",
			-50 => "GPIO already in use",
			_ => "unknown error",
		}
	}
}

impl fmt::Display for PigpioError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "pigpio {} failed: {} ({})", self.command, self.description(), self.code)
	}
}

impl Fail for PigpioError {}

/// Byte stream to the daemon.
pub trait Transport: Read + Write {
	fn close(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
	fn close(&mut self) -> io::Result<()> {
		self.shutdown(Shutdown::Both)
	}
}

/// Client for the pigpiod command socket.
///
/// Each request is a 16-byte header `cmd, p1, p2, p3` (u32 each) optionally
/// followed by `p3` extension bytes; the daemon echoes the header with `p3`
/// replaced by the (signed) result. Zip commands append `result` data bytes.
pub struct Pigpiod<S: Transport = TcpStream> {
	stream: S,
	stopped: bool,
}

impl Pigpiod<TcpStream> {
	pub fn connect(host: &str, port: u16, timeout: Duration) -> crate::AResult<Self> {
		with_context!(("couldn't connect to pigpiod at {}:{}", host, port), {
			let mut last_error = None;
			for addr in (host, port).to_socket_addrs()? {
				match TcpStream::connect_timeout(&addr, timeout) {
					Ok(stream) => {
						stream.set_read_timeout(Some(timeout))?;
						stream.set_write_timeout(Some(timeout))?;
						stream.set_nodelay(true)?;
						debug!("connected to pigpiod at {}", addr);
						return Ok(Pigpiod::new(stream));
					},
					Err(e) => {
						debug!("connecting to {} failed: {}", addr, e);
						last_error = Some(e);
					},
				}
			}
			match last_error {
				Some(e) => Err(e.into()),
				None => bail!("host name didn't resolve to any address"),
			}
		})
	}
}

impl<S: Transport> Pigpiod<S> {
	pub fn new(stream: S) -> Self {
		Pigpiod {
			stream,
			stopped: false,
		}
	}

	fn send(&mut self, cmd: u32, p1: u32, p2: u32, ext: &[u8]) -> crate::AResult<u32> {
		ensure!(!self.stopped, "pigpiod connection already stopped");

		let mut request = Vec::with_capacity(16 + ext.len());
		for &word in [cmd, p1, p2, ext.len() as u32].iter() {
			request.extend_from_slice(&le_u32_to_bytes(word));
		}
		request.extend_from_slice(ext);
		self.stream.write_all(&request)?;
		self.stream.flush()?;

		let mut response = [0u8; 16];
		self.stream.read_exact(&mut response)?;
		let echoed = le_u32_from_bytes(&response[0..4]);
		ensure!(echoed == cmd, "pigpiod answered command {} to request {}", echoed, cmd);

		let result = le_u32_from_bytes(&response[12..16]) as i32;
		if result < 0 {
			return Err(PigpioError {
				command: command_name(cmd),
				code: result,
			}.into());
		}
		Ok(result as u32)
	}

	fn send_and_receive(&mut self, cmd: u32, p1: u32, p2: u32, ext: &[u8]) -> crate::AResult<Vec<u8>> {
		let len = self.send(cmd, p1, p2, ext)? as usize;
		let mut data = vec![0u8; len];
		self.stream.read_exact(&mut data)?;
		Ok(data)
	}
}

impl<S: Transport> GpioDriver for Pigpiod<S> {
	fn set_mode(&mut self, pin: Pin, mode: Mode) -> crate::AResult<()> {
		let mode = match mode {
			Mode::Input => 0,
			Mode::Output => 1,
		};
		self.send(CMD_MODES, pin.0 as u32, mode, &[])?;
		Ok(())
	}

	fn set_pull(&mut self, pin: Pin, pull: Pull) -> crate::AResult<()> {
		let pull = match pull {
			Pull::Off => 0,
			Pull::Down => 1,
			Pull::Up => 2,
		};
		self.send(CMD_PUD, pin.0 as u32, pull, &[])?;
		Ok(())
	}

	fn write(&mut self, pin: Pin, level: Level) -> crate::AResult<()> {
		let level = match level {
			Level::Low => 0,
			Level::High => 1,
		};
		self.send(CMD_WRITE, pin.0 as u32, level, &[])?;
		Ok(())
	}

	fn read(&mut self, pin: Pin) -> crate::AResult<Level> {
		let level = self.send(CMD_READ, pin.0 as u32, 0, &[])?;
		Ok(Level::from(level != 0))
	}

	fn bb_i2c_open(&mut self, sda: Pin, scl: Pin, baud: u32) -> crate::AResult<()> {
		self.send(CMD_BI2CO, sda.0 as u32, scl.0 as u32, &le_u32_to_bytes(baud))?;
		Ok(())
	}

	fn bb_i2c_zip(&mut self, sda: Pin, frame: &[u8]) -> crate::AResult<Vec<u8>> {
		self.send_and_receive(CMD_BI2CZ, sda.0 as u32, 0, frame)
	}

	fn bb_i2c_close(&mut self, sda: Pin) -> crate::AResult<()> {
		self.send(CMD_BI2CC, sda.0 as u32, 0, &[])?;
		Ok(())
	}

	fn stop(&mut self) -> crate::AResult<()> {
		if self.stopped {
			return Ok(());
		}
		self.stopped = true;
		self.stream.close()?;
		Ok(())
	}
}
