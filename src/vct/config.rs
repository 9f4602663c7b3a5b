use std::time::Duration;

use crate::gpio::Pin;
use crate::number::DeviceAddress;

/// Bounded wait for SDA and SCL to be released before a read.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WaitIdle {
	pub timeout: Duration,
	pub interval: Duration,
}

impl WaitIdle {
	pub fn with_timeout(timeout: Duration) -> Self {
		WaitIdle {
			timeout,
			interval: Duration::from_millis(1),
		}
	}
}

#[derive(Clone, Debug)]
pub struct Config {
	pub sda: Pin,
	pub scl: Pin,
	// "FA1": pulled low the VCT's own master keeps off the bus
	pub inhibit: Pin,
	pub speed: u32,
	pub start_delay: Duration,
	pub end_delay: Duration,
	pub read_delay: Duration,
	pub page_delay: Duration,
	pub ddp_address: DeviceAddress,
	pub wait_idle: Option<WaitIdle>,
}

pub const DEFAULT_SDA: u8 = 2;
pub const DEFAULT_SCL: u8 = 3;
pub const DEFAULT_INHIBIT: u8 = 17;
pub const DEFAULT_SPEED: u32 = 40_000;
pub const DEFAULT_START_DELAY_MS: u64 = 500;
pub const DEFAULT_END_DELAY_MS: u64 = 40;
pub const DEFAULT_READ_DELAY_MS: u64 = 0;
pub const DEFAULT_PAGE_DELAY_MS: u64 = 20;
pub const DEFAULT_DDP_ADDRESS: u8 = 0x45;

impl Default for Config {
	fn default() -> Self {
		Config {
			sda: Pin(DEFAULT_SDA),
			scl: Pin(DEFAULT_SCL),
			inhibit: Pin(DEFAULT_INHIBIT),
			speed: DEFAULT_SPEED,
			start_delay: Duration::from_millis(DEFAULT_START_DELAY_MS),
			end_delay: Duration::from_millis(DEFAULT_END_DELAY_MS),
			read_delay: Duration::from_millis(DEFAULT_READ_DELAY_MS),
			page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
			ddp_address: DeviceAddress::new(DEFAULT_DDP_ADDRESS).expect("default DDP address is 7-bit"),
			wait_idle: None,
		}
	}
}

impl Config {
	/// Same pins and addresses, but without any delays.
	#[cfg(test)]
	pub fn immediate() -> Self {
		Config {
			start_delay: Duration::from_millis(0),
			end_delay: Duration::from_millis(0),
			read_delay: Duration::from_millis(0),
			page_delay: Duration::from_millis(0),
			..Config::default()
		}
	}

	pub fn validate(&self) -> crate::AResult<()> {
		ensure!(self.sda != self.scl, "SDA and SCL must be different pins ({})", self.sda);
		ensure!(self.inhibit != self.sda && self.inhibit != self.scl,
			"inhibit pin {} collides with the I2C pins", self.inhibit
		);
		ensure!(self.speed > 0, "I2C speed must not be zero");
		if let Some(wait) = self.wait_idle {
			ensure!(wait.interval > Duration::from_millis(0), "idle poll interval must not be zero");
		}
		Ok(())
	}
}
