use std::fmt;
use std::str;

/// Parse decimal or `0x`-prefixed hexadecimal.
pub fn parse_u32(s: &str) -> crate::AResult<u32> {
	let parsed = if s.starts_with("0x") || s.starts_with("0X") {
		u32::from_str_radix(&s[2..], 16)
	} else {
		s.parse::<u32>()
	};
	parsed.map_err(|_| format_err!("Invalid input ({}). Please use integer or hex string (e.g. 0x4d)", s))
}

pub fn parse_byte(s: &str) -> crate::AResult<u8> {
	let value = parse_u32(s)?;
	ensure!(value <= 0xff, "Invalid input ({}): doesn't fit into a byte", s);
	Ok(value as u8)
}

pub fn parse_address(s: &str) -> crate::AResult<DeviceAddress> {
	s.parse()
}

/// 7-bit I2C address; on the VCT it also selects the 256-byte page.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
	pub fn new(address: u8) -> crate::AResult<Self> {
		ensure!(address < 0x80, "Invalid I2C address 0x{:02x}: must be 7-bit", address);
		Ok(DeviceAddress(address))
	}

	pub fn get(self) -> u8 {
		self.0
	}

	/// All addresses from `first` to `last`, both included.
	pub fn range_inclusive(first: Self, last: Self) -> impl Iterator<Item = Self> {
		(first.0..=last.0).map(DeviceAddress)
	}
}

impl fmt::Display for DeviceAddress {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl str::FromStr for DeviceAddress {
	type Err = failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		DeviceAddress::new(parse_byte(s)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hex_and_decimal() {
		assert_eq!(parse_byte("0x4D").unwrap(), 77);
		assert_eq!(parse_byte("0x4d").unwrap(), 77);
		assert_eq!(parse_byte("77").unwrap(), 77);
		assert_eq!(parse_u32("40000").unwrap(), 40000);
	}

	#[test]
	fn rejects_garbage() {
		assert!(parse_byte("zz").is_err());
		assert!(parse_byte("0x").is_err());
		assert!(parse_byte("").is_err());
		assert!(parse_byte("-1").is_err());
		assert!(parse_byte("0x100").is_err());
	}

	#[test]
	fn device_address_is_7bit() {
		assert_eq!("0x50".parse::<DeviceAddress>().unwrap().get(), 0x50);
		assert!("0x80".parse::<DeviceAddress>().is_err());
		let all: Vec<u8> = DeviceAddress::range_inclusive(DeviceAddress(0x7e), DeviceAddress(0x7f))
			.map(DeviceAddress::get)
			.collect();
		assert_eq!(all, vec![0x7e, 0x7f]);
	}
}
