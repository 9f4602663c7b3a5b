use std::io::{
	self,
	Write,
};

/// `0xAB 0xCD ...`
pub fn format_hex(data: &[u8]) -> String {
	data.iter().map(|b| format!("0x{:02X}", b)).collect::<Vec<_>>().join(" ")
}

/// Classic 16 bytes per line dump; `base` is the offset of `data[0]`.
pub fn hexdump<W: Write>(out: &mut W, base: usize, data: &[u8]) -> io::Result<()> {
	for (i, byte) in data.iter().enumerate() {
		if 0 == i % 16 {
			write!(out, "{:08x} ", base + i)?;
		} else if 0 == i % 8 {
			write!(out, " ")?;
		}
		write!(out, " {:02x}", byte)?;
		if 15 == i % 16 {
			writeln!(out)?;
		}
	}
	if 0 != data.len() % 16 {
		writeln!(out)?;
	}
	Ok(())
}
