#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate vct49xl_i2c;
use vct49xl_i2c::*;

use std::io::{
	self,
	Write,
};
use std::process::exit;
use std::time::Duration;

use clap::{
	App,
	AppSettings,
	Arg,
	ArgGroup,
};

use vct49xl_i2c::gpio::{
	GpioDriver,
	Pigpiod,
	Pin,
};
use vct49xl_i2c::interrupt::{
	Interrupt,
	is_interrupted,
};
use vct49xl_i2c::number::{
	DeviceAddress,
	parse_address,
	parse_byte,
	parse_u32,
};
use vct49xl_i2c::vct::{
	Config,
	Vct,
	WaitIdle,
};

enum Operation {
	ReadByte {
		address: DeviceAddress,
		offset: u8,
	},
	WriteByte {
		address: DeviceAddress,
		offset: u8,
		value: u8,
	},
	WriteDdp {
		sub_address: u8,
		high: u8,
		low: u8,
	},
	ReadRange {
		address: DeviceAddress,
		offset_start: u8,
		offset_end: u8,
	},
	ReadPages {
		page_start: DeviceAddress,
		page_end: DeviceAddress,
	},
}

enum Output {
	Ack(Vec<u8>),
	Range {
		offset_start: u8,
		data: Vec<Vec<u8>>,
	},
	Pages {
		page_start: DeviceAddress,
		pages: Vec<Vec<Vec<u8>>>,
	},
}

fn parse_value<T>(name: &str, value: &str, parse: fn(&str) -> AResult<T>) -> AResult<T> {
	parse(value).map_err(|e| {
		let msg = format!("invalid parameter --{}: {}", name, e);
		e.context(msg).into()
	})
}

const DEFAULT_IO_TIMEOUT_MS: u64 = 5000;

/// Options without a clap default fall back to `Config::default()` and friends.
fn get_optional<T>(matches: &clap::ArgMatches, name: &str, parse: fn(&str) -> AResult<T>) -> AResult<Option<T>> {
	match matches.value_of(name) {
		Some(param) => Ok(Some(parse_value(name, param, parse)?)),
		None => Ok(None),
	}
}

fn get_millis(matches: &clap::ArgMatches, name: &str) -> AResult<Option<Duration>> {
	Ok(get_optional(matches, name, parse_u32)?.map(|ms| Duration::from_millis(ms as u64)))
}

fn get_values<'a>(matches: &'a clap::ArgMatches<'a>, name: &str) -> Option<Vec<&'a str>> {
	matches.values_of(name).map(|v| v.collect())
}

fn operation(matches: &clap::ArgMatches) -> AResult<Operation> {
	if let Some(v) = get_values(matches, "rbo") {
		return Ok(Operation::ReadByte {
			address: parse_value("rbo", v[0], parse_address)?,
			offset: parse_value("rbo", v[1], parse_byte)?,
		});
	}
	if let Some(v) = get_values(matches, "wbo") {
		return Ok(Operation::WriteByte {
			address: parse_value("wbo", v[0], parse_address)?,
			offset: parse_value("wbo", v[1], parse_byte)?,
			value: parse_value("wbo", v[2], parse_byte)?,
		});
	}
	if let Some(v) = get_values(matches, "wddp") {
		return Ok(Operation::WriteDdp {
			sub_address: parse_value("wddp", v[0], parse_byte)?,
			high: parse_value("wddp", v[1], parse_byte)?,
			low: parse_value("wddp", v[2], parse_byte)?,
		});
	}
	if let Some(v) = get_values(matches, "read-ram-block-page") {
		let address = parse_value("read-ram-block-page", v[0], parse_address)?;
		let offset_start = parse_value("read-ram-block-page", v[1], parse_byte)?;
		let offset_end = parse_value("read-ram-block-page", v[2], parse_byte)?;
		ensure!(offset_start <= offset_end, "offset_start 0x{:02x} is after offset_end 0x{:02x}", offset_start, offset_end);
		return Ok(Operation::ReadRange {
			address,
			offset_start,
			offset_end,
		});
	}
	if let Some(v) = get_values(matches, "read-ram-block") {
		let page_start = parse_value("read-ram-block", v[0], parse_address)?;
		let page_end = parse_value("read-ram-block", v[1], parse_address)?;
		ensure!(page_start <= page_end, "address_start {} is after address_end {}", page_start, page_end);
		return Ok(Operation::ReadPages {
			page_start,
			page_end,
		});
	}
	bail!("no operation given")
}

fn config(matches: &clap::ArgMatches) -> AResult<Config> {
	let default = Config::default();

	Ok(Config {
		sda: get_optional(matches, "sda", parse_byte)?.map_or(default.sda, Pin),
		scl: get_optional(matches, "scl", parse_byte)?.map_or(default.scl, Pin),
		inhibit: get_optional(matches, "inhibit-pin", parse_byte)?.map_or(default.inhibit, Pin),
		speed: get_optional(matches, "speed", parse_u32)?.unwrap_or(default.speed),
		start_delay: get_millis(matches, "start-delay")?.unwrap_or(default.start_delay),
		end_delay: get_millis(matches, "end-delay")?.unwrap_or(default.end_delay),
		read_delay: get_millis(matches, "read-delay")?.unwrap_or(default.read_delay),
		page_delay: get_millis(matches, "page-delay")?.unwrap_or(default.page_delay),
		ddp_address: get_optional(matches, "ddp-address", parse_address)?.unwrap_or(default.ddp_address),
		wait_idle: get_millis(matches, "wait-idle")?.map(WaitIdle::with_timeout),
	})
}

fn execute<D: GpioDriver>(vct: &mut Vct<D>, op: &Operation) -> AResult<Output> {
	let mut tx = vct.transaction()?;
	let output = match *op {
		Operation::ReadByte { address, offset } => {
			Output::Ack(tx.read_byte(address, offset)?)
		},
		Operation::WriteByte { address, offset, value } => {
			Output::Ack(tx.write_byte(address, offset, value)?)
		},
		Operation::WriteDdp { sub_address, high, low } => {
			Output::Ack(tx.write_ddp(sub_address, high, low)?)
		},
		Operation::ReadRange { address, offset_start, offset_end } => {
			Output::Range {
				offset_start,
				data: tx.read_range(address, offset_start, offset_end)?,
			}
		},
		Operation::ReadPages { page_start, page_end } => {
			Output::Pages {
				page_start,
				pages: tx.read_pages(page_start, page_end)?,
			}
		},
	};
	tx.finish()?;

	Ok(output)
}

fn print_output(result: &Output, hexdump: bool) -> AResult<()> {
	let stdout = io::stdout();
	let mut out = stdout.lock();

	match result {
		Output::Ack(data) => {
			writeln!(out, "{}", output::format_hex(data))?;
		},
		Output::Range { offset_start, data } => {
			let data: Vec<u8> = data.concat();
			if hexdump {
				output::hexdump(&mut out, *offset_start as usize, &data)?;
			} else {
				out.write_all(&data)?;
			}
		},
		Output::Pages { page_start, pages } => {
			for (index, page) in pages.iter().enumerate() {
				let data: Vec<u8> = page.concat();
				if hexdump {
					writeln!(out, "page 0x{:02x}:", page_start.get() as usize + index)?;
					output::hexdump(&mut out, 0, &data)?;
				} else {
					out.write_all(&data)?;
				}
			}
		},
	}
	out.flush()?;

	Ok(())
}

fn app<'a, 'b>() -> App<'a, 'b> {
	app_from_crate!()
		.about("VCT cli tool can be used to talk to VCT49xl ICs through pigpiod")
		.after_help("Examples:\n\n    vct-cli --rbo 0x50 0x10")
		.setting(AppSettings::ArgRequiredElseHelp)
		.arg(Arg::with_name("rbo")
			.long("rbo")
			.number_of_values(2)
			.value_names(&["address", "offset"])
			.help("Read byte from address offset"))
		.arg(Arg::with_name("wbo")
			.long("wbo")
			.number_of_values(3)
			.value_names(&["address", "offset", "data"])
			.help("Write byte to address offset"))
		.arg(Arg::with_name("wddp")
			.long("wddp")
			.number_of_values(3)
			.value_names(&["subaddress", "hbyte", "lbyte"])
			.help("Write word to DDP register"))
		.arg(Arg::with_name("read-ram-block-page")
			.long("read-ram-block-page")
			.number_of_values(3)
			.value_names(&["address", "offset_start", "offset_end"])
			.help("Read RAM page block (raw bytes to stdout)"))
		.arg(Arg::with_name("read-ram-block")
			.long("read-ram-block")
			.number_of_values(2)
			.value_names(&["address_start", "address_end"])
			.help("Read full RAM pages (raw bytes to stdout)"))
		.group(ArgGroup::with_name("operation")
			.args(&["rbo", "wbo", "wddp", "read-ram-block-page", "read-ram-block"])
			.required(true))
		.arg(Arg::with_name("hexdump")
			.long("hexdump")
			.help("print block reads as hex dump instead of raw bytes"))
		.arg(Arg::with_name("host")
			.long("host")
			.takes_value(true)
			.env("PIGPIO_ADDR")
			.default_value(gpio::DEFAULT_HOST)
			.help("pigpiod host"))
		.arg(Arg::with_name("port")
			.long("port")
			.takes_value(true)
			.env("PIGPIO_PORT")
			.help("pigpiod port"))
		.arg(Arg::with_name("io-timeout")
			.long("io-timeout")
			.value_name("ms")
			.help("timeout for connecting and talking to pigpiod"))
		.arg(Arg::with_name("sda")
			.long("sda")
			.value_name("gpio")
			.help("I2C data pin"))
		.arg(Arg::with_name("scl")
			.long("scl")
			.value_name("gpio")
			.help("I2C clock pin"))
		.arg(Arg::with_name("inhibit-pin")
			.long("inhibit-pin")
			.value_name("gpio")
			.help("pin keeping the VCT's own I2C master off the bus (FA1)"))
		.arg(Arg::with_name("speed")
			.long("speed")
			.value_name("baud")
			.help("bit-bang I2C clock"))
		.arg(Arg::with_name("start-delay")
			.long("start-delay")
			.value_name("ms")
			.help("wait after inhibiting the VCT master"))
		.arg(Arg::with_name("end-delay")
			.long("end-delay")
			.value_name("ms")
			.help("wait before releasing the VCT master"))
		.arg(Arg::with_name("read-delay")
			.long("read-delay")
			.value_name("ms")
			.help("wait between selecting an offset and reading it"))
		.arg(Arg::with_name("page-delay")
			.long("page-delay")
			.value_name("ms")
			.help("wait after each full page"))
		.arg(Arg::with_name("ddp-address")
			.long("ddp-address")
			.value_name("address")
			.help("I2C address of the DDP register block"))
		.arg(Arg::with_name("wait-idle")
			.long("wait-idle")
			.value_name("ms")
			.help("before each read poll until SDA and SCL are high, giving up after this timeout"))
}

fn main_app() -> AResult<()> {
	let matches = app().get_matches();

	// validate everything before touching the hardware
	let op = operation(&matches)?;
	let config = config(&matches)?;
	config.validate()?;
	let host = matches.value_of("host").unwrap_or(gpio::DEFAULT_HOST);
	let port = get_optional(&matches, "port", parse_u32)?.unwrap_or(u32::from(gpio::DEFAULT_PORT));
	ensure!(port > 0 && port <= 0xffff, "invalid pigpiod port {}", port);
	let io_timeout = get_millis(&matches, "io-timeout")?.unwrap_or(Duration::from_millis(DEFAULT_IO_TIMEOUT_MS));
	ensure!(io_timeout > Duration::from_millis(0), "io-timeout must not be zero");

	let interrupt = Interrupt::install()?;
	let driver = Pigpiod::connect(host, port as u16, io_timeout)?;
	let mut vct = Vct::open(driver, &config, interrupt)?;

	let res = execute(&mut vct, &op);

	if let Err(e) = vct.shutdown() {
		warn!("Failed releasing GPIO resources: {}", e);
	}

	print_output(&res?, matches.is_present("hexdump"))
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		if is_interrupted(&e) {
			eprintln!("\nProcess terminated by user");
			exit(130);
		}
		error!("Error: {}", e);
		exit(1);
	}
}
