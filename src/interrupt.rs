use std::fmt;
use std::io;
use std::mem;
use std::ptr;
use std::sync::atomic::{
	AtomicBool,
	Ordering,
};
use std::thread;
use std::time::{
	Duration,
	Instant,
};

use failure::Fail;

const SLEEP_SLICE: Duration = Duration::from_millis(10);

static SIGNALLED: AtomicBool = AtomicBool::new(false);
static NEVER: AtomicBool = AtomicBool::new(false);

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Operation aborted because of SIGINT/SIGTERM.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "interrupted")
	}
}

impl Fail for Interrupted {}

pub fn is_interrupted(e: &failure::Error) -> bool {
	e.iter_chain().any(|cause| cause.downcast_ref::<Interrupted>().is_some())
}

/// Shared "please stop" flag checked between bus operations.
#[derive(Clone, Copy)]
pub struct Interrupt(&'static AtomicBool);

impl Interrupt {
	/// Flag that is never raised.
	pub fn never() -> Self {
		Interrupt(&NEVER)
	}

	pub fn from_flag(flag: &'static AtomicBool) -> Self {
		Interrupt(flag)
	}

	/// Route SIGINT and SIGTERM into the returned flag.
	pub fn install() -> crate::AResult<Self> {
		for &signal in [libc::SIGINT, libc::SIGTERM].iter() {
			unsafe {
				let mut action: libc::sigaction = mem::zeroed();
				action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
				libc::sigemptyset(&mut action.sa_mask);
				// no SA_RESETHAND: a second signal shouldn't kill us while releasing the bus
				action.sa_flags = 0;
				if 0 != libc::sigaction(signal, &action, ptr::null_mut()) {
					let e = io::Error::last_os_error();
					bail!("couldn't install handler for signal {}: {}", signal, e);
				}
			}
		}
		Ok(Interrupt(&SIGNALLED))
	}

	pub fn is_raised(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	pub fn check(&self) -> crate::AResult<()> {
		if self.is_raised() {
			return Err(Interrupted.into());
		}
		Ok(())
	}

	/// Sleep for `duration`, returning early with `Interrupted`.
	pub fn sleep(&self, duration: Duration) -> crate::AResult<()> {
		let deadline = Instant::now() + duration;
		loop {
			self.check()?;
			let now = Instant::now();
			if now >= deadline {
				return Ok(());
			}
			reliable_sleep(std::cmp::min(deadline - now, SLEEP_SLICE));
		}
	}
}

impl fmt::Debug for Interrupt {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_tuple("Interrupt").field(&self.is_raised()).finish()
	}
}

extern "C" fn on_signal(_signal: libc::c_int) {
	SIGNALLED.store(true, Ordering::SeqCst);
}
