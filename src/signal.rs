use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::{mem, ptr};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::poll::{self, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd;

use crate::registry::ChildRegistry;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
// Write end of the pipe a sleeping drain polls, or -1.
static WAKE_FD: AtomicI32 = AtomicI32::new(-1);

fn poke() {
	let fd = WAKE_FD.load(Ordering::SeqCst);
	if fd < 0 {
		return;
	}
	let saved = Errno::last_raw();
	unsafe { libc::write(fd, b"!".as_ptr().cast(), 1) };
	Errno::set_raw(saved);
}

extern "C" fn note_interrupt(_: libc::c_int) {
	INTERRUPTED.store(true, Ordering::SeqCst);
	poke();
}

extern "C" fn note_child(_: libc::c_int) {
	poke();
}

/// Puts back dispositions a program expects to start with. Ignored signals
/// survive exec, and the Rust runtime ignores SIGPIPE in the shell.
pub fn reset_for_exec() -> nix::Result<()> {
	unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) }?;
	Ok(())
}

fn interrupt_ignored() -> nix::Result<bool> {
	let mut current: libc::sigaction = unsafe { mem::zeroed() };
	let r = unsafe { libc::sigaction(libc::SIGINT, ptr::null(), &mut current) };
	Errno::result(r)?;
	Ok(current.sa_sigaction == libc::SIG_IGN)
}

/// Connects SIGINT delivered to the shell with the children it owns.
///
/// The handler only raises a flag. The broadcast itself happens when the
/// reaper reaches a safe point and calls `deliver_pending`.
#[derive(Debug)]
pub struct SignalBridge {
	pending: &'static AtomicBool,
	installed: bool,
}

impl SignalBridge {
	/// Installs the interrupt handler, unless SIGINT was handed to us ignored.
	pub fn install() -> nix::Result<SignalBridge> {
		if interrupt_ignored()? {
			log::debug!("SIGINT is ignored, leaving its disposition alone");
			return Ok(SignalBridge { pending: &INTERRUPTED, installed: false });
		}
		let action = SigAction::new(SigHandler::Handler(note_interrupt), SaFlags::empty(), SigSet::empty());
		unsafe { signal::sigaction(Signal::SIGINT, &action) }?;
		log::debug!("SIGINT handler installed");
		Ok(SignalBridge { pending: &INTERRUPTED, installed: true })
	}

	/// A bridge driven by a caller-owned flag, with no handler behind it.
	pub fn detached(flag: &'static AtomicBool) -> SignalBridge {
		SignalBridge { pending: flag, installed: false }
	}

	pub fn is_installed(&self) -> bool {
		self.installed
	}

	pub fn take_pending(&self) -> bool {
		self.pending.swap(false, Ordering::SeqCst)
	}

	/// Sends SIGINT to every registered child and returns how many deliveries
	/// succeeded. A failed delivery is reported and the rest still go out.
	pub fn broadcast(&self, registry: &ChildRegistry) -> usize {
		let mut delivered = 0;
		registry.for_each(|pid| {
			match signal::kill(pid, Signal::SIGINT) {
				Ok(()) => { delivered += 1; },
				Err(e) => { eprintln!("mish: kill {}: {}", pid, e.desc()); },
			}
		});
		log::debug!("interrupt delivered to {} of {} children", delivered, registry.len());
		delivered
	}

	/// Broadcasts if an interrupt arrived since the last check.
	pub fn deliver_pending(&self, registry: &ChildRegistry) -> bool {
		if !self.take_pending() {
			return false;
		}
		self.broadcast(registry);
		true
	}
}

/// Lets a drain sleep until a child exits or an interrupt arrives.
///
/// Both handlers write a byte to the pipe, so a wake-up is never lost, on
/// whichever thread the signal lands. Only one watch may exist at a time.
#[derive(Debug)]
pub struct ChildWatch {
	read: OwnedFd,
	write: OwnedFd,
	previous: SigAction,
}

impl ChildWatch {
	pub fn start() -> nix::Result<ChildWatch> {
		let (read, write) = unistd::pipe2(OFlag::O_CLOEXEC | OFlag::O_NONBLOCK)?;
		if WAKE_FD.compare_exchange(-1, write.as_raw_fd(), Ordering::SeqCst, Ordering::SeqCst).is_err() {
			return Err(Errno::EBUSY);
		}
		let action = SigAction::new(SigHandler::Handler(note_child), SaFlags::SA_NOCLDSTOP | SaFlags::SA_RESTART, SigSet::empty());
		match unsafe { signal::sigaction(Signal::SIGCHLD, &action) } {
			Ok(previous) => Ok(ChildWatch { read: read, write: write, previous: previous }),
			Err(e) => {
				WAKE_FD.store(-1, Ordering::SeqCst);
				Err(e)
			},
		}
	}

	/// Blocks until something poked the pipe since the last call.
	pub fn sleep(&self) -> nix::Result<()> {
		let mut fds = [PollFd::new(self.read.as_fd(), PollFlags::POLLIN)];
		match poll::poll(&mut fds, PollTimeout::NONE) {
			Ok(_) | Err(Errno::EINTR) => {},
			Err(e) => { return Err(e); },
		}
		let mut buf = [0u8; 64];
		while let Ok(n) = unistd::read(self.read.as_raw_fd(), &mut buf) {
			if n < buf.len() { break; }
		}
		Ok(())
	}
}

impl Drop for ChildWatch {
	fn drop(&mut self) {
		let _ = unsafe { signal::sigaction(Signal::SIGCHLD, &self.previous) };
		let _ = WAKE_FD.compare_exchange(self.write.as_raw_fd(), -1, Ordering::SeqCst, Ordering::SeqCst);
	}
}

// Tests that install handlers or start a watch share process-wide state.
#[cfg(test)]
pub(crate) static PROCESS_SIGNALS: std::sync::Mutex<()> = std::sync::Mutex::new(());
