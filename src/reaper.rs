use nix::errno::Errno;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::constants::MAX_WAIT_FAILURES;
use crate::registry::ChildRegistry;
use crate::signal::{ChildWatch, SignalBridge};

pub trait WaitStatusExt {
	/// The pid of a child this status reports as gone for good.
	fn exited_pid(self) -> Option<Pid>;
}

impl WaitStatusExt for WaitStatus {
	fn exited_pid(self) -> Option<Pid> {
		match self {
			WaitStatus::Exited(pid, ..) => Some(pid),
			WaitStatus::Signaled(pid, ..) => Some(pid),
			_ => None,
		}
	}
}

/// The "wait for any child" primitive. EINTR means nothing was reaped yet.
pub trait Wait {
	fn wait_any(&mut self) -> nix::Result<WaitStatus>;
}

/// Waits on the real children of this process.
///
/// Children are collected with WNOHANG; when none has exited the caller
/// sleeps on a `ChildWatch` and the wake-up is reported as EINTR, so an
/// interrupt that lands before the sleep starts is still seen. Without a
/// watch this degrades to a blocking `wait`.
#[derive(Debug)]
pub struct SysWait {
	watch: Option<ChildWatch>,
}

impl SysWait {
	pub fn new() -> SysWait {
		let watch = match ChildWatch::start() {
			Ok(watch) => Some(watch),
			Err(e) => {
				log::warn!("cannot watch for child exits ({}), falling back to blocking wait", e);
				None
			},
		};
		SysWait { watch: watch }
	}
}

impl Wait for SysWait {
	fn wait_any(&mut self) -> nix::Result<WaitStatus> {
		let watch = match self.watch {
			Some(ref watch) => watch,
			None => { return wait::wait(); },
		};
		match wait::waitpid(None, Some(WaitPidFlag::WNOHANG))? {
			WaitStatus::StillAlive => {
				watch.sleep()?;
				Err(Errno::EINTR)
			},
			status => Ok(status),
		}
	}
}

/// Blocks until every registered child has been reaped.
pub fn drain(registry: &mut ChildRegistry, signals: &SignalBridge) -> Vec<WaitStatus> {
	if registry.is_empty() {
		return Vec::new();
	}
	drain_with(registry, signals, &mut SysWait::new())
}

/// Like `drain`, over an arbitrary wait primitive.
///
/// Pending interrupts are broadcast before every wait, which covers the EINTR
/// a handled SIGINT or a wake-up produces. Returns the exit statuses
/// observed, in the order the children went away.
pub fn drain_with<W: Wait>(registry: &mut ChildRegistry, signals: &SignalBridge, waiter: &mut W) -> Vec<WaitStatus> {
	let mut reaped = Vec::with_capacity(registry.len());
	let mut failures = 0;
	while !registry.is_empty() {
		signals.deliver_pending(registry);
		match waiter.wait_any() {
			Ok(status) => {
				failures = 0;
				match status.exited_pid() {
					Some(pid) => {
						if registry.unregister(pid) {
							log::debug!("reaped {:?}", status);
							reaped.push(status);
						} else {
							log::warn!("reaped {} which this shell did not spawn", pid);
						}
					},
					None => { log::debug!("ignoring {:?}", status); },
				}
			},
			Err(Errno::EINTR) => { log::trace!("wait interrupted"); },
			Err(Errno::ECHILD) => {
				eprintln!("mish: wait: no children left, forgetting {} registered", registry.len());
				registry.clear();
			},
			Err(e) => {
				eprintln!("mish: wait: {}", e.desc());
				failures += 1;
				if failures >= MAX_WAIT_FAILURES {
					eprintln!("mish: wait keeps failing, forgetting {} children", registry.len());
					registry.clear();
				}
			},
		}
	}
	reaped
}
