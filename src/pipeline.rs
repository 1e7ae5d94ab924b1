use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd};

use nix::fcntl::OFlag;
use nix::unistd::{self, ForkResult};
use thiserror::Error;

use crate::constants::STATUS_REDIRECT_FAILED;
use crate::executor;
use crate::registry::ChildRegistry;
use crate::signal;
use crate::types::{Command, Pipeline};

#[derive(Error, Debug)]
pub enum SpawnError {
	#[error("pipe: {0}")]
	Pipe(#[source] nix::Error),
	#[error("fork: {0}")]
	Fork(#[source] nix::Error),
}

// (read end, write end)
type Pipe = (OwnedFd, OwnedFd);

fn wire_child(in_pipe: Option<Pipe>, out_pipe: Option<Pipe>) -> nix::Result<()> {
	if let Some((read, write)) = in_pipe {
		unistd::dup2(read.as_raw_fd(), libc::STDIN_FILENO)?;
		drop(read);
		drop(write);
	}
	if let Some((read, write)) = out_pipe {
		unistd::dup2(write.as_raw_fd(), libc::STDOUT_FILENO)?;
		drop(read);
		drop(write);
	}
	Ok(())
}

fn abandon_child(command: &Command, what: &str, e: nix::Error) -> ! {
	let _ = writeln!(&mut io::stderr(), "mish: {}: {}: {}", String::from_utf8_lossy(command.name()), what, e);
	unsafe { libc::_exit(STATUS_REDIRECT_FAILED) }
}

/// Forks one child per stage, left to right, connecting neighbours with pipes
/// and registering each child as soon as it exists.
///
/// On error no further stage is started. Stages already forked stay in the
/// registry so that the following drain reaps them, and every pipe end the
/// parent still held is closed.
pub fn run(registry: &mut ChildRegistry, pipeline: &Pipeline) -> Result<(), SpawnError> {
	let commands = &pipeline.commands;
	assert!(!commands.is_empty());
	let last = commands.len() - 1;

	// Buffered output would otherwise be flushed once more by every child.
	let _ = io::stdout().flush();

	let mut in_pipe: Option<Pipe> = None;
	for (i, command) in commands.iter().enumerate() {
		let out_pipe = if i < last {
			Some(unistd::pipe2(OFlag::O_CLOEXEC).map_err(SpawnError::Pipe)?)
		} else {
			None
		};

		match unsafe { unistd::fork() }.map_err(SpawnError::Fork)? {
			ForkResult::Child => {
				if let Err(e) = signal::reset_for_exec() {
					abandon_child(command, "restoring signal dispositions", e);
				}
				if let Err(e) = wire_child(in_pipe.take(), out_pipe) {
					abandon_child(command, "connecting pipe", e);
				}
				executor::exec_command(command);
			},
			ForkResult::Parent { child } => {
				log::debug!("stage {} ({}) spawned as {}", i, String::from_utf8_lossy(command.name()), child);
				drop(in_pipe.take());
				in_pipe = out_pipe;
				registry.register(child);
			},
		}
	}
	Ok(())
}
