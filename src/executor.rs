use std::convert::Infallible;
use std::ffi::{self, CString, OsStr};
use std::io::{self, Write};
use std::{fs, os::unix::ffi::OsStrExt, os::unix::io::{IntoRawFd, RawFd}};

use nix::errno::Errno;
use nix::unistd;
use thiserror::Error;

use crate::constants::{STATUS_CANNOT_EXECUTE, STATUS_NOT_FOUND, STATUS_REDIRECT_FAILED};
use crate::types::Command;

#[derive(Error, Debug)]
pub enum ExecError {
	#[error("{path}: {source}")]
	Open {
		path: String,
		#[source]
		source: io::Error,
	},
	#[error("redirecting standard stream: {0}")]
	Dup(#[from] nix::Error),
	#[error("{0}: argument contains a nul byte")]
	Nul(String, #[source] ffi::NulError),
	#[error("{program}: {}", describe(.source))]
	Exec {
		program: String,
		source: nix::Error,
	},
}

impl ExecError {
	/// The status a child leaves with after this failure, kept apart from
	/// statuses a program picks for itself.
	pub fn exit_status(&self) -> i32 {
		match *self {
			ExecError::Open { .. } | ExecError::Dup(_) => STATUS_REDIRECT_FAILED,
			ExecError::Nul(..) => STATUS_CANNOT_EXECUTE,
			ExecError::Exec { source: Errno::ENOENT, .. } => STATUS_NOT_FOUND,
			ExecError::Exec { .. } => STATUS_CANNOT_EXECUTE,
		}
	}
}

fn describe(e: &Errno) -> &'static str {
	match *e {
		Errno::ENOENT => "command not found",
		e => e.desc(),
	}
}

fn lossy(bytes: &[u8]) -> String {
	String::from_utf8_lossy(bytes).into_owned()
}

fn redirect(path: &[u8], options: &fs::OpenOptions, to: RawFd) -> Result<(), ExecError> {
	let file = options.open(OsStr::from_bytes(path)).map_err(|e| ExecError::Open { path: lossy(path), source: e })?;
	install(file.into_raw_fd(), to)?;
	Ok(())
}

// With `to` closed beforehand, open hands back `to` itself and must stay open.
fn install(fd: RawFd, to: RawFd) -> nix::Result<()> {
	if fd == to {
		return Ok(());
	}
	unistd::dup2(fd, to)?;
	unistd::close(fd)
}

/// Binds the command's input and output files onto stdin and stdout.
pub fn prepare(command: &Command) -> Result<(), ExecError> {
	if let Some(infile) = command.infile {
		redirect(infile, fs::OpenOptions::new().read(true), libc::STDIN_FILENO)?;
	}
	if let Some(outfile) = command.outfile {
		redirect(outfile, fs::OpenOptions::new().write(true).create(true).truncate(true), libc::STDOUT_FILENO)?;
	}
	Ok(())
}

fn do_exec_command(command: &Command) -> Result<Infallible, ExecError> {
	prepare(command)?;
	let argv: Result<Vec<CString>, ffi::NulError> = command.argv.iter().map(|&s| CString::new(s)).collect();
	let argv = argv.map_err(|e| ExecError::Nul(lossy(command.name()), e))?;
	unistd::execvp(&argv[0], &argv).map_err(|e| ExecError::Exec { program: lossy(command.name()), source: e })
}

/// Turns the calling child into `command`, or terminates it.
///
/// Only ever called in a freshly forked child. `_exit` skips destructors, so
/// whatever parent state the child inherited is dropped on the floor rather
/// than torn down.
pub fn exec_command(command: &Command) -> ! {
	let status = match do_exec_command(command) {
		Ok(never) => match never {},
		Err(e) => {
			let _ = writeln!(&mut io::stderr(), "mish: {}", e);
			e.exit_status()
		},
	};
	unsafe { libc::_exit(status) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn statuses_are_distinguishable() {
		let open = ExecError::Open { path: "x".to_string(), source: io::Error::from(io::ErrorKind::NotFound) };
		let missing = ExecError::Exec { program: "x".to_string(), source: Errno::ENOENT };
		let denied = ExecError::Exec { program: "x".to_string(), source: Errno::EACCES };

		assert_eq!(open.exit_status(), STATUS_REDIRECT_FAILED);
		assert_eq!(ExecError::Dup(Errno::EBADF).exit_status(), STATUS_REDIRECT_FAILED);
		assert_eq!(missing.exit_status(), STATUS_NOT_FOUND);
		assert_eq!(denied.exit_status(), STATUS_CANNOT_EXECUTE);
	}

	#[test]
	fn reports_name_the_program() {
		let missing = ExecError::Exec { program: "frobnicate".to_string(), source: Errno::ENOENT };
		assert_eq!(missing.to_string(), "frobnicate: command not found");

		let denied = ExecError::Exec { program: "./script".to_string(), source: Errno::EACCES };
		assert!(denied.to_string().starts_with("./script: "));
	}

	#[test]
	fn descriptor_already_in_place_stays_open() {
		use std::os::unix::io::FromRawFd;

		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("out");
		let fd = fs::File::create(&path).unwrap().into_raw_fd();

		install(fd, fd).unwrap();

		let mut file = unsafe { fs::File::from_raw_fd(fd) };
		file.write_all(b"kept").unwrap();
		drop(file);
		assert_eq!(fs::read_to_string(&path).unwrap(), "kept");
	}

	#[test]
	fn descriptor_moves_onto_target() {
		use std::os::unix::io::FromRawFd;

		let dir = tempfile::tempdir().unwrap();
		let first = dir.path().join("first");
		let second = dir.path().join("second");
		let from = fs::File::create(&first).unwrap().into_raw_fd();
		let to = fs::File::create(&second).unwrap().into_raw_fd();

		install(from, to).unwrap();

		let mut file = unsafe { fs::File::from_raw_fd(to) };
		file.write_all(b"moved").unwrap();
		drop(file);
		assert_eq!(fs::read_to_string(&first).unwrap(), "moved");
		assert_eq!(fs::read_to_string(&second).unwrap(), "");
	}

	#[test]
	fn missing_input_file_fails_preparation() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("absent");
		let mut command = Command::new(vec![&b"cat"[..]]);
		command.infile = Some(path.as_os_str().as_bytes());

		match prepare(&command) {
			Err(ref e @ ExecError::Open { .. }) => {
				assert_eq!(e.exit_status(), STATUS_REDIRECT_FAILED);
				assert!(e.to_string().contains("absent"));
			},
			other => panic!("unexpected {:?}", other),
		}
	}
}
