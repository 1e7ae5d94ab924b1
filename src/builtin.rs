use std::env;
use std::ffi::{OsStr, OsString};
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use nix::unistd::{self, User};

fn home_directory() -> Option<PathBuf> {
	if let Some(home) = env::var_os("HOME").filter(|h| !h.is_empty()) {
		return Some(PathBuf::from(home));
	}
	match User::from_uid(unistd::getuid()) {
		Ok(Some(user)) => Some(user.dir),
		Ok(None) => None,
		Err(e) => {
			log::debug!("user database lookup failed: {}", e);
			None
		},
	}
}

pub fn builtin_cd(arguments: &[&[u8]]) -> u8 {
	let target = match arguments.first() {
		Some(dir) => PathBuf::from(OsString::from(OsStr::from_bytes(dir))),
		None => match home_directory() {
			Some(home) => home,
			None => {
				eprintln!("mish: cd: could not determine home directory");
				return 1;
			},
		},
	};
	match env::set_current_dir(&target) {
		Ok(()) => 0,
		Err(e) => {
			eprintln!("mish: cd: {}: {}", target.display(), e);
			1
		},
	}
}

pub fn builtin_echo(arguments: &[&[u8]]) -> u8 {
	let mut line = arguments.join(&b' ');
	line.push(b'\n');
	let mut stdout = io::stdout();
	match stdout.write_all(&line).and_then(|_| stdout.flush()) {
		Ok(()) => 0,
		Err(e) => {
			eprintln!("mish: echo: {}", e);
			1
		},
	}
}

pub fn match_builtin(name: &[u8]) -> Option<fn(&[&[u8]]) -> u8> {
	match name {
		b"cd" => Some(builtin_cd),
		b"echo" => Some(builtin_echo),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn knows_only_cd_and_echo() {
		assert!(match_builtin(b"cd").is_some());
		assert!(match_builtin(b"echo").is_some());
		assert!(match_builtin(b"ls").is_none());
		assert!(match_builtin(b"rehash").is_none());
	}

	#[test]
	fn cd_to_missing_directory_fails() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("nowhere");
		assert_eq!(builtin_cd(&[missing.as_os_str().as_bytes()]), 1);
	}
}
