use std::io;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use mish::constants::{MAX_LINE_LEN, PROMPT};
use mish::eval::{self, EvalResult};
use mish::global;
use mish::parser;
use mish::signal::SignalBridge;

fn main() -> Result<()> {
	env_logger::init();

	let signals = SignalBridge::install().context("installing SIGINT handler")?;
	let mut state = global::State::new(signals);

	let mut stderr = io::stderr();
	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	loop {
		let _ = stderr.write_all(PROMPT);
		let _ = stderr.flush();
		let mut line: Vec<u8> = vec![];
		let n = stdin_locked.read_until(b'\n', &mut line).context("reading command line")?;
		if n == 0 {
			log::debug!("end of input");
			return Ok(());
		}
		if line.len() - line.ends_with(b"\n") as usize > MAX_LINE_LEN {
			eprintln!("mish: line too long (at most {} bytes)", MAX_LINE_LEN);
			continue;
		}
		let pipeline = match parser::parse(&line) {
			Ok(Some(pipeline)) => pipeline,
			Ok(None) => { continue; },
			Err(e) => {
				eprintln!("mish: {}", e);
				continue;
			},
		};
		match eval::eval(&mut state, &pipeline) {
			EvalResult::Builtin(s) => log::debug!("built-ins finished with {}", s),
			EvalResult::Reaped(statuses) => log::debug!("pipeline finished: {:?}", statuses),
			EvalResult::Rejected => {},
		}
	}
}
