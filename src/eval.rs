use nix::sys::wait::WaitStatus;

use crate::builtin;
use crate::global;
use crate::pipeline;
use crate::reaper;
use crate::types::Pipeline;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Kind { Internal, External, Mixed }

pub fn classify(pipeline: &Pipeline) -> Kind {
	let internal = pipeline.commands.iter().filter(|c| builtin::match_builtin(c.name()).is_some()).count();
	if internal == 0 {
		Kind::External
	} else if internal == pipeline.commands.len() {
		Kind::Internal
	} else {
		Kind::Mixed
	}
}

pub enum EvalResult {
	/// Built-ins ran in the shell itself; the status of the last one.
	Builtin(u8),
	/// Children were spawned and reaped.
	Reaped(Vec<WaitStatus>),
	Rejected,
}

// Built-ins run one after another in the shell process, without pipes or
// redirections.
fn run_builtins(pipeline: &Pipeline) -> u8 {
	let mut status = 0;
	for command in &pipeline.commands {
		if let Some(func) = builtin::match_builtin(command.name()) {
			status = func(command.arguments());
		}
	}
	status
}

fn run_external(state: &mut global::State, pipeline: &Pipeline) -> Vec<WaitStatus> {
	if !state.registry.is_empty() {
		log::warn!("{} children left over from an earlier pipeline, reaping them first", state.registry.len());
		reaper::drain(&mut state.registry, &state.signals);
	}
	// An interrupt taken while nothing ran is not meant for this pipeline.
	if state.signals.take_pending() {
		log::debug!("discarding interrupt received at the prompt");
	}
	if let Err(e) = pipeline::run(&mut state.registry, pipeline) {
		eprintln!("mish: {}", e);
	}
	reaper::drain(&mut state.registry, &state.signals)
}

pub fn eval(state: &mut global::State, pipeline: &Pipeline) -> EvalResult {
	match classify(pipeline) {
		Kind::Internal => EvalResult::Builtin(run_builtins(pipeline)),
		Kind::External => EvalResult::Reaped(run_external(state, pipeline)),
		Kind::Mixed => {
			eprintln!("mish: built-in and external commands cannot share a pipeline");
			EvalResult::Rejected
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::AtomicBool;

	use nix::unistd::Pid;

	use crate::parser;
	use crate::signal::{self, SignalBridge};

	fn kind_of(line: &[u8]) -> Kind {
		classify(&parser::parse(line).unwrap().unwrap())
	}

	#[test]
	fn classifies_pipelines() {
		assert_eq!(kind_of(b"echo hi"), Kind::Internal);
		assert_eq!(kind_of(b"cd /tmp | echo x"), Kind::Internal);
		assert_eq!(kind_of(b"ls -l | wc"), Kind::External);
		assert_eq!(kind_of(b"echo hi | wc -c"), Kind::Mixed);
		assert_eq!(kind_of(b"ls | cd"), Kind::Mixed);
	}

	#[test]
	fn builtins_report_last_status() {
		let dir = tempfile::tempdir().unwrap();
		let line = format!("echo ok | cd {}/missing", dir.path().display());
		let pipeline = parser::parse(line.as_bytes()).unwrap().unwrap();
		assert_eq!(run_builtins(&pipeline), 1);
	}

	#[test]
	fn leftover_children_are_reaped_before_spawning() {
		static FLAG: AtomicBool = AtomicBool::new(false);
		let _guard = signal::PROCESS_SIGNALS.lock().unwrap_or_else(|e| e.into_inner());
		let mut state = global::State::new(SignalBridge::detached(&FLAG));
		// Not a child of this process, so the first drain finds nothing to wait for.
		state.registry.register(Pid::from_raw(0x3fff_fff3));

		let pipeline = parser::parse(b"true").unwrap().unwrap();
		match eval(&mut state, &pipeline) {
			EvalResult::Reaped(statuses) => {
				assert_eq!(statuses.len(), 1);
				assert!(matches!(statuses[0], WaitStatus::Exited(_, 0)));
			},
			_ => panic!("true is not a built-in"),
		}
		assert!(state.registry.is_empty());
	}
}
