use std::collections::HashMap;

use nix::unistd::Pid;

/// The children this shell currently owns: every pid that has been forked and
/// not yet observed to exit.
///
/// Entries are keyed by pid and remember their spawn order, so membership and
/// removal do not depend on where an entry sits.
#[derive(Debug, Default)]
pub struct ChildRegistry {
	imp: HashMap<Pid, u64>,
	next_seq: u64,
}

impl ChildRegistry {
	pub fn new() -> ChildRegistry {
		ChildRegistry { imp: HashMap::new(), next_seq: 0 }
	}

	/// Records a freshly spawned child. Returns false, leaving the registry
	/// untouched, if the pid is already tracked.
	pub fn register(&mut self, pid: Pid) -> bool {
		if self.imp.contains_key(&pid) {
			log::warn!("pid {} registered twice", pid);
			return false;
		}
		self.imp.insert(pid, self.next_seq);
		self.next_seq += 1;
		log::trace!("registered {} ({} live)", pid, self.imp.len());
		true
	}

	/// Forgets a child that has been reaped. Unknown pids are ignored.
	pub fn unregister(&mut self, pid: Pid) -> bool {
		let removed = self.imp.remove(&pid).is_some();
		if removed {
			log::trace!("unregistered {} ({} live)", pid, self.imp.len());
		}
		removed
	}

	pub fn contains(&self, pid: Pid) -> bool {
		self.imp.contains_key(&pid)
	}

	pub fn is_empty(&self) -> bool {
		self.imp.is_empty()
	}

	pub fn len(&self) -> usize {
		self.imp.len()
	}

	/// Live pids, oldest first.
	pub fn pids(&self) -> Vec<Pid> {
		let mut entries: Vec<(u64, Pid)> = self.imp.iter().map(|(&pid, &seq)| (seq, pid)).collect();
		entries.sort_unstable();
		entries.into_iter().map(|(_, pid)| pid).collect()
	}

	pub fn for_each<F>(&self, mut visit: F) where F: FnMut(Pid) {
		for pid in self.pids() {
			visit(pid);
		}
	}

	pub fn clear(&mut self) {
		self.imp.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pid(n: i32) -> Pid {
		Pid::from_raw(n)
	}

	#[test]
	fn starts_empty() {
		let registry = ChildRegistry::new();
		assert!(registry.is_empty());
		assert_eq!(registry.len(), 0);
		assert!(registry.pids().is_empty());
	}

	#[test]
	fn keeps_spawn_order() {
		let mut registry = ChildRegistry::new();
		for &n in &[300, 12, 4711, 99] {
			assert!(registry.register(pid(n)));
		}
		assert_eq!(registry.pids(), vec![pid(300), pid(12), pid(4711), pid(99)]);

		let mut visited = vec![];
		registry.for_each(|p| visited.push(p));
		assert_eq!(visited, registry.pids());
	}

	#[test]
	fn removal_is_by_value() {
		let mut registry = ChildRegistry::new();
		registry.register(pid(10));
		registry.register(pid(20));
		registry.register(pid(30));

		assert!(registry.unregister(pid(20)));
		assert!(!registry.contains(pid(20)));
		assert_eq!(registry.pids(), vec![pid(10), pid(30)]);

		assert!(registry.unregister(pid(10)));
		assert!(registry.unregister(pid(30)));
		assert!(registry.is_empty());
	}

	#[test]
	fn register_then_unregister_leaves_no_trace() {
		let mut registry = ChildRegistry::new();
		registry.register(pid(1));
		registry.register(pid(2));
		let before = registry.pids();

		registry.register(pid(3));
		registry.unregister(pid(3));

		assert_eq!(registry.pids(), before);
		assert_eq!(registry.len(), 2);
		assert!(!registry.contains(pid(3)));
	}

	#[test]
	fn unknown_pid_is_ignored() {
		let mut registry = ChildRegistry::new();
		registry.register(pid(5));
		assert!(!registry.unregister(pid(6)));
		assert_eq!(registry.pids(), vec![pid(5)]);
	}

	#[test]
	fn duplicate_is_refused() {
		let mut registry = ChildRegistry::new();
		assert!(registry.register(pid(7)));
		assert!(!registry.register(pid(7)));
		assert_eq!(registry.len(), 1);

		registry.unregister(pid(7));
		assert!(registry.is_empty());
	}
}
