use crate::registry::ChildRegistry;
use crate::signal::SignalBridge;

/// Everything the shell keeps between lines. There is one per process.
pub struct State {
	pub registry: ChildRegistry,
	pub signals: SignalBridge,
}

impl State {
	pub fn new(signals: SignalBridge) -> State {
		State { registry: ChildRegistry::new(), signals: signals }
	}
}
