#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Command<'a> {
	pub argv: Vec<&'a [u8]>,
	pub infile: Option<&'a [u8]>,
	pub outfile: Option<&'a [u8]>,
}

impl<'a> Command<'a> {
	pub fn new(argv: Vec<&'a [u8]>) -> Command<'a> {
		assert!(!argv.is_empty(), "command without a program name");
		Command { argv: argv, infile: None, outfile: None }
	}

	pub fn name(&self) -> &'a [u8] {
		self.argv[0]
	}

	pub fn arguments(&self) -> &[&'a [u8]] {
		&self.argv[1..]
	}

	pub fn argc(&self) -> usize {
		self.argv.len()
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Pipeline<'a> {
	pub commands: Vec<Command<'a>>,
}
