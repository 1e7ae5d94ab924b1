use thiserror::Error;

use crate::constants::MAX_COMMANDS;
use crate::types::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
	#[error("empty command")]
	EmptyCommand,
	#[error("missing file name after '{0}'")]
	MissingTarget(char),
	#[error("more than one '{0}' redirection for a command")]
	DuplicateRedirect(char),
	#[error("append redirection '>>' is not supported")]
	Append,
	#[error("background jobs are not supported")]
	Background,
	#[error("unexpected character: '{0}'")]
	UnexpectedChar(char),
	#[error("too many commands in pipeline (at most {})", MAX_COMMANDS)]
	TooManyCommands,
}

type ParseResult<T> = Result<T, ParseError>;

struct Parser<'a> {
	line: &'a [u8],
	i: usize,
}

impl<'a> Parser<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		matches!(c, b' ' | b'\t' | b'\n' | b'\r')
	}

	fn is_letter(c: u8) -> bool {
		match c {
			b'>' | b'<' | b'&' | b'|' => false,
			_ => !Parser::is_whitespace(c),
		}
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Parser::is_whitespace);
	}

	fn read_word(&mut self) -> &'a [u8] {
		let orig = self.i;
		self.proceed_while(Parser::is_letter);
		&self.line[orig .. self.i]
	}

	// Returns false without consuming anything when no redirection starts here.
	fn parse_redirect(&mut self, infile: &mut Option<&'a [u8]>, outfile: &mut Option<&'a [u8]>) -> ParseResult<bool> {
		let (op, slot) = match self.line.get(self.i) {
			Some(&b'<') => ('<', infile),
			Some(&b'>') => {
				if self.line.get(self.i + 1) == Some(&b'>') {
					return Err(ParseError::Append);
				}
				('>', outfile)
			},
			_ => { return Ok(false); },
		};
		self.i += 1;

		self.skip_whitespaces();
		let target = self.read_word();
		if target.is_empty() {
			return Err(ParseError::MissingTarget(op));
		}
		if slot.is_some() {
			return Err(ParseError::DuplicateRedirect(op));
		}
		*slot = Some(target);
		Ok(true)
	}

	fn parse_command(&mut self) -> ParseResult<Command<'a>> {
		let mut argv: Vec<&'a [u8]> = vec![];
		let mut infile = None;
		let mut outfile = None;

		loop {
			self.skip_whitespaces();
			if self.parse_redirect(&mut infile, &mut outfile)? {
				continue;
			}
			let word = self.read_word();
			if word.is_empty() {
				break;
			}
			argv.push(word);
		}

		if argv.is_empty() {
			return Err(ParseError::EmptyCommand);
		}
		Ok(Command { argv: argv, infile: infile, outfile: outfile })
	}

	fn parse_pipeline(&mut self) -> ParseResult<Pipeline<'a>> {
		let mut commands: Vec<Command<'a>> = vec![];

		loop {
			commands.push(self.parse_command()?);
			match self.line.get(self.i) {
				Some(&b'|') => {
					if commands.len() == MAX_COMMANDS {
						return Err(ParseError::TooManyCommands);
					}
					self.i += 1;
				},
				Some(&b'&') => { return Err(ParseError::Background); },
				Some(&c) => { return Err(ParseError::UnexpectedChar(c as char)); },
				None => { break; },
			}
		}
		Ok(Pipeline { commands: commands })
	}
}

/// Parses one input line. A line holding only whitespace yields `Ok(None)`.
pub fn parse<'a>(line: &'a [u8]) -> ParseResult<Option<Pipeline<'a>>> {
	if line.iter().all(|&c| Parser::is_whitespace(c)) {
		return Ok(None);
	}
	let mut parser: Parser<'a> = Parser { line: line, i: 0 };
	parser.parse_pipeline().map(Some)
}
