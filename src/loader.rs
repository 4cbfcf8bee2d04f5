/*!

  The program loader: parses LS-8 program text into the byte sequence the machine
  executes.

  The source format is line oriented. Each line holds at most one binary literal
  (characters '0' and '1'), optionally followed by a `#` comment; blank lines and
  comment-only lines are skipped. Literal values load sequentially starting at
  memory address 0:

  ```text
  # print8.ls8
  10000010 # LDI R0,8
  00000000
  00001000
  01000111 # PRN R0
  00000000
  00000001 # HLT
  ```

*/

use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::Path;

use nom::{
  IResult,
  bytes::complete::is_a,
  character::complete::{char as one_char, not_line_ending, space0},
  combinator::{all_consuming, opt},
  sequence::{delimited, pair, preceded},
};

use crate::machine::RAM_SIZE;

/// A failure to turn program source into a loadable byte sequence. Load errors
/// abort the run before execution starts.
#[derive(Debug)]
pub enum LoadError {
  /// The program file could not be read.
  File(io::Error),
  /// A line is not a binary literal, a comment, or blank, or its value does not
  /// fit in a byte.
  Malformed { line: usize },
  /// The program does not fit in machine memory.
  TooLong { bytes: usize },
}

impl Display for LoadError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      LoadError::File(error) => {
        write!(f, "Could not read the program file: {}", error)
      }

      LoadError::Malformed { line } => {
        write!(f, "Error on line {}: expected an 8 bit binary literal.", line)
      }

      LoadError::TooLong { bytes } => {
        write!(
          f,
          "The program is {} bytes, but the machine has only {} bytes of memory.",
          bytes, RAM_SIZE
        )
      }

    }
  }
}

impl std::error::Error for LoadError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      LoadError::File(error) => Some(error),
      _ => None
    }
  }
}

/// Recognizes one source line: optional binary literal, optional trailing comment.
/// Yields the literal's digits when the line carries one.
fn program_line(line: &str) -> IResult<&str, Option<&str>> {
  all_consuming(
    delimited(
      space0,
      opt(is_a("01")),
      preceded(space0, opt(pair(one_char('#'), not_line_ending))),
    )
  )(line)
}

/**
  Parses program text into the byte sequence to load at address 0.

  Malformed lines are reported with their 1-based line number. A program longer
  than machine memory is rejected here, before the machine ever sees it.
*/
pub fn parse_program(text: &str) -> Result<Vec<u8>, LoadError> {
  let mut program = Vec::new();

  for (index, line) in text.lines().enumerate() {
    let line_number = index + 1;

    let digits = match program_line(line) {
      Ok((_rest, digits)) => digits,
      Err(_) => {
        return Err(LoadError::Malformed { line: line_number });
      }
    };

    if let Some(digits) = digits {
      let value = u8::from_str_radix(digits, 2)
        .map_err(|_overflow| LoadError::Malformed { line: line_number })?;
      program.push(value);
    }
  }

  match program.len() > RAM_SIZE {
    true  => Err(LoadError::TooLong { bytes: program.len() }),
    false => Ok(program)
  }
}

/// Reads and parses a program file. A missing or unreadable file is a load error,
/// reported distinctly from execution errors.
pub fn load_file(path: &Path) -> Result<Vec<u8>, LoadError> {
  let text = fs::read_to_string(path).map_err(LoadError::File)?;
  parse_program(&text)
}
