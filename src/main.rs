use std::path::PathBuf;
use std::process;

use clap::Parser;

use ls8::loader;
use ls8::Machine;

/// Execute an LS-8 program.
#[derive(Parser)]
#[command(name = "ls8", version, about)]
struct Args {
  /// Path to the program source: one binary literal per line, `#` comments allowed.
  program: PathBuf,
}

// Exit codes: 2 for a load failure, 1 for a fault during execution, 0 for HLT.
fn main() {
  let args = Args::parse();

  let program = match loader::load_file(&args.program) {
    Ok(program) => program,
    Err(error) => {
      eprintln!("{}", error);
      process::exit(2);
    }
  };

  let mut machine = Machine::new();
  machine.load(&program);

  if let Err(error) = machine.run() {
    eprintln!("{}", error);
    process::exit(1);
  }
}
