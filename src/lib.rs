/*!

  An interpreter for the LS-8, a byte-addressable virtual machine with 256 bytes of
  memory, eight general purpose registers, and a fixed 14-instruction set.

  The core is [`machine::Machine`]: the register file, memory, program counter,
  flags, and the fetch-decode-execute loop. The [`loader`] turns program text into
  the byte sequence the machine executes; PRN output leaves the machine through a
  print callback, so hosts decide where printed values go.

*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod alu;
pub mod loader;
pub mod machine;
pub mod opcode;

pub use machine::{Machine, MachineError};
pub use opcode::Opcode;
