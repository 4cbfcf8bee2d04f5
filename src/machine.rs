/*!

  The LS-8 machine: memory, register file, program counter, flags, and the
  fetch-decode-execute loop.

  The machine owns a 256-cell byte-addressable memory and eight 8 bit general purpose
  registers. Register 7 is the stack pointer; the call/data stack grows downward
  through the same memory the program occupies. Addresses are `u8` throughout, so an
  out-of-range memory access is unrepresentable and address arithmetic wraps at 256.

  The dispatcher never advances the program counter. Each handler advances it by its
  own instruction width, or sets it directly for the branching instructions.

*/

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use crate::alu;
use crate::alu::{AluOp, FL_EQ};
use crate::opcode::Opcode;

/// Memory cell count. Addresses are `u8`, so every address is in range.
pub const RAM_SIZE: usize = 256;
/// General purpose register count.
pub const REGISTER_COUNT: usize = 8;
/// The register index reserved for the stack pointer.
pub const SP: usize = 7;
/// The stack pointer value at machine reset.
pub const SP_RESET: u8 = 0xF4;

/// A fatal execution error. Every error ends the run; there are no retries.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum MachineError {
  /// The byte at PC does not name an instruction.
  UnknownOpcode { pc: u8, opcode: u8 },
  /// An operand names a register outside the register file.
  BadRegister { pc: u8, index: u8 },
}

impl Display for MachineError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      MachineError::UnknownOpcode { pc, opcode } => {
        write!(f, "Unknown instruction {:#010b} at PC {:#04X}.", opcode, pc)
      }

      MachineError::BadRegister { pc, index } => {
        write!(
          f,
          "Instruction at PC {:#04X} names register {}, but registers are numbered 0-{}.",
          pc, index, REGISTER_COUNT - 1
        )
      }

    }
  }
}

impl std::error::Error for MachineError {}

pub struct Machine {

  // Memory Stores
  ram: [u8; RAM_SIZE], // Program, data, and stack share this address space.

  // Registers //
  registers : [u8; REGISTER_COUNT], // General purpose registers; registers[SP] is the stack pointer
  pc        : u8,                   // Program Counter, index of the next instruction byte
  flags     : u8,                   // Comparison flags, written only by CMP

  // The output collaborator: PRN hands each printed register value to this callback.
  print_handler: Box<dyn FnMut(u8)>,

}

impl Machine {

  // region Construction and accessors

  /// A machine at reset: memory and registers zeroed, SP at `SP_RESET`, PC at 0.
  /// PRN output goes to stdout, one decimal value per line.
  pub fn new() -> Machine {
    Machine::with_print_handler(Box::new(|value| println!("{}", value)))
  }

  /// A machine at reset whose PRN output is handed to the given callback instead of
  /// being printed. Used by hosts that capture or redirect program output.
  pub fn with_print_handler(print_handler: Box<dyn FnMut(u8)>) -> Machine {
    let mut registers = [0u8; REGISTER_COUNT];
    registers[SP] = SP_RESET;

    Machine {
      ram   :  [0u8; RAM_SIZE],
      registers,
      pc    :  0,
      flags :  0,
      print_handler,
    }
  }

  /// Copies a program into memory starting at address 0. The loader guarantees the
  /// program fits; a longer slice is a caller bug.
  pub fn load(&mut self, program: &[u8]) {
    assert!(
      program.len() <= RAM_SIZE,
      "Program of {} bytes does not fit in {} bytes of memory.",
      program.len(),
      RAM_SIZE
    );
    self.ram[..program.len()].copy_from_slice(program);
  }

  pub fn read_byte(&self, address: u8) -> u8 {
    self.ram[usize::from(address)]
  }

  pub fn write_byte(&mut self, address: u8, value: u8) {
    self.ram[usize::from(address)] = value;
  }

  pub fn register(&self, index: usize) -> u8 {
    self.registers[index]
  }

  pub fn set_register(&mut self, index: usize, value: u8) {
    self.registers[index] = value;
  }

  pub fn pc(&self) -> u8 {
    self.pc
  }

  pub fn flags(&self) -> u8 {
    self.flags
  }

  /// The current stack pointer, i.e. the value of register 7.
  pub fn sp(&self) -> u8 {
    self.registers[SP]
  }

  // endregion

  // region Fetch-decode-execute loop

  /**
    Runs the fetch-decode-execute loop until HLT or a fatal error.

    Each iteration fetches the opcode byte at PC and the two bytes after it. The two
    operand bytes are always fetched, even for narrower instructions; handlers ignore
    the ones their opcode does not use. Operand fetches near address 255 wrap around
    to the bottom of memory, as does all other address arithmetic.

    A byte with no registered instruction stops the run with
    `MachineError::UnknownOpcode` carrying the offending PC and byte.
  */
  pub fn run(&mut self) -> Result<(), MachineError> {
    loop {
      let opcode_byte = self.read_byte(self.pc);
      let operand_a = self.read_byte(self.pc.wrapping_add(1));
      let operand_b = self.read_byte(self.pc.wrapping_add(2));

      let opcode = match Opcode::try_decode(opcode_byte) {
        Some(opcode) => opcode,
        None => {
          return Err(MachineError::UnknownOpcode { pc: self.pc, opcode: opcode_byte });
        }
      };

      #[cfg(feature = "trace_computation")] println!("{}", self.trace_line());

      match opcode {
        Opcode::Hlt  => break,
        Opcode::Ldi  => self.ldi(operand_a, operand_b)?,
        Opcode::Prn  => self.prn(operand_a)?,
        Opcode::Push => self.push(operand_a)?,
        Opcode::Pop  => self.pop(operand_a)?,
        Opcode::Call => self.call(operand_a)?,
        Opcode::Ret  => self.ret(),
        Opcode::Jmp  => self.jmp(operand_a)?,
        Opcode::Jeq  => self.jeq(operand_a)?,
        Opcode::Jne  => self.jne(operand_a)?,
        Opcode::Add  => self.binary_alu(AluOp::Add, operand_a, operand_b)?,
        Opcode::Sub  => self.binary_alu(AluOp::Sub, operand_a, operand_b)?,
        Opcode::Mul  => self.binary_alu(AluOp::Mul, operand_a, operand_b)?,
        Opcode::Cmp  => self.binary_alu(AluOp::Cmp, operand_a, operand_b)?,
      }
    }
    Ok(())
  }

  // endregion

  // region Low-level utility methods

  /// Validates an operand byte that names a register.
  fn operand_register(&self, operand: u8) -> Result<usize, MachineError> {
    match usize::from(operand) {
      index if index < REGISTER_COUNT => Ok(index),
      _ => Err(MachineError::BadRegister { pc: self.pc, index: operand })
    }
  }

  /**
    Decrements SP and stores the value at the new top of stack.

    The stack shares memory with the program, and SP wrap is unchecked: a stack
    deep enough to wrap past address 0 overwrites high memory.
  */
  fn push_byte(&mut self, value: u8) {
    self.registers[SP] = self.registers[SP].wrapping_sub(1);
    let sp = self.registers[SP];
    self.write_byte(sp, value);
  }

  /// Reads the value at the top of stack and increments SP.
  fn pop_byte(&mut self) -> u8 {
    let value = self.read_byte(self.registers[SP]);
    self.registers[SP] = self.registers[SP].wrapping_add(1);
    value
  }

  /// Routes an ALU instruction: CMP writes the flags, everything else writes
  /// `registers[reg_a]` with wrapping arithmetic.
  fn alu(&mut self, op: AluOp, reg_a: usize, reg_b: usize) {
    let a = self.registers[reg_a];
    let b = self.registers[reg_b];

    match op {
      AluOp::Cmp => {
        self.flags = alu::compare(a, b);
      }
      _ => {
        self.registers[reg_a] = alu::arithmetic(op, a, b);
      }
    }
  }

  // endregion

  // region Instruction handlers

  fn ldi(&mut self, reg: u8, value: u8) -> Result<(), MachineError> {
    let reg = self.operand_register(reg)?;
    self.registers[reg] = value;
    self.pc = self.pc.wrapping_add(3);
    Ok(())
  }

  fn prn(&mut self, reg: u8) -> Result<(), MachineError> {
    let reg = self.operand_register(reg)?;
    let value = self.registers[reg];
    (self.print_handler)(value);
    self.pc = self.pc.wrapping_add(2);
    Ok(())
  }

  fn push(&mut self, reg: u8) -> Result<(), MachineError> {
    let reg = self.operand_register(reg)?;
    let value = self.registers[reg];
    self.push_byte(value);
    self.pc = self.pc.wrapping_add(2);
    Ok(())
  }

  fn pop(&mut self, reg: u8) -> Result<(), MachineError> {
    let reg = self.operand_register(reg)?;
    let value = self.pop_byte();
    self.registers[reg] = value;
    self.pc = self.pc.wrapping_add(2);
    Ok(())
  }

  /// Pushes the address of the instruction after the 2-byte CALL, so RET resumes
  /// there, then jumps to the address in the register.
  fn call(&mut self, reg: u8) -> Result<(), MachineError> {
    let reg = self.operand_register(reg)?;
    let target = self.registers[reg];
    let return_address = self.pc.wrapping_add(2);
    self.push_byte(return_address);
    self.pc = target;
    Ok(())
  }

  fn ret(&mut self) {
    self.pc = self.pop_byte();
  }

  fn jmp(&mut self, reg: u8) -> Result<(), MachineError> {
    let reg = self.operand_register(reg)?;
    self.pc = self.registers[reg];
    Ok(())
  }

  fn jeq(&mut self, reg: u8) -> Result<(), MachineError> {
    let reg = self.operand_register(reg)?;
    match self.flags & FL_EQ != 0 {
      true  => self.pc = self.registers[reg],
      false => self.pc = self.pc.wrapping_add(2),
    }
    Ok(())
  }

  fn jne(&mut self, reg: u8) -> Result<(), MachineError> {
    let reg = self.operand_register(reg)?;
    match self.flags & FL_EQ == 0 {
      true  => self.pc = self.registers[reg],
      false => self.pc = self.pc.wrapping_add(2),
    }
    Ok(())
  }

  /// The shared tail of the two-register ALU instructions.
  fn binary_alu(&mut self, op: AluOp, reg_a: u8, reg_b: u8) -> Result<(), MachineError> {
    let reg_a = self.operand_register(reg_a)?;
    let reg_b = self.operand_register(reg_b)?;
    self.alu(op, reg_a, reg_b);
    self.pc = self.pc.wrapping_add(3);
    Ok(())
  }

  // endregion

  // region Display methods

  /**
    One human-readable line of execution state: PC, the opcode byte and both bytes
    after it, then all eight registers, everything in hex. Printed before every
    instruction when the `trace_computation` feature is enabled.
  */
  pub fn trace_line(&self) -> String {
    let mut line = format!(
      "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
      self.pc,
      self.read_byte(self.pc),
      self.read_byte(self.pc.wrapping_add(1)),
      self.read_byte(self.pc.wrapping_add(2)),
    );
    for value in self.registers.iter() {
      line.push_str(&format!(" {:02X}", value));
    }
    line
  }

  fn make_register_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    for (i, value) in self.registers.iter().enumerate() {
      match i == SP {

        true  => {
          table.add_row(row![r->format!("SP --> R[{}] =", i), format!("{:#04X}", value)]);
        }

        false => {
          table.add_row(row![r->format!("R[{}] =", i), format!("{:#04X}", value)]);
        }

      } // end match on stack pointer
    } // end for
    table
  }

  // endregion

}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "PC: {:#04X}\tFL: {:#05b}\n{}",
      self.pc,
      self.flags,
      self.make_register_table()
    )
  }
}




#[cfg(test)]
mod proptests {
  use proptest::prelude::*;

  use super::*;

  proptest! {
    #[test]
    fn ldi_stores_any_value_in_any_register(reg in 0u8..8, value in any::<u8>()) {
      let mut machine = Machine::new();
      machine.load(&[Opcode::Ldi.code(), reg, value, Opcode::Hlt.code()]);
      machine.run().unwrap();

      prop_assert_eq!(machine.register(usize::from(reg)), value);
      prop_assert_eq!(machine.pc(), 3);
    }

    #[test]
    fn push_then_pop_restores_register_and_sp(reg in 0u8..7, value in any::<u8>()) {
      let mut machine = Machine::new();
      machine.load(&[
        Opcode::Ldi.code(), reg, value,
        Opcode::Push.code(), reg,
        Opcode::Ldi.code(), reg, value.wrapping_add(1),
        Opcode::Pop.code(), reg,
        Opcode::Hlt.code(),
      ]);
      machine.run().unwrap();

      prop_assert_eq!(machine.register(usize::from(reg)), value);
      prop_assert_eq!(machine.sp(), SP_RESET);
    }

    #[test]
    fn cmp_flags_match_register_ordering(a in any::<u8>(), b in any::<u8>()) {
      let mut machine = Machine::new();
      machine.load(&[
        Opcode::Ldi.code(), 0, a,
        Opcode::Ldi.code(), 1, b,
        Opcode::Cmp.code(), 0, 1,
        Opcode::Hlt.code(),
      ]);
      machine.run().unwrap();

      let flags = machine.flags();
      prop_assert_eq!(flags.count_ones(), 1);
      prop_assert_eq!(flags & FL_EQ != 0, a == b);
    }
  }
}
