/*!

  Opcodes of the LS-8 virtual machine.

  An LS-8 instruction is a single opcode byte followed by zero, one, or two operand
  bytes, stored contiguously in memory. The instruction layout is not self-describing
  on the wire; instead the opcode byte itself carries structure in its bit pattern:

    Bits 7-6: number of operand bytes (0, 1, or 2)
    Bit  5:   instruction is routed through the ALU
    Bit  4:   instruction sets the program counter itself
    Bits 3-0: instruction identifier

  Consequently the enum uses the ISA byte as its `#[repr(u8)]` discriminant, and the
  operand count, instruction width, and dispatch category are all recovered from the
  discriminant with trivial bit arithmetic. Rust stores the enum variants as single
  bytes, so `Opcode` round-trips losslessly through `u8` via `num_enum`.

*/

use std::convert::TryFrom;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

/**
  One variant per instruction in the ISA. The discriminant of each variant is the
  opcode byte exactly as it appears in program memory. The `strum` derives give the
  conventional upper-case mnemonic text ("LDI", "HLT", ...) for trace output and for
  parsing mnemonics back into opcodes.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq,        Debug,         Hash
)]
#[strum(serialize_all = "shouty_snake_case")]
#[repr(u8)]
pub enum Opcode {
  // Nullary instructions //
  Hlt  = 0b0000_0001, // HLT: stop the machine
  Ret  = 0b0001_0001, // RET: pop the return address into PC

  // Unary instructions //
  Push = 0b0100_0101, // PUSH regA
  Pop  = 0b0100_0110, // POP regA
  Prn  = 0b0100_0111, // PRN regA
  Call = 0b0101_0000, // CALL regA
  Jmp  = 0b0101_0100, // JMP regA
  Jeq  = 0b0101_0101, // JEQ regA
  Jne  = 0b0101_0110, // JNE regA

  // Binary instructions //
  Ldi  = 0b1000_0010, // LDI regA, immediate
  Add  = 0b1010_0000, // ADD regA, regB
  Sub  = 0b1010_0001, // SUB regA, regB
  Mul  = 0b1010_0010, // MUL regA, regB
  Cmp  = 0b1010_0111, // CMP regA, regB
}

impl Opcode {
  /// The raw opcode byte as it appears in program memory.
  pub fn code(self) -> u8 {
    Into::<u8>::into(self)
  }

  /// Decodes the opcode byte at the given program counter, if it names an instruction.
  pub fn try_decode(byte: u8) -> Option<Opcode> {
    Opcode::try_from(byte).ok()
  }

  /// The number of operand bytes following the opcode, encoded in bits 7-6.
  pub fn operand_count(self) -> u8 {
    self.code() >> 6
  }

  /// Total instruction width in bytes: the opcode byte plus its operands.
  pub fn width(self) -> u8 {
    1 + self.operand_count()
  }

  /// Whether the instruction is routed through the ALU (bit 5).
  pub fn is_alu(self) -> bool {
    self.code() & 0b0010_0000 != 0
  }

  /**
    Whether the handler sets the program counter itself (bit 4). For every other
    instruction the handler advances PC by the instruction width.
  */
  pub fn sets_pc(self) -> bool {
    self.code() & 0b0001_0000 != 0
  }
}


#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn opcode_round_trips_through_byte() {
    for &opcode in &[
      Opcode::Hlt, Opcode::Ret, Opcode::Push, Opcode::Pop, Opcode::Prn,
      Opcode::Call, Opcode::Jmp, Opcode::Jeq, Opcode::Jne, Opcode::Ldi,
      Opcode::Add, Opcode::Sub, Opcode::Mul, Opcode::Cmp,
    ] {
      assert_eq!(Opcode::try_decode(opcode.code()), Some(opcode));
    }
  }

  #[test]
  fn unassigned_byte_does_not_decode() {
    assert_eq!(Opcode::try_decode(0b1111_1111), None);
    assert_eq!(Opcode::try_decode(0b0000_0000), None);
  }

  #[test]
  fn operand_count_comes_from_high_bits() {
    assert_eq!(Opcode::Hlt.operand_count(), 0);
    assert_eq!(Opcode::Ret.operand_count(), 0);
    assert_eq!(Opcode::Prn.operand_count(), 1);
    assert_eq!(Opcode::Call.operand_count(), 1);
    assert_eq!(Opcode::Ldi.operand_count(), 2);
    assert_eq!(Opcode::Mul.operand_count(), 2);
  }

  #[test]
  fn width_is_one_plus_operands() {
    assert_eq!(Opcode::Hlt.width(), 1);
    assert_eq!(Opcode::Push.width(), 2);
    assert_eq!(Opcode::Cmp.width(), 3);
  }

  #[test]
  fn alu_and_pc_setter_categories() {
    assert!(Opcode::Add.is_alu());
    assert!(Opcode::Sub.is_alu());
    assert!(Opcode::Mul.is_alu());
    assert!(Opcode::Cmp.is_alu());
    assert!(!Opcode::Ldi.is_alu());

    assert!(Opcode::Call.sets_pc());
    assert!(Opcode::Ret.sets_pc());
    assert!(Opcode::Jmp.sets_pc());
    assert!(Opcode::Jeq.sets_pc());
    assert!(Opcode::Jne.sets_pc());
    assert!(!Opcode::Push.sets_pc());
    assert!(!Opcode::Hlt.sets_pc());
  }

  #[test]
  fn mnemonic_text_round_trips() {
    assert_eq!(Opcode::Ldi.to_string(), "LDI");
    assert_eq!(Opcode::Hlt.to_string(), "HLT");
    assert_eq!(Opcode::from_str("MUL"), Ok(Opcode::Mul));
    assert_eq!(Opcode::from_str("JEQ"), Ok(Opcode::Jeq));
    assert!(Opcode::from_str("NOP").is_err());
  }
}
