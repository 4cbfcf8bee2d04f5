/*!

  The arithmetic/logic unit: arithmetic on register operands and the comparison that
  drives the conditional branches.

  All arithmetic is unsigned 8 bit and wraps modulo 256. The wrap is a required
  invariant of the ISA, so it is spelled with the `wrapping_*` methods rather than
  left to release-mode overflow behavior.

  The flags register is written only by `compare`, and each comparison fully
  overwrites it with exactly one of the three bits set. Flag bits never accumulate.

*/

use std::cmp::Ordering;

/// Flags bit: the two compared registers were equal.
pub const FL_EQ: u8 = 0b001;
/// Flags bit: the first register was greater than the second.
pub const FL_GT: u8 = 0b010;
/// Flags bit: the first register was less than the second.
pub const FL_LT: u8 = 0b100;

/**
  The operation kinds the ALU understands. The enum is closed, and the dispatcher is
  the only caller, so an "unsupported ALU operation" is unrepresentable rather than a
  runtime error.
*/
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum AluOp {
  Add,
  Sub,
  Mul,
  Cmp,
}

/// Wrapping 8 bit arithmetic for the mutating ALU operations. `Cmp` has no result
/// value and is not routed through here.
pub fn arithmetic(op: AluOp, a: u8, b: u8) -> u8 {
  match op {
    AluOp::Add => a.wrapping_add(b),
    AluOp::Sub => a.wrapping_sub(b),
    AluOp::Mul => a.wrapping_mul(b),
    AluOp::Cmp => unreachable!("Cmp does not produce an arithmetic result."),
  }
}

/// The flags value for an unsigned comparison of two register values.
pub fn compare(a: u8, b: u8) -> u8 {
  match a.cmp(&b) {
    Ordering::Equal   => FL_EQ,
    Ordering::Greater => FL_GT,
    Ordering::Less    => FL_LT,
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn arithmetic_wraps_at_eight_bits() {
    assert_eq!(arithmetic(AluOp::Add, 200, 100), 44);
    assert_eq!(arithmetic(AluOp::Sub, 0, 1), 255);
    assert_eq!(arithmetic(AluOp::Mul, 16, 16), 0);
  }

  #[test]
  fn arithmetic_without_overflow() {
    assert_eq!(arithmetic(AluOp::Add, 2, 3), 5);
    assert_eq!(arithmetic(AluOp::Sub, 9, 4), 5);
    assert_eq!(arithmetic(AluOp::Mul, 9, 10), 90);
  }

  #[test]
  fn compare_sets_exactly_one_flag() {
    assert_eq!(compare(5, 5), FL_EQ);
    assert_eq!(compare(6, 5), FL_GT);
    assert_eq!(compare(5, 6), FL_LT);
  }
}
