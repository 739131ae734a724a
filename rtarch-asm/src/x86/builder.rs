use crate::x86::operand::{Descriptor, Extension, Register, ScaleFactor};
use crate::AssemblerBuffer;

pub fn modrm(reg: u8, mode: u8, rm: u8) -> u8 {
    mode << 6 | reg << 3 | rm
}

pub fn sib(scale: ScaleFactor, index: Register, base: Register) -> u8 {
    scale.value() << 6 | index.value() << 3 | base.value()
}

/// Emits the addressing byte for `rm` with `reg` (a register number or an
/// opcode selector) in the middle field.
pub fn emit_modrm<D: Descriptor<Field = u8>>(buf: &mut AssemblerBuffer, reg: u8, rm: &D) {
    buf.emit_u8(modrm(reg, rm.kind(), rm.field()));
}

/// Trailing bytes in architectural order: SIB, displacement, immediate.
pub fn emit_aux(buf: &mut AssemblerBuffer, sib: Extension, disp: Extension, imm: Extension) {
    sib.emit(buf);
    disp.emit(buf);
    imm.emit(buf);
}

pub fn emit_word(buf: &mut AssemblerBuffer, value: u32) {
    buf.emit_u32(value);
}

/// Low 7 bits only. The sign bit is dropped, not extended.
pub fn narrow(value: i32) -> u8 {
    (value & 0x7F) as u8
}
