use crate::x86::builder::{emit_aux, emit_modrm};
use crate::x86::flow::{self, Condition};
use crate::x86::operand::{Descriptor, Displacement, Extension, Immediate, Mem, Register};
use crate::{AssemblerBuffer, Label};

/// One x86 instruction with already decided operands, named after the
/// operation and the operand shape: `ri` register from immediate, `mi`
/// memory from immediate, `rr` register from register, `ld` register from
/// memory, `st` memory from register, `xr`/`xm` implicit accumulator with a
/// register/memory operand, `lb` label.
///
/// Forms with an implicit accumulator have no destination field:
///
/// ```compile_fail
/// use rtarch_asm::x86::{Displacement, Inst, Mem, EAX, ECX};
///
/// let _ = Inst::DivXm { rg: EAX, rm: Mem::base(ECX), dp: Displacement::dp(0) };
/// ```
///
/// Encoding performs no checks. Use `guard::check` (or
/// `CheckedAssemblerX86`) to reject requests that would silently encode a
/// different instruction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Inst {
    MovRi { rm: Register, im: Immediate },
    MovMi { rm: Mem, dp: Displacement, im: Immediate },
    MovRr { rg: Register, rm: Register },
    MovLd { rg: Register, rm: Mem, dp: Displacement },
    MovSt { rg: Register, rm: Mem, dp: Displacement },

    /// Only 10-bit offsets with 4-byte alignment are portable.
    AdrLd { rg: Register, rm: Mem, dp: Displacement },
    /// Label address into EAX.
    AdrLb(Label),

    StackSt { rm: Register },
    StackLd { rm: Register },
    /// Pushes EAX..EDI, 8 registers.
    StackSa,
    /// Pops EDI..EAX, 8 registers.
    StackLa,

    AndRi { rm: Register, im: Immediate },
    AndMi { rm: Mem, dp: Displacement, im: Immediate },
    AndRr { rg: Register, rm: Register },
    AndLd { rg: Register, rm: Mem, dp: Displacement },
    AndSt { rg: Register, rm: Mem, dp: Displacement },

    OrrRi { rm: Register, im: Immediate },
    OrrMi { rm: Mem, dp: Displacement, im: Immediate },
    OrrRr { rg: Register, rm: Register },
    OrrLd { rg: Register, rm: Mem, dp: Displacement },
    OrrSt { rg: Register, rm: Mem, dp: Displacement },

    NotRr { rm: Register },
    NotMm { rm: Mem, dp: Displacement },

    AddRi { rm: Register, im: Immediate },
    AddMi { rm: Mem, dp: Displacement, im: Immediate },
    AddRr { rg: Register, rm: Register },
    AddLd { rg: Register, rm: Mem, dp: Displacement },
    AddSt { rg: Register, rm: Mem, dp: Displacement },

    SubRi { rm: Register, im: Immediate },
    SubMi { rm: Mem, dp: Displacement, im: Immediate },
    SubRr { rg: Register, rm: Register },
    SubLd { rg: Register, rm: Mem, dp: Displacement },
    SubSt { rg: Register, rm: Mem, dp: Displacement },
    SubMr { rm: Mem, dp: Displacement, rg: Register },

    ShlRi { rm: Register, im: Immediate },
    ShlMi { rm: Mem, dp: Displacement, im: Immediate },
    ShrRi { rm: Register, im: Immediate },
    ShrMi { rm: Mem, dp: Displacement, im: Immediate },
    ShrnRi { rm: Register, im: Immediate },
    ShrnMi { rm: Mem, dp: Displacement, im: Immediate },

    /// Signed multiply, the result replaces `rm`.
    MulRi { rm: Register, im: Immediate },
    MulRr { rg: Register, rm: Register },
    MulLd { rg: Register, rm: Mem, dp: Displacement },
    /// EAX is in/out, EDX is destroyed.
    MulXr { rm: Register },
    MulXm { rm: Mem, dp: Displacement },

    /// EAX is in/out, EDX must hold the sign extension of EAX.
    DivXr { rm: Register },
    DivXm { rm: Mem, dp: Displacement },

    CmpRi { rm: Register, im: Immediate },
    CmpMi { rm: Mem, dp: Displacement, im: Immediate },
    CmpRr { rg: Register, rm: Register },
    CmpRm { rg: Register, rm: Mem, dp: Displacement },
    CmpMr { rm: Mem, dp: Displacement, rg: Register },

    JmpMm { rm: Mem, dp: Displacement },
    JmpLb(Label),
    Jcc(Condition, Label),
    Lbl(Label),
}

impl Inst {
    pub fn encode(&self, buf: &mut AssemblerBuffer) {
        match self {
            Inst::MovRi { rm, im } => {
                buf.emit_u8(0xC7);
                emit_modrm(buf, 0x00, rm);
                emit_aux(buf, Extension::Empty, Extension::Empty, mov_word(im));
            }
            Inst::MovMi { rm, dp, im } => {
                buf.emit_u8(0xC7);
                emit_modrm(buf, 0x00, rm);
                emit_aux(buf, rm.extension(), dp.extension(), mov_word(im));
            }
            Inst::MovRr { rg, rm } => rr(buf, &[0x8B], rg, rm),
            Inst::MovLd { rg, rm, dp } => ld(buf, &[0x8B], rg, rm, dp),
            Inst::MovSt { rg, rm, dp } => ld(buf, &[0x89], rg, rm, dp),

            Inst::AdrLd { rg, rm, dp } => {
                buf.emit_u8(0x8D);
                emit_modrm(buf, rg.field(), rm);
                let offset = Extension::Word((dp.value() & 0x3FC) as u32);
                emit_aux(buf, rm.extension(), offset, Extension::Empty);
            }
            Inst::AdrLb(target) => flow::emit_load_label(buf, target),

            Inst::StackSt { rm } => xr(buf, 0xFF, 0x06, rm),
            Inst::StackLd { rm } => xr(buf, 0x8F, 0x00, rm),
            Inst::StackSa => buf.emit_u8(0x60),
            Inst::StackLa => buf.emit_u8(0x61),

            Inst::AndRi { rm, im } => ri(buf, 0x81, 0x04, rm, im),
            Inst::AndMi { rm, dp, im } => mi(buf, 0x81, 0x04, rm, dp, im),
            Inst::AndRr { rg, rm } => rr(buf, &[0x23], rg, rm),
            Inst::AndLd { rg, rm, dp } => ld(buf, &[0x23], rg, rm, dp),
            Inst::AndSt { rg, rm, dp } => ld(buf, &[0x21], rg, rm, dp),

            Inst::OrrRi { rm, im } => ri(buf, 0x81, 0x01, rm, im),
            Inst::OrrMi { rm, dp, im } => mi(buf, 0x81, 0x01, rm, dp, im),
            Inst::OrrRr { rg, rm } => rr(buf, &[0x0B], rg, rm),
            Inst::OrrLd { rg, rm, dp } => ld(buf, &[0x0B], rg, rm, dp),
            Inst::OrrSt { rg, rm, dp } => ld(buf, &[0x09], rg, rm, dp),

            Inst::NotRr { rm } => xr(buf, 0xF7, 0x02, rm),
            Inst::NotMm { rm, dp } => xm(buf, 0xF7, 0x02, rm, dp),

            Inst::AddRi { rm, im } => ri(buf, 0x81, 0x00, rm, im),
            Inst::AddMi { rm, dp, im } => mi(buf, 0x81, 0x00, rm, dp, im),
            Inst::AddRr { rg, rm } => rr(buf, &[0x03], rg, rm),
            Inst::AddLd { rg, rm, dp } => ld(buf, &[0x03], rg, rm, dp),
            Inst::AddSt { rg, rm, dp } => ld(buf, &[0x01], rg, rm, dp),

            Inst::SubRi { rm, im } => ri(buf, 0x81, 0x05, rm, im),
            Inst::SubMi { rm, dp, im } => mi(buf, 0x81, 0x05, rm, dp, im),
            Inst::SubRr { rg, rm } => rr(buf, &[0x2B], rg, rm),
            Inst::SubLd { rg, rm, dp } => ld(buf, &[0x2B], rg, rm, dp),
            Inst::SubSt { rg, rm, dp } | Inst::SubMr { rm, dp, rg } => {
                ld(buf, &[0x29], rg, rm, dp)
            }

            Inst::ShlRi { rm, im } => shift_ri(buf, 0x04, rm, im),
            Inst::ShlMi { rm, dp, im } => shift_mi(buf, 0x04, rm, dp, im),
            Inst::ShrRi { rm, im } => shift_ri(buf, 0x05, rm, im),
            Inst::ShrMi { rm, dp, im } => shift_mi(buf, 0x05, rm, dp, im),
            Inst::ShrnRi { rm, im } => shift_ri(buf, 0x07, rm, im),
            Inst::ShrnMi { rm, dp, im } => shift_mi(buf, 0x07, rm, dp, im),

            Inst::MulRi { rm, im } => ri(buf, 0x69, rm.field(), rm, im),
            Inst::MulRr { rg, rm } => rr(buf, &[0x0F, 0xAF], rg, rm),
            Inst::MulLd { rg, rm, dp } => ld(buf, &[0x0F, 0xAF], rg, rm, dp),
            Inst::MulXr { rm } => xr(buf, 0xF7, 0x05, rm),
            Inst::MulXm { rm, dp } => xm(buf, 0xF7, 0x05, rm, dp),

            Inst::DivXr { rm } => xr(buf, 0xF7, 0x07, rm),
            Inst::DivXm { rm, dp } => xm(buf, 0xF7, 0x07, rm, dp),

            Inst::CmpRi { rm, im } => ri(buf, 0x81, 0x07, rm, im),
            Inst::CmpMi { rm, dp, im } => mi(buf, 0x81, 0x07, rm, dp, im),
            Inst::CmpRr { rg, rm } => rr(buf, &[0x3B], rg, rm),
            Inst::CmpRm { rg, rm, dp } => ld(buf, &[0x3B], rg, rm, dp),
            Inst::CmpMr { rm, dp, rg } => ld(buf, &[0x39], rg, rm, dp),

            Inst::JmpMm { rm, dp } => xm(buf, 0xFF, 0x04, rm, dp),
            Inst::JmpLb(target) => flow::emit_jump(buf, target),
            Inst::Jcc(condition, target) => flow::emit_jcc(buf, *condition, target),
            Inst::Lbl(label) => flow::emit_bind(buf, label),
        }
    }
}

// The opcode bit of the immediate and the width of its trailing bytes both
// come from the same truncation class.

fn ri(buf: &mut AssemblerBuffer, opcode: u8, selector: u8, rm: &Register, im: &Immediate) {
    buf.emit_u8(opcode | im.kind());
    emit_modrm(buf, selector, rm);
    emit_aux(buf, Extension::Empty, Extension::Empty, im.extension());
}

fn mi(
    buf: &mut AssemblerBuffer,
    opcode: u8,
    selector: u8,
    rm: &Mem,
    dp: &Displacement,
    im: &Immediate,
) {
    buf.emit_u8(opcode | im.kind());
    emit_modrm(buf, selector, rm);
    emit_aux(buf, rm.extension(), dp.extension(), im.extension());
}

fn rr(buf: &mut AssemblerBuffer, opcode: &[u8], rg: &Register, rm: &Register) {
    emit_opcode(buf, opcode);
    emit_modrm(buf, rg.field(), rm);
}

fn ld(buf: &mut AssemblerBuffer, opcode: &[u8], rg: &Register, rm: &Mem, dp: &Displacement) {
    emit_opcode(buf, opcode);
    emit_modrm(buf, rg.field(), rm);
    emit_aux(buf, rm.extension(), dp.extension(), Extension::Empty);
}

fn xr(buf: &mut AssemblerBuffer, opcode: u8, selector: u8, rm: &Register) {
    buf.emit_u8(opcode);
    emit_modrm(buf, selector, rm);
}

fn xm(buf: &mut AssemblerBuffer, opcode: u8, selector: u8, rm: &Mem, dp: &Displacement) {
    buf.emit_u8(opcode);
    emit_modrm(buf, selector, rm);
    emit_aux(buf, rm.extension(), dp.extension(), Extension::Empty);
}

fn shift_ri(buf: &mut AssemblerBuffer, selector: u8, rm: &Register, im: &Immediate) {
    buf.emit_u8(0xC1);
    emit_modrm(buf, selector, rm);
    emit_aux(buf, Extension::Empty, Extension::Empty, shift_count(im));
}

fn shift_mi(
    buf: &mut AssemblerBuffer,
    selector: u8,
    rm: &Mem,
    dp: &Displacement,
    im: &Immediate,
) {
    buf.emit_u8(0xC1);
    emit_modrm(buf, selector, rm);
    emit_aux(buf, rm.extension(), dp.extension(), shift_count(im));
}

fn emit_opcode(buf: &mut AssemblerBuffer, opcode: &[u8]) {
    for &byte in opcode {
        buf.emit_u8(byte);
    }
}

/// Shift counts ignore the truncation class: always one byte, 5 bits.
fn shift_count(im: &Immediate) -> Extension {
    Extension::Byte((im.value() & 0x1F) as u8)
}

/// C7 has no narrow form, the immediate is always a full word. Narrow
/// immediates are still masked to 7 bits.
fn mov_word(im: &Immediate) -> Extension {
    let mask = ((im.kind() as i32) << 6) - 1;
    Extension::Word((im.value() & mask) as u32)
}
