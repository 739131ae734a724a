use log::trace;

use crate::error::EncodeError;
use crate::{AssemblerBuffer, Label};

pub mod builder;
pub mod flow;
pub mod guard;
pub mod inst;
pub mod operand;

pub use self::flow::Condition;
pub use self::inst::Inst;
pub use self::operand::{
    Descriptor, DispClass, Displacement, Extension, ImmClass, Immediate, Mem, Mode, Register,
    ScaleFactor, EAX, EBP, EBX, ECX, EDI, EDX, ESI, ESP,
};

pub struct AssemblerX86 {
    buffer: AssemblerBuffer,
}

impl AssemblerX86 {
    pub fn new() -> AssemblerX86 {
        AssemblerX86 {
            buffer: AssemblerBuffer::new(),
        }
    }

    pub fn create_label(&mut self) -> Label {
        self.buffer.create_label()
    }

    /// Number of raw code bytes emitted so far.
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer(&self) -> &AssemblerBuffer {
        &self.buffer
    }

    /// Encodes `inst` as is. Nothing is validated, see `CheckedAssemblerX86`.
    pub fn emit(&mut self, inst: &Inst) {
        let mut piece = AssemblerBuffer::new();
        inst.encode(&mut piece);

        if piece.has_directives() {
            trace!("{:?} => {}", inst, piece.render().trim_end());
        } else {
            trace!("{:?} => {:02x?}", inst, piece.code());
        }

        self.buffer.append(piece);
    }

    pub fn finalize(self) -> AssemblerBuffer {
        self.buffer
    }
}

impl Default for AssemblerX86 {
    fn default() -> AssemblerX86 {
        AssemblerX86::new()
    }
}

/// Assembler that runs every instruction through `guard::check` first.
/// Rejected instructions leave the buffer untouched.
#[derive(Default)]
pub struct CheckedAssemblerX86 {
    asm: AssemblerX86,
}

impl CheckedAssemblerX86 {
    pub fn new() -> CheckedAssemblerX86 {
        CheckedAssemblerX86 {
            asm: AssemblerX86::new(),
        }
    }

    pub fn create_label(&mut self) -> Label {
        self.asm.create_label()
    }

    pub fn position(&self) -> usize {
        self.asm.position()
    }

    pub fn buffer(&self) -> &AssemblerBuffer {
        self.asm.buffer()
    }

    pub fn emit(&mut self, inst: &Inst) -> Result<(), EncodeError> {
        guard::check(inst)?;
        self.asm.emit(inst);
        Ok(())
    }

    pub fn finalize(self) -> AssemblerBuffer {
        self.asm.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_appends_in_order() {
        let mut asm = AssemblerX86::new();
        asm.emit(&Inst::StackSa);
        asm.emit(&Inst::AddRi {
            rm: EAX,
            im: Immediate::ib(5),
        });
        asm.emit(&Inst::StackLa);

        assert_eq!(asm.position(), 5);
        assert_eq!(asm.finalize().code(), vec![0x60, 0x83, 0xC0, 0x05, 0x61]);
    }

    #[test]
    fn test_loop_with_labels() {
        let mut asm = AssemblerX86::new();
        let head = asm.create_label();
        let exit = asm.create_label();

        asm.emit(&Inst::Lbl(head.clone()));
        asm.emit(&Inst::CmpRi {
            rm: ECX,
            im: Immediate::ib(0),
        });
        asm.emit(&Inst::Jcc(Condition::Equal, exit.clone()));
        asm.emit(&Inst::SubRi {
            rm: ECX,
            im: Immediate::ib(1),
        });
        asm.emit(&Inst::JmpLb(head));
        asm.emit(&Inst::Lbl(exit));

        let buf = asm.finalize();
        assert_eq!(
            buf.render(),
            "L0:\n.byte 0x83, 0xf9, 0x00\nje L1\n.byte 0x83, 0xe9, 0x01\njmp L0\nL1:\n"
        );
    }

    #[test]
    fn test_unchecked_encodes_invalid_requests() {
        let mut asm = AssemblerX86::new();
        asm.emit(&Inst::AddRi {
            rm: EAX,
            im: Immediate::ib(200),
        });
        assert_eq!(asm.finalize().code(), vec![0x83, 0xC0, 0x48]);
    }

    #[test]
    fn test_checked_rejects_without_emitting() {
        let mut asm = CheckedAssemblerX86::new();
        asm.emit(&Inst::StackSa).unwrap();

        let err = asm
            .emit(&Inst::AddRi {
                rm: EAX,
                im: Immediate::ib(200),
            })
            .unwrap_err();
        assert_eq!(err, EncodeError::ImmediateOutOfRange("IB", 200));

        assert_eq!(asm.position(), 1);
        assert_eq!(asm.finalize().code(), vec![0x60]);
    }

    #[test]
    fn test_checked_accepts_valid_requests() {
        let mut asm = CheckedAssemblerX86::new();
        asm.emit(&Inst::MovLd {
            rg: ECX,
            rm: Mem::base(EDX),
            dp: Displacement::dp(8),
        })
        .unwrap();
        assert_eq!(asm.buffer().code(), vec![0x8B, 0x8A, 0x08, 0, 0, 0]);
    }
}
