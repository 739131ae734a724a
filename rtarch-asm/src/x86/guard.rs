use log::debug;

use crate::error::EncodeError;
use crate::x86::inst::Inst;
use crate::x86::operand::{DispClass, Displacement, ImmClass, Immediate, Mem, Mode, Register};
use crate::x86::operand::{EBP, ESP};

/// Rejects requests whose unchecked encoding would silently produce a
/// different instruction.
pub fn check(inst: &Inst) -> Result<(), EncodeError> {
    let result = check_operands(inst);

    if let Err(ref err) = result {
        debug!("rejected {:?}: {}", inst, err);
    }

    result
}

fn check_operands(inst: &Inst) -> Result<(), EncodeError> {
    match inst {
        Inst::MovRi { rm, im }
        | Inst::AndRi { rm, im }
        | Inst::OrrRi { rm, im }
        | Inst::AddRi { rm, im }
        | Inst::SubRi { rm, im }
        | Inst::CmpRi { rm, im }
        | Inst::MulRi { rm, im } => {
            check_register(*rm)?;
            check_immediate(im)
        }

        Inst::MovMi { rm, dp, im }
        | Inst::AndMi { rm, dp, im }
        | Inst::OrrMi { rm, dp, im }
        | Inst::AddMi { rm, dp, im }
        | Inst::SubMi { rm, dp, im }
        | Inst::CmpMi { rm, dp, im } => {
            check_memory(rm, dp)?;
            check_immediate(im)
        }

        Inst::MovRr { rg, rm }
        | Inst::AndRr { rg, rm }
        | Inst::OrrRr { rg, rm }
        | Inst::AddRr { rg, rm }
        | Inst::SubRr { rg, rm }
        | Inst::CmpRr { rg, rm }
        | Inst::MulRr { rg, rm } => {
            check_register(*rg)?;
            check_register(*rm)
        }

        Inst::MovLd { rg, rm, dp }
        | Inst::MovSt { rg, rm, dp }
        | Inst::AndLd { rg, rm, dp }
        | Inst::AndSt { rg, rm, dp }
        | Inst::OrrLd { rg, rm, dp }
        | Inst::OrrSt { rg, rm, dp }
        | Inst::AddLd { rg, rm, dp }
        | Inst::AddSt { rg, rm, dp }
        | Inst::SubLd { rg, rm, dp }
        | Inst::SubSt { rg, rm, dp }
        | Inst::SubMr { rm, dp, rg }
        | Inst::MulLd { rg, rm, dp }
        | Inst::CmpRm { rg, rm, dp }
        | Inst::CmpMr { rm, dp, rg } => {
            check_register(*rg)?;
            check_memory(rm, dp)
        }

        Inst::AdrLd { rg, rm, dp } => {
            if rm.mode() == Mode::Direct {
                return Err(EncodeError::DirectAddressLoad);
            }

            check_register(*rg)?;
            check_memory(rm, dp)?;

            let offset = dp.value();

            if offset % 4 != 0 || !(0..=0x3FC).contains(&offset) {
                return Err(EncodeError::MisalignedAddressOffset(offset));
            }

            Ok(())
        }

        Inst::StackSt { rm }
        | Inst::StackLd { rm }
        | Inst::NotRr { rm }
        | Inst::MulXr { rm }
        | Inst::DivXr { rm } => check_register(*rm),

        Inst::NotMm { rm, dp }
        | Inst::MulXm { rm, dp }
        | Inst::DivXm { rm, dp }
        | Inst::JmpMm { rm, dp } => check_memory(rm, dp),

        Inst::ShlRi { rm, im } | Inst::ShrRi { rm, im } | Inst::ShrnRi { rm, im } => {
            check_register(*rm)?;
            check_shift(im)
        }

        Inst::ShlMi { rm, dp, im } | Inst::ShrMi { rm, dp, im } | Inst::ShrnMi { rm, dp, im } => {
            check_memory(rm, dp)?;
            check_shift(im)
        }

        Inst::StackSa
        | Inst::StackLa
        | Inst::AdrLb(_)
        | Inst::JmpLb(_)
        | Inst::Jcc(_, _)
        | Inst::Lbl(_) => Ok(()),
    }
}

fn check_register(reg: Register) -> Result<(), EncodeError> {
    if reg.value() > 7 {
        return Err(EncodeError::RegisterOutOfRange(reg.value()));
    }

    Ok(())
}

fn check_memory(mem: &Mem, dp: &Displacement) -> Result<(), EncodeError> {
    check_register(mem.base_register())?;

    if let Some(index) = mem.index_register() {
        check_register(index)?;

        if index == ESP {
            return Err(EncodeError::StackPointerIndex);
        }
    }

    match mem.mode() {
        Mode::Direct => {
            if mem.base_register() == EBP {
                return Err(EncodeError::AbsoluteBase);
            }

            if dp.class() != DispClass::Plain {
                return Err(EncodeError::UnexpectedDisplacement(dp.value()));
            }
        }

        Mode::Displaced | Mode::Register => {
            if dp.class() == DispClass::Plain {
                return Err(EncodeError::MissingDisplacement);
            }
        }
    }

    let limit = match dp.class() {
        DispClass::Dp => 0xFFF,
        DispClass::Dh => 0xFFFF,
        DispClass::Plain | DispClass::Dw => return Ok(()),
    };

    if !(0..=limit).contains(&dp.value()) {
        return Err(EncodeError::DisplacementOutOfRange(
            dp.class().name(),
            dp.value(),
        ));
    }

    Ok(())
}

fn check_immediate(im: &Immediate) -> Result<(), EncodeError> {
    let limit = match im.class() {
        ImmClass::Byte => 0x7F,
        ImmClass::Half => 0xFFFF,
        ImmClass::Word => return Ok(()),
    };

    if !(0..=limit).contains(&im.value()) {
        return Err(EncodeError::ImmediateOutOfRange(
            im.class().name(),
            im.value(),
        ));
    }

    Ok(())
}

fn check_shift(im: &Immediate) -> Result<(), EncodeError> {
    if !(0..=31).contains(&im.value()) {
        return Err(EncodeError::ShiftOutOfRange(im.value()));
    }

    Ok(())
}
