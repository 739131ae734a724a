use std::fmt;

/// Reasons the guard layer refuses an instruction. The encoders themselves
/// never produce these: unchecked encoding of such a request silently
/// yields a different instruction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum EncodeError {
    RegisterOutOfRange(u8),
    StackPointerIndex,
    AbsoluteBase,
    MissingDisplacement,
    UnexpectedDisplacement(i32),
    DisplacementOutOfRange(&'static str, i32),
    ImmediateOutOfRange(&'static str, i32),
    ShiftOutOfRange(i32),
    MisalignedAddressOffset(i32),
    DirectAddressLoad,
}

impl EncodeError {
    pub fn message(&self) -> String {
        match self {
            EncodeError::RegisterOutOfRange(index) => {
                format!("register index {} does not fit into 3 bits.", index)
            }
            EncodeError::StackPointerIndex => {
                "stack pointer cannot be used as index register.".into()
            }
            EncodeError::AbsoluteBase => {
                "base register 5 without displacement encodes an absolute address.".into()
            }
            EncodeError::MissingDisplacement => {
                "memory operand with displacement mode needs a DP, DH or DW displacement."
                    .into()
            }
            EncodeError::UnexpectedDisplacement(value) => format!(
                "memory operand without displacement mode cannot take displacement {}.",
                value
            ),
            EncodeError::DisplacementOutOfRange(class, value) => {
                format!("displacement {} does not fit into class {}.", value, class)
            }
            EncodeError::ImmediateOutOfRange(class, value) => {
                format!("immediate {} does not fit into class {}.", value, class)
            }
            EncodeError::ShiftOutOfRange(value) => {
                format!("shift count {} is outside of 0..=31.", value)
            }
            EncodeError::MisalignedAddressOffset(value) => format!(
                "address offset {} is not a multiple of 4 in 0..=0x3FC.",
                value
            ),
            EncodeError::DirectAddressLoad => {
                "address load always emits an offset word and needs a displaced memory operand."
                    .into()
            }
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for EncodeError {}
