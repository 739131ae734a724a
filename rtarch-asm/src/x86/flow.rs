use crate::{AssemblerBuffer, Directive, Label};

/// Branch conditions. `Below`/`Above` compare unsigned, `Less`/`Greater`
/// signed.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Condition {
    Equal,
    NotEqual,
    NotZero,
    Below,
    BelowOrEqual,
    Above,
    AboveOrEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Condition {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Condition::Equal => "je",
            Condition::NotEqual => "jne",
            Condition::NotZero => "jnz",
            Condition::Below => "jb",
            Condition::BelowOrEqual => "jbe",
            Condition::Above => "ja",
            Condition::AboveOrEqual => "jae",
            Condition::Less => "jl",
            Condition::LessOrEqual => "jle",
            Condition::Greater => "jg",
            Condition::GreaterOrEqual => "jge",
        }
    }
}

// The backend picks the 8-bit or 32-bit branch once it knows the distance,
// so jumps to labels leave this crate as text.

pub fn emit_jump(buf: &mut AssemblerBuffer, target: &Label) {
    buf.emit_directive(Directive::Jump {
        mnemonic: "jmp",
        target: target.clone(),
    });
}

pub fn emit_jcc(buf: &mut AssemblerBuffer, condition: Condition, target: &Label) {
    buf.emit_directive(Directive::Jump {
        mnemonic: condition.mnemonic(),
        target: target.clone(),
    });
}

pub fn emit_bind(buf: &mut AssemblerBuffer, label: &Label) {
    buf.emit_directive(Directive::Bind(label.clone()));
}

/// Address of `target` into the accumulator.
pub fn emit_load_label(buf: &mut AssemblerBuffer, target: &Label) {
    buf.emit_directive(Directive::LoadAddress {
        register: "eax",
        target: target.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_mnemonics() {
        let table = [
            (Condition::Equal, "je"),
            (Condition::NotEqual, "jne"),
            (Condition::NotZero, "jnz"),
            (Condition::Below, "jb"),
            (Condition::BelowOrEqual, "jbe"),
            (Condition::Above, "ja"),
            (Condition::AboveOrEqual, "jae"),
            (Condition::Less, "jl"),
            (Condition::LessOrEqual, "jle"),
            (Condition::Greater, "jg"),
            (Condition::GreaterOrEqual, "jge"),
        ];

        for (condition, mnemonic) in table {
            assert_eq!(condition.mnemonic(), mnemonic);
        }
    }

    #[test]
    fn test_jumps_emit_no_bytes() {
        let mut buf = AssemblerBuffer::new();
        let target = Label::named("done");
        emit_jcc(&mut buf, Condition::LessOrEqual, &target);
        emit_jump(&mut buf, &target);
        emit_bind(&mut buf, &target);
        emit_load_label(&mut buf, &target);

        assert_eq!(buf.len(), 0);
        assert_eq!(buf.render(), "jle done\njmp done\ndone:\nlea eax, [done]\n");
    }
}
