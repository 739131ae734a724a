use crate::x86::builder;
use crate::AssemblerBuffer;

/// Generic three-field view of an operand. Registers and memory operands
/// project to (register field, addressing mode, SIB byte), immediates and
/// displacements to (raw value, opcode bit, pre-truncated bytes).
pub trait Descriptor {
    type Field: Copy;

    fn field(&self) -> Self::Field;
    fn kind(&self) -> u8;
    fn extension(&self) -> Extension;
}

/// Trailing bytes carried by a descriptor, already truncated.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Extension {
    Empty,
    Byte(u8),
    Word(u32),
}

impl Extension {
    pub fn emit(self, buf: &mut AssemblerBuffer) {
        match self {
            Extension::Empty => {}
            Extension::Byte(value) => buf.emit_u8(value),
            Extension::Word(value) => builder::emit_word(buf, value),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Mode {
    Direct,
    Displaced,
    Register,
}

impl Mode {
    pub fn bits(self) -> u8 {
        match self {
            Mode::Direct => 0b00,
            Mode::Displaced => 0b10,
            Mode::Register => 0b11,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Register(u8);

impl Register {
    /// Indices above 7 are not rejected here, only by the guard.
    pub const fn new(value: u8) -> Register {
        Register(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

pub const EAX: Register = Register(0);
pub const ECX: Register = Register(1);
pub const EDX: Register = Register(2);
pub const EBX: Register = Register(3);
pub const ESP: Register = Register(4);
pub const EBP: Register = Register(5);
pub const ESI: Register = Register(6);
pub const EDI: Register = Register(7);

impl Descriptor for Register {
    type Field = u8;

    fn field(&self) -> u8 {
        self.0
    }

    fn kind(&self) -> u8 {
        Mode::Register.bits()
    }

    fn extension(&self) -> Extension {
        Extension::Empty
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ScaleFactor {
    One,
    Two,
    Four,
    Eight,
}

impl ScaleFactor {
    pub fn value(self) -> u8 {
        match self {
            ScaleFactor::One => 0,
            ScaleFactor::Two => 1,
            ScaleFactor::Four => 2,
            ScaleFactor::Eight => 3,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Mem {
    base: Register,
    index: Option<(Register, ScaleFactor)>,
    mode: Mode,
}

impl Mem {
    /// `[base]`, no displacement bytes follow.
    pub fn direct(base: Register) -> Mem {
        Mem {
            base,
            index: None,
            mode: Mode::Direct,
        }
    }

    /// `[base + disp]` with a full displacement word.
    pub fn base(base: Register) -> Mem {
        Mem {
            base,
            index: None,
            mode: Mode::Displaced,
        }
    }

    /// `[base + index * scale + disp]` with a full displacement word.
    pub fn indexed(base: Register, index: Register, scale: ScaleFactor) -> Mem {
        Mem {
            base,
            index: Some((index, scale)),
            mode: Mode::Displaced,
        }
    }

    pub fn base_register(&self) -> Register {
        self.base
    }

    pub fn index_register(&self) -> Option<Register> {
        self.index.map(|(index, _)| index)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn has_displacement(&self) -> bool {
        self.mode == Mode::Displaced
    }

    fn needs_sib(&self) -> bool {
        self.index.is_some() || self.base == ESP
    }
}

impl Descriptor for Mem {
    type Field = u8;

    fn field(&self) -> u8 {
        if self.needs_sib() {
            0b100
        } else {
            self.base.value()
        }
    }

    fn kind(&self) -> u8 {
        self.mode.bits()
    }

    fn extension(&self) -> Extension {
        match self.index {
            Some((index, scale)) => Extension::Byte(builder::sib(scale, index, self.base)),
            // 0b100 in the index field means "no index"
            None if self.base == ESP => Extension::Byte(builder::sib(ScaleFactor::One, ESP, ESP)),
            None => Extension::Empty,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ImmClass {
    Byte,
    Half,
    Word,
}

impl ImmClass {
    /// Bit OR'd into the base opcode of forms that have a narrow variant.
    pub fn opcode_bit(self) -> u8 {
        match self {
            ImmClass::Byte => 0x02,
            ImmClass::Half | ImmClass::Word => 0x00,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ImmClass::Byte => "IB",
            ImmClass::Half => "IH",
            ImmClass::Word => "IW",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Immediate {
    value: i32,
    class: ImmClass,
}

impl Immediate {
    pub fn ib(value: i32) -> Immediate {
        Immediate {
            value,
            class: ImmClass::Byte,
        }
    }

    pub fn ih(value: i32) -> Immediate {
        Immediate {
            value,
            class: ImmClass::Half,
        }
    }

    pub fn iw(value: i32) -> Immediate {
        Immediate {
            value,
            class: ImmClass::Word,
        }
    }

    /// Narrowest class that holds `value` without truncation.
    pub fn fitting(value: i32) -> Immediate {
        if (0..=0x7F).contains(&value) {
            Immediate::ib(value)
        } else if (0..=0xFFFF).contains(&value) {
            Immediate::ih(value)
        } else {
            Immediate::iw(value)
        }
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn class(&self) -> ImmClass {
        self.class
    }
}

impl Descriptor for Immediate {
    type Field = i32;

    fn field(&self) -> i32 {
        self.value
    }

    fn kind(&self) -> u8 {
        self.class.opcode_bit()
    }

    fn extension(&self) -> Extension {
        match self.class {
            ImmClass::Byte => Extension::Byte(builder::narrow(self.value)),
            ImmClass::Half => Extension::Word((self.value & 0xFFFF) as u32),
            ImmClass::Word => Extension::Word(self.value as u32),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DispClass {
    Plain,
    Dp,
    Dh,
    Dw,
}

impl DispClass {
    pub fn name(self) -> &'static str {
        match self {
            DispClass::Plain => "PLAIN",
            DispClass::Dp => "DP",
            DispClass::Dh => "DH",
            DispClass::Dw => "DW",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Displacement {
    value: i32,
    class: DispClass,
}

impl Displacement {
    /// No displacement; pairs with `Mem::direct` and register operands.
    pub fn plain() -> Displacement {
        Displacement {
            value: 0,
            class: DispClass::Plain,
        }
    }

    /// 12-bit displacement, the portable range shared with other targets.
    pub fn dp(value: i32) -> Displacement {
        Displacement {
            value,
            class: DispClass::Dp,
        }
    }

    pub fn dh(value: i32) -> Displacement {
        Displacement {
            value,
            class: DispClass::Dh,
        }
    }

    pub fn dw(value: i32) -> Displacement {
        Displacement {
            value,
            class: DispClass::Dw,
        }
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn class(&self) -> DispClass {
        self.class
    }
}

impl Descriptor for Displacement {
    type Field = i32;

    fn field(&self) -> i32 {
        self.value
    }

    fn kind(&self) -> u8 {
        0
    }

    fn extension(&self) -> Extension {
        match self.class {
            DispClass::Plain => Extension::Empty,
            DispClass::Dp => Extension::Word((self.value & 0xFFF) as u32),
            DispClass::Dh => Extension::Word((self.value & 0xFFFF) as u32),
            DispClass::Dw => Extension::Word(self.value as u32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_projection() {
        assert_eq!(EDI.field(), 7);
        assert_eq!(EDI.kind(), 0b11);
        assert_eq!(EDI.extension(), Extension::Empty);
    }

    #[test]
    fn test_mem_projection() {
        let mem = Mem::direct(EAX);
        assert_eq!((mem.field(), mem.kind()), (0, 0b00));
        assert_eq!(mem.extension(), Extension::Empty);

        let mem = Mem::base(EDX);
        assert_eq!((mem.field(), mem.kind()), (2, 0b10));
        assert_eq!(mem.extension(), Extension::Empty);

        let mem = Mem::indexed(ECX, EAX, ScaleFactor::One);
        assert_eq!((mem.field(), mem.kind()), (0b100, 0b10));
        assert_eq!(mem.extension(), Extension::Byte(0x01));

        let mem = Mem::indexed(EBX, ESI, ScaleFactor::Four);
        assert_eq!(mem.extension(), Extension::Byte(0b10_110_011));
    }

    #[test]
    fn test_stack_pointer_base_gets_sib() {
        let mem = Mem::base(ESP);
        assert_eq!(mem.field(), 0b100);
        assert_eq!(mem.extension(), Extension::Byte(0x24));
    }

    #[test]
    fn test_immediate_classes() {
        assert_eq!(Immediate::ib(5).kind(), 0x02);
        assert_eq!(Immediate::ib(5).extension(), Extension::Byte(5));
        assert_eq!(Immediate::ih(0x12345).extension(), Extension::Word(0x2345));
        assert_eq!(Immediate::iw(-1).extension(), Extension::Word(0xFFFF_FFFF));
        assert_eq!(Immediate::iw(-1).kind(), 0);
    }

    #[test]
    fn test_narrow_immediate_drops_sign_bit() {
        assert_eq!(Immediate::ib(-1).extension(), Extension::Byte(0x7F));
        assert_eq!(Immediate::ib(0x80).extension(), Extension::Byte(0x00));
    }

    #[test]
    fn test_fitting() {
        assert_eq!(Immediate::fitting(127).class(), ImmClass::Byte);
        assert_eq!(Immediate::fitting(128).class(), ImmClass::Half);
        assert_eq!(Immediate::fitting(0x10000).class(), ImmClass::Word);
        assert_eq!(Immediate::fitting(-1).class(), ImmClass::Word);
    }

    #[test]
    fn test_displacement_truncation() {
        assert_eq!(Displacement::plain().extension(), Extension::Empty);
        assert_eq!(Displacement::dp(0x1FF8).extension(), Extension::Word(0xFF8));
        assert_eq!(Displacement::dh(0x12345).extension(), Extension::Word(0x2345));
        assert_eq!(Displacement::dw(-4).extension(), Extension::Word(0xFFFF_FFFC));
        assert_eq!(Displacement::dw(-4).kind(), 0);
    }
}
