use byteorder::{LittleEndian, WriteBytesExt};
use std::fmt;

pub mod error;
pub mod x86;

pub use crate::error::EncodeError;

/// Symbolic jump target. Addresses are resolved by the backend assembler
/// that consumes the rendered stream, never by this crate.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Label(String);

impl Label {
    pub fn named(name: impl Into<String>) -> Label {
        Label(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Directive {
    Jump {
        mnemonic: &'static str,
        target: Label,
    },
    Bind(Label),
    LoadAddress {
        register: &'static str,
        target: Label,
    },
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Directive::Jump { mnemonic, target } => write!(f, "{} {}", mnemonic, target),
            Directive::Bind(label) => write!(f, "{}:", label),
            Directive::LoadAddress { register, target } => {
                write!(f, "lea {}, [{}]", register, target)
            }
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Item {
    Code(Vec<u8>),
    Directive(Directive),
}

/// Append-only output of the encoders: runs of raw bytes interleaved with
/// directives for the backend assembler.
#[derive(Default, Debug)]
pub struct AssemblerBuffer {
    items: Vec<Item>,
    len: usize,
    next_label: usize,
}

impl AssemblerBuffer {
    pub fn new() -> AssemblerBuffer {
        AssemblerBuffer {
            items: Vec::new(),
            len: 0,
            next_label: 0,
        }
    }

    pub fn create_label(&mut self) -> Label {
        let label = Label(format!("L{}", self.next_label));
        self.next_label += 1;
        label
    }

    /// Number of raw code bytes emitted so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing at all was emitted. Unlike `len`, directives count,
    /// so a buffer holding only labels is not empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn has_directives(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item, Item::Directive(_)))
    }

    /// All raw bytes in emission order, directives skipped.
    pub fn code(&self) -> Vec<u8> {
        let mut code = Vec::with_capacity(self.len);

        for item in &self.items {
            if let Item::Code(bytes) = item {
                code.extend_from_slice(bytes);
            }
        }

        code
    }

    pub fn emit_u8(&mut self, value: u8) {
        self.code_run().push(value);
        self.len += 1;
    }

    pub fn emit_u32(&mut self, value: u32) {
        self.code_run().write_u32::<LittleEndian>(value).unwrap();
        self.len += 4;
    }

    pub fn emit_directive(&mut self, directive: Directive) {
        self.items.push(Item::Directive(directive));
    }

    /// Moves the items of `other` to the end of this buffer. Byte runs are
    /// kept separate, so every appended piece renders on its own line.
    pub fn append(&mut self, other: AssemblerBuffer) {
        self.len += other.len;
        self.items.extend(other.items);
    }

    pub fn render(&self) -> String {
        let mut text = String::new();

        for item in &self.items {
            match item {
                Item::Code(bytes) => {
                    text.push_str(".byte ");

                    for (ind, byte) in bytes.iter().enumerate() {
                        if ind > 0 {
                            text.push_str(", ");
                        }

                        text.push_str(&format!("0x{:02x}", byte));
                    }
                }

                Item::Directive(directive) => text.push_str(&directive.to_string()),
            }

            text.push('\n');
        }

        text
    }

    fn code_run(&mut self) -> &mut Vec<u8> {
        if !matches!(self.items.last(), Some(Item::Code(_))) {
            self.items.push(Item::Code(Vec::new()));
        }

        match self.items.last_mut() {
            Some(Item::Code(bytes)) => bytes,
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_u32_little_endian() {
        let mut buf = AssemblerBuffer::new();
        buf.emit_u32(0x1122_3344);
        assert_eq!(buf.code(), vec![0x44, 0x33, 0x22, 0x11]);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_bytes_merge_into_one_run() {
        let mut buf = AssemblerBuffer::new();
        buf.emit_u8(0x83);
        buf.emit_u8(0xc0);
        buf.emit_u8(0x05);
        assert_eq!(buf.items(), &[Item::Code(vec![0x83, 0xc0, 0x05])]);
    }

    #[test]
    fn test_directive_splits_runs() {
        let mut buf = AssemblerBuffer::new();
        let label = buf.create_label();
        buf.emit_u8(0x60);
        buf.emit_directive(Directive::Jump {
            mnemonic: "jne",
            target: label.clone(),
        });
        buf.emit_u8(0x61);

        assert!(buf.has_directives());
        assert_eq!(buf.items().len(), 3);
        assert_eq!(buf.code(), vec![0x60, 0x61]);
        assert_eq!(buf.render(), ".byte 0x60\njne L0\n.byte 0x61\n");
    }

    #[test]
    fn test_append_keeps_pieces_apart() {
        let mut buf = AssemblerBuffer::new();
        buf.emit_u8(0x60);

        let mut piece = AssemblerBuffer::new();
        piece.emit_u8(0x61);
        buf.append(piece);

        assert_eq!(buf.len(), 2);
        assert_eq!(buf.render(), ".byte 0x60\n.byte 0x61\n");
    }

    #[test]
    fn test_directive_only_buffer() {
        let mut buf = AssemblerBuffer::new();
        assert!(buf.is_empty());

        buf.emit_directive(Directive::Bind(Label::named("entry")));
        assert_eq!(buf.len(), 0);
        assert!(!buf.is_empty());
        assert!(buf.has_directives());
    }

    #[test]
    fn test_create_label_is_unique() {
        let mut buf = AssemblerBuffer::new();
        assert_eq!(buf.create_label(), Label::named("L0"));
        assert_eq!(buf.create_label(), Label::named("L1"));
    }

    #[test]
    fn test_render_directives() {
        let target = Label::named("cycle");
        assert_eq!(Directive::Bind(target.clone()).to_string(), "cycle:");
        assert_eq!(
            Directive::LoadAddress {
                register: "eax",
                target
            }
            .to_string(),
            "lea eax, [cycle]"
        );
    }
}
