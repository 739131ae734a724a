use std::fmt;

use rtarch_asm::x86::{
    Condition, Displacement, Immediate, Inst, Mem, Register, ScaleFactor, EAX,
};
use rtarch_asm::Label;

const REGISTER_NAMES: [&str; 8] = ["eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi"];

/// One parsed instruction together with the line it came from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Request {
    pub line: usize,
    pub inst: Inst,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

pub fn parse_program(text: &str) -> Result<Vec<Request>, ParseError> {
    let mut requests = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let code = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let code = code.trim();

        if code.is_empty() {
            continue;
        }

        let inst = parse_line(code).map_err(|message| ParseError {
            line: line_no,
            message,
        })?;

        requests.push(Request {
            line: line_no,
            inst,
        });
    }

    Ok(requests)
}

fn parse_line(code: &str) -> Result<Inst, String> {
    if let Some(name) = code.strip_suffix(':') {
        return Ok(Inst::Lbl(parse_label(name.trim())?));
    }

    if let Some(name) = code.strip_prefix("LBL(").and_then(|rest| rest.strip_suffix(')')) {
        return Ok(Inst::Lbl(parse_label(name.trim())?));
    }

    let (name, rest) = match code.find(char::is_whitespace) {
        Some(pos) => (&code[..pos], &code[pos..]),
        None => (code, ""),
    };

    let mut ops = Operands::new(rest);
    let inst = parse_inst(name, &mut ops)?;
    ops.finish()?;

    Ok(inst)
}

fn parse_inst(name: &str, ops: &mut Operands) -> Result<Inst, String> {
    let inst = match name {
        "movxx_ri" => Inst::MovRi { rm: ops.reg()?, im: ops.imm()? },
        "movxx_mi" => Inst::MovMi { rm: ops.mem()?, dp: ops.disp()?, im: ops.imm()? },
        "movxx_rr" => Inst::MovRr { rg: ops.reg()?, rm: ops.reg()? },
        "movxx_ld" => Inst::MovLd { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },
        "movxx_st" => Inst::MovSt { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },

        "adrxx_ld" => Inst::AdrLd { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },
        "adrxx_lb" => Inst::AdrLb(ops.label()?),

        "stack_st" => Inst::StackSt { rm: ops.reg()? },
        "stack_ld" => Inst::StackLd { rm: ops.reg()? },
        "stack_sa" => Inst::StackSa,
        "stack_la" => Inst::StackLa,

        "andxx_ri" => Inst::AndRi { rm: ops.reg()?, im: ops.imm()? },
        "andxx_mi" => Inst::AndMi { rm: ops.mem()?, dp: ops.disp()?, im: ops.imm()? },
        "andxx_rr" => Inst::AndRr { rg: ops.reg()?, rm: ops.reg()? },
        "andxx_ld" => Inst::AndLd { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },
        "andxx_st" => Inst::AndSt { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },

        "orrxx_ri" => Inst::OrrRi { rm: ops.reg()?, im: ops.imm()? },
        "orrxx_mi" => Inst::OrrMi { rm: ops.mem()?, dp: ops.disp()?, im: ops.imm()? },
        "orrxx_rr" => Inst::OrrRr { rg: ops.reg()?, rm: ops.reg()? },
        "orrxx_ld" => Inst::OrrLd { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },
        "orrxx_st" => Inst::OrrSt { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },

        "notxx_rr" => Inst::NotRr { rm: ops.reg()? },
        "notxx_mm" => Inst::NotMm { rm: ops.mem()?, dp: ops.disp()? },

        "addxx_ri" => Inst::AddRi { rm: ops.reg()?, im: ops.imm()? },
        "addxx_mi" => Inst::AddMi { rm: ops.mem()?, dp: ops.disp()?, im: ops.imm()? },
        "addxx_rr" => Inst::AddRr { rg: ops.reg()?, rm: ops.reg()? },
        "addxx_ld" => Inst::AddLd { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },
        "addxx_st" => Inst::AddSt { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },

        "subxx_ri" => Inst::SubRi { rm: ops.reg()?, im: ops.imm()? },
        "subxx_mi" => Inst::SubMi { rm: ops.mem()?, dp: ops.disp()?, im: ops.imm()? },
        "subxx_rr" => Inst::SubRr { rg: ops.reg()?, rm: ops.reg()? },
        "subxx_ld" => Inst::SubLd { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },
        "subxx_st" => Inst::SubSt { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },
        "subxx_mr" => Inst::SubMr { rm: ops.mem()?, dp: ops.disp()?, rg: ops.reg()? },

        "shlxx_ri" => Inst::ShlRi { rm: ops.reg()?, im: ops.imm()? },
        "shlxx_mi" => Inst::ShlMi { rm: ops.mem()?, dp: ops.disp()?, im: ops.imm()? },
        "shrxx_ri" => Inst::ShrRi { rm: ops.reg()?, im: ops.imm()? },
        "shrxx_mi" => Inst::ShrMi { rm: ops.mem()?, dp: ops.disp()?, im: ops.imm()? },
        "shrxn_ri" => Inst::ShrnRi { rm: ops.reg()?, im: ops.imm()? },
        "shrxn_mi" => Inst::ShrnMi { rm: ops.mem()?, dp: ops.disp()?, im: ops.imm()? },

        "mulxn_ri" => Inst::MulRi { rm: ops.reg()?, im: ops.imm()? },
        "mulxn_rr" => Inst::MulRr { rg: ops.reg()?, rm: ops.reg()? },
        "mulxn_ld" => Inst::MulLd { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },
        "mulxn_xm" => match ops.reg_or_mem()? {
            Target::Reg(rm) => Inst::MulXr { rm },
            Target::Mem(rm, dp) => Inst::MulXm { rm, dp },
        },
        "divxn_xm" => match ops.reg_or_mem()? {
            Target::Reg(rm) => Inst::DivXr { rm },
            Target::Mem(rm, dp) => Inst::DivXm { rm, dp },
        },

        "cmpxx_ri" => Inst::CmpRi { rm: ops.reg()?, im: ops.imm()? },
        "cmpxx_mi" => Inst::CmpMi { rm: ops.mem()?, dp: ops.disp()?, im: ops.imm()? },
        "cmpxx_rr" => Inst::CmpRr { rg: ops.reg()?, rm: ops.reg()? },
        "cmpxx_rm" => Inst::CmpRm { rg: ops.reg()?, rm: ops.mem()?, dp: ops.disp()? },
        "cmpxx_mr" => Inst::CmpMr { rm: ops.mem()?, dp: ops.disp()?, rg: ops.reg()? },

        "jmpxx_mm" => Inst::JmpMm { rm: ops.mem()?, dp: ops.disp()? },
        "jmpxx_lb" => Inst::JmpLb(ops.label()?),

        _ => match condition(name) {
            Some(cond) => Inst::Jcc(cond, ops.label()?),
            None => return Err(format!("unknown instruction '{}'", name)),
        },
    };

    Ok(inst)
}

/// `xx` branches compare unsigned, `xn` branches signed.
fn condition(name: &str) -> Option<Condition> {
    let cond = match name {
        "jeqxx_lb" => Condition::Equal,
        "jnexx_lb" => Condition::NotEqual,
        "jnzxx_lb" => Condition::NotZero,
        "jltxx_lb" => Condition::Below,
        "jlexx_lb" => Condition::BelowOrEqual,
        "jgtxx_lb" => Condition::Above,
        "jgexx_lb" => Condition::AboveOrEqual,
        "jltxn_lb" => Condition::Less,
        "jlexn_lb" => Condition::LessOrEqual,
        "jgtxn_lb" => Condition::Greater,
        "jgexn_lb" => Condition::GreaterOrEqual,
        _ => return None,
    };

    Some(cond)
}

enum Target {
    Reg(Register),
    Mem(Mem, Displacement),
}

struct Operands<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> Operands<'a> {
    fn new(text: &'a str) -> Operands<'a> {
        let tokens = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .collect();

        Operands { tokens, pos: 0 }
    }

    fn next(&mut self, expected: &str) -> Result<&'a str, String> {
        match self.tokens.get(self.pos).copied() {
            Some(token) => {
                self.pos += 1;
                Ok(token)
            }
            None => Err(format!("missing operand, expected {}", expected)),
        }
    }

    fn finish(&self) -> Result<(), String> {
        match self.tokens.get(self.pos) {
            Some(token) => Err(format!("unexpected operand '{}'", token)),
            None => Ok(()),
        }
    }

    fn reg(&mut self) -> Result<Register, String> {
        let token = self.next("register")?;

        token
            .strip_prefix('R')
            .and_then(register)
            .ok_or_else(|| format!("expected register, got '{}'", token))
    }

    fn mem(&mut self) -> Result<Mem, String> {
        let token = self.next("memory operand")?;
        memory(token).ok_or_else(|| format!("expected memory operand, got '{}'", token))
    }

    fn reg_or_mem(&mut self) -> Result<Target, String> {
        let token = self.next("register or memory operand")?;

        let target = if let Some(reg) = token.strip_prefix('R').and_then(register) {
            let dp = self.disp()?;

            if dp != Displacement::plain() {
                return Err("register operand takes PLAIN displacement".into());
            }

            Target::Reg(reg)
        } else if let Some(mem) = memory(token) {
            Target::Mem(mem, self.disp()?)
        } else {
            return Err(format!(
                "expected register or memory operand, got '{}'",
                token
            ));
        };

        Ok(target)
    }

    fn disp(&mut self) -> Result<Displacement, String> {
        let token = self.next("displacement")?;

        if token == "PLAIN" {
            return Ok(Displacement::plain());
        }

        let (class, value) =
            call(token).ok_or_else(|| format!("expected displacement, got '{}'", token))?;
        let value = parse_number(value)?;

        match class {
            "DP" => Ok(Displacement::dp(value)),
            "DH" => Ok(Displacement::dh(value)),
            "DW" => Ok(Displacement::dw(value)),
            _ => Err(format!("expected displacement, got '{}'", token)),
        }
    }

    fn imm(&mut self) -> Result<Immediate, String> {
        let token = self.next("immediate")?;
        let (class, value) =
            call(token).ok_or_else(|| format!("expected immediate, got '{}'", token))?;
        let value = parse_number(value)?;

        match class {
            "IB" => Ok(Immediate::ib(value)),
            "IH" => Ok(Immediate::ih(value)),
            "IW" => Ok(Immediate::iw(value)),
            _ => Err(format!("expected immediate, got '{}'", token)),
        }
    }

    fn label(&mut self) -> Result<Label, String> {
        let token = self.next("label")?;
        parse_label(token)
    }
}

fn register(name: &str) -> Option<Register> {
    REGISTER_NAMES
        .iter()
        .position(|&reg| reg == name)
        .map(|idx| Register::new(idx as u8))
}

fn memory(token: &str) -> Option<Mem> {
    let mut chars = token.chars();
    let prefix = chars.next()?;
    let base = register(chars.as_str())?;

    match prefix {
        'O' => Some(Mem::direct(base)),
        'M' => Some(Mem::base(base)),
        'I' => Some(Mem::indexed(base, EAX, ScaleFactor::One)),
        _ => None,
    }
}

/// Splits `NAME(arg)` into its parts.
fn call(token: &str) -> Option<(&str, &str)> {
    let open = token.find('(')?;
    let inner = token[open + 1..].strip_suffix(')')?;
    Some((&token[..open], inner))
}

fn parse_number(text: &str) -> Result<i32, String> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (radix, body) = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => (16, hex),
        None => (10, digits),
    };

    // digits only, no sign after the leading '-'
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return Err(format!("invalid number '{}'", text));
    }

    let value =
        i64::from_str_radix(body, radix).map_err(|_| format!("invalid number '{}'", text))?;

    let value = if negative { -value } else { value };

    if value < i32::MIN as i64 || value > u32::MAX as i64 {
        return Err(format!("number '{}' does not fit into 32 bits", text));
    }

    Ok(value as i32)
}

fn parse_label(name: &str) -> Result<Label, String> {
    let valid = name
        .chars()
        .next()
        .map_or(false, |first| first.is_ascii_alphabetic() || first == '_' || first == '.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');

    if !valid {
        return Err(format!("invalid label '{}'", name));
    }

    Ok(Label::named(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtarch_asm::x86::{EBP, ECX, EDI, EDX};

    fn parse_one(text: &str) -> Inst {
        let requests = parse_program(text).unwrap();
        assert_eq!(requests.len(), 1);
        requests.into_iter().next().unwrap().inst
    }

    #[test]
    fn test_parse_shapes() {
        assert_eq!(
            parse_one("addxx_ri Reax, IB(5)"),
            Inst::AddRi { rm: EAX, im: Immediate::ib(5) }
        );
        assert_eq!(
            parse_one("movxx_ld Recx, Medx, DP(8)"),
            Inst::MovLd { rg: ECX, rm: Mem::base(EDX), dp: Displacement::dp(8) }
        );
        assert_eq!(
            parse_one("cmpxx_mi Iebp, DP(0x10), IW(-1)"),
            Inst::CmpMi {
                rm: Mem::indexed(EBP, EAX, ScaleFactor::One),
                dp: Displacement::dp(0x10),
                im: Immediate::iw(-1),
            }
        );
        assert_eq!(
            parse_one("subxx_mr Oedi PLAIN Reax"),
            Inst::SubMr { rm: Mem::direct(EDI), dp: Displacement::plain(), rg: EAX }
        );
        assert_eq!(parse_one("stack_sa"), Inst::StackSa);
    }

    #[test]
    fn test_parse_implicit_forms() {
        assert_eq!(parse_one("divxn_xm Recx, PLAIN"), Inst::DivXr { rm: ECX });
        assert_eq!(
            parse_one("mulxn_xm Mebp, DH(0x100)"),
            Inst::MulXm { rm: Mem::base(EBP), dp: Displacement::dh(0x100) }
        );

        let err = parse_program("divxn_xm Recx, DP(4)").unwrap_err();
        assert_eq!(err.message, "register operand takes PLAIN displacement");
    }

    #[test]
    fn test_parse_labels() {
        let requests = parse_program("LBL(head)\njnexx_lb head\nexit:\njltxn_lb exit\n").unwrap();
        let insts: Vec<Inst> = requests.into_iter().map(|req| req.inst).collect();

        assert_eq!(
            insts,
            vec![
                Inst::Lbl(Label::named("head")),
                Inst::Jcc(Condition::NotEqual, Label::named("head")),
                Inst::Lbl(Label::named("exit")),
                Inst::Jcc(Condition::Less, Label::named("exit")),
            ]
        );
    }

    #[test]
    fn test_comments_and_line_numbers() {
        let text = "# prologue\n\nstack_sa   # save all\n\naddxx_ri Reax, IB(1)\n";
        let requests = parse_program(text).unwrap();

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].line, 3);
        assert_eq!(requests[1].line, 5);
    }

    #[test]
    fn test_errors_carry_line() {
        let err = parse_program("stack_sa\nfooxx_rr Reax, Recx\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.to_string(), "line 2: unknown instruction 'fooxx_rr'");

        let err = parse_program("addxx_rr Reax").unwrap_err();
        assert_eq!(err.message, "missing operand, expected register");

        let err = parse_program("notxx_rr Reax, Recx").unwrap_err();
        assert_eq!(err.message, "unexpected operand 'Recx'");

        let err = parse_program("movxx_ld Reax, Reax, DP(0)").unwrap_err();
        assert_eq!(err.message, "expected memory operand, got 'Reax'");

        let err = parse_program("addxx_ri Reax, DP(1)").unwrap_err();
        assert_eq!(err.message, "expected immediate, got 'DP(1)'");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Ok(42));
        assert_eq!(parse_number("-8"), Ok(-8));
        assert_eq!(parse_number("0xFFF"), Ok(0xFFF));
        assert_eq!(parse_number("0xFFFFFFFF"), Ok(-1));
        assert!(parse_number("0x1FFFFFFFF").is_err());
        assert!(parse_number("ten").is_err());
    }

    #[test]
    fn test_parse_number_single_sign() {
        assert_eq!(parse_number("--5"), Err("invalid number '--5'".to_string()));
        assert_eq!(parse_number("-+5"), Err("invalid number '-+5'".to_string()));
        assert_eq!(parse_number("+5"), Err("invalid number '+5'".to_string()));
        assert_eq!(parse_number("0x-5"), Err("invalid number '0x-5'".to_string()));
        assert_eq!(parse_number("-"), Err("invalid number '-'".to_string()));

        let err = parse_program("addxx_ri Reax, IB(--5)").unwrap_err();
        assert_eq!(err.message, "invalid number '--5'");
    }
}
