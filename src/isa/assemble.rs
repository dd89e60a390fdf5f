use alloc::string::{String, ToString};
use alloc::vec::Vec;
use alloc::format;
use core::fmt;

use crate::isa::encoding::{HintPart, OperandKind, RegisterRole};
use crate::isa::matcher::Match;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterValue {
    pub index: u32,
    // the field may name the stack pointer, if the template offers it
    pub sp_alias: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Operands {
    pub rd: Option<RegisterValue>,
    pub rn: Option<RegisterValue>,
    pub rm: Option<RegisterValue>,
    pub rt: Option<RegisterValue>,
    pub imm: Option<u64>,
    pub offs: Option<u64>,
    pub shift: Option<u32>,
    pub crm: Option<u32>,
    pub op2: Option<u32>,
}

impl Operands {
    // collect field values from a match. every `imm*` field writes the same slot, so with several
    // of them the last one in field order wins.
    pub fn extract(m: &Match) -> Operands {
        let mut ops = Operands::default();
        for (field, bits) in m.captures() {
            let value = match bits.value() {
                Some(value) => value,
                None => continue,
            };
            match field.kind() {
                OperandKind::Register { role, sp_alias } => {
                    *ops.register_mut(role) = Some(RegisterValue { index: value, sp_alias });
                }
                OperandKind::Immediate => ops.imm = Some(value as u64),
                OperandKind::Offset => ops.offs = Some(value as u64),
                OperandKind::ShiftSelector => ops.shift = Some(value),
                OperandKind::HintSubfield(HintPart::CRm) => ops.crm = Some(value),
                OperandKind::HintSubfield(HintPart::Op2) => ops.op2 = Some(value),
                OperandKind::Ignored => {}
            }
        }

        // HINT #<imm> is CRm:op2
        if ops.imm.is_none() {
            if let (Some(crm), Some(op2)) = (ops.crm, ops.op2) {
                ops.imm = Some(((crm << 3) | op2) as u64);
            }
        }
        ops
    }

    pub fn register(&self, role: RegisterRole) -> Option<RegisterValue> {
        match role {
            RegisterRole::D => self.rd,
            RegisterRole::N => self.rn,
            RegisterRole::M => self.rm,
            RegisterRole::T => self.rt,
        }
    }

    fn register_mut(&mut self, role: RegisterRole) -> &mut Option<RegisterValue> {
        match role {
            RegisterRole::D => &mut self.rd,
            RegisterRole::N => &mut self.rn,
            RegisterRole::M => &mut self.rm,
            RegisterRole::T => &mut self.rt,
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct Form {
    placeholder: &'static str,
    prefix: char,
    sp: Option<&'static str>,
}

const fn plain(placeholder: &'static str, prefix: char) -> Form {
    Form { placeholder, prefix, sp: None }
}

const fn or_sp(placeholder: &'static str, prefix: char, sp: &'static str) -> Form {
    Form { placeholder, prefix, sp: Some(sp) }
}

// the first group with a placeholder present in the template is the one substituted. every
// placeholder in that group is replaced.
const RD_FORMS: &[&[Form]] = &[
    &[or_sp("<Xd|SP>", 'x', "sp")],
    &[plain("<Xd>", 'x')],
    &[or_sp("<Wd|WSP>", 'w', "wsp")],
    &[plain("<Wd>", 'w')],
];
const RN_FORMS: &[&[Form]] = &[
    &[or_sp("<Xn|SP>", 'x', "sp")],
    &[plain("<Xn>", 'x')],
    &[or_sp("<Wn|WSP>", 'w', "wsp")],
    &[plain("<Wn>", 'w')],
];
const RM_FORMS: &[&[Form]] = &[
    &[plain("<Xm>", 'x'), plain("<R><m>", 'x')],
    &[plain("<Wm>", 'w')],
];
const RT_FORMS: &[&[Form]] = &[
    &[plain("<Xt>", 'x')],
    &[plain("<Wt>", 'w')],
];

// optional syntax deleted when nothing resolved it
const OPTIONAL_GROUPS: &[&str] = &[
    "{, <shift>}",
    "{, <extend> {#<amount>}}",
    "{, <shift> #<amount>}",
];

fn forms(role: RegisterRole) -> &'static [&'static [Form]] {
    match role {
        RegisterRole::D => RD_FORMS,
        RegisterRole::N => RN_FORMS,
        RegisterRole::M => RM_FORMS,
        RegisterRole::T => RT_FORMS,
    }
}

fn substitute_register(text: &mut String, role: RegisterRole, reg: RegisterValue) {
    let group = forms(role)
        .iter()
        .find(|group| group.iter().any(|form| text.contains(form.placeholder)));
    if let Some(group) = group {
        for form in group.iter() {
            let name = match form.sp {
                Some(sp) if reg.sp_alias && reg.index == 31 => sp.to_string(),
                _ => format!("{}{}", form.prefix, reg.index),
            };
            *text = text.replace(form.placeholder, &name);
        }
    }
}

pub fn render(template: &str, ops: &Operands) -> String {
    let mut text = template.to_string();

    for role in [RegisterRole::D, RegisterRole::N, RegisterRole::M, RegisterRole::T] {
        if let Some(reg) = ops.register(role) {
            substitute_register(&mut text, role, reg);
        }
    }

    if let Some(imm) = ops.imm {
        text = text.replace("#<imm>", &format!("#{:#x}", imm));
        text = text.replace("<imm>", &format!("{:#x}", imm));
    }

    if let Some(offs) = ops.offs {
        let offs = format!("{:#x}", offs);
        text = text.replace("<offs>", &offs);
        text = text.replace("<simm>", &offs);
    }

    // `sh` is the single-bit selector of the add/sub immediate family: 0 or `lsl #12`
    match ops.shift {
        Some(0) => {
            text = text.replace("{, <shift>}", "");
        }
        Some(_) => {
            text = text.replace("<shift>", "lsl #12");
            text = text.replace("{, ", ", ").replace('}', "");
        }
        None => {}
    }

    for group in OPTIONAL_GROUPS {
        text = text.replace(group, "");
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Strictness {
    #[default]
    Lenient,
    Strict,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unresolved {
    pub text: String,
    pub placeholder: String,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unresolved placeholder {} in \"{}\"", self.placeholder, self.text)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Unresolved {}

pub fn first_placeholder(text: &str) -> Option<&str> {
    let start = text.find('<')?;
    let len = text[start..].find('>')?;
    Some(&text[start..start + len + 1])
}

pub fn assemble(m: &Match, strictness: Strictness) -> Result<(Operands, String), Unresolved> {
    let ops = Operands::extract(m);
    let text = render(m.template().assembly_template(), &ops);
    if strictness == Strictness::Strict {
        if let Some(placeholder) = first_placeholder(&text) {
            return Err(Unresolved { placeholder: placeholder.to_string(), text });
        }
    }
    Ok((ops, text))
}
