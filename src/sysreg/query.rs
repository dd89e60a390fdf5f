// the register query language and the reports it produces.
// RES0 | RES1 | UNPREDICTABLE | UNDEFINED | RAO | UNKNOWN
// REG.FIELD[hi:lo]   REG.FIELD[bit]   REG.FIELD
// REG[hi:lo]         REG[bit]         REG

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use crate::sysreg::{FieldLocation, Register, RegisterDb, RegisterField};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Definition {
    Res0,
    Res1,
    Unpredictable,
    Undefined,
    Rao,
    Unknown,
}

impl Definition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Definition::Res0 => "RES0",
            Definition::Res1 => "RES1",
            Definition::Unpredictable => "UNPREDICTABLE",
            Definition::Undefined => "UNDEFINED",
            Definition::Rao => "RAO",
            Definition::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for Definition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RES0" => Ok(Definition::Res0),
            "RES1" => Ok(Definition::Res1),
            "UNPREDICTABLE" => Ok(Definition::Unpredictable),
            "UNDEFINED" => Ok(Definition::Undefined),
            "RAO" => Ok(Definition::Rao),
            "UNKNOWN" => Ok(Definition::Unknown),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegisterQuery {
    Definition(Definition),
    // `REG.FIELD`, optionally pinned to an exact `[hi:lo]`
    Field { register: String, field: String, range: Option<(u32, u32)> },
    // `REG[hi:lo]`, with `hi >= lo`; a single bit has `hi == lo`
    Bits { register: String, hi: u32, lo: u32 },
    Register(String),
    // every register with a field of this name
    FieldUsers(String),
    // every register under this feature
    Feature(String),
}

fn is_register_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '<' || c == '>')
}

fn is_field_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn parse_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn split_bits(s: &str) -> Option<(&str, Option<(u32, u32)>)> {
    let open = match s.find('[') {
        Some(open) => open,
        None => return Some((s, None)),
    };
    let inner = s[open + 1..].strip_suffix(']')?;
    let (a, b) = match inner.split_once(':') {
        Some((a, b)) => (parse_number(a)?, parse_number(b)?),
        None => {
            let bit = parse_number(inner)?;
            (bit, bit)
        }
    };
    Some((&s[..open], Some((a.max(b), a.min(b)))))
}

impl RegisterQuery {
    pub fn parse(input: &str) -> Result<RegisterQuery, QueryError> {
        let q = input.trim();
        let invalid = || QueryError::Invalid(input.to_string());

        if let Ok(definition) = q.parse::<Definition>() {
            return Ok(RegisterQuery::Definition(definition));
        }

        if let Some((register, rest)) = q.split_once('.') {
            let (field, range) = split_bits(rest).ok_or_else(invalid)?;
            if !is_register_name(register) || !is_field_name(field) {
                return Err(invalid());
            }
            return Ok(RegisterQuery::Field { register: register.into(), field: field.into(), range });
        }

        let (register, range) = split_bits(q).ok_or_else(invalid)?;
        if !is_register_name(register) {
            return Err(invalid());
        }
        Ok(match range {
            Some((hi, lo)) => RegisterQuery::Bits { register: register.into(), hi, lo },
            None => RegisterQuery::Register(register.into()),
        })
    }
}

impl FromStr for RegisterQuery {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegisterQuery::parse(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryError {
    Invalid(String),
    UnknownRegister(String),
    NoFieldAtBits { register: String, hi: u32, lo: u32 },
    UnknownField { register: String, field: String },
    FieldNotAtRange { register: String, field: String, hi: u32, lo: u32 },
    UnknownDefinition(String),
    UnknownFeature(String),
    // no register has a field of this name
    UnusedField(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryError::Invalid(q) => write!(f, "invalid query format: '{}'", q),
            QueryError::UnknownRegister(r) => write!(f, "register '{}' not found in database", r),
            QueryError::NoFieldAtBits { register, hi, lo } if hi == lo => {
                write!(f, "no field found for bit [{}] in register '{}'", hi, register)
            }
            QueryError::NoFieldAtBits { register, hi, lo } => {
                write!(f, "no fields found for bit range [{}:{}] in register '{}'", hi, lo, register)
            }
            QueryError::UnknownField { register, field } => {
                write!(f, "field '{}' not found in register '{}'", field, register)
            }
            QueryError::FieldNotAtRange { register, field, hi, lo } => {
                write!(f, "field '{}' of register '{}' is not at bit range [{}:{}]", field, register, hi, lo)
            }
            QueryError::UnknownDefinition(d) => write!(f, "no fields found with definition '{}'", d),
            QueryError::UnknownFeature(feat) => write!(f, "no registers found for feature '{}'", feat),
            QueryError::UnusedField(field) => write!(f, "no register has a field named '{}'", field),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for QueryError {}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature="use-serde", derive(Serialize))]
#[cfg_attr(feature="use-serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Answer<'a> {
    Register { register: &'a Register },
    Bit { register: &'a str, bit: u32, field: &'a RegisterField },
    Range { register: &'a str, hi: u32, lo: u32, fields: Vec<&'a RegisterField> },
    Field { register: &'a str, field: &'a RegisterField },
    Definition { definition: Definition, locations: &'a [FieldLocation] },
    FieldUsers { field: String, registers: &'a [String] },
    Feature { feature: String, registers: &'a [String] },
}

#[cfg(feature="use-serde")]
impl serde::Serialize for Definition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl RegisterDb {
    pub fn answer(&self, query: &RegisterQuery) -> Result<Answer<'_>, QueryError> {
        let register = |name: &str| self.get(name).ok_or_else(|| QueryError::UnknownRegister(name.into()));

        match query {
            RegisterQuery::Definition(definition) => {
                let locations = self.fields_with_definition(definition.as_str());
                if locations.is_empty() {
                    return Err(QueryError::UnknownDefinition(definition.as_str().into()));
                }
                Ok(Answer::Definition { definition: *definition, locations })
            }
            RegisterQuery::Field { register: name, field, range } => {
                let reg = register(name)?;
                let unknown = || QueryError::UnknownField { register: name.clone(), field: field.clone() };
                let found = match range {
                    Some((hi, lo)) => {
                        if reg.field(field).is_none() {
                            return Err(unknown());
                        }
                        reg.fields.iter()
                            .find(|f| &f.name == field && f.msb == *hi && f.lsb == *lo)
                            .ok_or_else(|| QueryError::FieldNotAtRange {
                                register: name.clone(),
                                field: field.clone(),
                                hi: *hi,
                                lo: *lo,
                            })?
                    }
                    None => reg.field(field).ok_or_else(unknown)?,
                };
                Ok(Answer::Field { register: &reg.name, field: found })
            }
            RegisterQuery::Bits { register: name, hi, lo } => {
                let reg = register(name)?;
                let missing = || QueryError::NoFieldAtBits { register: name.clone(), hi: *hi, lo: *lo };
                if hi == lo {
                    let field = reg.field_at(*hi).ok_or_else(missing)?;
                    Ok(Answer::Bit { register: &reg.name, bit: *hi, field })
                } else {
                    let fields = reg.fields_in(*hi, *lo);
                    if fields.is_empty() {
                        return Err(missing());
                    }
                    Ok(Answer::Range { register: &reg.name, hi: *hi, lo: *lo, fields })
                }
            }
            RegisterQuery::Register(name) => Ok(Answer::Register { register: register(name)? }),
            RegisterQuery::FieldUsers(field) => {
                let registers = self.registers_with_field(field);
                if registers.is_empty() {
                    return Err(QueryError::UnusedField(field.clone()));
                }
                Ok(Answer::FieldUsers { field: field.clone(), registers })
            }
            RegisterQuery::Feature(feature) => {
                let registers = self.registers_with_feature(feature);
                if registers.is_empty() {
                    return Err(QueryError::UnknownFeature(feature.clone()));
                }
                Ok(Answer::Feature { feature: feature.clone(), registers })
            }
        }
    }

    pub fn query(&self, input: &str) -> Result<Answer<'_>, QueryError> {
        let query = RegisterQuery::parse(input)?;
        log::debug!("register query {:?}", query);
        self.answer(&query)
    }
}

const RULE: &str = "================================================================================";
const WRAP: usize = 78;

fn write_wrapped(f: &mut fmt::Formatter, indent: &str, text: &str) -> fmt::Result {
    let mut line = String::from(indent);
    for word in text.split_whitespace() {
        let at_start = line.len() == indent.len();
        if !at_start && line.chars().count() + word.chars().count() + 1 > WRAP {
            writeln!(f, "{}", line)?;
            line.truncate(indent.len());
        } else if !at_start {
            line.push(' ');
        }
        line.push_str(word);
    }
    if line.len() > indent.len() {
        writeln!(f, "{}", line)?;
    }
    Ok(())
}

fn write_field_list(f: &mut fmt::Formatter, fields: &[&RegisterField]) -> fmt::Result {
    for (i, field) in fields.iter().enumerate() {
        writeln!(f, "[{}] {:<10} {:<25} {:>3} bits", i + 1, field.position, field.name, field.width())?;
        if let Some(description) = field.description.as_deref().filter(|d| !d.is_empty()) {
            writeln!(f, "    Description:")?;
            write_wrapped(f, "      ", description)?;
        }
        if i + 1 < fields.len() {
            writeln!(f)?;
        }
    }
    Ok(())
}

impl fmt::Display for Answer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Answer::Register { register } => {
                writeln!(f, "{}", RULE)?;
                writeln!(f, "Register: {}", register.name)?;
                writeln!(f, "{}", RULE)?;
                writeln!(f)?;
                writeln!(f, "Long Name:      {}", register.long_name.as_deref().unwrap_or(""))?;
                writeln!(f, "Register Width: {} bits", register.width)?;
                writeln!(f, "Field Count:    {}", register.fields.len())?;
                if !register.features.is_empty() {
                    writeln!(f, "Features:       {}", register.features.join(", "))?;
                }
                writeln!(f)?;
                if let Some(purpose) = register.purpose.as_deref().filter(|p| !p.is_empty()) {
                    writeln!(f, "Purpose:")?;
                    write_wrapped(f, "  ", purpose)?;
                    writeln!(f)?;
                }
                writeln!(f, "Bit Field Layout:")?;
                writeln!(f)?;
                let fields: Vec<&RegisterField> = register.fields.iter().collect();
                write_field_list(f, &fields)
            }
            Answer::Bit { register, bit, field } => {
                writeln!(f, "{}", RULE)?;
                writeln!(f, "Register: {}", register)?;
                writeln!(f, "Bit Position: [{}]", bit)?;
                writeln!(f, "{}", RULE)?;
                writeln!(f)?;
                writeln!(f, "Field Name:     {}", field.name)?;
                writeln!(f, "Field Position: {}", field.position)?;
                writeln!(f, "Field Width:    {} bits", field.width())?;
                writeln!(f)?;
                if let Some(description) = field.description.as_deref().filter(|d| !d.is_empty()) {
                    writeln!(f, "Description:")?;
                    write_wrapped(f, "  ", description)?;
                    writeln!(f)?;
                }
                writeln!(f, "Explanation:")?;
                writeln!(f, "  Bit {} belongs to the '{}' field,", bit, field.name)?;
                writeln!(f, "  which spans bits {} ({} bits total).", field.position, field.width())
            }
            Answer::Range { register, hi, lo, fields } => {
                writeln!(f, "{}", RULE)?;
                writeln!(f, "Register: {}", register)?;
                writeln!(f, "Bit Range: [{}:{}] ({} bits)", hi, lo, u64::from(*hi) - u64::from(*lo) + 1)?;
                writeln!(f, "{}", RULE)?;
                writeln!(f)?;
                if let [field] = fields.as_slice() {
                    writeln!(f, "This range is covered by a single field:")?;
                    writeln!(f, "  Field Name:     {}", field.name)?;
                    writeln!(f, "  Field Position: {}", field.position)?;
                    writeln!(f, "  Field Width:    {} bits", field.width())?;
                    if let Some(description) = field.description.as_deref().filter(|d| !d.is_empty()) {
                        writeln!(f)?;
                        writeln!(f, "  Description:")?;
                        write_wrapped(f, "    ", description)?;
                    }
                    Ok(())
                } else {
                    writeln!(f, "This range spans {} field(s):", fields.len())?;
                    writeln!(f)?;
                    write_field_list(f, fields)
                }
            }
            Answer::Field { register, field } => {
                writeln!(f, "Register: {}", register)?;
                writeln!(f, "Field Name: {}", field.name)?;
                writeln!(f, "Field Position: {}", field.position)?;
                if let Some(definition) = field.definition.as_deref() {
                    writeln!(f, "Field Definition: {}", definition)?;
                }
                Ok(())
            }
            Answer::Definition { locations, .. } => {
                for location in locations.iter() {
                    writeln!(f, "{}", location)?;
                }
                Ok(())
            }
            Answer::FieldUsers { registers, .. } | Answer::Feature { registers, .. } => {
                for register in registers.iter() {
                    writeln!(f, "{}", register)?;
                }
                Ok(())
            }
        }
    }
}
