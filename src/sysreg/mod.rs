pub mod query;

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

pub use self::query::{Answer, Definition, QueryError, RegisterQuery};

pub const DEFAULT_WIDTH: u32 = 64;

#[cfg(feature="use-serde")]
fn default_width() -> u32 {
    DEFAULT_WIDTH
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature="use-serde", derive(Serialize, Deserialize))]
pub struct RegisterField {
    #[cfg_attr(feature="use-serde", serde(alias = "field_name"))]
    pub name: String,
    #[cfg_attr(feature="use-serde", serde(alias = "field_msb"))]
    pub msb: u32,
    #[cfg_attr(feature="use-serde", serde(alias = "field_lsb"))]
    pub lsb: u32,
    // `[msb:lsb]`, or `[bit]` for a one-bit field. filled in when the database is built if the
    // record left it empty.
    #[cfg_attr(feature="use-serde", serde(default, alias = "field_position"))]
    pub position: String,
    #[cfg_attr(feature="use-serde", serde(default, alias = "field_description"))]
    pub description: Option<String>,
    // `RES0`, `RES1`, ... for fields that are not functional
    #[cfg_attr(feature="use-serde", serde(default, alias = "field_definition"))]
    pub definition: Option<String>,
}

impl RegisterField {
    pub fn new(name: &str, msb: u32, lsb: u32) -> RegisterField {
        RegisterField {
            name: name.into(),
            msb,
            lsb,
            position: String::new(),
            description: None,
            definition: None,
        }
    }

    pub fn describe(mut self, description: &str) -> RegisterField {
        self.description = Some(description.into());
        self
    }

    pub fn define(mut self, definition: &str) -> RegisterField {
        self.definition = Some(definition.into());
        self
    }

    pub fn width(&self) -> u32 {
        self.msb - self.lsb + 1
    }

    pub fn contains(&self, bit: u32) -> bool {
        self.lsb <= bit && bit <= self.msb
    }

    pub fn overlaps(&self, hi: u32, lo: u32) -> bool {
        self.lsb <= hi && self.msb >= lo
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature="use-serde", derive(Serialize, Deserialize))]
pub struct RegisterRecord {
    #[cfg_attr(feature="use-serde", serde(alias = "register_name"))]
    pub name: String,
    #[cfg_attr(feature="use-serde", serde(default, alias = "feature_name"))]
    pub feature: Option<String>,
    #[cfg_attr(feature="use-serde", serde(default))]
    pub long_name: Option<String>,
    #[cfg_attr(feature="use-serde", serde(default = "default_width", alias = "register_width"))]
    pub width: u32,
    #[cfg_attr(feature="use-serde", serde(default, alias = "reg_purpose"))]
    pub purpose: Option<String>,
    #[cfg_attr(feature="use-serde", serde(default))]
    pub fields: Vec<RegisterField>,
}

impl RegisterRecord {
    pub fn new(name: &str, fields: Vec<RegisterField>) -> RegisterRecord {
        RegisterRecord {
            name: name.into(),
            feature: None,
            long_name: None,
            width: DEFAULT_WIDTH,
            purpose: None,
            fields,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature="use-serde", derive(Serialize))]
pub struct Register {
    pub name: String,
    pub features: Vec<String>,
    pub long_name: Option<String>,
    pub width: u32,
    pub purpose: Option<String>,
    // sorted by `msb`, highest first
    pub fields: Vec<RegisterField>,
}

impl Register {
    // the first field of that name. fields are ordered by `msb` descending, so this is the
    // highest one when a name repeats.
    pub fn field(&self, name: &str) -> Option<&RegisterField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_at(&self, bit: u32) -> Option<&RegisterField> {
        self.fields.iter().find(|f| f.contains(bit))
    }

    pub fn fields_in(&self, hi: u32, lo: u32) -> Vec<&RegisterField> {
        self.fields.iter().filter(|f| f.overlaps(hi, lo)).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature="use-serde", derive(Serialize))]
pub struct FieldLocation {
    pub register: String,
    pub field: String,
    pub position: String,
}

impl fmt::Display for FieldLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.register, self.field)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SysregError {
    FieldRange { register: String, field: String, msb: u32, lsb: u32 },
    FieldWidth { register: String, field: String, msb: u32, width: u32 },
    ConflictingLayout { register: String },
}

impl fmt::Display for SysregError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SysregError::FieldRange { register, field, msb, lsb } => {
                write!(f, "{}.{}: msb {} is below lsb {}", register, field, msb, lsb)
            }
            SysregError::FieldWidth { register, field, msb, width } => {
                write!(f, "{}.{}: msb {} does not fit a {}-bit register", register, field, msb, width)
            }
            SysregError::ConflictingLayout { register } => {
                write!(f, "{}: field layout differs between features", register)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SysregError {}

fn layout_key(fields: &[RegisterField]) -> Vec<(&str, u32, u32)> {
    fields.iter().map(|f| (f.name.as_str(), f.msb, f.lsb)).collect()
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|x| x == item) {
        list.push(item.into());
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterDb {
    registers: BTreeMap<String, Register>,
    by_field: BTreeMap<String, Vec<String>>,
    by_definition: BTreeMap<String, Vec<FieldLocation>>,
    by_feature: BTreeMap<String, Vec<String>>,
}

impl RegisterDb {
    pub fn from_records<I: IntoIterator<Item = RegisterRecord>>(records: I) -> Result<RegisterDb, SysregError> {
        let mut registers: BTreeMap<String, Register> = BTreeMap::new();
        // first-seen order, for the reverse indexes
        let mut order: Vec<String> = Vec::new();

        for record in records {
            let mut fields = record.fields;
            for field in fields.iter_mut() {
                if field.msb < field.lsb {
                    return Err(SysregError::FieldRange {
                        register: record.name.clone(),
                        field: field.name.clone(),
                        msb: field.msb,
                        lsb: field.lsb,
                    });
                }
                if field.msb >= record.width {
                    return Err(SysregError::FieldWidth {
                        register: record.name.clone(),
                        field: field.name.clone(),
                        msb: field.msb,
                        width: record.width,
                    });
                }
                if field.position.is_empty() {
                    field.position = if field.msb == field.lsb {
                        format!("[{}]", field.msb)
                    } else {
                        format!("[{}:{}]", field.msb, field.lsb)
                    };
                }
            }
            fields.sort_by(|a, b| b.msb.cmp(&a.msb));

            if let Some(existing) = registers.get_mut(&record.name) {
                if layout_key(&existing.fields) != layout_key(&fields) {
                    return Err(SysregError::ConflictingLayout { register: record.name });
                }
                if let Some(feature) = record.feature.as_deref() {
                    push_unique(&mut existing.features, feature);
                }
                continue;
            }

            order.push(record.name.clone());
            registers.insert(record.name.clone(), Register {
                name: record.name,
                features: record.feature.into_iter().collect(),
                long_name: record.long_name,
                width: record.width,
                purpose: record.purpose,
                fields,
            });
        }

        let mut by_field: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut by_definition: BTreeMap<String, Vec<FieldLocation>> = BTreeMap::new();
        let mut by_feature: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for register in order.iter().filter_map(|name| registers.get(name)) {
            for field in register.fields.iter() {
                push_unique(by_field.entry(field.name.clone()).or_default(), &register.name);
                if let Some(definition) = field.definition.as_ref() {
                    by_definition.entry(definition.clone()).or_default().push(FieldLocation {
                        register: register.name.clone(),
                        field: field.name.clone(),
                        position: field.position.clone(),
                    });
                }
            }
            for feature in register.features.iter() {
                push_unique(by_feature.entry(feature.clone()).or_default(), &register.name);
            }
        }

        log::debug!(
            "built register database: {} registers, {} distinct field names, {} features",
            registers.len(), by_field.len(), by_feature.len()
        );

        Ok(RegisterDb { registers, by_field, by_definition, by_feature })
    }

    pub fn len(&self) -> usize { self.registers.len() }
    pub fn is_empty(&self) -> bool { self.registers.is_empty() }

    pub fn get(&self, name: &str) -> Option<&Register> {
        self.registers.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.registers.values()
    }

    pub fn registers_with_field(&self, field: &str) -> &[String] {
        self.by_field.get(field).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn registers_with_feature(&self, feature: &str) -> &[String] {
        self.by_feature.get(feature).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn fields_with_definition(&self, definition: &str) -> &[FieldLocation] {
        self.by_definition.get(definition).map(|v| v.as_slice()).unwrap_or(&[])
    }
}
