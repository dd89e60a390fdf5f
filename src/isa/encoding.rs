use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::isa::opcode::NormalizedOpcode;

pub const WORD_BITS: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RegisterRole {
    D,
    N,
    M,
    T,
}

impl RegisterRole {
    // only `Rd` and `Rn` may name the stack pointer when the template offers it.
    pub fn sp_capable(&self) -> bool {
        match self {
            RegisterRole::D | RegisterRole::N => true,
            RegisterRole::M | RegisterRole::T => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HintPart {
    CRm,
    Op2,
}

// how a field's captured value is rendered into assembly text. resolved once, when the
// catalog is built, from the field's name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Register { role: RegisterRole, sp_alias: bool },
    Immediate,
    Offset,
    ShiftSelector,
    HintSubfield(HintPart),
    // a field with no rendering rule (`opc`, `option`, `shift`, ...)
    Ignored,
}

impl OperandKind {
    pub fn classify(name: &str) -> OperandKind {
        let register = |role: RegisterRole| OperandKind::Register { role, sp_alias: role.sp_capable() };
        match name {
            "Rd" => register(RegisterRole::D),
            "Rn" => register(RegisterRole::N),
            "Rm" => register(RegisterRole::M),
            "Rt" => register(RegisterRole::T),
            "sh" => OperandKind::ShiftSelector,
            "CRm" => OperandKind::HintSubfield(HintPart::CRm),
            "op2" => OperandKind::HintSubfield(HintPart::Op2),
            "simm" => OperandKind::Offset,
            _ if name.starts_with("imm") => OperandKind::Immediate,
            _ if name.starts_with("off") => OperandKind::Offset,
            _ => OperandKind::Ignored,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Fixed(bool),
    Field(u8),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    name: String,
    kind: OperandKind,
    msb: u8,
    lsb: u8,
    width: u8,
}

impl Field {
    pub fn name(&self) -> &str { &self.name }
    pub fn kind(&self) -> OperandKind { self.kind }
    pub fn msb(&self) -> u8 { self.msb }
    pub fn lsb(&self) -> u8 { self.lsb }
    pub fn width(&self) -> u8 { self.width }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature="use-serde", derive(Serialize, Deserialize))]
pub struct Metadata {
    pub mnemonic: Option<String>,
    pub title: Option<String>,
    pub feature: Option<String>,
    pub encoding_name: Option<String>,
    pub encoding_label: Option<String>,
}

// one catalog entry as handed over by the ingestion side. `fixed_value` and `fixed_mask` may be
// omitted, in which case they are derived from the `"0"`/`"1"` entries of `field_names`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature="use-serde", derive(Serialize, Deserialize))]
pub struct CatalogRecord {
    #[cfg_attr(feature="use-serde", serde(alias = "asm_template"))]
    pub assembly_template: String,
    pub fixed_value: Option<u32>,
    pub fixed_mask: Option<u32>,
    pub field_names: [String; WORD_BITS],
    #[cfg_attr(feature="use-serde", serde(flatten))]
    pub metadata: Metadata,
}

impl CatalogRecord {
    // build a record from a box diagram such as `"100100010 sh:1 imm12:12 Rn:5 Rd:5"`. boxes are
    // listed from bit 31 down; a run of `0`/`1` characters is literal bits, `name:width` is a
    // field of that many bits.
    pub fn from_diagram(assembly_template: &str, diagram: &str) -> Result<CatalogRecord, CatalogError> {
        let mut names: Vec<String> = Vec::with_capacity(WORD_BITS);
        for token in diagram.split_whitespace() {
            if let Some((name, width)) = token.split_once(':') {
                let width: usize = width.parse().map_err(|_| CatalogError::BadDiagramToken { token: token.to_string() })?;
                if name.is_empty() || width == 0 || name == "0" || name == "1" {
                    return Err(CatalogError::BadDiagramToken { token: token.to_string() });
                }
                let total = names.len().saturating_add(width);
                if total > WORD_BITS {
                    return Err(CatalogError::DiagramWidth { width: total });
                }
                for _ in 0..width {
                    names.push(name.to_string());
                }
            } else if token.chars().all(|c| c == '0' || c == '1') {
                names.extend(token.chars().map(|c| c.to_string()));
            } else {
                return Err(CatalogError::BadDiagramToken { token: token.to_string() });
            }
        }
        if names.len() != WORD_BITS {
            return Err(CatalogError::DiagramWidth { width: names.len() });
        }

        let mut names = names.into_iter();
        let field_names = core::array::from_fn(|_| names.next().unwrap_or_default());
        Ok(CatalogRecord {
            assembly_template: assembly_template.to_string(),
            fixed_value: None,
            fixed_mask: None,
            field_names,
            metadata: Metadata::default(),
        })
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> CatalogRecord {
        self.metadata = metadata;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogError {
    // a bit with neither a fixed value nor an owning field
    UnassignedBit { record: usize, bit: u8 },
    // `fixed_value`/`fixed_mask` disagree with `field_names` at this bit
    FixedBitMismatch { record: usize, bit: u8 },
    DiagramWidth { width: usize },
    BadDiagramToken { token: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CatalogError::UnassignedBit { record, bit } => {
                write!(f, "record {}: bit {} is neither fixed nor part of a field", record, bit)
            }
            CatalogError::FixedBitMismatch { record, bit } => {
                write!(f, "record {}: fixed value/mask disagree with field names at bit {}", record, bit)
            }
            CatalogError::DiagramWidth { width } => {
                write!(f, "bit diagram covers {} bits (expected 32)", width)
            }
            CatalogError::BadDiagramToken { token } => {
                write!(f, "invalid bit diagram box: {:?}", token)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CatalogError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodingTemplate {
    assembly: String,
    fixed_value: u32,
    fixed_mask: u32,
    slots: [Slot; WORD_BITS],
    fields: Vec<Field>,
    metadata: Metadata,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayoutEntry<'a> {
    Fixed(bool),
    Field(&'a str),
}

impl fmt::Display for LayoutEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LayoutEntry::Fixed(false) => write!(f, "0"),
            LayoutEntry::Fixed(true) => write!(f, "1"),
            LayoutEntry::Field(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LayoutRun<'a> {
    pub msb: u8,
    pub lsb: u8,
    pub entry: LayoutEntry<'a>,
}

impl EncodingTemplate {
    pub fn from_record(record: CatalogRecord, index: usize) -> Result<EncodingTemplate, CatalogError> {
        let mut fixed_value = 0u32;
        let mut fixed_mask = 0u32;
        let mut slots = [Slot::Fixed(false); WORD_BITS];
        let mut fields: Vec<Field> = Vec::new();

        for (pos, name) in record.field_names.iter().enumerate() {
            let bit = (WORD_BITS - 1 - pos) as u8;
            slots[pos] = match name.as_str() {
                "0" => {
                    fixed_mask |= 1 << bit;
                    Slot::Fixed(false)
                }
                "1" => {
                    fixed_mask |= 1 << bit;
                    fixed_value |= 1 << bit;
                    Slot::Fixed(true)
                }
                "" => {
                    return Err(CatalogError::UnassignedBit { record: index, bit });
                }
                name => {
                    let idx = match fields.iter().position(|f| f.name == name) {
                        Some(idx) => {
                            let field = &mut fields[idx];
                            field.lsb = bit;
                            field.width += 1;
                            idx
                        }
                        None => {
                            fields.push(Field {
                                name: name.to_string(),
                                kind: OperandKind::classify(name),
                                msb: bit,
                                lsb: bit,
                                width: 1,
                            });
                            fields.len() - 1
                        }
                    };
                    Slot::Field(idx as u8)
                }
            };
        }

        if let Some(mask) = record.fixed_mask {
            let diff = mask ^ fixed_mask;
            if diff != 0 {
                return Err(CatalogError::FixedBitMismatch { record: index, bit: (31 - diff.leading_zeros()) as u8 });
            }
        }
        if let Some(value) = record.fixed_value {
            let diff = (value ^ fixed_value) & fixed_mask;
            if diff != 0 {
                return Err(CatalogError::FixedBitMismatch { record: index, bit: (31 - diff.leading_zeros()) as u8 });
            }
        }

        Ok(EncodingTemplate {
            assembly: record.assembly_template,
            fixed_value,
            fixed_mask,
            slots,
            fields,
            metadata: record.metadata,
        })
    }

    pub fn assembly_template(&self) -> &str { &self.assembly }
    pub fn fixed_value(&self) -> u32 { self.fixed_value }
    pub fn fixed_mask(&self) -> u32 { self.fixed_mask }
    pub fn fields(&self) -> &[Field] { &self.fields }
    pub fn metadata(&self) -> &Metadata { &self.metadata }

    pub fn mnemonic(&self) -> Option<&str> {
        self.metadata.mnemonic.as_deref()
    }

    pub fn slot(&self, bit: u8) -> Slot {
        self.slots[WORD_BITS - 1 - bit as usize]
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_name(&self, bit: u8) -> &str {
        match self.slot(bit) {
            Slot::Fixed(false) => "0",
            Slot::Fixed(true) => "1",
            Slot::Field(idx) => &self.fields[idx as usize].name,
        }
    }

    pub fn pattern(&self) -> NormalizedOpcode {
        NormalizedOpcode::from_parts(self.fixed_value, self.fixed_mask)
    }

    pub fn layout(&self) -> Vec<LayoutRun<'_>> {
        let mut runs: Vec<(Slot, u8, u8)> = Vec::new();
        for pos in 0..WORD_BITS {
            let bit = (WORD_BITS - 1 - pos) as u8;
            let slot = self.slots[pos];
            match runs.last_mut() {
                Some((last, _, lsb)) if *last == slot => *lsb = bit,
                _ => runs.push((slot, bit, bit)),
            }
        }
        runs.into_iter()
            .map(|(slot, msb, lsb)| LayoutRun {
                msb,
                lsb,
                entry: match slot {
                    Slot::Fixed(b) => LayoutEntry::Fixed(b),
                    Slot::Field(idx) => LayoutEntry::Field(&self.fields[idx as usize].name),
                },
            })
            .collect()
    }
}

// every known encoding, in load order. built once and never mutated afterward; share it by
// reference or behind an `Arc`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    templates: Vec<EncodingTemplate>,
}

impl Catalog {
    pub fn from_records<I: IntoIterator<Item = CatalogRecord>>(records: I) -> Result<Catalog, CatalogError> {
        let templates = records.into_iter()
            .enumerate()
            .map(|(index, record)| EncodingTemplate::from_record(record, index))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("built encoding catalog with {} templates", templates.len());
        Ok(Catalog { templates })
    }

    pub fn len(&self) -> usize { self.templates.len() }
    pub fn is_empty(&self) -> bool { self.templates.is_empty() }

    pub fn get(&self, index: usize) -> Option<&EncodingTemplate> {
        self.templates.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, EncodingTemplate> {
        self.templates.iter()
    }

    // encodings whose mnemonic matches, ignoring ascii case, ordered by encoding name.
    pub fn by_mnemonic(&self, mnemonic: &str) -> Vec<&EncodingTemplate> {
        let mut found: Vec<&EncodingTemplate> = self.templates.iter()
            .filter(|t| t.mnemonic().map(|m| m.eq_ignore_ascii_case(mnemonic)).unwrap_or(false))
            .collect();
        // unnamed encodings sort last
        found.sort_by(|a, b| {
            let (a, b) = (a.metadata.encoding_name.as_deref(), b.metadata.encoding_name.as_deref());
            a.is_none().cmp(&b.is_none()).then_with(|| a.cmp(&b))
        });
        found
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a EncodingTemplate;
    type IntoIter = core::slice::Iter<'a, EncodingTemplate>;

    fn into_iter(self) -> Self::IntoIter {
        self.templates.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn add_imm() -> CatalogRecord {
        CatalogRecord::from_diagram(
            "ADD <Xd|SP>, <Xn|SP>, #<imm>{, <shift>}",
            "100100010 sh:1 imm12:12 Rn:5 Rd:5",
        ).unwrap()
    }

    #[test]
    fn derives_fixed_bits_from_names() {
        let t = EncodingTemplate::from_record(add_imm(), 0).unwrap();
        assert_eq!(t.fixed_value(), 0x9100_0000);
        assert_eq!(t.fixed_mask(), 0xff80_0000);
        assert_eq!(t.field_name(31), "1");
        assert_eq!(t.field_name(22), "sh");
        assert_eq!(t.field_name(0), "Rd");

        let imm = t.field("imm12").unwrap();
        assert_eq!((imm.msb(), imm.lsb(), imm.width()), (21, 10, 12));
        assert_eq!(imm.kind(), OperandKind::Immediate);
    }

    #[test]
    fn classify_fields() {
        assert_eq!(OperandKind::classify("Rd"), OperandKind::Register { role: RegisterRole::D, sp_alias: true });
        assert_eq!(OperandKind::classify("Rm"), OperandKind::Register { role: RegisterRole::M, sp_alias: false });
        assert_eq!(OperandKind::classify("immhi"), OperandKind::Immediate);
        assert_eq!(OperandKind::classify("offset"), OperandKind::Offset);
        assert_eq!(OperandKind::classify("simm"), OperandKind::Offset);
        assert_eq!(OperandKind::classify("op2"), OperandKind::HintSubfield(HintPart::Op2));
        assert_eq!(OperandKind::classify("opc"), OperandKind::Ignored);
        assert_eq!(OperandKind::classify("shift"), OperandKind::Ignored);
    }

    #[test]
    fn rejects_inconsistent_records() {
        let mut record = add_imm();
        record.fixed_mask = Some(0xffc0_0000);
        assert_eq!(
            EncodingTemplate::from_record(record, 7),
            Err(CatalogError::FixedBitMismatch { record: 7, bit: 22 })
        );

        let mut record = add_imm();
        record.fixed_value = Some(0x9000_0000);
        assert_eq!(
            EncodingTemplate::from_record(record, 0),
            Err(CatalogError::FixedBitMismatch { record: 0, bit: 24 })
        );

        let mut record = add_imm();
        record.field_names[3] = String::new();
        assert_eq!(
            Catalog::from_records(vec![add_imm(), record]),
            Err(CatalogError::UnassignedBit { record: 1, bit: 28 })
        );
    }

    #[test]
    fn diagram_width_is_checked() {
        assert_eq!(
            CatalogRecord::from_diagram("X", "1001 Rd:5"),
            Err(CatalogError::DiagramWidth { width: 9 })
        );
        assert!(CatalogRecord::from_diagram("X", "10z1 Rd:28").is_err());
        assert_eq!(
            CatalogRecord::from_diagram("X", "1111 Rd:30"),
            Err(CatalogError::DiagramWidth { width: 34 })
        );
        assert_eq!(
            CatalogRecord::from_diagram("X", "Rd:4000000000"),
            Err(CatalogError::DiagramWidth { width: 4_000_000_000 })
        );
    }

    #[test]
    fn mnemonic_lookup_puts_unnamed_encodings_last() {
        let named = |name: Option<&str>| {
            let mut record = add_imm();
            record.metadata.mnemonic = Some("ADD".to_string());
            record.metadata.encoding_name = name.map(|n| n.to_string());
            record
        };
        let catalog = Catalog::from_records(vec![
            named(None),
            named(Some("ADD_64_addsub_imm")),
            named(Some("ADD_32_addsub_imm")),
        ]).unwrap();
        let names: Vec<Option<&str>> = catalog.by_mnemonic("add")
            .iter()
            .map(|t| t.metadata().encoding_name.as_deref())
            .collect();
        assert_eq!(names, vec![Some("ADD_32_addsub_imm"), Some("ADD_64_addsub_imm"), None]);
    }

    #[test]
    fn layout_runs() {
        let t = EncodingTemplate::from_record(add_imm(), 0).unwrap();
        let runs = t.layout();
        assert_eq!(runs[0], LayoutRun { msb: 31, lsb: 31, entry: LayoutEntry::Fixed(true) });
        assert_eq!(runs[1], LayoutRun { msb: 30, lsb: 29, entry: LayoutEntry::Fixed(false) });
        assert_eq!(runs[runs.len() - 1], LayoutRun { msb: 4, lsb: 0, entry: LayoutEntry::Field("Rd") });
        assert_eq!(runs.iter().map(|r| (r.msb - r.lsb + 1) as usize).sum::<usize>(), WORD_BITS);
    }
}
