use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::isa::encoding::{Catalog, EncodingTemplate, LayoutEntry};
use crate::isa::opcode::NormalizedOpcode;

const RULE_WIDTH: usize = 80;

fn rule(f: &mut fmt::Formatter) -> fmt::Result {
    for _ in 0..RULE_WIDTH {
        f.write_str("=")?;
    }
    writeln!(f)
}

// every encoding of one mnemonic with its bit pattern and field layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MnemonicReport<'a> {
    pub mnemonic: String,
    pub encodings: Vec<&'a EncodingTemplate>,
}

impl Catalog {
    pub fn describe_mnemonic(&self, mnemonic: &str) -> MnemonicReport<'_> {
        let mnemonic = mnemonic.to_ascii_uppercase();
        let encodings = self.by_mnemonic(&mnemonic);
        MnemonicReport { mnemonic, encodings }
    }
}

fn write_encoding(f: &mut fmt::Formatter, idx: usize, template: &EncodingTemplate) -> fmt::Result {
    let metadata = template.metadata();
    let pattern = template.pattern();
    writeln!(f, "[{}] Encoding: {}", idx, metadata.encoding_name.as_deref().unwrap_or(""))?;
    if let Some(label) = metadata.encoding_label.as_deref().filter(|l| !l.is_empty()) {
        writeln!(f, "    Label: {}", label)?;
    }
    writeln!(f, "    Assembly: {}", template.assembly_template())?;
    writeln!(f, "    Binary Pattern:  {}", pattern.nibbles())?;
    writeln!(f, "    Hex Pattern:     {}", pattern.hex())?;
    writeln!(f, "    Bit Fields:")?;
    for run in template.layout() {
        let kind = match run.entry {
            LayoutEntry::Fixed(_) => "fixed",
            LayoutEntry::Field(_) => "variable",
        };
        writeln!(f, "      [{}:{}] = {} ({})", run.msb, run.lsb, run.entry, kind)?;
    }
    writeln!(f)
}

impl fmt::Display for MnemonicReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let first = match self.encodings.first() {
            Some(first) => first.metadata(),
            None => return writeln!(f, "No instruction found with mnemonic: {}", self.mnemonic),
        };

        rule(f)?;
        writeln!(f, "Mnemonic: {}", first.mnemonic.as_deref().unwrap_or(&self.mnemonic))?;
        writeln!(f, "Title: {}", first.title.as_deref().unwrap_or(""))?;
        writeln!(f, "Features: {}", first.feature.as_deref().unwrap_or("AARCH64"))?;
        rule(f)?;
        writeln!(f)?;

        for (idx, template) in self.encodings.iter().enumerate() {
            write_encoding(f, idx + 1, template)?;
        }
        Ok(())
    }
}

// what gets printed when an opcode or a partial opcode matches nothing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NoMatch<'a> {
    pub input: &'a str,
    pub opcode: NormalizedOpcode,
    pub partial: bool,
}

impl<'a> NoMatch<'a> {
    pub fn opcode(input: &'a str, opcode: NormalizedOpcode) -> NoMatch<'a> {
        NoMatch { input, opcode, partial: false }
    }

    pub fn partial(input: &'a str, opcode: NormalizedOpcode) -> NoMatch<'a> {
        NoMatch { input, opcode, partial: true }
    }
}

impl fmt::Display for NoMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.partial {
            writeln!(f, "No matching instruction found for partial opcode: {}", self.input)?;
            writeln!(f, "Binary: {}", self.opcode.nibbles())
        } else {
            writeln!(f, "No matching instruction found for opcode: {}", self.input)?;
            writeln!(f, "Binary: {}", self.opcode.nibbles())?;
            writeln!(f, "Hex: {}", self.opcode.hex())
        }
    }
}
