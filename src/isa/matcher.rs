use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use bitvec::prelude::*;

use crate::isa::encoding::{Catalog, EncodingTemplate, Field, Slot};
use crate::isa::opcode::{NormalizedOpcode, Ternary};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldBits {
    bits: BitVec<u32, Msb0>,
    known: BitVec<u32, Msb0>,
}

impl FieldBits {
    fn push(&mut self, bit: Ternary) {
        self.bits.push(bit == Ternary::One);
        self.known.push(bit != Ternary::X);
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn value(&self) -> Option<u32> {
        if self.bits.is_empty() || !self.known.all() {
            return None;
        }
        Some(self.bits.load_be::<u32>())
    }
}

impl fmt::Display for FieldBits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (bit, known) in self.bits.iter().by_vals().zip(self.known.iter().by_vals()) {
            let c = match (known, bit) {
                (false, _) => 'X',
                (true, true) => '1',
                (true, false) => '0',
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match<'a> {
    template: &'a EncodingTemplate,
    index: usize,
    captures: Vec<FieldBits>,
}

impl<'a> Match<'a> {
    pub fn template(&self) -> &'a EncodingTemplate {
        self.template
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn captured(&self, name: &str) -> Option<&FieldBits> {
        self.template.fields()
            .iter()
            .position(|f| f.name() == name)
            .map(|idx| &self.captures[idx])
    }

    pub fn captures(&self) -> impl Iterator<Item = (&'a Field, &FieldBits)> + '_ {
        self.template.fields().iter().zip(self.captures.iter())
    }
}

pub fn matches_hint(template: &EncodingTemplate, opcode: &NormalizedOpcode) -> bool {
    (opcode.bits() ^ template.fixed_value()) & template.fixed_mask() & opcode.care_mask() == 0
}

pub fn match_exact<'a>(template: &'a EncodingTemplate, index: usize, opcode: &NormalizedOpcode) -> Option<Match<'a>> {
    let mask = template.fixed_mask();
    // a don't-care can not stand in for a fixed bit here
    if opcode.care_mask() & mask != mask {
        return None;
    }
    if (opcode.bits() ^ template.fixed_value()) & mask != 0 {
        return None;
    }

    let mut captures = vec![FieldBits::default(); template.fields().len()];
    for bit in (0..32u8).rev() {
        if let Slot::Field(idx) = template.slot(bit) {
            captures[idx as usize].push(opcode.bit(bit));
        }
    }

    Some(Match { template, index, captures })
}

pub fn scan_exact<'a>(catalog: &'a Catalog, opcode: &NormalizedOpcode) -> Vec<Match<'a>> {
    let found: Vec<Match<'a>> = catalog.iter()
        .enumerate()
        .filter_map(|(index, template)| match_exact(template, index, opcode))
        .inspect(|m| log::trace!("{} matches template {}: {}", opcode, m.index, m.template.assembly_template()))
        .collect();
    log::debug!("exact scan of {} templates for {}: {} matches", catalog.len(), opcode, found.len());
    found
}

pub fn scan_hint<'a>(catalog: &'a Catalog, opcode: &NormalizedOpcode) -> Vec<&'a EncodingTemplate> {
    let found: Vec<&'a EncodingTemplate> = catalog.iter()
        .filter(|template| matches_hint(template, opcode))
        .collect();
    log::debug!("hint scan of {} templates for {}: {} matches", catalog.len(), opcode, found.len());
    found
}
