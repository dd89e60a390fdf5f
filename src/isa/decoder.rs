use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use yaxpeax_arch::{Arch, AddressDiff, Decoder, LengthedInstruction, Reader, ShowContextual, YaxColors};

use crate::isa::{Catalog, DecodeError, Operands};

#[cfg(feature="use-serde")]
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct A64Db { }

#[cfg(not(feature="use-serde"))]
#[derive(Copy, Clone, Debug)]
pub struct A64Db { }

impl Arch for A64Db {
    type Word = u8;
    type Address = u64;
    type Instruction = Instruction;
    type DecodeError = DecodeError;
    type Decoder = InstDecoder;
    type Operand = Operands;
}

// one decoded word. every matching encoding contributes a rendering, in catalog order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Instruction {
    pub word: u32,
    pub forms: Vec<String>,
}

impl Instruction {
    pub fn forms(&self) -> &[String] {
        &self.forms
    }
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        if self.forms.is_empty() {
            return write!(fmt, "invalid");
        }
        for (i, form) in self.forms.iter().enumerate() {
            if i > 0 {
                writeln!(fmt)?;
            }
            write!(fmt, "{}", form)?;
        }
        Ok(())
    }
}

impl yaxpeax_arch::Instruction for Instruction {
    // ambiguous words decode, but to more than one thing
    fn well_defined(&self) -> bool { self.forms.len() == 1 }
}

impl LengthedInstruction for Instruction {
    type Unit = AddressDiff<<A64Db as Arch>::Address>;
    fn min_size() -> Self::Unit {
        AddressDiff::from_const(4)
    }
    fn len(&self) -> Self::Unit {
        AddressDiff::from_const(4)
    }
}

pub struct NoContext;

impl <T: fmt::Write, Y: YaxColors> ShowContextual<u64, NoContext, T, Y> for Instruction {
    fn contextualize(&self, _colors: &Y, _address: u64, _context: Option<&NoContext>, out: &mut T) -> fmt::Result {
        write!(out, "{}", self)
    }
}

// decodes against a shared, read-only catalog. the default decoder has an empty catalog and
// rejects every word.
#[derive(Clone, Debug, Default)]
pub struct InstDecoder {
    catalog: Arc<Catalog>,
}

impl InstDecoder {
    pub fn new(catalog: Arc<Catalog>) -> InstDecoder {
        InstDecoder { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl Decoder<A64Db> for InstDecoder {
    fn decode_into<T: Reader<<A64Db as Arch>::Address, <A64Db as Arch>::Word>>(&self, inst: &mut Instruction, words: &mut T) -> Result<(), <A64Db as Arch>::DecodeError> {
        let mut word_bytes = [0u8; 4];
        words.next_n(&mut word_bytes)?;
        let word = u32::from_le_bytes(word_bytes);

        let decoded = self.catalog.decode_word(word)?;
        if decoded.is_empty() {
            return Err(DecodeError::InvalidOpcode);
        }

        inst.word = word;
        inst.forms = decoded.into_iter().map(|d| d.text).collect();
        Ok(())
    }
}
