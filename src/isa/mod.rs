pub mod assemble;
pub mod decoder;
pub mod encoding;
pub mod matcher;
pub mod opcode;
pub mod report;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use yaxpeax_arch::ReadError;

pub use self::assemble::{Operands, RegisterValue, Strictness, Unresolved};
pub use self::decoder::{A64Db, InstDecoder, Instruction};
pub use self::encoding::{Catalog, CatalogError, CatalogRecord, EncodingTemplate, Field, Metadata, OperandKind};
pub use self::matcher::Match;
pub use self::opcode::{NormalizedOpcode, ParseError, Ternary};
pub use self::report::{MnemonicReport, NoMatch};

#[derive(Debug, PartialEq, Clone)]
pub enum DecodeError {
    ExhaustedInput,
    InvalidOpcode,
    Malformed(ParseError),
    Unresolved(Unresolved),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::Malformed(e) => write!(f, "{}", e),
            DecodeError::Unresolved(e) => write!(f, "{}", e),
            _ => f.write_str(<Self as yaxpeax_arch::DecodeError>::description(self)),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Malformed(e) => Some(e),
            DecodeError::Unresolved(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReadError> for DecodeError {
    fn from(_e: ReadError) -> DecodeError {
        DecodeError::ExhaustedInput
    }
}

impl From<ParseError> for DecodeError {
    fn from(e: ParseError) -> DecodeError {
        DecodeError::Malformed(e)
    }
}

impl From<Unresolved> for DecodeError {
    fn from(e: Unresolved) -> DecodeError {
        DecodeError::Unresolved(e)
    }
}

impl yaxpeax_arch::DecodeError for DecodeError {
    fn data_exhausted(&self) -> bool { self == &DecodeError::ExhaustedInput }
    fn bad_opcode(&self) -> bool { self == &DecodeError::InvalidOpcode }
    fn bad_operand(&self) -> bool { matches!(self, DecodeError::Unresolved(_)) }
    fn description(&self) -> &'static str {
        match self {
            DecodeError::ExhaustedInput => "exhausted input",
            DecodeError::InvalidOpcode => "invalid opcode",
            DecodeError::Malformed(e) => e.description(),
            DecodeError::Unresolved(_) => "unresolved operand placeholder",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded<'a> {
    pub template: &'a EncodingTemplate,
    // position of `template` in the catalog
    pub index: usize,
    pub operands: Operands,
    pub text: String,
}

impl fmt::Display for Decoded<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Catalog {
    // parse `input` and decode it against every template. an empty result means no encoding
    // matched, which is not an error.
    pub fn decode(&self, input: &str) -> Result<Vec<Decoded<'_>>, DecodeError> {
        self.decode_with(input, Strictness::Lenient)
    }

    pub fn decode_with(&self, input: &str, strictness: Strictness) -> Result<Vec<Decoded<'_>>, DecodeError> {
        let opcode = NormalizedOpcode::parse(input)?;
        self.decode_opcode(&opcode, strictness)
    }

    pub fn decode_word(&self, word: u32) -> Result<Vec<Decoded<'_>>, DecodeError> {
        self.decode_opcode(&NormalizedOpcode::from_word(word), Strictness::Lenient)
    }

    pub fn decode_opcode(&self, opcode: &NormalizedOpcode, strictness: Strictness) -> Result<Vec<Decoded<'_>>, DecodeError> {
        let mut decoded = Vec::new();
        for m in matcher::scan_exact(self, opcode) {
            let (operands, text) = assemble::assemble(&m, strictness)?;
            decoded.push(Decoded {
                template: m.template(),
                index: m.index(),
                operands,
                text,
            });
        }
        Ok(decoded)
    }

    // parse `input`, which may carry don't-care bits, and list every compatible template.
    pub fn hint(&self, input: &str) -> Result<Vec<&EncodingTemplate>, DecodeError> {
        let opcode = NormalizedOpcode::parse(input)?;
        Ok(matcher::scan_hint(self, &opcode))
    }
}
