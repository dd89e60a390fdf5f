use alloc::string::String;
use core::fmt;
use core::str::FromStr;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ternary {
    Zero,
    One,
    X,
}

impl fmt::Display for Ternary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Ternary::Zero => write!(f, "0"),
            Ternary::One => write!(f, "1"),
            Ternary::X => write!(f, "X"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    MissingPrefix,
    Empty,
    InvalidDigit { digit: char, radix: u32 },
    TooLong { bits: usize },
}

impl ParseError {
    pub fn description(&self) -> &'static str {
        match self {
            ParseError::MissingPrefix => "opcode must start with 0x (hex) or 0b (binary)",
            ParseError::Empty => "opcode has no digits",
            ParseError::InvalidDigit { radix: 16, .. } => "invalid hex character",
            ParseError::InvalidDigit { .. } => "invalid binary character",
            ParseError::TooLong { .. } => "opcode too long",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::InvalidDigit { digit, .. } => write!(f, "{}: {:?}", self.description(), digit),
            ParseError::TooLong { bits } => write!(f, "{}: {} bits (expected 32)", self.description(), bits),
            _ => f.write_str(self.description()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

// `care` has a bit set for every literal position; `bits` holds the literal values and is zero
// wherever `care` is clear.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NormalizedOpcode {
    bits: u32,
    care: u32,
}

impl NormalizedOpcode {
    pub fn from_word(word: u32) -> NormalizedOpcode {
        NormalizedOpcode { bits: word, care: 0xffff_ffff }
    }

    pub fn from_parts(bits: u32, care: u32) -> NormalizedOpcode {
        NormalizedOpcode { bits: bits & care, care }
    }

    // parse `0x...` or `0b...` text. `_` and `:` are ignored anywhere. in hex, `x`/`X` stands
    // for four don't-care bits; in binary, for one. short input is zero-extended on the left.
    pub fn parse(input: &str) -> Result<NormalizedOpcode, ParseError> {
        let cleaned: String = input.trim().chars().filter(|c| *c != '_' && *c != ':').collect();

        let (radix, digits) = if let Some(digits) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
            (16u32, digits)
        } else if let Some(digits) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
            (2u32, digits)
        } else {
            return Err(ParseError::MissingPrefix);
        };

        if digits.is_empty() {
            return Err(ParseError::Empty);
        }

        let step = if radix == 16 { 4 } else { 1 };
        let mut bits = 0u64;
        let mut care = 0u64;
        let mut width = 0usize;
        for digit in digits.chars() {
            let (value, known) = match digit {
                'x' | 'X' => (0, 0),
                _ => match digit.to_digit(radix) {
                    Some(value) => (value as u64, (1u64 << step) - 1),
                    None => return Err(ParseError::InvalidDigit { digit, radix }),
                },
            };
            width += step;
            if width <= 32 {
                bits = (bits << step) | value;
                care = (care << step) | known;
            }
        }

        if width > 32 {
            return Err(ParseError::TooLong { bits: width });
        }

        // left padding is literal zeros, never don't-care
        let pad = !((1u64 << width) - 1) & 0xffff_ffff;
        Ok(NormalizedOpcode::from_parts(bits as u32, (care | pad) as u32))
    }

    pub fn bits(&self) -> u32 { self.bits }
    pub fn care_mask(&self) -> u32 { self.care }

    pub fn is_exact(&self) -> bool {
        self.care == 0xffff_ffff
    }

    pub fn word(&self) -> Option<u32> {
        if self.is_exact() { Some(self.bits) } else { None }
    }

    pub fn bit(&self, bit: u8) -> Ternary {
        let probe = 1u32 << bit;
        if self.care & probe == 0 {
            Ternary::X
        } else if self.bits & probe != 0 {
            Ternary::One
        } else {
            Ternary::Zero
        }
    }

    pub fn relax(&self, bit: u8) -> NormalizedOpcode {
        NormalizedOpcode::from_parts(self.bits, self.care & !(1 << bit))
    }

    pub fn wildcard_count(&self) -> u32 {
        self.care.count_zeros()
    }

    pub fn nibbles(&self) -> String {
        let mut out = String::with_capacity(39);
        for bit in (0..32u8).rev() {
            out.push(match self.bit(bit) {
                Ternary::Zero => '0',
                Ternary::One => '1',
                Ternary::X => 'X',
            });
            if bit % 4 == 0 && bit != 0 {
                out.push(' ');
            }
        }
        out
    }

    // `0x%08x`, reading don't-care bits as zero and saying so.
    pub fn hex(&self) -> String {
        if self.is_exact() {
            alloc::format!("{:#010x}", self.bits)
        } else {
            alloc::format!("{:#010x} (with X=don't care)", self.bits)
        }
    }
}

impl fmt::Display for NormalizedOpcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for bit in (0..32u8).rev() {
            write!(f, "{}", self.bit(bit))?;
        }
        Ok(())
    }
}

impl FromStr for NormalizedOpcode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NormalizedOpcode::parse(s)
    }
}

impl From<u32> for NormalizedOpcode {
    fn from(word: u32) -> Self {
        NormalizedOpcode::from_word(word)
    }
}
