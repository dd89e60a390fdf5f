use std::sync::Arc;

use yaxpeax_arch::{AddressBase, Arch, Decoder, LengthedInstruction, U8Reader};

use aarch64_isadb::isa::{A64Db, DecodeError, InstDecoder, NoMatch, NormalizedOpcode, ParseError, Strictness};
use aarch64_isadb::isa::matcher;

use crate::catalog;

fn test_display(opcode: &str, expected: &[&str]) {
    let catalog = catalog();
    let decoded = catalog.decode(opcode).unwrap();
    let texts: Vec<&str> = decoded.iter().map(|d| d.text.as_str()).collect();
    assert!(
        texts == expected,
        "display error for {}:\n  parsed: {}\n displayed: {:?}\n expected: {:?}\n",
        opcode,
        NormalizedOpcode::parse(opcode).unwrap(),
        texts, expected
    );
}

fn test_hint(partial: &str, expected: &[&str]) {
    let catalog = catalog();
    let found: Vec<&str> = catalog.hint(partial).unwrap().iter().map(|t| t.assembly_template()).collect();
    assert!(
        found == expected,
        "hint error for {}:\n  found: {:?}\n expected: {:?}\n",
        partial, found, expected
    );
}

fn test_decode(data: [u8; 4], expected: &str) {
    let decoder = InstDecoder::new(Arc::new(catalog()));
    let instr = decoder.decode(&mut U8Reader::new(&data)).unwrap();
    let text = instr.to_string();
    assert!(
        text == expected,
        "decode error for {:02x}{:02x}{:02x}{:02x}:\n  decoded: {:?}\n displayed: {}\n expected: {}\n",
        data[0], data[1], data[2], data[3],
        instr, text, expected
    );
}

#[test]
fn test_add_immediate() {
    test_display("0x9100_03E0", &["ADD x0, sp, #0x0"]);
    test_display("0x910003ff", &["ADD sp, sp, #0x0"]);
    test_display("0x91000421", &["ADD x1, x1, #0x1"]);
    test_display("0x914003E0", &["ADD x0, sp, #0x0, lsl #12"]);
    test_display("0x11003c41", &["ADD w1, w2, #0xf"]);
}

#[test]
fn test_sp_and_bare_register_31() {
    test_display("0x310003ff", &["ADDS w31, wsp, #0x0"]);
    test_display("0x8b1f03ff", &["ADD x31, x31, x31"]);
    test_display("0x8b3f63ff", &["ADD sp, sp, x31"]);
}

#[test]
fn test_register_forms() {
    test_display("0x8b020020", &["ADD x0, x1, x2"]);
    test_display("0x8b2263ff", &["ADD sp, sp, x2"]);
    test_display("0xf9400020", &["LDR x0, [x1{, #<pimm>}]"]);
}

#[test]
fn test_hint_immediate() {
    // CRm = 0b0010, op2 = 0b011
    test_display("0xd503227f", &["HINT #0x13"]);
    test_display("0b1101_0101_0000_0011_0010_0010_0111_1111", &["HINT #0x13"]);
}

#[test]
fn test_overlapping_encodings() {
    test_display("0xd503201f", &["HINT #0x0", "NOP"]);
    test_display("0x110003e0", &["ADD w0, wsp, #0x0", "MOV w0, wsp"]);
}

#[test]
fn test_unresolved_placeholders() {
    test_display("0x10000000", &["ADR x0, <label>"]);
    let catalog = catalog();
    match catalog.decode_with("0xf9400020", Strictness::Strict) {
        Err(DecodeError::Unresolved(u)) => {
            assert_eq!(u.placeholder, "<pimm>");
            assert_eq!(u.text, "LDR x0, [x1{, #<pimm>}]");
        }
        other => panic!("strict decode should fail, got {:?}", other),
    }
    assert_eq!(catalog.decode_with("0x910003e0", Strictness::Strict).unwrap()[0].text, "ADD x0, sp, #0x0");
}

#[test]
fn test_no_match() {
    test_display("0x00000000", &[]);
    test_display("0xffffffff", &[]);
}

#[test]
fn test_malformed_input() {
    let catalog = catalog();
    assert_eq!(catalog.decode("0xZZ"), Err(DecodeError::Malformed(ParseError::InvalidDigit { digit: 'Z', radix: 16 })));
    assert_eq!(catalog.decode("0x1_0000_0000"), Err(DecodeError::Malformed(ParseError::TooLong { bits: 36 })));
    assert_eq!(catalog.decode("910003e0"), Err(DecodeError::Malformed(ParseError::MissingPrefix)));
    assert!(catalog.hint("0b2").is_err());
}

#[test]
fn test_wildcards_in_decode() {
    // a wildcard in Rd leaves the placeholder alone; one in a fixed bit rules the encoding out
    test_display("0x910003eX", &["ADD <Xd|SP>, sp, #0x0"]);
    test_display("0x9X0003e0", &[]);
}

#[test]
fn test_hint_scenarios() {
    test_hint("0x1100XXXX", &[
        "ADD <Wd|WSP>, <Wn|WSP>, #<imm>{, <shift>}",
        "MOV <Wd|WSP>, <Wn|WSP>",
    ]);
    test_hint("0x1100_0000", &[
        "ADD <Wd|WSP>, <Wn|WSP>, #<imm>{, <shift>}",
        "MOV <Wd|WSP>, <Wn|WSP>",
    ]);
    test_hint("0b00X1_0001_0XXX_XXXX_XXXX_XXXX_XXXX_XXXX", &[
        "ADD <Wd|WSP>, <Wn|WSP>, #<imm>{, <shift>}",
        "MOV <Wd|WSP>, <Wn|WSP>",
        "ADDS <Wd>, <Wn|WSP>, #<imm>{, <shift>}",
    ]);
    test_hint("0xd503_2XXX", &["HINT #<imm>", "NOP"]);
    test_hint("0xd503_2X3F", &["HINT #<imm>"]);
    test_hint("0x0", &[]);
}

#[test]
fn test_by_mnemonic() {
    let catalog = catalog();
    let names: Vec<&str> = catalog.by_mnemonic("add")
        .iter()
        .map(|t| t.metadata().encoding_name.as_deref().unwrap())
        .collect();
    assert_eq!(names, vec!["ADD_32_addsub_imm", "ADD_64_addsub_ext", "ADD_64_addsub_imm", "ADD_64_addsub_shift"]);
    assert!(catalog.by_mnemonic("SUB").is_empty());

    let add = catalog.by_mnemonic("ADD")[2];
    assert_eq!(add.pattern().nibbles(), "1001 0001 0XXX XXXX XXXX XXXX XXXX XXXX");
    assert_eq!(add.pattern().hex(), "0x91000000 (with X=don't care)");
    let runs: Vec<String> = add.layout().iter().map(|r| format!("[{}:{}] = {}", r.msb, r.lsb, r.entry)).collect();
    assert_eq!(runs, vec![
        "[31:31] = 1", "[30:29] = 0", "[28:28] = 1", "[27:25] = 0", "[24:24] = 1", "[23:23] = 0",
        "[22:22] = sh", "[21:10] = imm12", "[9:5] = Rn", "[4:0] = Rd",
    ]);
}

fn test_lines(what: &str, text: &str, expected: &[&str]) {
    let lines: Vec<&str> = text.lines().collect();
    assert!(
        lines == expected,
        "report mismatch for {}:\n rendered:\n{}\n expected:\n{}\n",
        what, text, expected.join("\n")
    );
}

#[test]
fn test_mnemonic_report() {
    let catalog = catalog();
    let rule = "=".repeat(80);
    let rule = rule.as_str();
    test_lines("nop", &catalog.describe_mnemonic("nop").to_string(), &[
        rule,
        "Mnemonic: NOP",
        "Title: ",
        "Features: AARCH64",
        rule,
        "",
        "[1] Encoding: NOP_HI_hints",
        "    Assembly: NOP",
        "    Binary Pattern:  1101 0101 0000 0011 0010 0000 0001 1111",
        "    Hex Pattern:     0xd503201f",
        "    Bit Fields:",
        "      [31:30] = 1 (fixed)",
        "      [29:29] = 0 (fixed)",
        "      [28:28] = 1 (fixed)",
        "      [27:27] = 0 (fixed)",
        "      [26:26] = 1 (fixed)",
        "      [25:25] = 0 (fixed)",
        "      [24:24] = 1 (fixed)",
        "      [23:18] = 0 (fixed)",
        "      [17:16] = 1 (fixed)",
        "      [15:14] = 0 (fixed)",
        "      [13:13] = 1 (fixed)",
        "      [12:5] = 0 (fixed)",
        "      [4:0] = 1 (fixed)",
        "",
    ]);

    let adr = catalog.describe_mnemonic("ADR").to_string();
    assert!(adr.contains("    Hex Pattern:     0x10000000 (with X=don't care)\n"));
    assert!(adr.contains("      [30:29] = immlo (variable)\n"));
    assert!(adr.contains("      [23:5] = immhi (variable)\n"));

    test_lines("sub", &catalog.describe_mnemonic("sub").to_string(), &["No instruction found with mnemonic: SUB"]);
}

#[test]
fn test_no_match_report() {
    let opcode = NormalizedOpcode::parse("0x00000000").unwrap();
    test_lines("0x00000000", &NoMatch::opcode("0x00000000", opcode).to_string(), &[
        "No matching instruction found for opcode: 0x00000000",
        "Binary: 0000 0000 0000 0000 0000 0000 0000 0000",
        "Hex: 0x00000000",
    ]);
    let partial = NormalizedOpcode::parse("0x0000XXXX").unwrap();
    test_lines("0x0000XXXX", &NoMatch::partial("0x0000XXXX", partial).to_string(), &[
        "No matching instruction found for partial opcode: 0x0000XXXX",
        "Binary: 0000 0000 0000 0000 XXXX XXXX XXXX XXXX",
    ]);
}

#[test]
fn test_matcher_captures() {
    let catalog = catalog();
    let op = NormalizedOpcode::parse("0x8b2263ff").unwrap();
    let found = matcher::scan_exact(&catalog, &op);
    assert_eq!(found.len(), 1);
    let m = &found[0];
    assert_eq!(m.index(), 5);
    let captured: Vec<(String, String)> = m.captures()
        .map(|(field, bits)| (field.name().to_string(), bits.to_string()))
        .collect();
    assert_eq!(captured, vec![
        ("Rm".to_string(), "00010".to_string()),
        ("option".to_string(), "011".to_string()),
        ("imm3".to_string(), "000".to_string()),
        ("Rn".to_string(), "11111".to_string()),
        ("Rd".to_string(), "11111".to_string()),
    ]);
}

#[test]
fn test_decoder_trait() {
    test_decode([0xe0, 0x03, 0x00, 0x91], "ADD x0, sp, #0x0");
    test_decode([0x7f, 0x22, 0x03, 0xd5], "HINT #0x13");
    test_decode([0x1f, 0x20, 0x03, 0xd5], "HINT #0x0\nNOP");

    let decoder = InstDecoder::new(Arc::new(catalog()));
    let instr = decoder.decode(&mut U8Reader::new(&[0xe0, 0x03, 0x00, 0x91])).unwrap();
    assert_eq!(instr.word, 0x910003e0);
    assert!(yaxpeax_arch::Instruction::well_defined(&instr));
    assert_eq!(0u64.wrapping_offset(instr.len()), 4);

    let nop = decoder.decode(&mut U8Reader::new(&[0x1f, 0x20, 0x03, 0xd5])).unwrap();
    assert!(!yaxpeax_arch::Instruction::well_defined(&nop));
}

#[test]
fn test_decoder_errors() {
    let decoder = InstDecoder::new(Arc::new(catalog()));
    assert_eq!(decoder.decode(&mut U8Reader::new(&[0x00, 0x00, 0x00, 0x00])), Err(DecodeError::InvalidOpcode));
    assert_eq!(decoder.decode(&mut U8Reader::new(&[0xe0, 0x03])), Err(DecodeError::ExhaustedInput));

    let empty = <A64Db as Arch>::Decoder::default();
    assert_eq!(empty.decode(&mut U8Reader::new(&[0xe0, 0x03, 0x00, 0x91])), Err(DecodeError::InvalidOpcode));
}
