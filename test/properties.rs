use proptest::prelude::*;

use aarch64_isadb::isa::{Catalog, EncodingTemplate, NormalizedOpcode};
use aarch64_isadb::isa::matcher;

use crate::catalog;

fn positions(catalog: &Catalog, found: &[&EncodingTemplate]) -> Vec<usize> {
    found.iter()
        .filter_map(|t| catalog.iter().position(|c| std::ptr::eq(c, *t)))
        .collect()
}

/// a word that satisfies the fixed bits of one template in the catalog.
fn template_word() -> impl Strategy<Value = u32> {
    let catalog = catalog();
    let patterns: Vec<(u32, u32)> = catalog.iter().map(|t| (t.fixed_value(), t.fixed_mask())).collect();
    (prop::sample::select(patterns), any::<u32>())
        .prop_map(|((value, mask), noise)| (noise & !mask) | value)
}

fn sp_or(reg: u32, sp: &str) -> String {
    if reg == 31 { sp.to_string() } else { format!("x{}", reg) }
}

#[test]
fn all_fixed_templates_round_trip() {
    let catalog = catalog();
    let fixed: Vec<&EncodingTemplate> = catalog.iter().filter(|t| t.fixed_mask() == 0xffff_ffff).collect();
    assert!(!fixed.is_empty());
    for template in fixed.iter() {
        let hex = format!("{:#010x}", template.fixed_value());
        let decoded = catalog.decode(&hex).unwrap();
        assert!(
            decoded.iter().any(|d| std::ptr::eq(d.template, *template)),
            "{} did not decode back to {}", hex, template.assembly_template()
        );
        let others = decoded.iter()
            .filter(|d| d.template.fixed_mask() == 0xffff_ffff && !std::ptr::eq(d.template, *template))
            .count();
        assert_eq!(others, 0, "{} matches more than one fully fixed encoding", hex);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn separators_are_ignored(word in any::<u32>(), seps in prop::collection::vec(prop::sample::select(vec!["", "_", ":"]), 8)) {
        let plain = format!("0x{:08x}", word);
        let mut separated = String::from("0x");
        for (digit, sep) in plain[2..].chars().zip(seps.iter()) {
            separated.push(digit);
            separated.push_str(sep);
        }
        prop_assert_eq!(NormalizedOpcode::parse(&separated), NormalizedOpcode::parse(&plain));
        prop_assert_eq!(NormalizedOpcode::parse(&plain).unwrap().word(), Some(word));
    }

    #[test]
    fn hex_and_binary_wildcards_agree(digits in prop::collection::vec(prop::sample::select(vec![
        '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'X', 'x',
    ]), 1..=8)) {
        let hex: String = digits.iter().collect();
        let binary: String = digits.iter()
            .map(|d| match d.to_digit(16) {
                Some(v) => format!("{:04b}", v),
                None => d.to_string().repeat(4),
            })
            .collect();
        let from_hex = NormalizedOpcode::parse(&format!("0x{}", hex)).unwrap();
        let from_binary = NormalizedOpcode::parse(&format!("0b{}", binary)).unwrap();
        prop_assert_eq!(from_hex, from_binary);
        prop_assert_eq!(from_hex.wildcard_count() as usize, 4 * digits.iter().filter(|d| **d == 'x' || **d == 'X').count());
    }

    #[test]
    fn relaxing_a_bit_never_loses_matches(word in template_word(), relaxed in prop::collection::vec(0u8..32, 0..6), extra in 0u8..32) {
        let catalog = catalog();
        let mut op = NormalizedOpcode::from_word(word);
        for bit in relaxed {
            op = op.relax(bit);
        }
        let before = positions(&catalog, &matcher::scan_hint(&catalog, &op));
        let after = positions(&catalog, &matcher::scan_hint(&catalog, &op.relax(extra)));
        for idx in before.iter() {
            prop_assert!(after.contains(idx), "template {} lost after relaxing bit {} of {}", idx, extra, op);
        }
    }

    #[test]
    fn exact_matches_are_hint_matches(word in template_word(), relaxed in prop::collection::vec(0u8..32, 0..3)) {
        let catalog = catalog();
        let mut op = NormalizedOpcode::from_word(word);
        for bit in relaxed {
            op = op.relax(bit);
        }
        let hinted = positions(&catalog, &matcher::scan_hint(&catalog, &op));
        let exact: Vec<usize> = matcher::scan_exact(&catalog, &op).iter().map(|m| m.index()).collect();
        for idx in exact.iter() {
            prop_assert!(hinted.contains(idx));
        }
        if op.is_exact() {
            prop_assert_eq!(exact, hinted);
        }
    }

    #[test]
    fn add_immediate_operands(rd in 0u32..32, rn in 0u32..32, imm in 0u32..4096) {
        let catalog = catalog();
        let word = 0x9100_0000 | (imm << 10) | (rn << 5) | rd;
        let decoded = catalog.decode_word(word).unwrap();
        prop_assert_eq!(decoded.len(), 1);
        let expected = format!("ADD {}, {}, #{:#x}", sp_or(rd, "sp"), sp_or(rn, "sp"), imm);
        prop_assert_eq!(&decoded[0].text, &expected);
    }
}
