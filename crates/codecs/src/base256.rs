//! Base-256 conversion over a fixed 256-symbol alphabet.
//!
//! The alphabet is the single most consensus-sensitive table in the codec
//! layer: any drift between a writer's and a reader's table silently
//! corrupts every payload that crosses it. It is therefore checked into
//! source as a literal (codepoints U+0021 and up, ascending, skipping
//! whitespace, control, and format codepoints, truncated at 256 symbols)
//! instead of being regenerated from the environment's Unicode tables at
//! startup. The accessor still verifies the 256-symbol invariant once and
//! refuses to let the process run otherwise.

use std::{collections::HashMap, sync::LazyLock};

use crate::errors::CodecError;

/// The checked-in alphabet, 256 symbols, index = byte value.
const ALPHABET_LITERAL: &str = concat!(
    "!\"#$%&'()*+,-./0123456789:;<=>?@",
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`",
    "abcdefghijklmnopqrstuvwxyz{|}~\u{a1}\u{a2}",
    "£¤¥¦§¨©ª«¬®¯°±²³´µ¶·¸¹º»¼½¾¿ÀÁÂÃ",
    "ÄÅÆÇÈÉÊËÌÍÎÏÐÑÒÓÔÕÖ×ØÙÚÛÜÝÞßàáâã",
    "äåæçèéêëìíîïðñòóôõö÷øùúûüýþÿĀāĂă",
    "ĄąĆćĈĉĊċČčĎďĐđĒēĔĕĖėĘęĚěĜĝĞğĠġĢģ",
    "ĤĥĦħĨĩĪīĬĭĮįİıĲĳĴĵĶķĸĹĺĻļĽľĿŀŁłŃ",
);

static ALPHABET: LazyLock<[char; 256]> = LazyLock::new(|| {
    let symbols: Vec<char> = ALPHABET_LITERAL.chars().collect();
    let table: [char; 256] = symbols
        .try_into()
        .expect("codecs: base256 alphabet must have exactly 256 symbols");
    for c in table {
        assert!(
            !c.is_whitespace() && !c.is_control(),
            "codecs: base256 alphabet contains unsafe symbol {c:?}"
        );
    }
    table
});

static REVERSE: LazyLock<HashMap<char, u8>> = LazyLock::new(|| {
    let map: HashMap<char, u8> = ALPHABET
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, i as u8))
        .collect();
    assert_eq!(
        map.len(),
        256,
        "codecs: base256 alphabet contains duplicate symbols"
    );
    map
});

/// Returns the fixed alphabet, verifying the startup invariant on first use.
pub fn alphabet() -> &'static [char; 256] {
    &ALPHABET
}

fn symbol_value(c: char) -> Result<u8, CodecError> {
    REVERSE.get(&c).copied().ok_or(CodecError::UnknownSymbol(c))
}

/// Encodes an integer as positional base-256 over the alphabet.
pub fn to_base256(mut value: u128) -> String {
    let table = alphabet();
    if value == 0 {
        return table[0].to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(table[(value % 256) as usize]);
        value /= 256;
    }
    digits.reverse();
    digits.into_iter().collect()
}

/// Decodes a positional base-256 string into an integer.
pub fn from_base256(s: &str) -> Result<u128, CodecError> {
    if s.is_empty() {
        return Err(CodecError::Empty);
    }
    let mut acc: u128 = 0;
    for c in s.chars() {
        let d = symbol_value(c)? as u128;
        acc = acc
            .checked_mul(256)
            .and_then(|v| v.checked_add(d))
            .ok_or(CodecError::Overflow(256))?;
    }
    Ok(acc)
}

/// Maps a byte string symbol-for-byte into the alphabet.
pub fn bytes_to_base256(bytes: &[u8]) -> String {
    let table = alphabet();
    bytes.iter().map(|&b| table[b as usize]).collect()
}

/// Inverse of [`bytes_to_base256`].
pub fn base256_to_bytes(s: &str) -> Result<Vec<u8>, CodecError> {
    s.chars().map(symbol_value).collect()
}

/// Maps a hex string byte-for-symbol into the alphabet.
pub fn hex_to_base256(hex_str: &str) -> Result<String, CodecError> {
    let bytes = hex::decode(hex_str).map_err(|_| CodecError::InvalidHex(hex_str.to_owned()))?;
    Ok(bytes_to_base256(&bytes))
}
