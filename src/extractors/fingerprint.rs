// src/extractors/fingerprint.rs
use crate::extractors::model::{ExtractionResult, MaterialFingerprint, SectionRecord};
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// SHA-256 over [`canonical_form`], as 64 lowercase hex characters.
pub fn fingerprint(result: &ExtractionResult) -> MaterialFingerprint {
    let digest = Sha256::digest(canonical_form(result).as_bytes());
    MaterialFingerprint(format!("{:x}", digest))
}

/// Line-oriented text the fingerprint is computed over:
///
/// ```text
/// linha:<len>:<line id or empty>
/// [<section>]            sections in name order
/// #<posicao>             records in position order
/// <field>:<len>:<value>  fields in name order, money as 1234.56
/// ```
///
/// `<len>` is the value's length in UTF-8 bytes. Warnings, the environment
/// name and confidence flags are not part of the material payload.
pub fn canonical_form(result: &ExtractionResult) -> String {
    let mut out = String::new();
    push_value(&mut out, "linha", result.linha_detectada.as_deref().unwrap_or_default());

    // BTreeMap iteration is already in section-name order.
    for (section, records) in &result.sections {
        let _ = writeln!(out, "[{}]", section);

        let mut ordered: Vec<&SectionRecord> = records.iter().collect();
        ordered.sort_by_key(|record| record.posicao);
        for record in ordered {
            let _ = writeln!(out, "#{}", record.posicao);
            for (key, value) in &record.fields {
                push_value(&mut out, key.as_str(), &value.canonical());
            }
        }
    }
    out
}

fn push_value(out: &mut String, name: &str, value: &str) {
    let _ = writeln!(out, "{}:{}:{}", name, value.len(), value);
}
