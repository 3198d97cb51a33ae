// src/extractors/product_line.rs

// --- Imports ---
use crate::extractors::model::FieldKey;
use crate::utils::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

// --- Built-in Table ---
// Attribute names observed per product line. Callers can replace the whole
// table with a JSON file of the same shape.
const BUILTIN_TABLE: &str = r#"{
  "version": "2024.1",
  "lines": [
    {
      "id": "unique",
      "nome": "Linha Unique",
      "signatures": ["(?i)\\bunique\\b"],
      "fields": {
        "descricao": ["DESCRIPTION"],
        "referencia": ["REFERENCE", "CODE"],
        "quantidade": ["QUANTITY"],
        "largura": ["WIDTH"],
        "altura": ["HEIGHT"],
        "profundidade": ["DEPTH"],
        "comprimento": ["LENGTH"],
        "espessura": ["THICKNESS"],
        "acabamento": ["FINISH"],
        "cor": ["COLOR"],
        "valor_unitario": ["UNITPRICE", "PRICE"],
        "valor_total": ["TOTALPRICE", "TOTAL"]
      }
    },
    {
      "id": "essenza",
      "nome": "Linha Essenza",
      "signatures": ["(?i)\\bessenza\\b"],
      "fields": {
        "descricao": ["DESCRICAO"],
        "referencia": ["CODIGO"],
        "quantidade": ["QTDE", "QUANTIDADE"],
        "largura": ["LARGURA"],
        "altura": ["ALTURA"],
        "profundidade": ["PROFUNDIDADE"],
        "comprimento": ["COMPRIMENTO"],
        "espessura": ["ESPESSURA"],
        "acabamento": ["ACABAMENTO"],
        "cor": ["COR"],
        "valor_unitario": ["PRECO_UNITARIO", "VALOR_UNITARIO"],
        "valor_total": ["PRECO_TOTAL", "VALOR_TOTAL"]
      }
    }
  ]
}"#;

static BUILTIN: Lazy<Arc<ProductLineTable>> = Lazy::new(|| {
    Arc::new(ProductLineTable::from_json(BUILTIN_TABLE).expect("Failed to load built-in product-line table"))
});

fn default_signature_attributes() -> Vec<String> {
    ["LIBRARY", "MANUFACTURER", "LINE", "LINHA", "CATALOG"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// --- Serialized Shape ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductLineTableSpec {
    pub version: String,
    #[serde(default = "default_signature_attributes")]
    pub signature_attributes: Vec<String>,
    pub lines: Vec<ProductLineSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductLineSpec {
    pub id: String,
    pub nome: String,
    pub signatures: Vec<String>,
    pub fields: BTreeMap<FieldKey, Vec<String>>,
}

// --- Compiled Table ---

/// Attribute/element names to look up for each canonical field, in priority order.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    candidates: BTreeMap<FieldKey, Vec<String>>,
}

impl FieldMap {
    pub fn new(candidates: BTreeMap<FieldKey, Vec<String>>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self, key: FieldKey) -> &[String] {
        self.candidates.get(&key).map_or(&[], Vec::as_slice)
    }

    /// Every line's candidates merged, followed by the canonical field name.
    fn generic<'a>(maps: impl Iterator<Item = &'a FieldMap>) -> Self {
        let mut candidates: BTreeMap<FieldKey, Vec<String>> = BTreeMap::new();
        for map in maps {
            for (key, names) in &map.candidates {
                let merged = candidates.entry(*key).or_default();
                for name in names {
                    if !merged.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                        merged.push(name.clone());
                    }
                }
            }
        }
        for key in FieldKey::ALL {
            let merged = candidates.entry(key).or_default();
            let canonical = key.as_str().to_ascii_uppercase();
            if !merged.iter().any(|n| n.eq_ignore_ascii_case(&canonical)) {
                merged.push(canonical);
            }
        }
        Self { candidates }
    }
}

#[derive(Debug, Clone)]
pub struct ProductLine {
    pub id: String,
    pub nome: String,
    signatures: Vec<Regex>,
    pub fields: FieldMap,
}

impl ProductLine {
    pub fn matches(&self, value: &str) -> bool {
        self.signatures.iter().any(|re| re.is_match(value))
    }
}

/// Versioned product-line → field-map configuration.
#[derive(Debug, Clone)]
pub struct ProductLineTable {
    version: String,
    signature_attributes: Vec<String>,
    lines: Vec<ProductLine>,
    generic: FieldMap,
}

impl ProductLineTable {
    /// The table shipped with the binary.
    pub fn builtin() -> Arc<ProductLineTable> {
        Arc::clone(&BUILTIN)
    }

    pub fn from_spec(spec: ProductLineTableSpec) -> Result<Self, ConfigError> {
        let mut lines = Vec::with_capacity(spec.lines.len());
        for line in spec.lines {
            let signatures = line
                .signatures
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|source| ConfigError::Signature {
                        line: line.id.clone(),
                        pattern: pattern.clone(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            lines.push(ProductLine {
                id: line.id,
                nome: line.nome,
                signatures,
                fields: FieldMap::new(line.fields),
            });
        }

        let generic = FieldMap::generic(lines.iter().map(|line| &line.fields));
        tracing::debug!("Loaded product-line table v{} with {} line(s)", spec.version, lines.len());
        Ok(Self {
            version: spec.version,
            signature_attributes: spec.signature_attributes,
            lines,
            generic,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let spec: ProductLineTableSpec = serde_json::from_str(json)?;
        Self::from_spec(spec)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!("Loading product-line table from {}", path.display());
        Self::from_json(&json)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn lines(&self) -> &[ProductLine] {
        &self.lines
    }

    pub fn line(&self, id: &str) -> Option<&ProductLine> {
        self.lines.iter().find(|line| line.id == id)
    }

    pub fn is_signature_attribute(&self, name: &str) -> bool {
        self.signature_attributes.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// First line whose signature matches `value`.
    pub fn detect(&self, value: &str) -> Option<&ProductLine> {
        self.lines.iter().find(|line| line.matches(value))
    }

    /// Best-effort mapping used when no line was detected.
    pub fn generic_fields(&self) -> &FieldMap {
        &self.generic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_loads() {
        let table = ProductLineTable::builtin();
        assert_eq!(table.version(), "2024.1");
        assert_eq!(table.lines().len(), 2);
        assert!(table.is_signature_attribute("library"));
        assert_eq!(table.detect("Biblioteca UNIQUE 2024").map(|l| l.id.as_str()), Some("unique"));
        assert_eq!(table.detect("Essenza Móveis").map(|l| l.id.as_str()), Some("essenza"));
        assert!(table.detect("Uniquely other").is_none());
    }

    #[test]
    fn generic_map_merges_all_lines() {
        let table = ProductLineTable::builtin();
        let totals = table.generic_fields().candidates(FieldKey::ValorTotal);
        assert!(totals.iter().any(|n| n == "TOTALPRICE"));
        assert!(totals.iter().any(|n| n == "PRECO_TOTAL"));
        assert!(totals.iter().any(|n| n == "VALOR_TOTAL"));
        assert_eq!(totals.iter().filter(|n| n.as_str() == "VALOR_TOTAL").count(), 1);
    }

    #[test]
    fn custom_table_from_json() {
        let json = r#"{
            "version": "test-1",
            "signature_attributes": ["SERIE"],
            "lines": [{
                "id": "classic",
                "nome": "Classic",
                "signatures": ["(?i)classic"],
                "fields": { "descricao": ["NOME_PECA"], "valor_total": ["CUSTO"] }
            }]
        }"#;
        let table = ProductLineTable::from_json(json).unwrap();
        assert!(table.is_signature_attribute("SERIE"));
        assert!(!table.is_signature_attribute("LIBRARY"));
        let line = table.line("classic").unwrap();
        assert_eq!(line.fields.candidates(FieldKey::Descricao), ["NOME_PECA".to_string()]);
        assert!(line.fields.candidates(FieldKey::Cor).is_empty());
    }

    #[test]
    fn invalid_signature_is_reported() {
        let json = r#"{"version":"x","lines":[{"id":"bad","nome":"Bad","signatures":["("],"fields":{}}]}"#;
        assert!(matches!(
            ProductLineTable::from_json(json),
            Err(ConfigError::Signature { line, .. }) if line == "bad"
        ));
    }

    #[test]
    fn unknown_field_key_is_rejected() {
        let json = r#"{"version":"x","lines":[{"id":"a","nome":"A","signatures":[],"fields":{"gaveta":["X"]}}]}"#;
        assert!(matches!(ProductLineTable::from_json(json), Err(ConfigError::Table(_))));
    }

    #[test]
    fn table_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.json");
        std::fs::write(&path, BUILTIN_TABLE).unwrap();
        let table = ProductLineTable::load(&path).unwrap();
        assert_eq!(table.lines().len(), 2);

        let missing = ProductLineTable::load(dir.path().join("none.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
