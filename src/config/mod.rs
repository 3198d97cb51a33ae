// src/config/mod.rs
use crate::extractors::money::{MonetaryNormalizer, DEFAULT_MONETARY_CEILING};
use crate::extractors::product_line::ProductLineTable;
use crate::utils::error::ConfigError;
use bigdecimal::BigDecimal;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

pub const ENV_MONETARY_CEILING: &str = "PROMOB_MONETARY_CEILING";
pub const ENV_MAX_DOCUMENT_BYTES: &str = "PROMOB_MAX_DOCUMENT_BYTES";
pub const ENV_PRODUCT_LINES: &str = "PROMOB_PRODUCT_LINES";

/// Read-only settings shared by every extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub monetary_ceiling: BigDecimal,
    pub max_document_bytes: usize,
    pub product_lines: Arc<ProductLineTable>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            monetary_ceiling: BigDecimal::from(DEFAULT_MONETARY_CEILING),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            product_lines: ProductLineTable::builtin(),
        }
    }
}

impl ExtractionConfig {
    /// Defaults overridden by `PROMOB_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(ENV_MONETARY_CEILING) {
            config.monetary_ceiling = parse_ceiling(ENV_MONETARY_CEILING, &value)?;
            tracing::debug!("Using monetary ceiling {} from {}", value, ENV_MONETARY_CEILING);
        }
        if let Ok(value) = std::env::var(ENV_MAX_DOCUMENT_BYTES) {
            config.max_document_bytes = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_MAX_DOCUMENT_BYTES.to_string(),
                value: value.clone(),
            })?;
            tracing::debug!("Using document limit {} bytes from {}", value, ENV_MAX_DOCUMENT_BYTES);
        }
        if let Ok(path) = std::env::var(ENV_PRODUCT_LINES) {
            config = config.with_product_lines_file(path)?;
        }

        Ok(config)
    }

    pub fn with_monetary_ceiling(mut self, ceiling: BigDecimal) -> Self {
        self.monetary_ceiling = ceiling;
        self
    }

    pub fn with_max_document_bytes(mut self, limit: usize) -> Self {
        self.max_document_bytes = limit;
        self
    }

    pub fn with_product_lines(mut self, table: ProductLineTable) -> Self {
        self.product_lines = Arc::new(table);
        self
    }

    pub fn with_product_lines_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        Ok(self.with_product_lines(ProductLineTable::load(path)?))
    }

    pub fn normalizer(&self) -> MonetaryNormalizer {
        MonetaryNormalizer::new(self.monetary_ceiling.clone())
    }
}

fn parse_ceiling(key: &str, value: &str) -> Result<BigDecimal, ConfigError> {
    let invalid = || ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() };
    let ceiling: BigDecimal = value.trim().parse().map_err(|_| invalid())?;
    if ceiling < BigDecimal::from(0) {
        return Err(invalid());
    }
    Ok(ceiling)
}
