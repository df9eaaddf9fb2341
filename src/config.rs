use thiserror::Error;

use crate::codec::{ColumnConfig, ValueCodec};

/// Records per container when nothing else is configured.
pub const DEFAULT_RECORDS_PER_CONTAINER: usize = 1000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A parameter is out of its valid range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for writing a SECRAM file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecramConfig {
    /// Records grouped into one indexed container.
    pub records_per_container: usize,
    /// Column codecs; stored in the file header.
    pub columns: ColumnConfig,
    /// Reject reads that start before their predecessor.
    pub check_order: bool,
}

impl Default for SecramConfig {
    fn default() -> Self {
        Self {
            records_per_container: DEFAULT_RECORDS_PER_CONTAINER,
            columns: ColumnConfig::default(),
            check_order: true,
        }
    }
}

impl SecramConfig {
    /// Set the container size (at least one record).
    pub fn with_records_per_container(mut self, records: usize) -> Self {
        self.records_per_container = records.max(1);
        self
    }

    /// Replace the column codecs.
    pub fn with_columns(mut self, columns: ColumnConfig) -> Self {
        self.columns = columns;
        self
    }

    /// Enable or disable the read ordering check.
    pub fn with_order_check(mut self, enabled: bool) -> Self {
        self.check_order = enabled;
        self
    }

    /// Check that every column can hold the values records will carry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.records_per_container == 0 {
            return Err(ConfigError::Invalid(
                "records per container must be > 0".to_string(),
            ));
        }
        let columns = &self.columns;
        let named = [
            ("coverage", columns.coverage),
            ("header_count", columns.header_count),
            ("mapping_quality", columns.mapping_quality),
            ("reference_span", columns.reference_span),
            ("feature_count", columns.feature_count),
            ("coverage_index", columns.coverage_index),
            ("feature_length", columns.feature_length),
            ("quality_count", columns.quality_count),
            ("quality", columns.quality),
        ];
        for (name, codec) in named {
            if codec.width() > 64 {
                return Err(ConfigError::Invalid(format!(
                    "column {name} is {} bits wide",
                    codec.width()
                )));
            }
        }
        if matches!(columns.bases, ValueCodec::Fixed { bits } | ValueCodec::Beta { bits, .. } if bits < 4)
        {
            return Err(ConfigError::Invalid(
                "bases column needs at least 4 bits per symbol".to_string(),
            ));
        }
        Ok(())
    }
}
