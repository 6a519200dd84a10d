//! # Table Configuration
//!
//! Page geometry and initial reservations for component tables.
//! Loaded once at startup, either from code or from a TOML document:
//!
//! ```toml
//! entity_page_size = 1024
//! component_page_size = 256
//! reserve = 4096
//! ```

use serde::{Deserialize, Serialize};

use crate::ecs::Entity;
use crate::error::{StorageError, StorageResult};

/// Bytes targeted by one storage page.
pub const PAGE_BYTES: usize = 4096;

/// Default number of entries per sparse index page.
pub const DEFAULT_ENTITY_PAGE_SIZE: usize = PAGE_BYTES / std::mem::size_of::<Entity>();

/// Configuration shared by both table kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Entries per sparse index page.
    pub entity_page_size: usize,
    /// Components per stable table page. `None` derives it from the component size.
    pub component_page_size: Option<usize>,
    /// Rows reserved up front in the dense sequences.
    pub reserve: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            entity_page_size: DEFAULT_ENTITY_PAGE_SIZE,
            component_page_size: None,
            reserve: 0,
        }
    }
}

impl TableConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if the text is not valid TOML for this
    /// structure, or [`StorageError::InvalidPageSize`] if a page size is
    /// rejected by [`TableConfig::validate`].
    pub fn from_toml_str(source: &str) -> StorageResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| StorageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every page size is a non-zero power of two.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPageSize`] naming the offending page kind.
    pub fn validate(&self) -> StorageResult<()> {
        check_page_size("entity", self.entity_page_size)?;
        if let Some(size) = self.component_page_size {
            check_page_size("component", size)?;
        }
        Ok(())
    }

    /// Resolves the component page size for a component of type `T`.
    #[must_use]
    pub fn component_page_size_for<T>(&self) -> usize {
        self.component_page_size
            .unwrap_or_else(default_component_page_size::<T>)
    }
}

/// Default components per page: as many as fit in [`PAGE_BYTES`], rounded
/// down to a power of two, at least one.
#[must_use]
pub fn default_component_page_size<T>() -> usize {
    let fit = PAGE_BYTES / std::mem::size_of::<T>().max(1);
    if fit <= 1 {
        1
    } else if fit.is_power_of_two() {
        fit
    } else {
        fit.next_power_of_two() >> 1
    }
}

pub(crate) fn check_page_size(kind: &'static str, size: usize) -> StorageResult<()> {
    if size == 0 || !size.is_power_of_two() {
        return Err(StorageError::InvalidPageSize { kind, size });
    }
    Ok(())
}
