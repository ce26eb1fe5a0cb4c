use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::RwLock;

use super::{CategoryId, ClaimKind, FundingCategory};
use crate::money::Amount;

/// Read access to category rules, supplied by the host.
pub trait CategoryProvider: Send + Sync {
    fn category(&self, id: &CategoryId) -> Result<Option<FundingCategory>, CategoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("failed to read category catalogue: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid category catalogue: {0}")]
    Json(#[from] serde_json::Error),
    #[error("category catalogue lists {0} more than once")]
    Duplicate(CategoryId),
    #[error("category provider unavailable: {0}")]
    Unavailable(String),
}

/// In-memory category table. Caps may be changed at runtime through [`CategoryCatalog::upsert`].
#[derive(Debug, Default)]
pub struct CategoryCatalog {
    categories: RwLock<BTreeMap<CategoryId, FundingCategory>>,
}

impl CategoryCatalog {
    pub fn from_categories(
        categories: impl IntoIterator<Item = FundingCategory>,
    ) -> Result<Self, CategoryError> {
        let mut table = BTreeMap::new();
        for category in categories {
            let id = category.id.clone();
            if table.insert(id.clone(), category).is_some() {
                return Err(CategoryError::Duplicate(id));
            }
        }

        Ok(Self {
            categories: RwLock::new(table),
        })
    }

    /// The university's default welfare categories.
    pub fn standard() -> Self {
        let table = standard_categories()
            .into_iter()
            .map(|category| (category.id.clone(), category))
            .collect();

        Self {
            categories: RwLock::new(table),
        }
    }

    /// Load a JSON array of categories.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CategoryError> {
        let categories: Vec<FundingCategory> = serde_json::from_reader(reader)?;
        Self::from_categories(categories)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CategoryError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Insert or replace a category. Applications already submitted keep their snapshot.
    pub fn upsert(&self, category: FundingCategory) -> Result<(), CategoryError> {
        let mut guard = self
            .categories
            .write()
            .map_err(|_| CategoryError::Unavailable("catalogue lock poisoned".to_string()))?;
        guard.insert(category.id.clone(), category);
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<FundingCategory>, CategoryError> {
        let guard = self
            .categories
            .read()
            .map_err(|_| CategoryError::Unavailable("catalogue lock poisoned".to_string()))?;
        Ok(guard.values().cloned().collect())
    }
}

impl CategoryProvider for CategoryCatalog {
    fn category(&self, id: &CategoryId) -> Result<Option<FundingCategory>, CategoryError> {
        let guard = self
            .categories
            .read()
            .map_err(|_| CategoryError::Unavailable("catalogue lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }
}

fn standard_categories() -> Vec<FundingCategory> {
    let category = |id: &str,
                    name: &str,
                    sen: u64,
                    requires_committee_approval: bool,
                    claim_kind: ClaimKind| FundingCategory {
        id: CategoryId::new(id),
        name: name.to_string(),
        max_amount: Amount::from_sen(sen),
        requires_committee_approval,
        active: true,
        claim_kind,
    };

    vec![
        category(
            "CAT-ILLNESS-OUTPATIENT",
            "Illness (outpatient)",
            3_000,
            false,
            ClaimKind::Outpatient,
        ),
        category(
            "CAT-ILLNESS-INPATIENT",
            "Illness (inpatient)",
            20_000,
            false,
            ClaimKind::Inpatient,
        ),
        category(
            "CAT-ILLNESS-CHRONIC",
            "Chronic illness",
            50_000,
            true,
            ClaimKind::Inpatient,
        ),
        category(
            "CAT-BEREAVEMENT-IMMEDIATE",
            "Bereavement (immediate family)",
            50_000,
            false,
            ClaimKind::Bereavement,
        ),
        category(
            "CAT-BEREAVEMENT-EXTENDED",
            "Bereavement (extended family)",
            20_000,
            false,
            ClaimKind::Bereavement,
        ),
        category(
            "CAT-DISASTER",
            "Natural disaster",
            30_000,
            true,
            ClaimKind::Disaster,
        ),
        category(
            "CAT-EMERGENCY-OTHERS",
            "Emergency (others)",
            100_000,
            true,
            ClaimKind::Emergency,
        ),
    ]
}
