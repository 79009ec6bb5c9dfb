use crate::models::{CleanedImmigrant, CleanedRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Order in which surrogate keys are handed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrdering {
    /// Sorted by the original immigration id, so re-runs over the same
    /// input produce the same keys regardless of file order.
    #[default]
    ImmigrationId,
    /// Input order as loaded.
    Input,
}

pub struct SurrogateKeyAssigner {
    ordering: KeyOrdering,
}

impl SurrogateKeyAssigner {
    pub fn new(ordering: KeyOrdering) -> Self {
        Self { ordering }
    }

    /// Assigns ids `1..=N`, each exactly once.
    pub fn assign(&self, records: Vec<CleanedRecord>) -> Vec<CleanedImmigrant> {
        let mut records = records;
        if self.ordering == KeyOrdering::ImmigrationId {
            // stable: equal ids keep input order; missing ids go last
            records.sort_by_key(|r| (r.immigration_id.is_none(), r.immigration_id));
        }

        let immigrants: Vec<CleanedImmigrant> = records
            .into_iter()
            .zip(1u64..)
            .map(|(record, immigrant_id)| CleanedImmigrant {
                immigrant_id,
                record,
            })
            .collect();

        info!(
            "Assigned {} surrogate keys ({:?} ordering)",
            immigrants.len(),
            self.ordering
        );
        immigrants
    }
}

impl Default for SurrogateKeyAssigner {
    fn default() -> Self {
        Self::new(KeyOrdering::default())
    }
}
