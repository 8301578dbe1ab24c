//! Task variant catalog
//!
//! Groups variants by their logical job. Every group must carry a full-quality
//! variant because the deadline baseline is "the device alone at full quality".

use std::collections::{BTreeMap, HashSet};

use crate::domain::{GroupId, TaskVariant};
use crate::error::{OffloadError, Result};

/// Static description of task groups and their quality variants
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    groups: BTreeMap<GroupId, Vec<TaskVariant>>,
}

impl TaskCatalog {
    /// Build a catalog, checking id uniqueness and full-quality coverage
    pub fn new(variants: Vec<TaskVariant>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut groups: BTreeMap<GroupId, Vec<TaskVariant>> = BTreeMap::new();

        for variant in variants {
            if !seen.insert(variant.id) {
                return Err(OffloadError::InvalidConfig(format!("duplicate variant id {}", variant.id)));
            }
            if !(0.0..=1.0).contains(&variant.quality) {
                return Err(OffloadError::InvalidConfig(format!(
                    "variant {} has quality {} outside [0, 1]",
                    variant.id, variant.quality
                )));
            }
            if variant.length < 0.0 {
                return Err(OffloadError::InvalidConfig(format!("variant {} has negative length", variant.id)));
            }
            groups.entry(variant.group).or_default().push(variant);
        }

        for (group, variants) in &groups {
            if !variants.iter().any(TaskVariant::is_full_quality) {
                return Err(OffloadError::MissingFullQuality(*group));
            }
        }

        Ok(Self { groups })
    }

    /// Variants of `group` in catalog order
    pub fn variants(&self, group: GroupId) -> Result<&[TaskVariant]> {
        self.groups
            .get(&group)
            .map(Vec::as_slice)
            .ok_or(OffloadError::UnknownGroup(group))
    }

    /// The variant that defines the deadline baseline
    pub fn full_quality(&self, group: GroupId) -> Result<&TaskVariant> {
        self.variants(group)?
            .iter()
            .find(|v| v.is_full_quality())
            .ok_or(OffloadError::MissingFullQuality(group))
    }

    /// Group ids in ascending order
    pub fn group_ids(&self) -> Vec<GroupId> {
        self.groups.keys().copied().collect()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variants() -> Vec<TaskVariant> {
        vec![
            TaskVariant::new(0, 0, 1.0, 100.0),
            TaskVariant::new(1, 0, 0.5, 40.0),
            TaskVariant::new(2, 1, 1.0, 20.0),
        ]
    }

    #[test]
    fn test_catalog_groups() {
        let catalog = TaskCatalog::new(variants()).unwrap();
        assert_eq!(catalog.group_ids(), vec![0, 1]);
        assert_eq!(catalog.variants(0).unwrap().len(), 2);
        assert_eq!(catalog.full_quality(0).unwrap().id, 0);
        assert_eq!(catalog.full_quality(1).unwrap().length, 20.0);
    }

    #[test]
    fn test_catalog_unknown_group() {
        let catalog = TaskCatalog::new(variants()).unwrap();
        assert!(matches!(catalog.variants(7), Err(OffloadError::UnknownGroup(7))));
    }

    #[test]
    fn test_catalog_requires_full_quality() {
        let err = TaskCatalog::new(vec![TaskVariant::new(0, 4, 0.5, 10.0)]).unwrap_err();
        assert!(matches!(err, OffloadError::MissingFullQuality(4)));
    }

    #[test]
    fn test_catalog_rejects_duplicate_ids() {
        let err = TaskCatalog::new(vec![TaskVariant::new(0, 0, 1.0, 10.0), TaskVariant::new(0, 1, 1.0, 10.0)])
            .unwrap_err();
        assert!(matches!(err, OffloadError::InvalidConfig(_)));
    }

    #[test]
    fn test_catalog_rejects_quality_out_of_range() {
        let err = TaskCatalog::new(vec![TaskVariant::new(0, 0, 1.5, 10.0)]).unwrap_err();
        assert!(err.to_string().contains("outside [0, 1]"));
    }
}
