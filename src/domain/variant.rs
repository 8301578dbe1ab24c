//! Task variants: quality/cost realizations of a task group.

use serde::{Deserialize, Serialize};

use super::{GroupId, VariantId};

/// Quality at or above which a variant counts as full quality.
pub const FULL_QUALITY: f64 = 1.0;

/// One quality level of a logical job.
///
/// Variants that share a `group` are interchangeable results of the same job;
/// `quality` is the score the planner maximizes and `length` the work it costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TaskVariant {
    /// Unique across the catalog
    pub id: VariantId,

    /// Logical job this variant realizes
    pub group: GroupId,

    /// Result quality in [0, 1]
    pub quality: f64,

    /// Instruction length (million instructions)
    pub length: f64,

    /// Upload payload size (KB)
    pub input_size: f64,

    /// Result payload size (KB)
    pub output_size: f64,
}

impl TaskVariant {
    pub fn new(id: VariantId, group: GroupId, quality: f64, length: f64) -> Self {
        Self {
            id,
            group,
            quality,
            length,
            input_size: 0.0,
            output_size: 0.0,
        }
    }

    /// Set upload and download payload sizes
    pub fn with_sizes(mut self, input_size: f64, output_size: f64) -> Self {
        self.input_size = input_size;
        self.output_size = output_size;
        self
    }

    /// Returns true for the variant that defines the deadline baseline
    pub fn is_full_quality(&self) -> bool {
        self.quality >= FULL_QUALITY
    }
}
