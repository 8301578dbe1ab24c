//! A single task instance awaiting dispatch.

use serde::{Deserialize, Serialize};

use crate::domain::{ExecutionVenue, GroupId, TaskVariant, VariantId, VenueId};
use crate::error::{OffloadError, Result};

/// Chosen (variant, venue) pair of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub variant: VariantId,
    pub venue: VenueId,
}

/// One task instance with its candidate sets and current selection
///
/// The selection is held as positions into the candidate lists, so it can never
/// point outside them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    group: GroupId,
    variants: Vec<TaskVariant>,
    venues: Vec<ExecutionVenue>,
    selected_variant: usize,
    selected_venue: usize,
}

impl ScheduleEntry {
    /// Create an entry selecting the highest-quality variant (first among
    /// equals) on the first candidate venue
    pub fn new(group: GroupId, variants: Vec<TaskVariant>, venues: Vec<ExecutionVenue>) -> Result<Self> {
        if variants.is_empty() {
            return Err(OffloadError::UnknownGroup(group));
        }
        if venues.is_empty() {
            return Err(OffloadError::InvalidConfig(format!(
                "entry of group {} has no candidate venues",
                group
            )));
        }
        if let Some(stray) = variants.iter().find(|v| v.group != group) {
            return Err(OffloadError::ProtocolViolation(format!(
                "variant {} belongs to group {}, not {}",
                stray.id, stray.group, group
            )));
        }

        let mut best = 0;
        for (index, variant) in variants.iter().enumerate() {
            if variant.quality > variants[best].quality {
                best = index;
            }
        }

        Ok(Self {
            group,
            variants,
            venues,
            selected_variant: best,
            selected_venue: 0,
        })
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn variants(&self) -> &[TaskVariant] {
        &self.variants
    }

    pub fn venues(&self) -> &[ExecutionVenue] {
        &self.venues
    }

    pub fn selected_variant(&self) -> &TaskVariant {
        &self.variants[self.selected_variant]
    }

    pub fn selected_venue(&self) -> &ExecutionVenue {
        &self.venues[self.selected_venue]
    }

    pub fn assignment(&self) -> Assignment {
        Assignment {
            variant: self.selected_variant().id,
            venue: self.selected_venue().id,
        }
    }

    /// Select by position in the candidate lists
    pub fn select_at(&mut self, variant: usize, venue: usize) -> Result<()> {
        if variant >= self.variants.len() || venue >= self.venues.len() {
            return Err(OffloadError::ProtocolViolation(format!(
                "selection ({}, {}) outside candidates of group {}",
                variant, venue, self.group
            )));
        }
        self.selected_variant = variant;
        self.selected_venue = venue;
        Ok(())
    }

    /// Keep the selected venue, switch the variant
    pub fn select_variant_at(&mut self, variant: usize) -> Result<()> {
        self.select_at(variant, self.selected_venue)
    }
}
