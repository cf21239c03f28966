use crate::context::OwnerId;
use serde::{Deserialize, Serialize};

/// Strengths and weaknesses kept per owner.
pub const MAX_PROFILE_ITEMS: usize = 10;

/// Running summary of an owner's strengths and weaknesses across evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillProfile {
    pub owner: OwnerId,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

impl SkillProfile {
    pub fn empty(owner: OwnerId) -> Self {
        Self {
            owner,
            strengths: vec![],
            weaknesses: vec![],
        }
    }

    /// Adds new items after the existing ones, skipping duplicates, and keeps
    /// at most [`MAX_PROFILE_ITEMS`] of each.
    pub fn merge(&mut self, strengths: &[String], weaknesses: &[String]) {
        merge_into(&mut self.strengths, strengths);
        merge_into(&mut self.weaknesses, weaknesses);
    }
}

fn merge_into(existing: &mut Vec<String>, incoming: &[String]) {
    for item in incoming {
        let item = item.trim();
        if item.is_empty() || existing.iter().any(|e| e == item) {
            continue;
        }
        existing.push(item.to_string());
    }
    existing.truncate(MAX_PROFILE_ITEMS);
}
