use super::media::MediaAsset;

pub const FREE_SELECTION_LIMIT: usize = 10;
pub const PREMIUM_SELECTION_LIMIT: usize = 30;

pub fn selection_limit(premium: bool) -> usize {
    if premium {
        PREMIUM_SELECTION_LIMIT
    } else {
        FREE_SELECTION_LIMIT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("at most {limit} items can be selected at once")]
pub struct LimitReached {
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddOutcome {
    pub added: usize,
    /// New items dropped because the limit was exceeded
    pub truncated: usize,
    pub duplicates: usize,
}

/// Assets picked so far and the one currently shown.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    assets: Vec<MediaAsset>,
    current: usize,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assets(&self) -> &[MediaAsset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn current(&self) -> Option<&MediaAsset> {
        self.assets.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Returns false when `index` is out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.assets.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    /// Append picked assets, skipping ones already selected (same uri or
    /// library id) and truncating at the limit for the given tier.
    pub fn add(
        &mut self,
        picked: impl IntoIterator<Item = MediaAsset>,
        premium: bool,
    ) -> Result<AddOutcome, LimitReached> {
        let limit = selection_limit(premium);
        if self.assets.len() >= limit {
            return Err(LimitReached { limit });
        }

        let was_empty = self.assets.is_empty();
        let mut outcome = AddOutcome::default();

        for asset in picked {
            if self.contains(&asset) {
                outcome.duplicates += 1;
            } else if self.assets.len() >= limit {
                outcome.truncated += 1;
            } else {
                self.assets.push(asset);
                outcome.added += 1;
            }
        }

        if was_empty {
            self.current = 0;
        }
        Ok(outcome)
    }

    fn contains(&self, asset: &MediaAsset) -> bool {
        self.assets.iter().any(|existing| {
            existing.uri == asset.uri
                || matches!(
                    (&existing.asset_id, &asset.asset_id),
                    (Some(a), Some(b)) if a == b
                )
        })
    }
}
