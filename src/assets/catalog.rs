//! Registry of every loadable animation asset

use super::types::{Asset, AssetId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Static description of all registered assets. Lookup only; no loading.
#[derive(Debug, Default)]
pub struct AssetCatalog {
    assets: RwLock<HashMap<AssetId, Arc<Asset>>>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one asset, replacing any previous descriptor with the same id
    pub fn register(&self, asset: Asset) {
        debug!(
            "Registered asset {} ({} frames x {} bytes, {:?})",
            asset.id, asset.frame_count, asset.estimated_bytes_per_frame, asset.priority
        );
        let mut assets = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        assets.insert(asset.id.clone(), Arc::new(asset));
    }

    pub fn register_all(&self, batch: impl IntoIterator<Item = Asset>) {
        let mut assets = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        let before = assets.len();
        for asset in batch {
            assets.insert(asset.id.clone(), Arc::new(asset));
        }
        info!("Catalog now holds {} assets (+{})", assets.len(), assets.len() - before);
    }

    pub fn unregister(&self, asset_id: &AssetId) -> Option<Arc<Asset>> {
        let mut assets = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        assets.remove(asset_id)
    }

    pub fn get(&self, asset_id: &AssetId) -> Option<Arc<Asset>> {
        let assets = self.assets.read().unwrap_or_else(PoisonError::into_inner);
        assets.get(asset_id).cloned()
    }

    pub fn contains(&self, asset_id: &AssetId) -> bool {
        let assets = self.assets.read().unwrap_or_else(PoisonError::into_inner);
        assets.contains_key(asset_id)
    }

    /// Assets flagged for preloading on start
    pub fn pinned(&self) -> Vec<Arc<Asset>> {
        let assets = self.assets.read().unwrap_or_else(PoisonError::into_inner);
        let mut pinned: Vec<_> = assets.values().filter(|a| a.pinned).cloned().collect();
        pinned.sort_by(|a, b| a.id.cmp(&b.id));
        pinned
    }

    pub fn in_group(&self, group_id: &str) -> Vec<Arc<Asset>> {
        let assets = self.assets.read().unwrap_or_else(PoisonError::into_inner);
        let mut group: Vec<_> = assets
            .values()
            .filter(|a| a.group_id == group_id)
            .cloned()
            .collect();
        group.sort_by(|a, b| a.id.cmp(&b.id));
        group
    }

    pub fn len(&self) -> usize {
        self.assets.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::types::{AssetCategory, PriorityTier};

    fn asset(id: &str, group: &str) -> Asset {
        Asset::new(id, group, AssetCategory::Theme, 10, 100, PriorityTier::Medium)
    }

    #[test]
    fn test_register_and_lookup() {
        let catalog = AssetCatalog::new();
        catalog.register(asset("sunset", "summer"));
        catalog.register_all(vec![asset("rain", "autumn"), asset("leaves", "autumn").pinned()]);

        assert_eq!(catalog.len(), 3);
        assert!(catalog.contains(&AssetId::from("rain")));
        assert_eq!(catalog.in_group("autumn").len(), 2);
        assert_eq!(catalog.pinned().len(), 1);
        assert_eq!(catalog.pinned()[0].id, AssetId::from("leaves"));
    }

    #[test]
    fn test_unregister() {
        let catalog = AssetCatalog::new();
        catalog.register(asset("sunset", "summer"));

        assert!(catalog.unregister(&AssetId::from("sunset")).is_some());
        assert!(catalog.get(&AssetId::from("sunset")).is_none());
        assert!(catalog.is_empty());
    }
}
