pub mod types;
pub mod catalog;
pub mod gate;
pub mod loader;
pub mod planner;
pub mod eviction;
pub mod cache;

pub use types::{Asset, AssetCategory, AssetId, FrameHandle, FrameKey, LoadState, PriorityTier};
pub use catalog::AssetCatalog;
pub use gate::{AdmissionGate, GatePermit};
pub use loader::{FileFrameSource, FrameLoader, FrameSource};
pub use planner::PreloadPlanner;
pub use eviction::{EvictionCandidate, EvictionOrder, EvictionPolicy};
pub use cache::{AssetCache, CacheEntry, CacheStats, EntrySnapshot, MemoryBudget, PreloadReport};
