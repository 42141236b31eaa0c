pub mod device;
pub mod network;

pub use device::{
    CapabilityClass, CapabilityScorer, DeviceProfile, DeviceProfiler, PlatformProbe, PlatformSignals,
    SysinfoProbe, TableScorer,
};
pub use network::{
    HttpLatencyProbe, LatencyProbe, LinkKind, NetworkClass, NetworkProfile, NetworkProfiler, ProbePlan,
    Stability,
};
