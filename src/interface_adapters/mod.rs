// Interface adapters: store façade and snapshot-to-event derivation.

pub mod bridge;
pub mod store;
pub mod utils;

pub use bridge::EventBridge;
pub use store::MemoryStore;
