pub use memory::MemoryStorage;
pub use rocks::RocksStorage;
pub use traits::*;
pub mod memory;
pub mod rocks;
pub mod traits;
