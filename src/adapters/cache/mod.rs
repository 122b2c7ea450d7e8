mod disk;
mod memory;

pub use disk::JsonFileLeaseCache;
pub use memory::MemoryLeaseCache;
