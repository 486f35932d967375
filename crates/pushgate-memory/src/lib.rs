// pushgate-memory: in-memory document store.
//
// HashMap-backed, lost on drop. Used for development and every test suite.

pub mod adapter;

pub use adapter::MemoryAdapter;
