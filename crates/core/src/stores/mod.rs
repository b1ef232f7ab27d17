pub mod fs;
pub mod memory;
pub mod supabase;

pub use fs::FsObjectStore;
pub use memory::{MemoryDocumentStore, MemoryObjectStore};
pub use supabase::{SupabaseDocumentStore, SupabaseStorage};
