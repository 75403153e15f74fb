pub mod db;
pub mod email;
pub mod memory;
pub mod pdf;

pub use db::DbAdapter;
pub use email::LogEmailAdapter;
pub use memory::MemoryAdapter;
pub use pdf::GenPdfRenderer;
