pub mod loader;
pub mod util;

pub use loader::FsLoader;
pub use util::{collect_documents, generated_at};
