// System Layer
pub mod archive;
pub mod backup;
pub mod launch;
pub mod paths;
pub mod purge;

pub use archive::{default_app_root_predicate, detect_root_folder, extract, ArchiveEntry};
pub use backup::{backup, restore};
pub use launch::launch;
pub use paths::{resolve, resolve_target};
pub use purge::{purge, purge_with};
