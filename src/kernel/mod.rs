//! Kernel Source Management Module
//!
//! Everything that turns a kernel image into a searchable source tree:
//! - Version parsing and backport selection
//! - Git provisioning of mainline and backport tool trees
//! - Backported tree generation
//! - Architecture mapping and image inspection

pub mod arch;
pub mod backport;
pub mod git;
pub mod image;
pub mod sources;
pub mod version;
