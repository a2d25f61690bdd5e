//! Filesystem primitives the executor applies plan actions with.
pub mod fs;
pub mod symlink;
