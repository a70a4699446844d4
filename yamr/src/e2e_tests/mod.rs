//! End-to-end tests at the tree and database level.
//!
//! Each test file covers a specific scenario, using deterministic inputs
//! to verify behavior across commits, evictions and reopens.

#![cfg(test)]

mod helpers;

mod test_corrupt_chunk;
mod test_database_store;
mod test_empty_tree;
mod test_file_reopen;
mod test_lazy_reload;
mod test_shuffled_inserts;
mod test_sixteen_keys;
mod test_torn_superblock;
mod test_update_overwrites;
