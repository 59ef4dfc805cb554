//! # bagit-io — Reading and Writing Bags
//!
//! - [`reader`]: parses `bagit.txt`, manifests, bag-info and `fetch.txt`
//!   into a [`bagit_core::Bag`].
//! - [`text`]: the inverse, one function per tag file.
//! - [`writer`]: writes a whole bag so its tag manifests match the tag
//!   files on disk.
//! - [`creator`]: turns a plain directory into a bag in place.
//!
//! Tag files are UTF-8 with `\n` line endings on write; `\r\n` is accepted
//! on read.

pub mod creator;
pub mod reader;
pub mod text;
pub mod writer;

pub use creator::{create_bag_in_place, CreateOptions};
pub use reader::BagReader;
pub use text::{write_bagit_file, write_fetch, write_manifest, write_metadata};
pub use writer::BagWriter;
