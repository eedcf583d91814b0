//! Notebook document model shared between the editor host and the
//! completion stream.
//!
//! A notebook is an ordered list of [`Block`]s. Blocks produced by the
//! completion service are *ghost* blocks: speculative content flagged through
//! block metadata until the user accepts it. The editor itself stays behind
//! the [`NotebookHost`] trait; [`InMemoryHost`] implements it without an
//! editor for embedding and tests.

#![warn(missing_docs)]

mod block;
mod edit;
mod host;
mod memory;

pub use block::{Block, BlockId, DocumentId, GHOST_METADATA_KEY, NotebookSnapshot};
pub use edit::{BlockEdit, NotebookEdit};
pub use host::{CellResolution, HostError, NotebookHost};
pub use memory::InMemoryHost;
