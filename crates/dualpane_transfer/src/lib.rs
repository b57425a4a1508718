//! `dualpane_transfer` v1:
//! Rust-side clipboard/transfer core for a dual-pane file manager.
//!
//! Layout:
//! - `engine` : pending copy/cut request, observers, paste entry point
//! - `copy`   : single-entry paste (file, symlink, directory tree)
//! - `ops`    : delete/rename primitives
//! - `spec`   : enums/options/events/errors
//! - `report` : per-paste report model
//! - `util`   : unique-name probing and metadata helpers

pub mod copy;
pub mod engine;
pub mod ops;
pub mod report;
pub mod spec;
mod util;

pub use copy::paste_entry;
pub use engine::{FnTransferObserver, ObserverId, TransferEngine};
pub use ops::{delete_entry, rename_entry};
pub use report::{ReportPaste, ReportPasteBuilder};
pub use spec::{
    EnumDeleteOutcome, EnumTransferMode, EnumTransferSymlinkStrategy, EventTransfer,
    SpecTransferOptions, SpecTransferRequest, TransferError, TransferResult,
};
pub use util::derive_unique_path as unique_name;
