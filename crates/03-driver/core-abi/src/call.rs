//! Fallible call adapter.
//!
//! Every mutating core operation goes through [`call`] or [`call_value`]: a
//! fresh [`ErrorSlot`] is handed to the operation and inspected afterwards, so
//! callers see either the success value or a typed [`BridgeError`], never both
//! and never neither. The adapter holds no state and takes no locks; the core
//! serialises its own mutations.

use crate::error::{BridgeError, BridgeResult, ErrorCode, ErrorSlot};
use serde::Serialize;
use std::fmt;

/// Closed set of operations the consumer may issue into the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    IsReady,
    Run,
    Pause,
    PowerOn,
    PowerOff,
    SetWarp,
    ExportConfig,
    LoadSnapshot,
    LoadRom,
    LoadExt,
    SaveRom,
    SaveWom,
    SaveExt,
    MakeMedia,
    WriteMedia,
    InsertDisk,
    InsertBlankDisk,
    EjectDisk,
    ExportDisk,
    AttachHardDrive,
    FormatHardDrive,
    ChangeGeometry,
    WriteHardDrive,
    EnableWriteThrough,
    ExportFileSystem,
    StartRecording,
}

impl Operation {
    /// Every operation, for enumeration in tooling and tests.
    pub const ALL: &'static [Operation] = &[
        Operation::IsReady,
        Operation::Run,
        Operation::Pause,
        Operation::PowerOn,
        Operation::PowerOff,
        Operation::SetWarp,
        Operation::ExportConfig,
        Operation::LoadSnapshot,
        Operation::LoadRom,
        Operation::LoadExt,
        Operation::SaveRom,
        Operation::SaveWom,
        Operation::SaveExt,
        Operation::MakeMedia,
        Operation::WriteMedia,
        Operation::InsertDisk,
        Operation::InsertBlankDisk,
        Operation::EjectDisk,
        Operation::ExportDisk,
        Operation::AttachHardDrive,
        Operation::FormatHardDrive,
        Operation::ChangeGeometry,
        Operation::WriteHardDrive,
        Operation::EnableWriteThrough,
        Operation::ExportFileSystem,
        Operation::StartRecording,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::IsReady => "is-ready",
            Operation::Run => "run",
            Operation::Pause => "pause",
            Operation::PowerOn => "power-on",
            Operation::PowerOff => "power-off",
            Operation::SetWarp => "set-warp",
            Operation::ExportConfig => "export-config",
            Operation::LoadSnapshot => "load-snapshot",
            Operation::LoadRom => "load-rom",
            Operation::LoadExt => "load-ext",
            Operation::SaveRom => "save-rom",
            Operation::SaveWom => "save-wom",
            Operation::SaveExt => "save-ext",
            Operation::MakeMedia => "make-media",
            Operation::WriteMedia => "write-media",
            Operation::InsertDisk => "insert-disk",
            Operation::InsertBlankDisk => "insert-blank-disk",
            Operation::EjectDisk => "eject-disk",
            Operation::ExportDisk => "export-disk",
            Operation::AttachHardDrive => "attach-hard-drive",
            Operation::FormatHardDrive => "format-hard-drive",
            Operation::ChangeGeometry => "change-geometry",
            Operation::WriteHardDrive => "write-hard-drive",
            Operation::EnableWriteThrough => "enable-write-through",
            Operation::ExportFileSystem => "export-file-system",
            Operation::StartRecording => "start-recording",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Invokes `f` with a fresh error slot and returns its value unless the slot
/// reports a failure.
pub fn call<T>(operation: Operation, f: impl FnOnce(&mut ErrorSlot) -> T) -> BridgeResult<T> {
    let mut slot = ErrorSlot::new();
    let value = f(&mut slot);
    match slot.into_error(operation) {
        Some(err) => {
            log::debug!("{operation}: {err}");
            Err(err)
        }
        None => {
            log::trace!("{operation}: ok");
            Ok(value)
        }
    }
}

/// Like [`call`] for operations that produce an optional value.
///
/// A failure code wins over any returned value. An OK slot without a value is
/// reported as [`ErrorCode::Internal`].
pub fn call_value<T>(
    operation: Operation,
    f: impl FnOnce(&mut ErrorSlot) -> Option<T>,
) -> BridgeResult<T> {
    call(operation, f)?.ok_or_else(|| {
        BridgeError::new(
            ErrorCode::Internal,
            operation,
            "core reported success without producing a value",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RawCode;

    #[test]
    fn success_returns_value() {
        let result = call(Operation::WriteMedia, |_slot| 901_120usize);
        assert_eq!(result, Ok(901_120));
    }

    #[test]
    fn failure_discards_value() {
        let result = call_value(Operation::ExportDisk, |slot| {
            slot.fail(RawCode::DiskMissing, "df1 is empty");
            Some(7u8)
        });
        let err = result.unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingResource);
        assert_eq!(err.operation(), Operation::ExportDisk);
    }

    #[test]
    fn success_without_value_is_internal() {
        let err = call_value::<u8>(Operation::MakeMedia, |_slot| None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
    }

    #[test]
    fn operations_are_enumerable_and_named_uniquely() {
        let names: std::collections::HashSet<_> =
            Operation::ALL.iter().map(|op| op.name()).collect();
        assert_eq!(names.len(), Operation::ALL.len());
    }
}
