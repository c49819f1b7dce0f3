//! Error codes reported by the core and the typed taxonomy handed to callers.

use crate::call::Operation;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result alias for bridged core operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Raw failure codes a core writes into an [`ErrorSlot`].
///
/// These are the core's own vocabulary and never leave this crate's adapter;
/// callers only ever see [`ErrorCode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RawCode {
    Ok = 0,
    Unknown,

    // Emulator state
    Launch,
    PoweredOff,
    PoweredOn,
    Running,

    // Configuration
    OptUnsupported,
    OptInvArg,

    // Memory
    OutOfMemory,

    // Files and directories
    DirNotFound,
    DirAccessDenied,
    DirCantCreate,
    FileNotFound,
    FileExists,
    FileIsDirectory,
    FileAccessDenied,
    FileTypeMismatch,
    FileTypeUnsupported,
    FileCantRead,
    FileCantWrite,
    FileCantCreate,

    // Ram / Rom
    ChipRamMissing,
    RomMissing,
    ArosNoExtrom,

    // Write-through
    WtBlocked,
    Wt,

    // Floppy disks
    DiskMissing,
    DiskIncompatible,
    DiskInvalidDiameter,
    DiskInvalidDensity,
    DiskInvalidLayout,

    // Hard drives
    HdrTooLarge,
    HdrUnsupportedCylCount,
    HdrUnsupportedHeadCount,
    HdrUnsupportedSecCount,
    HdrUnsupportedBsize,
    HdrUnknownGeometry,
    HdrUnmatchedGeometry,
    HdrUnpartitioned,
    HdrCorruptedPtable,
    HdrUnsupported,

    // Snapshots
    SnapTooOld,
    SnapTooNew,
    SnapIsBeta,
    SnapCorrupted,

    // Extension ROMs and encrypted ROMs
    ExtIncompatible,
    ExtCorrupted,
    MissingRomKey,
    InvalidRomKey,

    // Recorder
    RecLaunch,

    // File systems
    FsUnsupported,
    FsUnformatted,
    FsCorrupted,
    FsOutOfSpace,
    FsDirNotEmpty,
    FsCannotCreateDir,
    FsCannotCreateFile,

    /// The user dismissed an interaction the operation depended on.
    Cancelled,
}

impl RawCode {
    const TABLE: &'static [RawCode] = &[
        RawCode::Ok,
        RawCode::Unknown,
        RawCode::Launch,
        RawCode::PoweredOff,
        RawCode::PoweredOn,
        RawCode::Running,
        RawCode::OptUnsupported,
        RawCode::OptInvArg,
        RawCode::OutOfMemory,
        RawCode::DirNotFound,
        RawCode::DirAccessDenied,
        RawCode::DirCantCreate,
        RawCode::FileNotFound,
        RawCode::FileExists,
        RawCode::FileIsDirectory,
        RawCode::FileAccessDenied,
        RawCode::FileTypeMismatch,
        RawCode::FileTypeUnsupported,
        RawCode::FileCantRead,
        RawCode::FileCantWrite,
        RawCode::FileCantCreate,
        RawCode::ChipRamMissing,
        RawCode::RomMissing,
        RawCode::ArosNoExtrom,
        RawCode::WtBlocked,
        RawCode::Wt,
        RawCode::DiskMissing,
        RawCode::DiskIncompatible,
        RawCode::DiskInvalidDiameter,
        RawCode::DiskInvalidDensity,
        RawCode::DiskInvalidLayout,
        RawCode::HdrTooLarge,
        RawCode::HdrUnsupportedCylCount,
        RawCode::HdrUnsupportedHeadCount,
        RawCode::HdrUnsupportedSecCount,
        RawCode::HdrUnsupportedBsize,
        RawCode::HdrUnknownGeometry,
        RawCode::HdrUnmatchedGeometry,
        RawCode::HdrUnpartitioned,
        RawCode::HdrCorruptedPtable,
        RawCode::HdrUnsupported,
        RawCode::SnapTooOld,
        RawCode::SnapTooNew,
        RawCode::SnapIsBeta,
        RawCode::SnapCorrupted,
        RawCode::ExtIncompatible,
        RawCode::ExtCorrupted,
        RawCode::MissingRomKey,
        RawCode::InvalidRomKey,
        RawCode::RecLaunch,
        RawCode::FsUnsupported,
        RawCode::FsUnformatted,
        RawCode::FsCorrupted,
        RawCode::FsOutOfSpace,
        RawCode::FsDirNotEmpty,
        RawCode::FsCannotCreateDir,
        RawCode::FsCannotCreateFile,
        RawCode::Cancelled,
    ];

    /// Maps a raw slot value back to a known code.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::TABLE.get(raw as usize).copied()
    }

    /// Default human-readable description used when the core supplies none.
    pub fn describe(self) -> &'static str {
        match self {
            RawCode::Ok => "no error",
            RawCode::Unknown => "unclassified error condition",
            RawCode::Launch => "the emulator could not be launched",
            RawCode::PoweredOff => "the emulator is powered off",
            RawCode::PoweredOn => "the emulator is powered on",
            RawCode::Running => "the emulator is running",
            RawCode::OptUnsupported => "unsupported configuration option",
            RawCode::OptInvArg => "invalid configuration argument",
            RawCode::OutOfMemory => "out of memory",
            RawCode::DirNotFound => "directory does not exist",
            RawCode::DirAccessDenied => "directory access denied",
            RawCode::DirCantCreate => "unable to create directory",
            RawCode::FileNotFound => "file not found",
            RawCode::FileExists => "file already exists",
            RawCode::FileIsDirectory => "the file is a directory",
            RawCode::FileAccessDenied => "file access denied",
            RawCode::FileTypeMismatch => "file type mismatch",
            RawCode::FileTypeUnsupported => "unsupported file type",
            RawCode::FileCantRead => "can't read from file",
            RawCode::FileCantWrite => "can't write to file",
            RawCode::FileCantCreate => "can't create file",
            RawCode::ChipRamMissing => "no chip RAM installed",
            RawCode::RomMissing => "no Kickstart ROM installed",
            RawCode::ArosNoExtrom => "the AROS ROM requires an extension ROM",
            RawCode::WtBlocked => "write-through storage is in use by another instance",
            RawCode::Wt => "write-through storage could not be created",
            RawCode::DiskMissing => "no disk in drive",
            RawCode::DiskIncompatible => "disk is incompatible with this drive",
            RawCode::DiskInvalidDiameter => "invalid disk diameter",
            RawCode::DiskInvalidDensity => "invalid disk density",
            RawCode::DiskInvalidLayout => "invalid disk layout",
            RawCode::HdrTooLarge => "hard drive image is too large",
            RawCode::HdrUnsupportedCylCount => "unsupported cylinder count",
            RawCode::HdrUnsupportedHeadCount => "unsupported head count",
            RawCode::HdrUnsupportedSecCount => "unsupported sector count",
            RawCode::HdrUnsupportedBsize => "unsupported block size",
            RawCode::HdrUnknownGeometry => "hard drive geometry could not be derived",
            RawCode::HdrUnmatchedGeometry => "geometry does not match the image size",
            RawCode::HdrUnpartitioned => "hard drive image is not partitioned",
            RawCode::HdrCorruptedPtable => "corrupted partition table",
            RawCode::HdrUnsupported => "unsupported hard drive image",
            RawCode::SnapTooOld => "snapshot was created with an older version",
            RawCode::SnapTooNew => "snapshot was created with a newer version",
            RawCode::SnapIsBeta => "snapshot was created with a beta release",
            RawCode::SnapCorrupted => "snapshot data is corrupted",
            RawCode::ExtIncompatible => "extension ROM is incompatible",
            RawCode::ExtCorrupted => "extension ROM is corrupted",
            RawCode::MissingRomKey => "encrypted ROM requires a rom.key file",
            RawCode::InvalidRomKey => "rom.key does not decrypt this ROM",
            RawCode::RecLaunch => "the screen recorder could not be launched",
            RawCode::FsUnsupported => "unsupported file system",
            RawCode::FsUnformatted => "the volume is not formatted",
            RawCode::FsCorrupted => "the file system is corrupted",
            RawCode::FsOutOfSpace => "the volume is full",
            RawCode::FsDirNotEmpty => "target directory is not empty",
            RawCode::FsCannotCreateDir => "unable to create a directory on the host",
            RawCode::FsCannotCreateFile => "unable to create a file on the host",
            RawCode::Cancelled => "cancelled by the user",
        }
    }
}

/// Closed failure taxonomy exposed to callers of bridged operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    /// Media or data has the wrong or a corrupted format.
    InvalidFormat,
    /// A required file, ROM, or medium is absent.
    MissingResource,
    /// The request conflicts with the emulated hardware or its state.
    IncompatibleConfiguration,
    /// The host refused or failed an I/O request.
    IoFailure,
    /// The user backed out of the interaction.
    UserCancelled,
    /// Unclassified failure; indicates a bridge or core defect.
    Internal,
}

impl ErrorCode {
    /// Stable label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidFormat => "invalid format",
            ErrorCode::MissingResource => "missing resource",
            ErrorCode::IncompatibleConfiguration => "incompatible configuration",
            ErrorCode::IoFailure => "I/O failure",
            ErrorCode::UserCancelled => "cancelled",
            ErrorCode::Internal => "internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a raw slot value onto the caller-facing taxonomy. Total over `u32`.
pub fn classify(raw: u32) -> ErrorCode {
    let Some(code) = RawCode::from_raw(raw) else {
        return ErrorCode::Internal;
    };
    match code {
        RawCode::FileTypeMismatch
        | RawCode::FileTypeUnsupported
        | RawCode::DiskIncompatible
        | RawCode::DiskInvalidDiameter
        | RawCode::DiskInvalidDensity
        | RawCode::DiskInvalidLayout
        | RawCode::HdrUnpartitioned
        | RawCode::HdrCorruptedPtable
        | RawCode::SnapTooOld
        | RawCode::SnapTooNew
        | RawCode::SnapIsBeta
        | RawCode::SnapCorrupted
        | RawCode::ExtIncompatible
        | RawCode::ExtCorrupted
        | RawCode::InvalidRomKey
        | RawCode::FsUnsupported
        | RawCode::FsUnformatted
        | RawCode::FsCorrupted => ErrorCode::InvalidFormat,

        RawCode::FileNotFound
        | RawCode::DirNotFound
        | RawCode::RomMissing
        | RawCode::ArosNoExtrom
        | RawCode::MissingRomKey
        | RawCode::DiskMissing
        | RawCode::ChipRamMissing => ErrorCode::MissingResource,

        RawCode::PoweredOff
        | RawCode::PoweredOn
        | RawCode::Running
        | RawCode::OptUnsupported
        | RawCode::OptInvArg
        | RawCode::HdrTooLarge
        | RawCode::HdrUnsupportedCylCount
        | RawCode::HdrUnsupportedHeadCount
        | RawCode::HdrUnsupportedSecCount
        | RawCode::HdrUnsupportedBsize
        | RawCode::HdrUnknownGeometry
        | RawCode::HdrUnmatchedGeometry
        | RawCode::HdrUnsupported
        | RawCode::WtBlocked => ErrorCode::IncompatibleConfiguration,

        RawCode::DirAccessDenied
        | RawCode::DirCantCreate
        | RawCode::FileExists
        | RawCode::FileIsDirectory
        | RawCode::FileAccessDenied
        | RawCode::FileCantRead
        | RawCode::FileCantWrite
        | RawCode::FileCantCreate
        | RawCode::FsOutOfSpace
        | RawCode::FsDirNotEmpty
        | RawCode::FsCannotCreateDir
        | RawCode::FsCannotCreateFile
        | RawCode::Wt
        | RawCode::RecLaunch
        | RawCode::OutOfMemory => ErrorCode::IoFailure,

        RawCode::Cancelled => ErrorCode::UserCancelled,

        // An OK code never reaches classification through the adapter.
        RawCode::Ok | RawCode::Unknown | RawCode::Launch => ErrorCode::Internal,
    }
}

/// Out-of-band failure slot a core operation fills in.
///
/// Created fresh for every call by the adapter and owned by that call alone.
#[derive(Debug)]
pub struct ErrorSlot {
    raw: u32,
    what: String,
}

impl ErrorSlot {
    /// Creates a slot in the OK state.
    pub fn new() -> Self {
        Self {
            raw: RawCode::Ok as u32,
            what: String::new(),
        }
    }

    /// Records a failure. The first recorded failure wins.
    pub fn fail(&mut self, code: RawCode, what: impl Into<String>) {
        self.fail_raw(code as u32, what);
    }

    /// Records a failure by raw value, for codes outside [`RawCode`].
    pub fn fail_raw(&mut self, raw: u32, what: impl Into<String>) {
        if self.is_ok() {
            self.raw = raw;
            self.what = what.into();
        }
    }

    /// Returns `true` while no failure has been recorded.
    pub fn is_ok(&self) -> bool {
        self.raw == RawCode::Ok as u32
    }

    /// Converts a failed slot into a typed error; `None` when the slot is OK.
    pub(crate) fn into_error(self, operation: Operation) -> Option<BridgeError> {
        if self.is_ok() {
            return None;
        }
        let code = classify(self.raw);
        let message = if !self.what.is_empty() {
            self.what
        } else {
            match RawCode::from_raw(self.raw) {
                Some(raw) => raw.describe().to_owned(),
                None => format!("unrecognised core error code {}", self.raw),
            }
        };
        Some(BridgeError::new(code, operation, message))
    }
}

impl Default for ErrorSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed failure of a bridged operation. Owned by the caller that receives it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{operation} failed ({code}): {message}")]
pub struct BridgeError {
    code: ErrorCode,
    operation: Operation,
    message: String,
}

impl BridgeError {
    pub fn new(code: ErrorCode, operation: Operation, message: impl Into<String>) -> Self {
        Self {
            code,
            operation,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Human-readable detail. Not meant for control flow.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the failure should be shown to the user as a dismissible notice.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self.code, ErrorCode::Internal)
    }

    /// Logs the error at a level matching its category.
    pub fn log(&self) {
        match self.code {
            ErrorCode::Internal => log::error!(
                "internal failure in {} ({:?}): {}",
                self.operation,
                self.code,
                self.message
            ),
            ErrorCode::UserCancelled => log::debug!("{self}"),
            _ => log::warn!("{self}"),
        }
    }
}
