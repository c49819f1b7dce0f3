//! Size and header checks the simulated core applies to media.

use std::io;
use std::path::Path;

use core_abi::{FileKind, Geometry, RawCode};

pub const ADF_DD_BYTES: usize = 880 * 1024;
pub const ADF_HD_BYTES: usize = 2 * ADF_DD_BYTES;
pub const IMG_DD_BYTES: usize = 720 * 1024;
pub const IMG_HD_BYTES: usize = 1440 * 1024;
pub const ROM_SIZES: [usize; 2] = [256 * 1024, 512 * 1024];
pub const EXT_ROM_BYTES: usize = 512 * 1024;
/// Largest hard drive image the controller can address.
pub const MAX_HDF_BYTES: u64 = 504 * 1024 * 1024;
pub const EADF_MAGIC: &[u8] = b"UAE-1ADF";
pub const SNAPSHOT_MAGIC: &[u8] = b"VASNAP";
pub const SNAPSHOT_VERSION: u8 = 1;

/// Failure as the core reports it: a raw code plus a human-readable detail.
pub type Reject = (RawCode, String);

fn reject<T>(code: RawCode, what: impl Into<String>) -> Result<T, Reject> {
    Err((code, what.into()))
}

/// Checks `bytes` against the container format `kind` claims.
pub fn check_media(kind: FileKind, bytes: &[u8]) -> Result<(), Reject> {
    match kind {
        FileKind::Adf => check_adf(bytes),
        FileKind::Eadf if bytes.starts_with(EADF_MAGIC) => Ok(()),
        FileKind::Eadf => reject(RawCode::FileTypeMismatch, "missing extended ADF header"),
        FileKind::Img => match bytes.len() {
            IMG_DD_BYTES | IMG_HD_BYTES => Ok(()),
            len => reject(RawCode::DiskInvalidLayout, format!("{len} bytes is no PC disk size")),
        },
        FileKind::Hdf => check_hdf(bytes.len() as u64),
        FileKind::Rom => check_rom(bytes),
        FileKind::ExtRom if bytes.len() == EXT_ROM_BYTES => Ok(()),
        FileKind::ExtRom => reject(RawCode::ExtIncompatible, "extension ROMs are 512 KB"),
        FileKind::Snapshot => check_snapshot(bytes),
    }
}

pub fn check_adf(bytes: &[u8]) -> Result<(), Reject> {
    match bytes.len() {
        ADF_DD_BYTES | ADF_HD_BYTES => Ok(()),
        len => reject(
            RawCode::DiskInvalidLayout,
            format!("{len} bytes is neither a DD nor an HD disk"),
        ),
    }
}

pub fn check_rom(bytes: &[u8]) -> Result<(), Reject> {
    if ROM_SIZES.contains(&bytes.len()) {
        Ok(())
    } else {
        reject(
            RawCode::FileTypeUnsupported,
            format!("{} bytes is not a Kickstart ROM size", bytes.len()),
        )
    }
}

pub fn check_snapshot(bytes: &[u8]) -> Result<(), Reject> {
    let Some(rest) = bytes.strip_prefix(SNAPSHOT_MAGIC) else {
        return reject(RawCode::FileTypeMismatch, "not a snapshot");
    };
    match rest.first().copied() {
        None => reject(RawCode::SnapCorrupted, "snapshot is truncated"),
        Some(v) if v < SNAPSHOT_VERSION => reject(RawCode::SnapTooOld, format!("version {v}")),
        Some(v) if v > SNAPSHOT_VERSION => reject(RawCode::SnapTooNew, format!("version {v}")),
        Some(_) => Ok(()),
    }
}

pub fn check_hdf(len: u64) -> Result<(), Reject> {
    if len > MAX_HDF_BYTES {
        return reject(RawCode::HdrTooLarge, format!("{len} bytes exceeds 504 MB"));
    }
    if len == 0 || len % 512 != 0 {
        return reject(
            RawCode::HdrUnknownGeometry,
            format!("{len} bytes is not a whole number of blocks"),
        );
    }
    Ok(())
}

/// Validates a geometry on its own, without an image to match.
pub fn check_geometry(geometry: &Geometry) -> Result<(), Reject> {
    if geometry.bsize != 512 {
        return reject(
            RawCode::HdrUnsupportedBsize,
            format!("block size {}", geometry.bsize),
        );
    }
    if !(1..=16_384).contains(&geometry.cylinders) {
        return reject(
            RawCode::HdrUnsupportedCylCount,
            format!("{} cylinders", geometry.cylinders),
        );
    }
    if !(1..=16).contains(&geometry.heads) {
        return reject(
            RawCode::HdrUnsupportedHeadCount,
            format!("{} heads", geometry.heads),
        );
    }
    if !(1..=63).contains(&geometry.sectors) {
        return reject(
            RawCode::HdrUnsupportedSecCount,
            format!("{} sectors", geometry.sectors),
        );
    }
    check_hdf(geometry.num_bytes())
}

/// Derives a plausible geometry for an image of `len` bytes.
pub fn guess_geometry(len: u64) -> Result<Geometry, Reject> {
    check_hdf(len)?;
    let blocks = len / 512;
    for heads in [1u32, 2, 4, 8, 16] {
        for sectors in [32u32, 63, 16, 1] {
            let per_cylinder = u64::from(heads) * u64::from(sectors);
            if blocks % per_cylinder == 0 {
                let cylinders = blocks / per_cylinder;
                if (1..=16_384).contains(&cylinders) {
                    return Ok(Geometry::new(cylinders as u32, heads, sectors));
                }
            }
        }
    }
    reject(
        RawCode::HdrUnknownGeometry,
        format!("no geometry fits {len} bytes"),
    )
}

/// Maps a host I/O failure on a file to the core's vocabulary.
pub fn io_reject(err: &io::Error, path: &Path, writing: bool) -> Reject {
    let code = match err.kind() {
        io::ErrorKind::NotFound if writing => RawCode::DirNotFound,
        io::ErrorKind::NotFound => RawCode::FileNotFound,
        io::ErrorKind::PermissionDenied => RawCode::FileAccessDenied,
        io::ErrorKind::AlreadyExists => RawCode::FileExists,
        _ if path.is_dir() => RawCode::FileIsDirectory,
        _ if writing => RawCode::FileCantWrite,
        _ => RawCode::FileCantRead,
    };
    (code, format!("{}: {err}", path.display()))
}
