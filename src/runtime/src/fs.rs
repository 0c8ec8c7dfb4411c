//! Atomic file replacement.
//!
//! Content is streamed into a staging file in the destination directory and
//! renamed over the destination, so readers never observe a partial file.

use std::io;
use std::path::Path;

use tempfile::NamedTempFile;

/// Mode given to written files; staging files are created owner-only.
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Stream `reader` into `dest`, replacing any existing file atomically.
///
/// The parent directory of `dest` must exist.
pub fn write_atomic(dest: &Path, reader: &mut impl io::Read) -> io::Result<u64> {
    let dir = dest.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", dest.display()),
        )
    })?;

    let mut staging = NamedTempFile::new_in(dir)?;
    let written = io::copy(reader, staging.as_file_mut())?;
    staging.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staging
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(FILE_MODE))?;
    }

    staging.persist(dest).map_err(|e| e.error)?;
    Ok(written)
}
