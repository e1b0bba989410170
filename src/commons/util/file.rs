use std::{
    fs::{self, File, OpenOptions},
    io::{Read, Write},
    path::Path,
};

use bytes::Bytes;
use log::trace;

use crate::commons::error::IoError;

fn create_parent_dirs(path: &Path) -> Result<(), IoError> {
    if !path.exists() {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            trace!("Creating path: {}", parent.to_string_lossy());
            fs::create_dir_all(parent).map_err(|e| {
                IoError::new(
                    format!("Could not create dir path for: {}", parent.to_string_lossy()),
                    e,
                )
            })?;
        }
    }
    Ok(())
}

pub fn create_file_with_path(path: &Path) -> Result<File, IoError> {
    create_parent_dirs(path)?;
    File::create(path).map_err(|e| IoError::new(format!("Could not create file: {}", path.to_string_lossy()), e))
}

/// Creates or truncates a file only the current user can read, on unix.
pub fn create_private_file_with_path(path: &Path) -> Result<File, IoError> {
    create_parent_dirs(path)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options
        .open(path)
        .map_err(|e| IoError::new(format!("Could not create file: {}", path.to_string_lossy()), e))
}

/// Saves a file, creating parent dirs as needed
pub fn save(content: &[u8], full_path: &Path) -> Result<(), IoError> {
    let mut f = create_file_with_path(full_path)?;
    f.write_all(content)
        .map_err(|e| IoError::new(format!("Could not write to: {}", full_path.to_string_lossy()), e))?;

    trace!("Saved file: {}", full_path.to_string_lossy());
    Ok(())
}

/// Saves a file with owner only permissions, creating parent dirs as needed
pub fn save_private(content: &[u8], full_path: &Path) -> Result<(), IoError> {
    let mut f = create_private_file_with_path(full_path)?;
    f.write_all(content)
        .map_err(|e| IoError::new(format!("Could not write to: {}", full_path.to_string_lossy()), e))?;

    trace!("Saved private file: {}", full_path.to_string_lossy());
    Ok(())
}

/// Reads a file to Bytes
pub fn read(path: &Path) -> Result<Bytes, IoError> {
    let mut f =
        File::open(path).map_err(|e| IoError::new(format!("Could not open: '{}'", path.to_string_lossy()), e))?;
    let mut bytes = Vec::new();
    f.read_to_end(&mut bytes)
        .map_err(|e| IoError::new(format!("Could not read: {}", path.to_string_lossy()), e))?;
    Ok(Bytes::from(bytes))
}

//------------ Tests ---------------------------------------------------------
