use std::fs;
use std::io::{self, BufWriter, ErrorKind, Read};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error, info};
use zip::ZipWriter;

use crate::codec::{self, TileGrid, MIN_TILE_SIZE};
use crate::error::{CodecError, CoreError, CoreResult};
use crate::session::{FileRecord, Session};

/// Session-scoped file operations.
///
/// Every operation holds the session's own lock for its whole duration, so
/// work on one session is serialized while different sessions proceed in
/// parallel. The file index is only updated after the filesystem step has
/// fully succeeded.
#[derive(Debug, Default, Clone)]
pub struct FileManager;

impl FileManager {
    pub fn new() -> Self {
        Self
    }

    /// Snapshot of the session's files, most recent upload first.
    pub fn get_files(&self, session: &Session) -> CoreResult<Vec<FileRecord>> {
        let state = session.lock();
        if state.terminated {
            return Err(CoreError::SessionNotFound);
        }

        let mut files: Vec<FileRecord> = state.files.values().cloned().collect();
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(files)
    }

    /// Store the full contents of `reader` as `file_name` in the session
    /// directory and index it. Returns the stored path, which is the key for
    /// every other operation.
    pub fn upload_file<R: Read>(
        &self,
        session: &Session,
        mut reader: R,
        file_name: &str,
    ) -> CoreResult<PathBuf> {
        let name = sanitize_file_name(file_name)?;

        let mut state = session.lock();
        if state.terminated {
            return Err(CoreError::SessionNotFound);
        }

        let path = session.dir().join(name);
        // an archive belongs to the entry it was cut from
        if state
            .files
            .values()
            .any(|record| record.archive_path.as_deref() == Some(path.as_path()))
        {
            return Err(CoreError::InvalidFileName(name.to_string()));
        }

        fs::create_dir_all(session.dir())
            .map_err(|e| io_failure("creating session directory", session.dir(), e))?;

        let mut staged = NamedTempFile::new_in(session.dir())
            .map_err(|e| io_failure("staging upload in", session.dir(), e))?;
        let written = io::copy(&mut reader, &mut staged)
            .map_err(|e| io_failure("writing uploaded file", &path, e))?;
        // a later cut re-opens the file from disk
        staged
            .as_file()
            .sync_all()
            .map_err(|e| io_failure("syncing uploaded file", &path, e))?;

        // the new content has not been cut yet
        if let Some(stale) = state.files.get(&path).and_then(|r| r.archive_path.clone()) {
            remove_if_exists(&stale)?;
            debug!("removed stale archive {}", stale.display());
        }

        staged
            .persist(&path)
            .map_err(|e| io_failure("moving upload into place", &path, e.error))?;
        debug!("written {} bytes to {}", written, path.display());

        state.files.insert(path.clone(), FileRecord::new(path.clone()));
        info!("uploaded file {} to session {}", path.display(), session);
        Ok(path)
    }

    /// Cut the uploaded `file_name` into `dx` x `dy` tiles and pack them into
    /// a zip archive next to it. Returns the archive path.
    pub fn cut_file(
        &self,
        session: &Session,
        file_name: impl AsRef<Path>,
        dx: u32,
        dy: u32,
    ) -> CoreResult<PathBuf> {
        if dx < MIN_TILE_SIZE || dy < MIN_TILE_SIZE {
            return Err(CoreError::TileTooSmall {
                dx,
                dy,
                min: MIN_TILE_SIZE,
            });
        }

        let file_name = file_name.as_ref();
        let mut state = session.lock();
        if state.terminated {
            return Err(CoreError::SessionNotFound);
        }

        let original = state
            .files
            .get(file_name)
            .map(|record| record.original_path.clone())
            .ok_or(CoreError::FileNotFound)?;

        let archive_path = original.with_extension("zip");
        // the archive must not clobber an uploaded file
        if archive_path == original || state.files.contains_key(&archive_path) {
            return Err(CoreError::InvalidFileName(original.display().to_string()));
        }

        let (img, format) = codec::open_image(&original)?;
        debug!("cutting {} ({:?}) into {}x{} tiles", original.display(), format, dx, dy);
        let grid = codec::cut_image(&img, dx, dy)?;

        let prefix = archive_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staged = write_archive(session.dir(), &grid, &prefix)?;
        staged
            .persist(&archive_path)
            .map_err(|e| io_failure("moving archive into place", &archive_path, e.error))?;

        if let Some(record) = state.files.get_mut(file_name) {
            record.archive_path = Some(archive_path.clone());
        }
        info!(
            "file {} cut into {} tiles, archive {}",
            original.display(),
            grid.len(),
            archive_path.display()
        );
        Ok(archive_path)
    }

    /// Path of the archive produced for `file_name`.
    ///
    /// "Never cut" and "archive no longer on disk" are both `FileNotFound`.
    pub fn get_archive_name(
        &self,
        session: &Session,
        file_name: impl AsRef<Path>,
    ) -> CoreResult<PathBuf> {
        let state = session.lock();
        if state.terminated {
            return Err(CoreError::SessionNotFound);
        }

        let archive = state
            .files
            .get(file_name.as_ref())
            .and_then(|record| record.archive_path.clone())
            .ok_or(CoreError::FileNotFound)?;

        if !archive.is_file() {
            debug!("archive {} is gone", archive.display());
            return Err(CoreError::FileNotFound);
        }
        Ok(archive)
    }

    /// Remove `file_name` and its archive from disk, then from the index.
    ///
    /// Files already missing are fine. Any other failure keeps the entry so
    /// the delete can be retried.
    pub fn delete_file(&self, session: &Session, file_name: impl AsRef<Path>) -> CoreResult<()> {
        let file_name = file_name.as_ref();
        let mut state = session.lock();
        if state.terminated {
            return Err(CoreError::SessionNotFound);
        }

        let record = state
            .files
            .get(file_name)
            .cloned()
            .ok_or(CoreError::FileNotFound)?;

        remove_if_exists(&record.original_path)?;
        if let Some(archive) = &record.archive_path {
            remove_if_exists(archive)?;
        }

        state.files.remove(file_name);
        info!("deleted file {} from session {}", file_name.display(), session);
        Ok(())
    }
}

/// Keep only the final path component of a client supplied name.
fn sanitize_file_name(file_name: &str) -> CoreResult<&str> {
    Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| CoreError::InvalidFileName(file_name.to_string()))
}

/// Build the archive in an exclusively created temp file inside `dir`.
/// The temp file is deleted on drop unless persisted.
fn write_archive(dir: &Path, grid: &TileGrid, prefix: &str) -> Result<NamedTempFile, CodecError> {
    let staged = NamedTempFile::new_in(dir)?;
    let mut zip_writer = ZipWriter::new(BufWriter::new(staged));
    codec::pack_images(&mut zip_writer, grid, prefix)?;

    let staged = zip_writer
        .finish()?
        .into_inner()
        .map_err(|e| e.into_error())?;
    staged.as_file().sync_all()?;
    Ok(staged)
}

fn remove_if_exists(path: &Path) -> CoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_failure("removing file", path, e)),
    }
}

fn io_failure(action: &str, path: &Path, err: io::Error) -> CoreError {
    error!("error {} {}: {}", action, path.display(), err);
    CoreError::Filesystem
}
