//! Scoped staging of uploads on the local filesystem.

use std::io::Write;
use std::path::{Path, PathBuf};

use mediascribe_types::UploadedFile;
use tempfile::NamedTempFile;

/// Creates uniquely named staging files, optionally inside a fixed directory.
#[derive(Debug, Clone, Default)]
pub struct Stager {
    dir: Option<PathBuf>,
}

impl Stager {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Write the upload to a fresh staging file.
    ///
    /// With `keep_extension`, the staged name ends with the original file's
    /// extension.
    pub async fn stage(
        &self,
        upload: &UploadedFile,
        keep_extension: bool,
    ) -> std::io::Result<StagedFile> {
        let suffix = if keep_extension {
            upload.extension_suffix()
        } else {
            String::new()
        };
        let dir = self.dir.clone();
        let data = upload.data.clone();

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            let mut builder = tempfile::Builder::new();
            builder.prefix("mediascribe-").suffix(&suffix);
            let mut file = match dir {
                Some(dir) => builder.tempfile_in(dir)?,
                None => builder.tempfile()?,
            };
            file.write_all(&data)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(std::io::Error::other)??;

        tracing::debug!(path = %file.path().display(), bytes = upload.data.len(), "Upload staged");
        Ok(StagedFile { file })
    }
}

/// A staged upload. Dropping it deletes the file.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the staged contents back into memory.
    pub async fn read_all(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.path()).await
    }

    /// Content type inferred from the staged file's extension.
    pub fn guess_mime(&self) -> Option<String> {
        mime_guess::from_path(self.path())
            .first()
            .map(|m| m.essence_str().to_string())
    }

    /// Delete the file now, reporting failures instead of ignoring them.
    pub fn close(self) -> std::io::Result<()> {
        self.file.close()
    }
}
