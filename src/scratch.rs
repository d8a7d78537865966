//! Scratch artifacts: save, read back, always delete
//!
//! The renderer saves into a uniquely-named file under the scratch
//! directory; the pipeline reads the bytes back and the file is gone by the
//! time the response is written. Cleanup is owned by [`ScratchFile`], a
//! guard whose `Drop` removes the file on every exit path rather than in
//! hand-written cleanup branches.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::{self, JoinHandle};
use uuid::Uuid;

use crate::{Error, RenderJob, RenderResult, Renderer, Result};

/// A uniquely-named scratch path that deletes its file when dropped.
///
/// Allocation only reserves the name (16 bytes of random entropy as 32 hex
/// characters, plus the artifact extension); the renderer creates the file.
/// Dropping the guard removes whatever ended up at the path, and a path
/// that never got written is not an error.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Reserve a fresh random path under `dir`, creating `dir` if needed.
    pub fn allocate(dir: &Path, extension: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let name = format!("{}.{}", Uuid::new_v4().simple(), extension);
        Self::claim(dir.join(name))
    }

    // An occupied path is never handed to the renderer; this request does
    // not own that file.
    pub(crate) fn claim(path: PathBuf) -> Result<Self> {
        if path.exists() {
            return Err(Error::ArtifactExists(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "failed to remove scratch file {}: {}",
                    self.path.display(),
                    err
                );
            }
        }
    }
}

/// Run one render job through the save/read/delete protocol.
///
/// The synchronous renderer runs on a blocking worker and races the job's
/// timeout. On timeout the request fails immediately; the worker cannot be
/// interrupted mid-call, so the scratch guard is handed to a reaper task
/// that deletes the file once the worker actually finishes. Either way, no
/// invocation leaves a file behind.
pub async fn produce(
    renderer: Arc<dyn Renderer>,
    job: RenderJob,
    scratch_dir: &Path,
) -> Result<RenderResult> {
    let scratch = ScratchFile::allocate(scratch_dir, job.output_kind.extension())?;
    let timeout = job.options.timeout;
    let mime_type = job.output_kind.mime_type();
    let dest = scratch.path().to_path_buf();

    let mut worker: JoinHandle<Result<()>> =
        task::spawn_blocking(move || renderer.render_to_file(&job, &dest));

    let joined = tokio::select! {
        joined = &mut worker => joined,
        _ = tokio::time::sleep(timeout) => {
            log::warn!("render exceeded {}s, abandoning worker", timeout.as_secs());
            tokio::spawn(async move {
                let _ = worker.await;
                drop(scratch);
            });
            return Err(Error::Timeout(timeout.as_secs()));
        }
    };

    match joined {
        Ok(outcome) => outcome?,
        Err(join_err) => {
            return Err(Error::Render(format!("render worker panicked: {join_err}")))
        }
    }

    let bytes = match tokio::fs::read(scratch.path()).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ArtifactNotProduced(scratch.path().to_path_buf()))
        }
        Err(err) => return Err(err.into()),
    };

    let size = bytes.len() as u64;
    Ok(RenderResult {
        bytes,
        mime_type,
        size,
    })
}
