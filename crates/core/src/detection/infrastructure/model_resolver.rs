use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

const APP_DIR: &str = "SelfieGate";

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("could not determine cache directory")]
    NoCacheDir,
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] io::Error),
    #[error("model {name} not found locally and no download URL was given")]
    NotFound { name: String },
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to store model at {path}: {source}")]
    Transfer {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Progress callback: `(bytes_downloaded, total_bytes)`, with `total_bytes`
/// 0 when the server sends no Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where a detection model may be found.
pub struct ModelSource<'a> {
    pub name: &'a str,
    /// Download location used when no local copy exists.
    pub url: Option<&'a str>,
    /// Directory shipped alongside the host application.
    pub bundled_dir: Option<&'a Path>,
}

/// Finds `source.name` in the bundled directory, then the user cache, and
/// only then downloads it into the cache.
pub fn resolve(
    source: &ModelSource<'_>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, source, progress)
}

fn resolve_in(
    cache_dir: &Path,
    source: &ModelSource<'_>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached = cache_dir.join(source.name);
    let local = source
        .bundled_dir
        .map(|dir| dir.join(source.name))
        .into_iter()
        .chain(std::iter::once(cached.clone()))
        .find(|path| path.is_file());
    if let Some(path) = local {
        log::debug!("Using model at {}", path.display());
        return Ok(path);
    }

    let url = source.url.ok_or_else(|| ModelResolveError::NotFound {
        name: source.name.to_string(),
    })?;
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {} from {url}", source.name);
    download(url, &cached, progress)?;
    Ok(cached)
}

/// Platform model cache: the data dir on macOS, the cache dir elsewhere,
/// under `SelfieGate/models`.
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|dir| dir.join(APP_DIR).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Downloads into `<dest>.part` and renames on success, so `dest` only ever
/// holds a complete file.
fn download(
    url: &str,
    dest: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let partial = dest.with_extension("part");
    let result = fetch(url, &partial, progress).and_then(|()| {
        fs::rename(&partial, dest).map_err(|source| ModelResolveError::Transfer {
            path: dest.to_path_buf(),
            source,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn fetch(url: &str, path: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;
    let total = response.content_length().unwrap_or(0);
    let transfer_err = |source: io::Error| ModelResolveError::Transfer {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ProgressReader::new(response, total, progress);
    let mut file = BufWriter::new(File::create(path).map_err(transfer_err)?);
    io::copy(&mut reader, &mut file).map_err(transfer_err)?;
    file.flush().map_err(transfer_err)
}

/// Reports cumulative bytes read through the wrapped reader.
struct ProgressReader<R> {
    inner: R,
    read: u64,
    total: u64,
    progress: Option<ProgressFn>,
}

impl<R> ProgressReader<R> {
    fn new(inner: R, total: u64, progress: Option<ProgressFn>) -> Self {
        Self {
            inner,
            read: 0,
            total,
            progress,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.read += n as u64;
            if let Some(progress) = &self.progress {
                progress(self.read, self.total);
            }
        }
        Ok(n)
    }
}
