//! Local filesystem endpoint for `file://` URLs
//!
//! Positioned I/O over a shared file descriptor runs on the blocking thread
//! pool, so overlapping chunk reads from the pipeline never block the
//! runtime.

use crate::checksum::{ChecksumKind, Digest};
use crate::endpoint::{Endpoint, ObjectHandle, OpenOptions, StatInfo};
use crate::url::EndpointUrl;
use async_trait::async_trait;
use bulkcp_types::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Storage endpoint backed by the local filesystem
#[derive(Debug, Default)]
pub struct LocalEndpoint;

impl LocalEndpoint {
    /// Create a new local endpoint
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Endpoint for LocalEndpoint {
    fn scheme(&self) -> &str {
        "file"
    }

    async fn stat(&self, url: &EndpointUrl) -> Result<StatInfo> {
        let meta = tokio::fs::metadata(url.path()).await?;
        Ok(StatInfo {
            size: meta.len(),
            is_dir: meta.is_dir(),
        })
    }

    async fn open(&self, url: &EndpointUrl, options: OpenOptions) -> Result<Box<dyn ObjectHandle>> {
        let path = PathBuf::from(url.path());
        let url = url.clone();
        debug!(url = %url, ?options, "opening local file");

        let file = run_blocking(move || {
            if options.write && options.make_dirs {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let mut open = std::fs::OpenOptions::new();
            if options.read {
                open.read(true);
            }
            if options.write {
                open.write(true);
                if options.overwrite {
                    open.create(options.create).truncate(options.truncate);
                } else if options.create {
                    // Refuse to silently replace an existing target.
                    open.create_new(true);
                }
            }
            open.open(&path)
        })
        .await?;

        Ok(Box::new(LocalHandle {
            file: Arc::new(file),
            url,
            sync_on_close: options.posc,
        }))
    }

    async fn remove(&self, url: &EndpointUrl) -> Result<()> {
        debug!(url = %url, "removing local file");
        tokio::fs::remove_file(url.path()).await?;
        Ok(())
    }

    async fn checksum(&self, url: &EndpointUrl, kind: ChecksumKind) -> Result<String> {
        let path = PathBuf::from(url.path());
        run_blocking(move || {
            let mut file = File::open(path)?;
            let mut digest = Digest::new(kind);
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                digest.update(&buf[..n]);
            }
            Ok::<_, std::io::Error>(digest.finalize_hex())
        })
        .await
    }
}

/// Open handle on a local file
struct LocalHandle {
    file: Arc<File>,
    url: EndpointUrl,
    sync_on_close: bool,
}

#[async_trait]
impl ObjectHandle for LocalHandle {
    async fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let file = Arc::clone(&self.file);
        run_blocking(move || {
            let mut buf = vec![0u8; len];
            let mut filled = 0;
            while filled < len {
                let n = positioned::read_at(&file, &mut buf[filled..], offset + filled as u64)?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            buf.truncate(filled);
            Ok::<_, std::io::Error>(buf)
        })
        .await
    }

    async fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        let file = Arc::clone(&self.file);
        let data = data.to_vec();
        run_blocking(move || positioned::write_all_at(&file, &data, offset)).await
    }

    async fn truncate(&self, size: u64) -> Result<()> {
        let file = Arc::clone(&self.file);
        run_blocking(move || file.set_len(size)).await
    }

    async fn close(&mut self) -> Result<()> {
        if self.sync_on_close {
            let file = Arc::clone(&self.file);
            run_blocking(move || file.sync_all()).await?;
        }
        Ok(())
    }

    fn resolved_url(&self) -> &EndpointUrl {
        &self.url
    }
}

async fn run_blocking<T, E>(f: impl FnOnce() -> std::result::Result<T, E> + Send + 'static) -> Result<T>
where
    T: Send + 'static,
    E: Into<Error> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::other(format!("blocking I/O task failed: {e}")))?
        .map_err(Into::into)
}

/// Platform positioned I/O primitives
mod positioned {
    use std::fs::File;

    #[cfg(unix)]
    pub fn read_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        use std::os::unix::fs::FileExt;
        file.read_at(buf, offset)
    }

    #[cfg(unix)]
    pub fn write_all_at(file: &File, data: &[u8], offset: u64) -> std::io::Result<()> {
        use std::os::unix::fs::FileExt;
        file.write_all_at(data, offset)
    }

    #[cfg(windows)]
    pub fn read_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        use std::os::windows::fs::FileExt;
        file.seek_read(buf, offset)
    }

    #[cfg(windows)]
    pub fn write_all_at(file: &File, mut data: &[u8], mut offset: u64) -> std::io::Result<()> {
        use std::os::windows::fs::FileExt;
        while !data.is_empty() {
            let n = file.seek_write(data, offset)?;
            data = &data[n..];
            offset += n as u64;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::digest_bytes;
    use tempfile::TempDir;

    fn file_url(dir: &TempDir, name: &str) -> EndpointUrl {
        EndpointUrl::parse(&format!("file://{}", dir.path().join(name).display()))
    }

    #[tokio::test]
    async fn test_stat_and_read() {
        let dir = TempDir::new().unwrap();
        let url = file_url(&dir, "a.bin");
        tokio::fs::write(url.path(), b"0123456789").await.unwrap();

        let ep = LocalEndpoint::new();
        let info = ep.stat(&url).await.unwrap();
        assert_eq!(info.size, 10);
        assert!(!info.is_dir);

        let handle = ep.open(&url, OpenOptions::reading()).await.unwrap();
        assert_eq!(handle.read_at(3, 4).await.unwrap(), b"3456");
        // Reads past the end come back short.
        assert_eq!(handle.read_at(8, 16).await.unwrap(), b"89");
        assert!(handle.read_at(20, 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_positioned() {
        let dir = TempDir::new().unwrap();
        let url = file_url(&dir, "out.bin");

        let ep = LocalEndpoint::new();
        let mut handle = ep.open(&url, OpenOptions::writing()).await.unwrap();
        handle.write_at(4, b"5678").await.unwrap();
        handle.write_at(0, b"1234").await.unwrap();
        handle.close().await.unwrap();

        assert_eq!(tokio::fs::read(url.path()).await.unwrap(), b"12345678");
    }

    #[tokio::test]
    async fn test_refuses_overwrite_without_flag() {
        let dir = TempDir::new().unwrap();
        let url = file_url(&dir, "exists.bin");
        tokio::fs::write(url.path(), b"old").await.unwrap();

        let ep = LocalEndpoint::new();
        assert!(ep.open(&url, OpenOptions::writing()).await.is_err());

        let mut handle = ep
            .open(&url, OpenOptions::writing().overwrite(true))
            .await
            .unwrap();
        handle.write_at(0, b"new").await.unwrap();
        handle.close().await.unwrap();
        assert_eq!(tokio::fs::read(url.path()).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_make_dirs_creates_parents() {
        let dir = TempDir::new().unwrap();
        let url = file_url(&dir, "deep/nested/out.bin");

        let ep = LocalEndpoint::new();
        assert!(ep.open(&url, OpenOptions::writing()).await.is_err());

        let mut handle = ep
            .open(&url, OpenOptions::writing().make_dirs(true))
            .await
            .unwrap();
        handle.write_at(0, b"x").await.unwrap();
        handle.close().await.unwrap();
        assert!(tokio::fs::try_exists(url.path()).await.unwrap());
    }

    #[tokio::test]
    async fn test_checksum_matches_content() {
        let dir = TempDir::new().unwrap();
        let url = file_url(&dir, "sum.bin");
        let data = vec![7u8; 100_000];
        tokio::fs::write(url.path(), &data).await.unwrap();

        let ep = LocalEndpoint::new();
        let sum = ep.checksum(&url, ChecksumKind::Blake3).await.unwrap();
        assert_eq!(sum, digest_bytes(ChecksumKind::Blake3, &data));
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = TempDir::new().unwrap();
        let url = file_url(&dir, "gone.bin");
        tokio::fs::write(url.path(), b"x").await.unwrap();

        let ep = LocalEndpoint::new();
        ep.remove(&url).await.unwrap();
        assert!(!tokio::fs::try_exists(url.path()).await.unwrap());
        assert!(ep.remove(&url).await.is_err());
    }
}
