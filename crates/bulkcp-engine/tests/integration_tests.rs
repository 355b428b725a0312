//! Integration tests for the bulkcp engine
//!
//! These drive whole copy processes through the public facade against the
//! local filesystem endpoint and the in-memory endpoint.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use bulkcp_endpoint::{EndpointResolver, MemoryEndpoint};
use bulkcp_engine::{
    CopyProcess, EngineConfig, NullProgressHandler, ProgressEvent, RecordingHandler,
};
use bulkcp_types::{status::code, PropertyBag};

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Deterministic pseudo-random content so runs are reproducible
fn random_bytes(size: usize) -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut content = Vec::with_capacity(size);
    let mut hasher = DefaultHasher::new();
    for i in 0..size {
        i.hash(&mut hasher);
        content.push((hasher.finish() % 256) as u8);
    }
    content
}

fn local_job(source: &Path, target: &Path) -> PropertyBag {
    let mut job = PropertyBag::new();
    job.set("source", file_url(source));
    job.set("target", file_url(target));
    job
}

#[tokio::test]
async fn test_basic_file_copy() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("source.bin");
    let target = temp_dir.path().join("target.bin");
    fs::write(&source, b"ten bytes!")?;

    let mut process = CopyProcess::new(EngineConfig::default());
    let mut job = local_job(&source, &target);
    job.set("chunksize", 4i64);
    job.set("parallelchunks", 4i64);
    process.add_job(&job)?;
    process.prepare()?;

    let status = process.run(Arc::new(NullProgressHandler)).await?;
    assert!(status.is_ok());
    assert_eq!(fs::read(&target)?, b"ten bytes!");

    let result = &process.results()[0];
    assert_eq!(result.get_int("size"), Some(10));
    assert_eq!(result.get_int("retries"), Some(0));
    assert_eq!(result.get_str("realTarget"), Some(file_url(&target)));
    Ok(())
}

#[tokio::test]
async fn test_large_copy_with_end_to_end_checksum() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("big.bin");
    let target = temp_dir.path().join("big.out");
    let content = random_bytes(256 * 1024);
    fs::write(&source, &content)?;

    let mut process = CopyProcess::new(EngineConfig::default());
    let mut job = local_job(&source, &target);
    job.set("chunksize", 4096i64);
    job.set("parallelchunks", 8i64);
    job.set("checksummode", "end2end");
    job.set("checksumtype", "sha256");
    process.add_job(&job)?;
    process.prepare()?;

    let status = process.run(Arc::new(NullProgressHandler)).await?;
    assert!(status.is_ok());
    assert_eq!(fs::read(&target)?, content);

    let result = &process.results()[0];
    assert!(result.get_str("sourceCheckSum").is_some());
    assert_eq!(
        result.get_str("sourceCheckSum"),
        result.get_str("targetCheckSum")
    );
    Ok(())
}

#[tokio::test]
async fn test_copy_size_not_divisible_by_chunk() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("odd.bin");
    let target = temp_dir.path().join("odd.out");
    // 10007 is not a multiple of any reasonable chunk size.
    let content = random_bytes(10_007);
    fs::write(&source, &content)?;

    let mut process = CopyProcess::new(EngineConfig::default());
    let mut job = local_job(&source, &target);
    job.set("chunksize", 512i64);
    job.set("parallelchunks", 3i64);
    process.add_job(&job)?;
    process.prepare()?;

    let status = process.run(Arc::new(NullProgressHandler)).await?;
    assert!(status.is_ok());
    assert_eq!(fs::read(&target)?, content);
    assert_eq!(process.results()[0].get_int("size"), Some(10_007));
    Ok(())
}

#[tokio::test]
async fn test_batch_results_keep_submission_order() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let mut config = EngineConfig::default();
    config.parallel = 4;
    let mut process = CopyProcess::new(config);

    // Jobs of very different sizes finish in scrambled order; the middle
    // job has no source and must fail in place.
    let sizes = [512 * 1024, 0, 1024, 64 * 1024];
    for (i, size) in sizes.iter().enumerate() {
        let source = temp_dir.path().join(format!("in{i}"));
        let target = temp_dir.path().join(format!("out{i}"));
        if i != 1 {
            fs::write(&source, random_bytes(*size))?;
        }
        let mut job = local_job(&source, &target);
        job.set("chunksize", 4096i64);
        process.add_job(&job)?;
    }
    process.prepare()?;

    let status = process.run(Arc::new(NullProgressHandler)).await?;
    // The aggregate is the first failure in submission order.
    assert!(!status.is_ok());
    assert_eq!(status.code, code::ENDPOINT);

    let results = process.results();
    assert_eq!(results.len(), 4);
    for (i, result) in results.iter().enumerate() {
        let sources = result.get_list("sources");
        if i == 1 {
            assert!(!result.get_status("status").unwrap().is_ok());
        } else {
            assert!(result.get_status("status").unwrap().is_ok());
            let expected = file_url(&temp_dir.path().join(format!("in{i}")));
            assert_eq!(sources.unwrap(), &[expected]);
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_striped_copy_reassembles() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("striped.bin");
    let target = temp_dir.path().join("striped.out");
    let content = random_bytes(100_000);
    fs::write(&source, &content)?;

    let mut config = EngineConfig::default();
    config.parallel = 3;
    let mut process = CopyProcess::new(config);
    let mut job = local_job(&source, &target);
    job.set("sourcelimit", 3i64);
    job.set("blocksize", 4096i64);
    job.set("chunksize", 8192i64);
    process.add_job(&job)?;
    process.prepare()?;

    let status = process.run(Arc::new(NullProgressHandler)).await?;
    assert!(status.is_ok());
    assert_eq!(fs::read(&target)?, content);

    // Striping produced one result per segment, summing to the full size.
    let results = process.results();
    assert_eq!(results.len(), 3);
    let total: i64 = results.iter().filter_map(|r| r.get_int("size")).sum();
    assert_eq!(total, 100_000);
    Ok(())
}

#[tokio::test]
async fn test_progress_callbacks_are_ordered_and_monotone() -> Result<(), Box<dyn std::error::Error>>
{
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("watched.bin");
    let target = temp_dir.path().join("watched.out");
    fs::write(&source, random_bytes(64 * 1024))?;

    let mut process = CopyProcess::new(EngineConfig::default());
    let mut job = local_job(&source, &target);
    job.set("chunksize", 4096i64);
    job.set("parallelchunks", 4i64);
    process.add_job(&job)?;
    process.prepare()?;

    let handler = Arc::new(RecordingHandler::new());
    let status = process.run(handler.clone()).await?;
    assert!(status.is_ok());

    let events = handler.events();
    assert!(matches!(events.first(), Some(ProgressEvent::Begin { .. })));
    assert!(matches!(events.last(), Some(ProgressEvent::End { ok: true, .. })));

    // Processed byte counts never go backwards and end at the full size.
    let mut last = 0u64;
    for event in &events {
        if let ProgressEvent::Progress(snapshot) = event {
            assert!(snapshot.bytes_processed >= last);
            assert_eq!(snapshot.bytes_total, 64 * 1024);
            last = snapshot.bytes_processed;
        }
    }
    assert_eq!(last, 64 * 1024);
    Ok(())
}

#[tokio::test]
async fn test_retries_recover_through_the_facade() -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = MemoryEndpoint::new();
    endpoint.insert("flaky", b"eventually fine".to_vec());
    endpoint.fail_times(2, true);
    let mut resolver = EndpointResolver::empty();
    resolver.register(Arc::new(endpoint.clone()));

    let mut process = CopyProcess::with_resolver(EngineConfig::default(), Arc::new(resolver));
    let mut job = PropertyBag::new();
    job.set("source", "mem://flaky");
    job.set("target", "mem://flaky.out");
    job.set("retry", 2i64);
    process.add_job(&job)?;
    process.prepare()?;

    let status = process.run(Arc::new(NullProgressHandler)).await?;
    assert!(status.is_ok());
    assert_eq!(process.results()[0].get_int("retries"), Some(2));
    assert_eq!(endpoint.contents("flaky.out").unwrap(), b"eventually fine");
    Ok(())
}

#[tokio::test]
async fn test_toml_config_drives_job_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("cfg.bin");
    let target = temp_dir.path().join("cfg.out");
    fs::write(&source, b"configured")?;

    let config = EngineConfig::from_toml_str(
        r#"
        parallel = 2
        chunk_size = 4
        parallel_chunks = 2
        retry_count = 1
        "#,
    )?;
    assert_eq!(config.chunk_size, 4);

    let mut process = CopyProcess::new(config);
    process.add_job(&local_job(&source, &target))?;
    process.prepare()?;

    let status = process.run(Arc::new(NullProgressHandler)).await?;
    assert!(status.is_ok());
    assert_eq!(fs::read(&target)?, b"configured");
    Ok(())
}

#[tokio::test]
async fn test_existing_target_needs_force() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("src.bin");
    let target = temp_dir.path().join("dst.bin");
    fs::write(&source, b"fresh")?;
    fs::write(&target, b"precious")?;

    let mut process = CopyProcess::new(EngineConfig::default());
    process.add_job(&local_job(&source, &target))?;
    process.prepare()?;
    let status = process.run(Arc::new(NullProgressHandler)).await?;
    assert!(!status.is_ok());
    assert_eq!(fs::read(&target)?, b"precious");

    let mut process = CopyProcess::new(EngineConfig::default());
    let mut job = local_job(&source, &target);
    job.set("force", true);
    process.add_job(&job)?;
    process.prepare()?;
    let status = process.run(Arc::new(NullProgressHandler)).await?;
    assert!(status.is_ok());
    assert_eq!(fs::read(&target)?, b"fresh");
    Ok(())
}

#[tokio::test]
async fn test_mkdir_creates_target_directories() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("deep.bin");
    let target = temp_dir.path().join("a/b/c/deep.out");
    fs::write(&source, b"nested")?;

    let mut process = CopyProcess::new(EngineConfig::default());
    let mut job = local_job(&source, &target);
    job.set("mkdir", true);
    process.add_job(&job)?;
    process.prepare()?;

    let status = process.run(Arc::new(NullProgressHandler)).await?;
    assert!(status.is_ok());
    assert_eq!(fs::read(&target)?, b"nested");
    Ok(())
}

#[tokio::test]
async fn test_dynamic_source_copy() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("dyn.bin");
    let target = temp_dir.path().join("dyn.out");
    let content = random_bytes(10_000);
    fs::write(&source, &content)?;

    let mut process = CopyProcess::new(EngineConfig::default());
    let mut job = local_job(&source, &target);
    job.set("dynamicsource", true);
    job.set("chunksize", 1024i64);
    process.add_job(&job)?;
    process.prepare()?;

    let status = process.run(Arc::new(NullProgressHandler)).await?;
    assert!(status.is_ok());
    assert_eq!(fs::read(&target)?, content);
    Ok(())
}
