//! Integration tests for `ul` and `dl` payload phases

mod integration;

use anyhow::Result;
use dirshare::{ClientState, Notice};
use dirshare_proto::Framing;
use integration::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_upload_then_download_is_byte_identical() -> Result<()> {
    let server = TestServer::start().await?;
    let outbox = TempDir::new()?;
    let inbox = TempDir::new()?;
    let original = binary_pattern(4096);
    write_file(outbox.path(), "blob.bin", &original)?;

    let mut uploader = server.client(outbox.path()).await?;
    let report = uploader.execute("ul blob.bin").await?;
    assert_eq!(
        report.notice,
        Some(Notice::Uploaded {
            name: "blob.bin".to_string(),
            size: original.len()
        })
    );
    assert_eq!(entries(report.listing.as_deref().unwrap()), vec!["blob.bin"]);
    assert_eq!(std::fs::read(server.root().join("blob.bin"))?, original);

    let mut downloader = server.client(inbox.path()).await?;
    let report = downloader.execute("dl blob.bin").await?;
    assert!(matches!(report.notice, Some(Notice::Downloaded { .. })));
    assert_eq!(std::fs::read(inbox.path().join("blob.bin"))?, original);
    Ok(())
}

#[tokio::test]
async fn test_large_transfer_spans_many_reads() -> Result<()> {
    let server = TestServer::start().await?;
    let local = TempDir::new()?;
    // several hundred reads at the default 1024-byte buffer
    let original = binary_pattern(300 * 1024 + 7);
    write_file(local.path(), "big.dat", &original)?;

    let mut client = server.client(local.path()).await?;
    client.execute("ul big.dat").await?;
    std::fs::remove_file(local.path().join("big.dat"))?;

    let report = client.execute("dl big.dat").await?;
    assert!(report.listing.is_some());
    assert_eq!(std::fs::read(local.path().join("big.dat"))?, original);
    Ok(())
}

#[tokio::test]
async fn test_download_missing_file_keeps_session_ready() -> Result<()> {
    let server = TestServer::start().await?;
    let local = TempDir::new()?;
    let mut client = server.client(local.path()).await?;
    let initial = client.listing().to_string();

    let report = client.execute("dl missing.txt").await?;
    assert_eq!(
        report.notice,
        Some(Notice::RemoteFileNotFound("missing.txt".to_string()))
    );
    assert_eq!(report.listing.as_deref(), Some(initial.as_str()));
    assert_eq!(client.state(), ClientState::Ready);
    assert!(!local.path().join("missing.txt").exists());

    // the channel is still in step
    let report = client.execute("mkdir after").await?;
    assert_eq!(entries(report.listing.as_deref().unwrap()), vec!["after"]);
    Ok(())
}

#[tokio::test]
async fn test_download_directory_reports_not_found() -> Result<()> {
    let server = TestServer::start().await?;
    std::fs::create_dir(server.root().join("folder"))?;
    let local = TempDir::new()?;
    let mut client = server.client(local.path()).await?;

    let report = client.execute("dl folder").await?;
    assert_eq!(report.notice, Some(Notice::RemoteFileNotFound("folder".to_string())));
    assert_eq!(client.state(), ClientState::Ready);
    Ok(())
}

#[tokio::test]
async fn test_upload_missing_local_file_sends_nothing() -> Result<()> {
    let server = TestServer::start().await?;
    let local = TempDir::new()?;
    let mut client = server.client(local.path()).await?;

    let report = client.execute("ul not-here.txt").await?;
    assert_eq!(
        report.notice,
        Some(Notice::LocalFileNotFound(local.path().join("not-here.txt")))
    );
    assert_eq!(report.listing, None);

    // had a command gone out, the server would be waiting for a payload
    let report = client.execute("mkdir still-in-step").await?;
    assert_eq!(entries(report.listing.as_deref().unwrap()), vec!["still-in-step"]);
    assert!(!server.root().join("not-here.txt").exists());
    Ok(())
}

#[tokio::test]
async fn test_upload_overwrites_existing_file() -> Result<()> {
    let server = TestServer::start().await?;
    write_file(server.root(), "notes.txt", b"old contents that are longer")?;
    let local = TempDir::new()?;
    write_file(local.path(), "notes.txt", b"new")?;

    let mut client = server.client(local.path()).await?;
    client.execute("ul notes.txt").await?;
    assert_eq!(std::fs::read(server.root().join("notes.txt"))?, b"new");
    Ok(())
}

#[tokio::test]
async fn test_upload_into_current_directory() -> Result<()> {
    let server = TestServer::start().await?;
    let local = TempDir::new()?;
    write_file(local.path(), "photo.raw", &binary_pattern(512))?;

    let mut client = server.client(local.path()).await?;
    client.execute("mkdir album").await?;
    client.execute("cd album").await?;
    let report = client.execute("ul photo.raw").await?;

    assert_eq!(entries(report.listing.as_deref().unwrap()), vec!["photo.raw"]);
    assert!(server.root().join("album/photo.raw").is_file());
    Ok(())
}

#[tokio::test]
async fn test_delimited_upload_refuses_token_bytes() -> Result<()> {
    let server = TestServer::start().await?;
    let local = TempDir::new()?;
    let mut client = server.client(local.path()).await?;

    let mut contents = b"header ".to_vec();
    contents.extend_from_slice(client.token().as_bytes());
    contents.extend_from_slice(b" trailer");
    write_file(local.path(), "tricky.bin", &contents)?;

    let report = client.execute("ul tricky.bin").await?;
    assert_eq!(
        report.notice,
        Some(Notice::PayloadContainsToken(local.path().join("tricky.bin")))
    );
    assert_eq!(client.state(), ClientState::Ready);
    assert!(!server.root().join("tricky.bin").exists());
    Ok(())
}

#[tokio::test]
async fn test_delimited_download_of_token_bytes_is_refused() -> Result<()> {
    let server = TestServer::start().await?;
    let local = TempDir::new()?;
    let mut client = server.client(local.path()).await?;

    // placed on the server after the token is known
    let mut contents = b"prefix".to_vec();
    contents.extend_from_slice(client.token().as_bytes());
    write_file(server.root(), "tricky.bin", &contents)?;

    let report = client.execute("dl tricky.bin").await?;
    assert_eq!(report.notice, Some(Notice::RemoteFileNotFound("tricky.bin".to_string())));
    assert_eq!(client.state(), ClientState::Ready);
    Ok(())
}

#[tokio::test]
async fn test_length_prefixed_carries_token_bytes() -> Result<()> {
    let server = TestServer::start_with(Framing::LengthPrefixed).await?;
    let outbox = TempDir::new()?;
    let inbox = TempDir::new()?;

    let mut uploader = server.client(outbox.path()).await?;
    let mut contents = binary_pattern(2048);
    contents.extend_from_slice(uploader.token().as_bytes());
    contents.extend_from_slice(&binary_pattern(100));
    write_file(outbox.path(), "tokens.bin", &contents)?;

    let report = uploader.execute("ul tokens.bin").await?;
    assert!(matches!(report.notice, Some(Notice::Uploaded { .. })));
    assert_eq!(std::fs::read(server.root().join("tokens.bin"))?, contents);

    let mut downloader = server.client(inbox.path()).await?;
    // the other session's token may differ; neither matters in this mode
    downloader.execute("dl tokens.bin").await?;
    assert_eq!(std::fs::read(inbox.path().join("tokens.bin"))?, contents);

    // and the session continues normally afterwards
    let report = uploader.execute("mkdir next").await?;
    assert_eq!(entries(report.listing.as_deref().unwrap()), vec!["next", "tokens.bin"]);
    Ok(())
}
