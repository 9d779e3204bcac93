use bytes::Bytes;
use color_eyre::eyre::{Result, eyre};
use echoprobe::common::{spawn_test_server, spawn_test_server_with_config};
use echoprobe::harness::{self, HarnessConfig};
use echoprobe::{ClientConfig, EchoClient, EchoError, Framing, HttpConfig, HttpEchoClient, Payload, Submission};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn ephemeral_config(framing: Framing) -> HarnessConfig {
    let mut config = HarnessConfig::default().with_framing(framing);
    config.server.bind_addr = "127.0.0.1:0".parse().unwrap();
    config
}

#[tokio::test]
async fn test_full_run_raw() -> Result<()> {
    let mut config = ephemeral_config(Framing::Raw);
    config.target_host = "127.0.0.1".to_string();

    let report = harness::run(config).await?;
    assert_eq!(report.round_trips, 198);
    Ok(())
}

#[tokio::test]
async fn test_full_run_length_prefixed() -> Result<()> {
    let mut config = ephemeral_config(Framing::LengthPrefixed);
    config.target_host = "127.0.0.1".to_string();

    let report = harness::run(config).await?;
    assert_eq!(report.round_trips, 198);
    Ok(())
}

#[tokio::test]
async fn test_run_by_host_name() -> Result<()> {
    let mut config = ephemeral_config(Framing::Raw);
    config.iterations = 3;

    let report = harness::run(config).await?;
    assert_eq!(report.round_trips, 6);
    Ok(())
}

#[tokio::test]
async fn test_submissions_observe_identical_results() -> Result<()> {
    for framing in [Framing::Raw, Framing::LengthPrefixed] {
        let server = spawn_test_server(framing).await?;
        let client = HttpEchoClient::new(
            &format!("http://{}/", server.addr),
            ClientConfig {
                framing,
                ..ClientConfig::default()
            },
        )?;

        let payload = Payload::default();
        let buffered = client.echo(payload.bytes(), Submission::Buffered).await?;
        let deferred = client.echo(payload.bytes(), Submission::Deferred).await?;

        payload.verify(&buffered)?;
        payload.verify(&deferred)?;
        assert_eq!(buffered, deferred);

        drop(client);
        server.stop().await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_multiple_concurrent_requests() -> Result<()> {
    let server = spawn_test_server(Framing::Raw).await?;
    let client = Arc::new(HttpEchoClient::new(
        &format!("http://{}/", server.addr),
        ClientConfig {
            max_connections_per_destination: 3,
            ..ClientConfig::default()
        },
    )?);

    let mut handles = Vec::new();
    for i in 0..12u8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let payload = Payload::filled(512 + i as usize, i);
            let submission = if i % 2 == 0 {
                Submission::Buffered
            } else {
                Submission::Deferred
            };
            let echoed = client.echo(payload.bytes(), submission).await?;
            payload.verify(&echoed)?;
            Ok::<(), EchoError>(())
        }));
    }

    for handle in handles {
        handle.await??;
    }

    drop(client);
    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_connection_limit() -> Result<()> {
    let server = spawn_test_server_with_config(HttpConfig {
        bind_addr: "127.0.0.1:0".parse()?,
        max_connections: 1,
        ..HttpConfig::default()
    })
    .await?;

    // Hold the only slot open with an idle keep-alive connection
    let mut first = TcpStream::connect(server.addr).await?;
    first
        .write_all(b"POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 2\r\n\r\nhi")
        .await?;
    let mut buffer = [0u8; 512];
    let n = first.read(&mut buffer).await?;
    assert!(String::from_utf8_lossy(&buffer[..n]).starts_with("HTTP/1.1 200 OK"));

    // The second connection is accepted by the OS and then dropped
    let mut second = TcpStream::connect(server.addr).await?;
    let _ = second
        .write_all(b"POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 2\r\n\r\nhi")
        .await;
    let mut rejected = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), second.read_to_end(&mut rejected))
        .await
        .map_err(|_| eyre!("Rejected connection was not closed"))?;
    assert!(read.map(|n| n == 0).unwrap_or(true));

    drop(first);
    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_graceful_shutdown() -> Result<()> {
    let server = spawn_test_server(Framing::Raw).await?;
    let addr = server.addr;

    let client = HttpEchoClient::new(&format!("http://{addr}/"), ClientConfig::default())?;
    let echoed = client
        .echo(Bytes::from_static(b"test"), Submission::Buffered)
        .await?;
    assert_eq!(&echoed[..], b"test");

    // Shutdown drains the pooled keep-alive connection instead of hanging
    tokio::time::timeout(Duration::from_secs(10), server.stop())
        .await
        .map_err(|_| eyre!("Server did not stop"))??;

    assert!(TcpStream::connect(addr).await.is_err());
    Ok(())
}
