//! Unit tests for the server session state machine

use super::*;
use dirshare_proto::{LocalFs, Verb};
use tempfile::TempDir;
use tokio::io::{duplex, split, DuplexStream, ReadHalf, WriteHalf};
use tokio::time::{timeout, Duration};

type Halves = (ReadHalf<DuplexStream>, WriteHalf<DuplexStream>);

fn session_pair(
    root: &Path,
    config: ChannelConfig,
) -> (ServerSession<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>, Halves) {
    let (server_io, client_io) = duplex(64 * 1024);
    let (sr, sw) = split(server_io);
    let session = ServerSession::new(
        sr,
        sw,
        root.to_path_buf(),
        Arc::new(LocalFs),
        Arc::new(CommandRouter::standard()),
        config,
    );
    (session, split(client_io))
}

async fn connect((reader, writer): Halves) -> (Channel, String) {
    let mut channel = Channel::connect(reader, writer, &ChannelConfig::default())
        .await
        .unwrap();
    let listing = channel.receive().await.unwrap();
    (channel, String::from_utf8(listing.to_vec()).unwrap())
}

#[tokio::test]
async fn test_new_session_is_handshaking() {
    let temp = TempDir::new().unwrap();
    let (session, _client) = session_pair(temp.path(), ChannelConfig::default());
    assert_eq!(session.state(), &SessionState::Handshaking);
    assert!(session.cwd().is_none());
}

#[tokio::test]
async fn test_step_through_states() {
    let temp = TempDir::new().unwrap();
    let (mut session, client) = session_pair(temp.path(), ChannelConfig::default());

    let client_task = tokio::spawn(async move {
        let (mut channel, first) = connect(client).await;
        channel.send(b"mkdir a").await.unwrap();
        let second = channel.receive().await.unwrap();
        (first, String::from_utf8(second.to_vec()).unwrap())
    });

    assert_eq!(session.step().await, &SessionState::Ready);
    assert_eq!(
        session.step().await,
        &SessionState::Dispatching(Command::new(Verb::Mkdir, "a"))
    );
    assert_eq!(session.step().await, &SessionState::Ready);

    let (first, second) = client_task.await.unwrap();
    let root = temp.path().display();
    assert_eq!(first, format!("Current Directory: {}:\n|", root));
    assert_eq!(second, format!("Current Directory: {}:\n|\n-- a", root));
}

#[tokio::test]
async fn test_exit_closes_without_reply() {
    let temp = TempDir::new().unwrap();
    let (session, client) = session_pair(temp.path(), ChannelConfig::default());
    let server = tokio::spawn(session.run());

    let (mut channel, _) = connect(client).await;
    channel.send(b"exit").await.unwrap();

    let summary = timeout(Duration::from_secs(5), server)
        .await
        .expect("session did not close")
        .unwrap()
        .unwrap();
    assert_eq!(summary.commands_handled, 1);

    // nothing but EOF follows the exit
    let err = channel.receive().await.unwrap_err();
    assert!(matches!(err, ProtocolError::TruncatedMessage { buffered: 0 }));
}

#[tokio::test]
async fn test_malformed_commands_are_noops() {
    let temp = TempDir::new().unwrap();
    let (session, client) = session_pair(temp.path(), ChannelConfig::default());
    let server = tokio::spawn(session.run());

    let (mut channel, initial) = connect(client).await;
    for line in ["cd", "bogus arg", "", "CD ..", "mkdir"] {
        channel.send(line.as_bytes()).await.unwrap();
        let reply = channel.receive().await.unwrap();
        assert_eq!(String::from_utf8_lossy(&reply), initial, "after {:?}", line);
    }
    channel.send(b"exit").await.unwrap();

    let summary = server.await.unwrap().unwrap();
    assert_eq!(summary.commands_handled, 1);
    assert_eq!(summary.final_cwd.as_deref(), Some(temp.path()));
}

#[tokio::test]
async fn test_cwd_follows_cd() {
    let temp = TempDir::new().unwrap();
    let (session, client) = session_pair(temp.path(), ChannelConfig::default());
    let server = tokio::spawn(session.run());

    let (mut channel, _) = connect(client).await;
    channel.send(b"mkdir x").await.unwrap();
    channel.receive().await.unwrap();
    channel.send(b"cd x").await.unwrap();
    let listing = channel.receive().await.unwrap();
    assert!(String::from_utf8_lossy(&listing)
        .starts_with(&format!("Current Directory: {}:", temp.path().join("x").display())));
    channel.send(b"exit").await.unwrap();

    let summary = server.await.unwrap().unwrap();
    assert_eq!(summary.final_cwd, Some(temp.path().join("x")));
}

#[tokio::test]
async fn test_disconnect_is_a_normal_end() {
    let temp = TempDir::new().unwrap();
    let (session, client) = session_pair(temp.path(), ChannelConfig::default());
    let server = tokio::spawn(session.run());

    let (channel, _) = connect(client).await;
    drop(channel);

    let summary = timeout(Duration::from_secs(5), server)
        .await
        .expect("session did not notice the disconnect")
        .unwrap()
        .unwrap();
    assert_eq!(summary.commands_handled, 0);
}

#[tokio::test]
async fn test_oversized_message_fails_session() {
    let temp = TempDir::new().unwrap();
    let config = ChannelConfig {
        max_message_size: 64,
        ..Default::default()
    };
    let (session, client) = session_pair(temp.path(), config);
    let server = tokio::spawn(session.run());

    let (mut channel, _) = connect(client).await;
    channel.send(&[b'a'; 512]).await.unwrap();

    let result = server.await.unwrap();
    assert!(matches!(
        result,
        Err(ServerError::Protocol(ProtocolError::MessageTooLarge { .. }))
    ));
}

#[tokio::test]
async fn test_handshake_failure_closes() {
    let temp = TempDir::new().unwrap();
    let (session, (mut reader, writer)) = session_pair(temp.path(), ChannelConfig::default());
    let server = tokio::spawn(session.run());

    // take the token, then hang up without acknowledging it
    let mut token = [0u8; dirshare_proto::TOKEN_LEN];
    tokio::io::AsyncReadExt::read_exact(&mut reader, &mut token).await.unwrap();
    drop(reader);
    drop(writer);

    let result = server.await.unwrap();
    assert!(matches!(
        result,
        Err(ServerError::Protocol(ProtocolError::HandshakeFailed(_)))
    ));
}
