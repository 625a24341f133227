//! Client Tests
//!
//! Tests for outcome classification and the typed operations.

#[path = "../common/mod.rs"]
mod common;

use bytes::Bytes;
use common::{open_client, Event, FakeServer, Reply};
use mpcover::protocol::{Command, Outcome, Value};
use mpcover::MpdError;

// =============================================================================
// Execute Tests
// =============================================================================

#[test]
fn test_execute_success() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"volume: 50\nOK\n");

    match client.execute(&Command::new("status")).unwrap() {
        Outcome::Success(items) => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].key, "volume");
        }
        other => panic!("Expected success, got {:?}", other),
    }
}

#[test]
fn test_execute_generic_ack_is_error_outcome() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"ACK [2@0] {seekcur} wrong number of arguments\n");

    match client.execute(&Command::new("seekcur")).unwrap() {
        Outcome::Error(ack) => {
            assert_eq!(ack.code, Some(2));
            assert_eq!(ack.message, "wrong number of arguments");
        }
        other => panic!("Expected error outcome, got {:?}", other),
    }
}

#[test]
fn test_execute_permission_ack_is_auth_error() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"ACK [4@0] {status} you don't have permission for \"status\"\n");

    assert!(matches!(client.status(), Err(MpdError::Auth(_))));
}

#[test]
fn test_execute_empty_after_retries() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server
        .push(Reply::Silence)
        .push(Reply::Silence)
        .push(Reply::Silence);

    assert_eq!(client.execute(&Command::new("status")).unwrap(), Outcome::Empty);
}

#[test]
fn test_execute_missing_terminator_keeps_items() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"file: a.flac\nTitle: A\n");

    let items = client.run("currentsong", Vec::<String>::new()).unwrap();
    assert_eq!(items.len(), 2);
}

#[test]
fn test_run_returns_no_items_on_error() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"ACK [50@0] {lsinfo} No such directory\n");

    let items = client.run("lsinfo", ["missing dir"]).unwrap();
    assert!(items.is_empty());
    assert_eq!(server.commands(), vec!["lsinfo \"missing dir\""]);
}

// =============================================================================
// Simple Command Tests
// =============================================================================

#[test]
fn test_status_mapping() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"volume: 50\nrepeat: 0\nstate: play\nelapsed: 12.5\nOK\n");

    let status = client.status().unwrap();
    assert_eq!(status["volume"].as_int(), Some(50));
    assert_eq!(status["state"].as_str(), Some("play"));
    assert_eq!(status["elapsed"].as_float(), Some(12.5));
    assert_eq!(server.commands(), vec!["status"]);
}

#[test]
fn test_stats_and_current_song_commands() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server
        .reply(b"artists: 3\nalbums: 4\nOK\n")
        .reply(b"file: a.flac\nTitle: A\nTitle: B\nOK\n");

    let stats = client.stats().unwrap();
    let song = client.current_song().unwrap();

    assert_eq!(stats["albums"], Value::Int(4));
    assert_eq!(song["Title"], Value::Str("B".to_string()));
    assert_eq!(server.commands(), vec!["stats", "currentsong"]);
}

#[test]
fn test_simple_command_maps_empty_on_failure() {
    let server = FakeServer::new();
    let mut client = open_client(&server);

    assert!(client.status().unwrap().is_empty());
}

// =============================================================================
// Album Art Tests
// =============================================================================

#[test]
fn test_album_art_assembles_chunks() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server
        .reply(b"size: 6\nbinary: 3\nabc\nOK\n")
        .reply(b"size: 6\nbinary: 3\nd\nf\nOK\n");

    let art = client.album_art(Some("Artist/Album/01 Track.flac")).unwrap();

    assert_eq!(art, Some(Bytes::from_static(b"abcd\nf")));
    assert_eq!(
        server.commands(),
        vec![
            "albumart \"Artist/Album/01 Track.flac\" 0",
            "albumart \"Artist/Album/01 Track.flac\" 3",
        ]
    );
}

#[test]
fn test_album_art_for_current_song() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server
        .reply(b"file: music/song.flac\nTitle: Song\nOK\n")
        .reply(b"size: 2\nbinary: 2\n\xff\xd8\nOK\n");

    let art = client.album_art(None).unwrap();

    assert_eq!(art, Some(Bytes::from_static(b"\xff\xd8")));
    assert_eq!(
        server.commands(),
        vec!["currentsong", "albumart music/song.flac 0"]
    );
}

#[test]
fn test_album_art_for_numeric_file_name() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server
        .reply(b"file: 007\nOK\n")
        .reply(b"size: 1\nbinary: 1\nx\nOK\n");

    let art = client.album_art(None).unwrap();

    assert_eq!(art, Some(Bytes::from_static(b"x")));
    assert_eq!(server.commands(), vec!["currentsong", "albumart 007 0"]);
}

#[test]
fn test_status_fails_when_server_stays_down() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.push(Reply::SendFails).reply(b"volume: 1\nOK\n");
    server.refuse_next_connects(5);

    assert!(matches!(client.status(), Err(MpdError::Connect { .. })));
}

#[test]
fn test_album_art_missing_is_none() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"ACK [50@0] {albumart} No file exists\n");

    assert_eq!(client.album_art(Some("song.flac")).unwrap(), None);
}

#[test]
fn test_album_art_none_when_server_goes_silent() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server
        .reply(b"size: 6\nbinary: 3\nabc\nOK\n")
        .push(Reply::Silence)
        .push(Reply::Silence)
        .push(Reply::Silence);

    assert_eq!(client.album_art(Some("song.flac")).unwrap(), None);
}

#[test]
fn test_album_art_without_current_song() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"OK\n");

    assert_eq!(client.album_art(None).unwrap(), None);
    assert_eq!(server.commands(), vec!["currentsong"]);
}

#[test]
fn test_album_art_empty_chunk_is_protocol_error() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"size: 6\nbinary: 0\n\nOK\n");

    assert!(matches!(
        client.album_art(Some("song.flac")),
        Err(MpdError::Protocol(_))
    ));
}

#[test]
fn test_album_art_of_zero_size() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"size: 0\nbinary: 0\n\nOK\n");

    assert_eq!(client.album_art(Some("song.flac")).unwrap(), Some(Bytes::new()));
}

// =============================================================================
// Idle Tests
// =============================================================================

#[test]
fn test_wait_for_change_unbounds_timeout_first() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"changed: player\nOK\n");

    let changed = client.wait_for_change(&["player", "playlist"]).unwrap();
    assert_eq!(changed.as_deref(), Some("player"));

    let events = server.events();
    let unbounded = events
        .iter()
        .position(|event| *event == Event::SetTimeout(None))
        .unwrap();
    let idle = events
        .iter()
        .position(|event| *event == Event::Send("idle player playlist".to_string()))
        .unwrap();
    assert!(unbounded < idle);
    assert_eq!(client.session().timeout(), None);
}

#[test]
fn test_wait_for_change_without_change() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"OK\n");

    assert_eq!(client.wait_for_change(&["player"]).unwrap(), None);
}

#[test]
fn test_wait_for_change_ack_is_command_error() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"ACK [2@0] {idle} Unrecognized idle event: bogus\n");

    assert!(matches!(
        client.wait_for_change(&["bogus"]),
        Err(MpdError::Command(_))
    ));
}

#[test]
fn test_watch_delivers_changes_in_order() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server
        .reply(b"changed: player\nOK\n")
        .reply(b"OK\n")
        .reply(b"changed: playlist\nOK\n");

    let (tx, rx) = crossbeam::channel::unbounded();
    let result = client.watch(&["player", "playlist"], &tx);

    // Script exhausted: the server goes silent and retries run out
    assert!(matches!(result, Err(MpdError::EmptyResponse)));
    let received: Vec<String> = rx.try_iter().collect();
    assert_eq!(received, vec!["player", "playlist"]);
}

#[test]
fn test_watch_stops_when_receiver_dropped() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server.reply(b"changed: player\nOK\n");

    let (tx, rx) = crossbeam::channel::unbounded();
    drop(rx);

    assert!(client.watch(&["player"], &tx).is_ok());
    assert_eq!(server.commands().len(), 1);
}

#[test]
fn test_watch_after_reconnect_keeps_unbounded_timeout() {
    let server = FakeServer::new();
    let mut client = open_client(&server);
    server
        .push(Reply::ReceiveFails)
        .reply(b"changed: mixer\nOK\n");

    assert_eq!(
        client.wait_for_change(&["mixer"]).unwrap().as_deref(),
        Some("mixer")
    );
    assert_eq!(client.session().reconnects(), 1);

    let events = server.events();
    let unbounded = events
        .iter()
        .position(|event| *event == Event::SetTimeout(None))
        .unwrap();
    assert!(events[unbounded..]
        .iter()
        .all(|event| !matches!(event, Event::SetTimeout(Some(_)))));
}
