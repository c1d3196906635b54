use std::fs;

use mudlink::config::MudlinkConfig;
use mudlink::errors::AppError;
use mudlink::replay::{ReplayReport, parse_hex_capture, replay};
use telnet_automata::{OptionState, Side};
use tempfile::TempDir;

const LOGIN_CAPTURE: &str = r#"
# WILL ECHO, WILL SGA, DO TERMINAL-TYPE
ff fb 01  ff fb 03  ff fd 18
# "Name: " then GA
4e 61 6d 65 3a 20  ff f9
# SB TERMINAL-TYPE SEND SE
ff fa 18 01 ff f0
"#;

#[test]
fn test_replay_hex_capture_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("login.hex");
    fs::write(&path, LOGIN_CAPTURE).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let input = parse_hex_capture(&text).unwrap();
    assert_eq!(input.len(), 23);

    let config = MudlinkConfig::default();
    let mut session = config.build_session();
    let (output, chunks) = replay(&mut session, &input, 5).unwrap();

    assert_eq!(chunks, 5);
    assert_eq!(output.data, b"Name: ");
    assert_eq!(output.commands, vec![0xF9]);
    assert_eq!(session.state(Side::Remote, 1), Some(OptionState::Yes));
    assert_eq!(session.state(Side::Local, 24), Some(OptionState::Yes));

    // DO ECHO, DO SGA, WILL TTYPE, then IS XTERM-256COLOR
    let mut expected = vec![0xFF, 0xFD, 0x01, 0xFF, 0xFD, 0x03, 0xFF, 0xFB, 0x18];
    expected.extend_from_slice(&[0xFF, 0xFA, 0x18, 0x00]);
    expected.extend_from_slice(b"XTERM-256COLOR");
    expected.extend_from_slice(&[0xFF, 0xF0]);
    assert_eq!(output.replies, expected);
}

#[test]
fn test_chunk_size_does_not_change_output() {
    let input = parse_hex_capture(LOGIN_CAPTURE).unwrap();
    let config = MudlinkConfig::default();

    let mut whole = config.build_session();
    let (expected, _) = replay(&mut whole, &input, 0).unwrap();

    for chunk in 1..input.len() {
        let mut session = config.build_session();
        let (output, _) = replay(&mut session, &input, chunk).unwrap();
        assert_eq!(output, expected, "chunk size {}", chunk);
    }
}

#[test]
fn test_receive_limit_surfaces_as_session_error() {
    let config = MudlinkConfig::parse("[session]\nreceive_limit = 4\n").unwrap();
    let mut session = config.build_session();

    let result = replay(&mut session, b"too long for one chunk", 8);
    let err = AppError::from(result.unwrap_err());
    assert!(matches!(err, AppError::Session(_)));
}

#[test]
fn test_json_report_round_trips() {
    let input = parse_hex_capture(LOGIN_CAPTURE).unwrap();
    let config = MudlinkConfig::default();
    let mut session = config.build_session();
    let (output, chunks) = replay(&mut session, &input, 512).unwrap();

    let report = ReplayReport::new("login.hex", input.len(), chunks, &output, &session);
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["source"], "login.hex");
    assert_eq!(json["chunks"], 1);
    assert_eq!(json["subnegotiations"][0]["option"], "terminal type");
    assert_eq!(json["subnegotiations"][0]["payload"], "01");
    assert_eq!(json["incomplete"], false);
    assert!(json["generated_at"].as_str().is_some());
}
