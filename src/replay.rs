//! Replaying captured telnet traffic through a `ProtocolSession`.
//!
//! A capture is the raw byte stream a server sent, either as a binary file
//! or as whitespace separated hex. Replaying it in chunks shows exactly what
//! a client would have displayed and answered.

use std::io::Write;

use jiff::Timestamp;
use serde::Serialize;
use tracing::{debug, info};

use telnet_automata::{
    OptionIdentity, OptionState, ProtocolSession, SessionError, SessionOutput, TelnetCommand,
};

use crate::errors::{AppError, AppResult};

/// Feed `input` to `session` in chunks of `chunk_size` bytes (whole input
/// when zero), collecting everything the session produced
pub fn replay(
    session: &mut ProtocolSession,
    input: &[u8],
    chunk_size: usize,
) -> Result<(SessionOutput, usize), SessionError> {
    let chunk_size = if chunk_size == 0 {
        input.len().max(1)
    } else {
        chunk_size
    };

    let mut output = SessionOutput::default();
    let mut chunks = 0;
    for chunk in input.chunks(chunk_size) {
        chunks += 1;
        output.append(session.feed(chunk)?);
    }

    info!(
        bytes = input.len(),
        chunks,
        data = output.data.len(),
        replies = output.replies.len(),
        "replay finished"
    );
    Ok((output, chunks))
}

/// Parse a hex capture such as `ff fb 01 48 49`
///
/// Whitespace and `#` comments to the end of a line are ignored.
pub fn parse_hex_capture(text: &str) -> AppResult<Vec<u8>> {
    let digits: String = text
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(|line| line.chars())
        .filter(|c| !c.is_whitespace())
        .collect();

    let decoded =
        hex::decode(&digits).map_err(|e| AppError::InvalidCapture(e.to_string()))?;
    debug!(bytes = decoded.len(), "parsed hex capture");
    Ok(decoded)
}

/// Uppercase hex with one space between bytes, e.g. `FF FD 01`
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandRecord {
    pub code: u8,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubnegotiationRecord {
    pub code: u8,
    pub option: &'static str,
    pub payload: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionRecord {
    pub code: u8,
    pub option: &'static str,
    pub remote: OptionState,
    pub local: OptionState,
}

/// Summary of one replay, printable as text or JSON
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub generated_at: Timestamp,
    pub source: String,
    pub bytes_in: usize,
    pub chunks: usize,
    /// Decoded data, lossily converted to UTF-8
    pub data: String,
    /// Reply bytes in hex
    pub replies: String,
    pub commands: Vec<CommandRecord>,
    pub subnegotiations: Vec<SubnegotiationRecord>,
    pub options: Vec<OptionRecord>,
    /// Capture ended inside a command or subnegotiation
    pub incomplete: bool,
}

impl ReplayReport {
    pub fn new(
        source: impl Into<String>,
        bytes_in: usize,
        chunks: usize,
        output: &SessionOutput,
        session: &ProtocolSession,
    ) -> Self {
        let commands = output
            .commands
            .iter()
            .map(|&code| CommandRecord {
                code,
                name: TelnetCommand::from_byte(code)
                    .map(|command| format!("{:?}", command))
                    .unwrap_or_else(|| "unknown".to_string()),
            })
            .collect();

        let subnegotiations = output
            .subnegotiations
            .iter()
            .map(|sub| SubnegotiationRecord {
                code: sub.option.code,
                option: sub.option.name,
                payload: hex(&sub.payload),
            })
            .collect();

        let options = session
            .pairs()
            .map(|pair| OptionRecord {
                code: pair.identity.code,
                option: pair.identity.name,
                remote: pair.remote.state(),
                local: pair.local.state(),
            })
            .collect();

        Self {
            generated_at: Timestamp::now(),
            source: source.into(),
            bytes_in,
            chunks,
            data: String::from_utf8_lossy(&output.data).into_owned(),
            replies: hex(&output.replies),
            commands,
            subnegotiations,
            options,
            incomplete: session.is_mid_sequence(),
        }
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_text<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(
            writer,
            "Replayed {} bytes from {} in {} chunk(s)",
            self.bytes_in, self.source, self.chunks
        )?;
        writeln!(writer)?;
        writeln!(writer, "Decoded data:")?;
        writeln!(writer, "{}", self.data)?;
        writeln!(writer)?;

        if self.replies.is_empty() {
            writeln!(writer, "Replies: none")?;
        } else {
            writeln!(writer, "Replies: {}", self.replies)?;
        }

        if !self.commands.is_empty() {
            let names: Vec<&str> = self.commands.iter().map(|c| c.name.as_str()).collect();
            writeln!(writer, "Commands: {}", names.join(", "))?;
        }

        for sub in &self.subnegotiations {
            writeln!(
                writer,
                "Subnegotiation {}: {}",
                OptionIdentity::from_code(sub.code),
                sub.payload
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Option states:")?;
        for option in &self.options {
            writeln!(
                writer,
                "  {:<28} remote={:<16} local={:?}",
                format!("{} ({})", option.option, option.code),
                format!("{:?}", option.remote),
                option.local
            )?;
        }

        if self.incomplete {
            writeln!(writer)?;
            writeln!(writer, "Capture ends mid sequence")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telnet_automata::{OptionRegistry, Side};

    #[test]
    fn test_parse_hex_capture() {
        let bytes = parse_hex_capture("ff fb 01  # WILL ECHO\n48 49\n").unwrap();
        assert_eq!(bytes, vec![0xFF, 0xFB, 0x01, 0x48, 0x49]);
    }

    #[test]
    fn test_parse_hex_capture_errors() {
        match parse_hex_capture("ff f") {
            Err(AppError::InvalidCapture(reason)) => {
                assert_eq!(reason, hex::FromHexError::OddLength.to_string())
            }
            other => panic!("expected odd length error, got {:?}", other),
        }
        match parse_hex_capture("ff zz") {
            Err(AppError::InvalidCapture(reason)) => assert!(reason.contains("'z'")),
            other => panic!("expected invalid character error, got {:?}", other),
        }
        // Comments are stripped before decoding, so hex-looking text in them is ignored
        assert_eq!(parse_hex_capture("# zz\n0a").unwrap(), vec![0x0A]);
    }

    #[test]
    fn test_hex_formats_spaced_uppercase() {
        assert_eq!(hex(&[0xFF, 0xFD, 0x01, 0x0a]), "FF FD 01 0A");
        assert_eq!(hex(&[]), "");
    }

    #[test]
    fn test_replay_in_chunks() {
        let mut session = ProtocolSession::new(OptionRegistry::default());
        let input = [255, 251, 1, b'h', b'i', 255, 249];
        let (output, chunks) = replay(&mut session, &input, 2).unwrap();

        assert_eq!(chunks, 4);
        assert_eq!(output.data, b"hi");
        assert_eq!(output.replies, vec![255, 253, 1]);
        assert_eq!(output.commands, vec![249]);
        assert!(session.is_enabled(Side::Remote, 1));
    }

    #[test]
    fn test_zero_chunk_size_feeds_whole_input() {
        let mut session = ProtocolSession::new(OptionRegistry::default());
        let (_, chunks) = replay(&mut session, b"hello", 0).unwrap();
        assert_eq!(chunks, 1);
    }

    #[test]
    fn test_report_text_and_json() {
        let mut session = ProtocolSession::new(OptionRegistry::default());
        let input = [255, 251, 1, b'o', b'k', 255, 249, 255];
        let (output, chunks) = replay(&mut session, &input, 3).unwrap();
        let report = ReplayReport::new("capture.bin", input.len(), chunks, &output, &session);

        assert_eq!(report.replies, "FF FD 01");
        assert_eq!(report.commands[0].name, "GA");
        assert!(report.incomplete);

        let mut text = Vec::new();
        report.write_text(&mut text).unwrap();
        let text = String::from_utf8(text).unwrap();
        assert!(text.contains("Replies: FF FD 01"));
        assert!(text.contains("Commands: GA"));
        assert!(text.contains("Capture ends mid sequence"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["bytes_in"], 8);
        assert_eq!(json["data"], "ok");
        assert_eq!(json["options"][1]["remote"], "Yes");
    }
}
