//! # Negotiation Demo
//!
//! Plays a scripted MUD server greeting through a `ProtocolSession` and
//! prints what the session decodes and what it would send back.
//! Run with: `cargo run --example negotiation_demo`

use telnet_automata::{OptionIdentity, OptionRegistry, ProtocolSession, Side, TerminalTypeHandler};

const IAC: u8 = 255;
const WILL: u8 = 251;
const DO: u8 = 253;
const SB: u8 = 250;
const SE: u8 = 240;

fn main() {
    println!("=== Telnet Negotiation Demo ===");
    println!();

    let mut session = ProtocolSession::new(OptionRegistry::default())
        .with_handler(TerminalTypeHandler::new(vec!["mudlink".to_string()]));

    let script: Vec<(&str, Vec<u8>)> = vec![
        ("server offers echo and SGA", vec![IAC, WILL, 1, IAC, WILL, 3]),
        ("server asks for terminal type", vec![IAC, DO, 24]),
        ("server requests the name", vec![IAC, SB, 24, 1, IAC, SE]),
        ("server offers GMCP (not in registry)", vec![IAC, WILL, 201]),
        ("greeting split mid command", b"Welcome!\r\n\xff".to_vec()),
        ("rest of the command", vec![249]),
    ];

    for (label, bytes) in script {
        println!("-- {}", label);
        println!("   in:      {}", hex(&bytes));
        match session.feed(&bytes) {
            Ok(output) => {
                if !output.data.is_empty() {
                    println!("   data:    {:?}", String::from_utf8_lossy(&output.data));
                }
                if !output.replies.is_empty() {
                    println!("   replies: {}", hex(&output.replies));
                }
                if !output.commands.is_empty() {
                    println!("   commands: {:?}", output.commands);
                }
            }
            Err(e) => println!("   error:   {}", e),
        }
    }

    println!();
    println!("Final option states:");
    for pair in session.pairs() {
        println!(
            "  {:<24} remote={:?} local={:?}",
            pair.identity.name,
            pair.remote.state(),
            pair.local.state()
        );
    }

    println!();
    let sent = session.request_disable(Side::Remote, OptionIdentity::ECHO.code);
    println!("Asking the server to stop echoing sends: {}", hex(&sent));
}

fn hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}
