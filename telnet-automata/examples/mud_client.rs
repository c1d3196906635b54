//! # Minimal MUD Client
//!
//! Connects to a telnet server, lets a `ProtocolSession` answer every
//! negotiation, and prints decoded text until the server closes the
//! connection or the read times out.
//! Run with: `cargo run --example mud_client -- 127.0.0.1:4000`

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use telnet_automata::{OptionRegistry, ProtocolSession, TerminalTypeHandler};

fn main() -> io::Result<()> {
    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:4000".to_string());

    println!("=== Telnet Automata MUD Client ===");
    let mut stream = match TcpStream::connect(&address) {
        Ok(stream) => stream,
        Err(e) => {
            println!("Failed to connect to {}: {}", address, e);
            return Ok(());
        }
    };
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    println!("Connected to {}", address);

    let mut session = ProtocolSession::new(OptionRegistry::default())
        .with_handler(TerminalTypeHandler::default());
    let mut buffer = [0u8; 4096];
    let stdout = io::stdout();

    loop {
        let n = match stream.read(&mut buffer) {
            Ok(0) => {
                println!();
                println!("Server closed connection");
                break;
            }
            Ok(n) => n,
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                println!();
                println!("No data for 5 seconds, disconnecting");
                break;
            }
            Err(e) => return Err(e),
        };

        let output = session
            .feed(&buffer[..n])
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;

        if !output.replies.is_empty() {
            stream.write_all(&output.replies)?;
            stream.flush()?;
        }

        let mut out = stdout.lock();
        out.write_all(&output.data)?;
        out.flush()?;
    }

    Ok(())
}
