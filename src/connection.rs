//! SSH session handling for the event stream.

use std::io::BufReader;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};

use crate::error::ConnectionError;

/// Command whose line-delimited output feeds the event stream.
const STREAM_EVENTS_COMMAND: &str = "gerrit stream-events";

/// Bounds the TCP connect, the SSH handshake and authentication. Streaming
/// itself is not time-bounded.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport keepalive ping interval in seconds.
const KEEPALIVE_INTERVAL_SECS: u32 = 60;

/// Opaque connection parameters for one event source.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// SSH private key; the matching public key is expected next to it with
    /// a `.pub` extension.
    pub private_key_path: Option<PathBuf>,
    /// Key passphrase when a private key is set, plain password otherwise.
    pub password: Option<String>,
}

fn pub_key_path(priv_key_path: &Path) -> PathBuf {
    let mut path = priv_key_path.to_path_buf();
    path.set_extension("pub");
    path
}

/// An authenticated session to the event source.
pub struct Connection {
    session: ssh2::Session,
}

impl Connection {
    pub fn connect(options: &ConnectOptions) -> Result<Connection, ConnectionError> {
        let addr = (options.host.as_str(), options.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| ConnectionError::Resolve(options.host.clone()))?;

        debug!("connecting to {}", addr);
        let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;

        let mut session = ssh2::Session::new()?;
        session.set_timeout(CONNECT_TIMEOUT.as_millis() as u32);
        session.set_tcp_stream(tcp);
        session.handshake()?;

        match (&options.private_key_path, &options.password) {
            (Some(priv_key), passphrase) => {
                let pub_key = pub_key_path(priv_key);
                debug!("authenticating with public key {}", pub_key.display());
                session.userauth_pubkey_file(
                    &options.username,
                    Some(&pub_key),
                    priv_key,
                    passphrase.as_deref(),
                )?;
            }
            (None, Some(password)) => {
                session.userauth_password(&options.username, password)?;
            }
            (None, None) => return Err(ConnectionError::NoAuthMethod),
        }

        session.set_keepalive(true, KEEPALIVE_INTERVAL_SECS);
        // Only the connect phase is time-bounded; reads may block for as
        // long as the stream stays quiet.
        session.set_timeout(0);

        Ok(Connection { session })
    }

    /// Runs the stream command and returns its output channel.
    pub fn open_event_channel(&self) -> Result<BufReader<ssh2::Channel>, ConnectionError> {
        let mut channel = self.session.channel_session()?;
        channel.exec(STREAM_EVENTS_COMMAND)?;
        Ok(BufReader::new(channel))
    }

    pub fn close(self) {
        if let Err(err) = self.session.disconnect(None, "closing", None) {
            debug!("error during disconnect: {}", err);
        }
    }
}

/// Where the connection manager gets its raw event lines from.
///
/// The production implementation is [`SshEventSource`]; tests substitute a
/// scripted one.
pub trait EventSource {
    type Lines: std::io::BufRead;

    /// Establishes a session and starts the stream command.
    fn connect(&mut self) -> Result<Self::Lines, ConnectionError>;

    /// Tears down whatever the last successful `connect` established.
    fn disconnect(&mut self) {}
}

/// Event source reading `gerrit stream-events` over SSH.
pub struct SshEventSource {
    options: ConnectOptions,
    connection: Option<Connection>,
}

impl SshEventSource {
    pub fn new(options: ConnectOptions) -> SshEventSource {
        SshEventSource {
            options,
            connection: None,
        }
    }
}

impl EventSource for SshEventSource {
    type Lines = BufReader<ssh2::Channel>;

    fn connect(&mut self) -> Result<Self::Lines, ConnectionError> {
        let connection = Connection::connect(&self.options)?;
        let lines = connection.open_event_channel()?;
        info!(
            "connected to gerrit at {}:{}",
            self.options.host, self.options.port
        );
        self.connection = Some(connection);
        Ok(lines)
    }

    fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            debug!("disconnecting from {}", self.options.host);
            connection.close();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pub_key_path() {
        let result = pub_key_path(Path::new("some_priv_key"));
        assert!(result == PathBuf::from("some_priv_key.pub"));
    }
}
