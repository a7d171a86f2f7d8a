#![deny(warnings)]

use {
    anyhow::{Context, Result},
    std::{
        io::{self, BufRead, Read, Write},
        net::{SocketAddr, TcpStream, ToSocketAddrs},
        str,
    },
    tracing::log,
};

pub const HOST: &str = "localhost";
pub const PORT: u16 = 8080;
pub const CHUNK_SIZE: usize = 512;
pub const PROMPT: &str = "the message? ";
pub const REFUSED: &str = "the connection was refused.make sure the server is running";

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: HOST.to_owned(),
            port: PORT,
            chunk_size: CHUNK_SIZE,
        }
    }
}

/// The message is substituted verbatim and the request has no terminating empty line.
pub fn request(message: &str) -> String {
    format!("GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nMessage:{message}\r\n")
}

pub fn connect(config: &Config, mut output: impl Write) -> Result<Option<Session<TcpStream>>> {
    let Config {
        host,
        port,
        chunk_size,
    } = config;

    // IPv4 only, so a `localhost` that also resolves to `::1` still reports a refusal
    let addresses = (host.as_str(), *port)
        .to_socket_addrs()
        .with_context(|| format!("unable to resolve {host}:{port}"))?
        .filter(SocketAddr::is_ipv4)
        .collect::<Vec<_>>();

    log::debug!("connecting to {host}:{port} via {addresses:?}");

    match TcpStream::connect(addresses.as_slice()) {
        Ok(stream) => {
            writeln!(output, "connected to {host}:{port}")?;
            Ok(Some(Session::new(stream, *chunk_size)))
        }
        Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
            writeln!(output, "{REFUSED}")?;
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("unable to connect to {host}:{port}")),
    }
}

pub fn run(config: &Config, input: impl BufRead, mut output: impl Write) -> Result<()> {
    match connect(config, &mut output)? {
        Some(session) => session.run(input, output),
        None => Ok(()),
    }
}

/// Dropping the session closes the connection.
pub struct Session<S> {
    stream: S,
    chunk_size: usize,
}

impl<S: Read + Write> Session<S> {
    pub fn new(stream: S, chunk_size: usize) -> Self {
        Self { stream, chunk_size }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn exchange(&mut self, message: &str, mut output: impl Write) -> Result<()> {
        let request = request(message);

        let written = self
            .stream
            .write(request.as_bytes())
            .context("unable to send request")?;

        if written < request.len() {
            log::warn!("short write: sent {written} of {} request bytes", request.len());
        }

        let mut buffer = vec![0; self.chunk_size];
        loop {
            let count = match self.stream.read(&mut buffer) {
                Ok(count) => count,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("unable to receive response"),
            };

            if count == 0 {
                break;
            }

            log::debug!("received {count} byte chunk");

            let chunk =
                str::from_utf8(&buffer[..count]).context("response chunk is not valid UTF-8")?;
            writeln!(output, "{chunk}")?;
        }

        // leftover response, never accumulated
        writeln!(output)?;

        Ok(())
    }

    /// Only returns on error, including end of input.
    pub fn run(mut self, mut input: impl BufRead, mut output: impl Write) -> Result<()> {
        let mut line = String::new();
        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line).context("unable to read message")? == 0 {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof))
                    .context("standard input closed");
            }

            let message = line
                .strip_suffix('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line))
                .unwrap_or(&line);

            self.exchange(message, &mut output)?;
        }
    }
}

impl<S> Drop for Session<S> {
    fn drop(&mut self) {
        log::debug!("closing connection");
    }
}
