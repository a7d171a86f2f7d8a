#![deny(warnings)]

use {
    anyhow::{Context, Error, Result},
    futures::{channel::mpsc, FutureExt},
    std::{future::Future, net::SocketAddr, sync::Arc},
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        task,
    },
    tracing::log,
};

pub const WELCOME: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<h1>Welcome to pgin!</h1>";

const MESSAGE: &[u8] = b"\r\nMessage:";

/// Each request is read in full before replying, so the close is never a reset.
pub async fn serve_reply(
    address: SocketAddr,
    reply: Vec<u8>,
) -> Result<(
    impl Future<Output = Result<()>>,
    SocketAddr,
    mpsc::UnboundedReceiver<Vec<u8>>,
)> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Unable to listen on {address}"))?;

    let address = listener.local_addr()?;

    let (tx, rx) = mpsc::unbounded();
    let reply = Arc::<[u8]>::from(reply);

    Ok((
        async move {
            loop {
                let (mut stream, peer) = listener.accept().await?;
                log::debug!("accepted connection from {peer}");

                let reply = reply.clone();
                let tx = tx.clone();

                task::spawn(
                    async move {
                        let request = read_request(&mut stream).await?;
                        log::debug!("received {} byte request", request.len());
                        drop(tx.unbounded_send(request));

                        stream.write_all(&reply).await?;
                        stream.shutdown().await?;

                        Ok::<_, Error>(())
                    }
                    .map(|result| {
                        if let Err(e) = result {
                            log::warn!("error handling connection: {e:?}");
                        }
                    }),
                );
            }
        }
        .boxed(),
        address,
        rx,
    ))
}

/// Whether `request` holds a `Message:` line and ends a line.
///
/// A message that itself contains `\r\n` can look complete early if it arrives split right after that `\r\n`;
/// the peer then replies to the prefix.  Only use such messages when they are sent in one segment.
fn complete(request: &[u8]) -> bool {
    request.ends_with(b"\r\n") && request.windows(MESSAGE.len()).any(|w| w == MESSAGE)
}

async fn read_request(stream: &mut TcpStream) -> Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut buffer = vec![0; 1024];
    while !complete(&request) {
        let count = stream.read(&mut buffer).await?;
        if count == 0 {
            break;
        }

        request.extend_from_slice(&buffer[..count]);
    }

    Ok(request)
}
