#![deny(warnings)]

use {
    anyhow::{Context, Result},
    sockets_probe::Config,
    std::{io, net::Shutdown, process},
    tracing::log,
};

fn main() -> Result<()> {
    pretty_env_logger::init();

    let Some(session) = sockets_probe::connect(&Config::default(), io::stdout())? else {
        return Ok(());
    };

    let socket = session
        .get_ref()
        .try_clone()
        .context("unable to clone socket for interrupt handling")?;

    let _handler = ctrlc2::set_handler(move || {
        log::debug!("interrupted; closing connection");
        if let Err(e) = socket.shutdown(Shutdown::Both) {
            log::warn!("unable to shut down connection: {e}");
        }
        process::exit(130)
    })
    .context("unable to install interrupt handler")?;

    session.run(io::stdin().lock(), io::stdout().lock())
}
