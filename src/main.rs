//! Remember - fetch URLs through a persistent response cache
//!
//! Opens the cache store once, runs a single subcommand against it and closes
//! it again so the last write is flushed.

use std::io::{self, Write};
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use tracing::info;

use remember::cli::{Cli, Command, FetchSummary};
use remember::logging::init_logger;
use remember::{CachingTransport, Response, Store, Transport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logger(cli.log_format).map_err(|err| err as Box<dyn std::error::Error>)?;

    let config = cli.store_config();
    let store = Arc::new(Store::open(&config)?);

    match cli.command {
        Command::Fetch { url, include, meta } => {
            let transport = CachingTransport::new(Arc::clone(&store))?;
            let request = http::Request::get(url).body(Bytes::new())?;
            let response = transport.execute(request).await?;
            info!(
                status = %response.status,
                from_cache = response.from_cache,
                "fetched"
            );
            print_response(response, include, meta).await?;
        }
        Command::Stats => {
            println!("store:   {}", config.path.display());
            println!("bucket:  {}", config.bucket);
            println!("entries: {}", store.len()?);
        }
        Command::Purge => {
            let removed = store.purge()?;
            println!("removed {} cached responses", removed);
        }
    }

    // Every transport holding the store is gone by now.
    if let Ok(store) = Arc::try_unwrap(store) {
        store.close()?;
    }

    Ok(())
}

async fn print_response(
    response: Response,
    include: bool,
    meta: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout().lock();

    if meta {
        let summary = FetchSummary::from_response(&response);
        serde_json::to_writer_pretty(&mut stdout, &summary)?;
        writeln!(stdout)?;
        return Ok(());
    }

    if include {
        let (proto, _, _) = response.protocol();
        writeln!(
            stdout,
            "{} {} {}",
            proto,
            response.status.as_u16(),
            response.status_text
        )?;
        for (name, value) in response.headers.iter() {
            writeln!(stdout, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()))?;
        }
        writeln!(stdout)?;
    }

    let body = response.bytes().await?;
    stdout.write_all(&body)?;
    stdout.flush()?;
    Ok(())
}
