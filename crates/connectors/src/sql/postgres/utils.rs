use crate::sql::error::ConnectorError;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::future::Future;
use tokio_postgres::{Client, Config, NoTls, config::SslMode};
use tracing::{debug, error, warn};

/// Opens a client for `url`, honouring its `sslmode`. With `prefer`, a failed TLS
/// handshake falls back to a plain connection.
pub(crate) async fn connect_client(url: &str) -> Result<Client, ConnectorError> {
    let config: Config = url
        .parse()
        .map_err(|e: tokio_postgres::Error| ConnectorError::InvalidUrl(e.to_string()))?;

    match config.get_ssl_mode() {
        SslMode::Disable => plain(&config).await,
        SslMode::Prefer => match tls(&config).await {
            Ok(client) => Ok(client),
            Err(err) => {
                warn!(error = %err, "TLS handshake with Postgres failed, connecting without TLS");
                plain(&config).await
            }
        },
        _ => tls(&config).await,
    }
}

async fn tls(config: &Config) -> Result<Client, ConnectorError> {
    let connector = MakeTlsConnector::new(TlsConnector::builder().build()?);
    let (client, connection) = config.connect(connector).await?;
    drive(connection);
    debug!("Connected to Postgres over TLS");
    Ok(client)
}

async fn plain(config: &Config) -> Result<Client, ConnectorError> {
    let (client, connection) = config.connect(NoTls).await?;
    drive(connection);
    debug!("Connected to Postgres");
    Ok(client)
}

/// The connection future performs the actual I/O and must be polled for the
/// client to make progress.
fn drive<F>(connection: F)
where
    F: Future<Output = Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(error = %err, "Postgres connection closed with error");
        }
    });
}
