mod error;

pub use self::error::PoolError;

use core::num::NonZeroUsize;

use diesel::ConnectionError;
use diesel_async::{
    AsyncPgConnection,
    pooled_connection::{
        AsyncDieselConnectionManager, ManagerConfig,
        deadpool::{Object, Pool},
    },
};
use rustls::{ClientConfig, RootCertStore};
use rustls_native_certs::CertificateResult;
use tokio::task;
use tokio_postgres_rustls::MakeRustlsConnect;

/// A deadpool-managed pool of asynchronous PostgreSQL connections.
pub type DbPool = Pool<AsyncPgConnection>;

/// A connection checked out of [`DbPool`]; returned to the pool on drop.
pub type DbConn = Object<AsyncPgConnection>;

/// Establishes a TLS-capable connection pool to the custody database.
///
/// Native root certificates are loaded on a blocking task. Connections are opened lazily,
/// so an unreachable database surfaces on first use rather than here.
///
/// # Errors
///
/// Returns an error if the root certificates cannot be loaded or the pool configuration
/// is rejected.
#[tracing::instrument(skip(url))]
pub async fn establish_pool<U>(url: U, max_size: NonZeroUsize) -> Result<DbPool, PoolError>
where
    String: From<U>,
{
    let tls = task::spawn_blocking(make_rustls_config).await??;

    let mut manager_config = ManagerConfig::default();
    manager_config.custom_setup = Box::new(move |url: &str| {
        let tls = tls.clone();
        let url = url.to_string();
        Box::pin(async move {
            let (client, conn) = tokio_postgres::connect(&url, tls)
                .await
                .map_err(|e| e.to_string())
                .map_err(ConnectionError::BadConnection)?;

            tokio::spawn(async move {
                if let Err(err) = conn.await {
                    tracing::error!(%err, "postgres connection closed with error");
                }
            });

            AsyncPgConnection::try_from(client).await
        })
    });

    let manager =
        AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(url, manager_config);

    Pool::builder(manager).max_size(max_size.get()).build().map_err(From::from)
}

fn make_rustls_config() -> Result<MakeRustlsConnect, rustls::Error> {
    let mut cert_store = RootCertStore::empty();
    let CertificateResult { certs, errors, .. } = rustls_native_certs::load_native_certs();

    if !errors.is_empty() {
        tracing::warn!(count = errors.len(), "some native root certificates failed to load");
    }

    for cert in certs {
        cert_store.add(cert)?;
    }

    let config = ClientConfig::builder().with_root_certificates(cert_store).with_no_client_auth();

    Ok(MakeRustlsConnect::new(config))
}
