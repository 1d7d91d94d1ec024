use crate::{cli::globals::GlobalArgs, vault};
use anyhow::Result;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::{
    sync::mpsc::UnboundedSender,
    time::{Duration, interval, sleep},
};
use tracing::{debug, error, info, instrument, warn};

/// Keep the Vault token alive for the lifetime of the process.
///
/// Renews on a jittered fraction of the lease duration with bounded
/// retries. If renewal keeps failing the shutdown channel is signalled
/// so the server can drain and exit instead of serving with a dead
/// token.
#[instrument(skip(globals, shutdown_tx))]
pub async fn try_renew(
    globals: &GlobalArgs,
    lease_duration: u64,
    shutdown_tx: UnboundedSender<()>,
) -> Result<()> {
    let mut rng = StdRng::from_entropy();

    let mut jittered_lease_duration = (lease_duration as f64 * rng.gen_range(0.7..0.9)) as u64;

    let mut renew_token_interval = interval(Duration::from_secs(jittered_lease_duration.max(1)));

    let globals = globals.clone();

    tokio::spawn(async move {
        // First tick completes immediately
        renew_token_interval.tick().await;

        loop {
            renew_token_interval.tick().await;

            for attempt in 1..=3 {
                let backoff_time = 2u64.pow(attempt - 1);

                if attempt > 1 {
                    warn!("Backing off for {} seconds", backoff_time);
                    sleep(Duration::from_secs(backoff_time)).await;
                }

                match vault::renew_self(&globals).await {
                    Ok(lease_duration) => {
                        debug!("token lease duration {} seconds", lease_duration);

                        jittered_lease_duration =
                            (lease_duration as f64 * rng.gen_range(0.7..0.9)) as u64;

                        renew_token_interval =
                            interval(Duration::from_secs(jittered_lease_duration.max(1)));
                        renew_token_interval.tick().await;

                        break;
                    }

                    Err(e) => {
                        error!("Error renewing token: {}", e);

                        if attempt == 3 {
                            error!("Failed to renew token after 3 attempts, shutting down");
                            let _ = shutdown_tx.send(());
                            return;
                        }

                        continue;
                    }
                }
            }

            info!("Will renew token in {} seconds", jittered_lease_duration);
        }
    });

    Ok(())
}
