use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::gateway::Gateway;
use crate::session::Session;
use crate::wallet::WalletCapability;

/// Background task that keeps the owner's balance fresh.
///
/// While the wallet is connected it ticks immediately, then every
/// `balance_refresh_interval`. A disconnect stops the timer at once; a
/// reconnect re-arms it with an immediate tick. The task is aborted when the
/// refresher is stopped or dropped. Failed reads are logged and the last
/// known value is kept.
pub struct BalanceRefresher {
    handle: JoinHandle<()>,
    balance: watch::Receiver<Option<u64>>,
    ticking: Arc<AtomicBool>,
}

impl BalanceRefresher {
    /// Must be called from within a tokio runtime.
    pub fn spawn(session: &Session) -> Self {
        let gateway = session.gateway_handle();
        let wallet = session.wallet_handle();
        let period = session.config().balance_refresh_interval;
        let (sender, balance) = watch::channel(None);
        let ticking = Arc::new(AtomicBool::new(false));
        let task_ticking = Arc::clone(&ticking);

        let handle = tokio::spawn(async move {
            let mut connection = wallet.subscribe_connection();
            loop {
                if *connection.borrow_and_update() {
                    task_ticking.store(true, Ordering::SeqCst);
                    refresh_while_connected(
                        gateway.as_ref(),
                        wallet.as_ref(),
                        &mut connection,
                        period,
                        &sender,
                    )
                    .await;
                    task_ticking.store(false, Ordering::SeqCst);
                    debug!("Wallet disconnected, balance refresh paused");
                }
                if connection.changed().await.is_err() {
                    debug!("Wallet connection closed, balance refresh stopped");
                    break;
                }
            }
        });

        Self {
            handle,
            balance,
            ticking,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<u64>> {
        self.balance.clone()
    }

    /// Last balance read, in lamports.
    pub fn latest(&self) -> Option<u64> {
        *self.balance.borrow()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Whether the refresh timer is armed, i.e. the wallet is connected.
    pub fn is_ticking(&self) -> bool {
        self.is_running() && self.ticking.load(Ordering::SeqCst)
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for BalanceRefresher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Tick until the connection reports a disconnect.
async fn refresh_while_connected(
    gateway: &dyn Gateway,
    wallet: &dyn WalletCapability,
    connection: &mut watch::Receiver<bool>,
    period: Duration,
    sender: &watch::Sender<Option<u64>>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut watching = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(owner) = wallet.public_identity() else {
                    continue;
                };
                match gateway.get_balance(&owner).await {
                    Ok(lamports) => {
                        sender.send_replace(Some(lamports));
                    }
                    Err(e) => warn!("Balance refresh for {owner} failed: {e}"),
                }
            }
            changed = connection.changed(), if watching => {
                match changed {
                    Ok(()) if !*connection.borrow_and_update() => return,
                    Ok(()) => {}
                    // No further connection updates; keep ticking.
                    Err(_) => watching = false,
                }
            }
        }
    }
}
