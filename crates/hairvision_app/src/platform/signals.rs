//! Maps process signals onto the controller's cancellation triggers.
//!
//! Ctrl-C is the user's cancel; pressing it again while the backend has not
//! confirmed the cancel stops waiting for that confirmation. SIGTERM and
//! SIGHUP mean the process is going away, which is handled like a page
//! unload.

use std::io;
use std::sync::mpsc;
use std::thread;

use engine_logging::{engine_info, engine_warn};
use hairvision_core::{CancelTrigger, Msg};

pub fn spawn_listener(msg_tx: mpsc::Sender<Msg>) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    thread::Builder::new()
        .name("hairvision-signals".to_string())
        .spawn(move || runtime.block_on(listen(msg_tx)))?;
    Ok(())
}

#[cfg(unix)]
async fn listen(msg_tx: mpsc::Sender<Msg>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut terminate, mut hangup) =
        match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
            (Ok(terminate), Ok(hangup)) => (terminate, hangup),
            (Err(err), _) | (_, Err(err)) => {
                engine_warn!("Termination signals unavailable ({err}); listening for Ctrl-C only");
                return listen_ctrl_c(msg_tx).await;
            }
        };

    loop {
        let trigger = tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => CancelTrigger::User,
                Err(err) => {
                    engine_warn!("Ctrl-C handler failed: {err}");
                    return;
                }
            },
            _ = terminate.recv() => CancelTrigger::Unload,
            _ = hangup.recv() => CancelTrigger::Unload,
        };
        engine_info!("Signal received, cancel trigger {:?}", trigger);
        if msg_tx.send(Msg::Cancel(trigger)).is_err() {
            return;
        }
    }
}

#[cfg(not(unix))]
async fn listen(msg_tx: mpsc::Sender<Msg>) {
    listen_ctrl_c(msg_tx).await
}

async fn listen_ctrl_c(msg_tx: mpsc::Sender<Msg>) {
    while tokio::signal::ctrl_c().await.is_ok() {
        engine_info!("Ctrl-C received");
        if msg_tx.send(Msg::Cancel(CancelTrigger::User)).is_err() {
            return;
        }
    }
}
