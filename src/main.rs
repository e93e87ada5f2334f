// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `shield-watcher`: keep HyperHDR in step with an Android TV.
//!
//! Configuration comes from the environment (see
//! [`shield_watcher::config`]). Exit status: `1` adb not found, `2`
//! connection failed under the fail-fast policy, `3` log backlog flush
//! failed, `4` invalid configuration, `5` HyperHDR client setup failed,
//! `130` interrupted, `0` on SIGTERM/SIGQUIT.

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shield_watcher::mirror::{Mirror, seed_state};
use shield_watcher::{Error, Watcher, WatcherConfig};

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shield_watcher=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    tokio::select! {
        result = run() => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!(error = %err, "Exiting");
                err.exit_code()
            }
        },
        code = shutdown_signal() => code,
    }
}

async fn run() -> Result<(), Error> {
    let config = WatcherConfig::from_env()?;
    tracing::info!(
        shield = %config.shield_host(),
        adb_port = config.adb_port(),
        hyperhdr = %config.hyperhdr_host(),
        hyperhdr_port = config.hyperhdr_port(),
        "Starting shield-watcher"
    );

    let hyperhdr = config.hyperhdr().into_client()?;
    let seed = seed_state(&hyperhdr).await;
    let (mirror, _worker) = Mirror::spawn(hyperhdr);

    let mut watcher = Watcher::builder(config.log_source())
        .with_initial_state(seed)
        .with_supervisor_config(config.supervisor())
        .with_tick(config.tick())
        .build();
    mirror.install(watcher.callbacks_mut());

    watcher.run().await?;
    Ok(())
}

/// Resolves with the exit status matching the first termination signal.
async fn shutdown_signal() -> ExitCode {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "Could not listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::terminate()), signal(SignalKind::quit())) {
            (Ok(mut term), Ok(mut quit)) => {
                tokio::select! {
                    _ = term.recv() => {},
                    _ = quit.recv() => {},
                }
            }
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(error = %err, "Could not listen for SIGTERM/SIGQUIT");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {
            tracing::info!("Interrupted");
            ExitCode::from(130)
        },
        () = terminate => {
            tracing::info!("Terminated");
            ExitCode::SUCCESS
        },
    }
}
