//! `serve`: run the coordinator until Ctrl+C.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actor::Coordinator;
use crate::config::HmrConfig;
use crate::core::register_shutdown;
use crate::hmr::{Hmr, Slot, SourcePatchInjector};
use crate::log;
use crate::transform::Transformer;

pub fn serve(config: Arc<HmrConfig>) -> Result<()> {
    let hmr = Arc::new(Hmr::new(&config.client));
    let patcher =
        SourcePatchInjector::from_config(&config.patch).context("invalid [patch] marker")?;
    let transformer = Arc::new(Transformer::new(
        config.watch_root(),
        config.client.id_attr.clone(),
        patcher,
    ));

    // Server-side half of the fragment slot: a refetch re-transforms
    let cache = Arc::clone(&transformer);
    hmr.on_reload(Slot::Fragment, Arc::new(move || cache.clear()));

    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded(1);
    register_shutdown(shutdown_tx);

    log!("serve"; "watching {}", config.watch_root().display());

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(
        Coordinator::new(config, hmr, transformer)
            .with_shutdown_signal(shutdown_rx)
            .run(),
    )
}
