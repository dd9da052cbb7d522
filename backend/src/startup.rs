use anyhow::{Context, Result};
use santa_core::{run_seed, seeded_rng, Exchange, PersistentStore, CURRENT_FORMAT_VERSION};
use tracing::info;

use crate::config::Cli;
use crate::{admin, backup};

/// Everything `main` needs before it decides whether to serve.
pub struct Startup {
    pub exchange: Exchange,
    pub store: PersistentStore,
}

/// Backs up, loads or draws the roster, applies the admin flags, and saves
/// whatever changed. The save happens here, before any listener is bound,
/// so tokens printed by `--show-people` are already on disk.
pub fn prepare(cli: &Cli) -> Result<Startup> {
    let seed = run_seed(cli.internal);
    info!(seed, "seeded draw");
    let mut rng = seeded_rng(seed);

    backup::backup_data_file(&cli.data_file, &cli.backup_dir)
        .with_context(|| format!("backing up {}", cli.data_file.display()))?;

    let store = PersistentStore::new(cli.data_file.clone());
    let loaded = store
        .load()
        .with_context(|| format!("loading {}", store.path().display()))?;
    let (mut exchange, mut did_work) = match loaded {
        Some(record) => {
            let migrated = record.format_version() < CURRENT_FORMAT_VERSION;
            let exchange = Exchange::restore(record, &mut rng)
                .with_context(|| format!("loading {}", store.path().display()))?;
            (exchange, migrated)
        }
        None => (Exchange::fresh(&cli.participants(), &mut rng)?, true),
    };

    did_work |= admin::apply(&mut exchange, &cli.admin, &mut rng)?;

    if did_work {
        store
            .save(&exchange.to_record())
            .with_context(|| format!("saving {}", store.path().display()))?;
    }

    Ok(Startup { exchange, store })
}
