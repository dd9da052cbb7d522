use rand::Rng;
use santa_core::{Exchange, SantaError};
use tracing::info;

use crate::config::AdminArgs;

/// Applies the maintenance flags in a fixed order. Returns whether anything
/// was asked for that needs saving.
pub fn apply<R: Rng + ?Sized>(
    exchange: &mut Exchange,
    args: &AdminArgs,
    rng: &mut R,
) -> Result<bool, SantaError> {
    let mut did_work = args.save;

    if let Some(name) = &args.add_person {
        exchange.directory.add(name, rng)?;
        did_work = true;
    }

    if let Some(name) = &args.remove_person {
        exchange.directory.remove(name)?;
        did_work = true;
    }

    if args.reset_tokens {
        exchange.reset_tokens(rng);
        did_work = true;
    }

    if args.unpick_all {
        exchange.directory.unpick_all();
        info!("unpicked all");
        did_work = true;
    }

    if args.shuffle {
        exchange.directory.reshuffle(rng)?;
        info!("shuffled people");
        did_work = true;
    }

    if args.show_people {
        print!("{}", roster_table(exchange));
    }

    if let Some(name) = &args.unpick {
        exchange.directory.unpick(name)?;
        info!(name = %name, "unpicked");
        did_work = true;
    }

    if let Some(key) = args.set_access_key {
        exchange.set_access_key(key);
        info!("access key set");
        did_work = true;
    }

    Ok(did_work)
}

pub fn roster_table(exchange: &Exchange) -> String {
    exchange
        .directory
        .participants()
        .iter()
        .map(|p| format!("{:>12} [{:>15}] {}\n", p.name, p.token, p.has_picked))
        .collect()
}
