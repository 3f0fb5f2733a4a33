use tastematch_core::config::ConfigOverrides;

use crate::commands::{block_on, load_config, open_database, CommandResult};

pub fn run(overrides: ConfigOverrides) -> CommandResult {
    let result = load_config(overrides).and_then(|config| {
        block_on(async {
            let pool = open_database(&config).await?;
            pool.close().await;
            Ok(())
        })
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => failure.into_result("migrate"),
    }
}
