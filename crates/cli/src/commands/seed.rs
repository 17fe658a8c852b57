use crate::commands::CommandResult;
use shopsense_core::config::{AppConfig, LoadOptions};
use shopsense_db::{connect_with_settings, migrations, DemoSeedDataset, SeedResult};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedResult, (&'static str, String, u8)> =
            if verification.is_complete() {
                Ok(seed_result)
            } else {
                Err((
                    "seed_verification",
                    format!(
                        "demo catalog is incomplete after load: {} customers, {} products, {} recommendations",
                        verification.customers, verification.products, verification.recommendations
                    ),
                    6u8,
                ))
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seed_result) => {
            CommandResult::success("seed", describe(&seed_result))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn describe(result: &SeedResult) -> String {
    if result.already_seeded {
        format!(
            "demo catalog already present, nothing loaded: {} customers, {} products, {} recommendations",
            result.customers, result.products, result.recommendations
        )
    } else {
        format!(
            "demo catalog loaded: {} customers, {} products, {} recommendations",
            result.customers, result.products, result.recommendations
        )
    }
}

#[cfg(test)]
mod tests {
    use super::describe;
    use shopsense_db::SeedResult;

    #[test]
    fn reload_is_reported_as_a_no_op() {
        let message = describe(&SeedResult {
            customers: 3,
            products: 6,
            recommendations: 6,
            already_seeded: true,
        });

        assert_eq!(
            message,
            "demo catalog already present, nothing loaded: 3 customers, 6 products, 6 recommendations"
        );
    }

    #[test]
    fn first_load_reports_row_counts() {
        let message = describe(&SeedResult {
            customers: 3,
            products: 6,
            recommendations: 6,
            already_seeded: false,
        });

        assert_eq!(message, "demo catalog loaded: 3 customers, 6 products, 6 recommendations");
    }
}
