use std::sync::Arc;

use crate::commands::CommandResult;
use crate::RecommendArgs;
use shopsense_agent::{AgentMemory, LlmClient, OllamaClient, RecommendationAgent};
use shopsense_core::config::{AppConfig, LoadOptions};
use shopsense_core::domain::customer::CustomerId;
use shopsense_core::domain::recommendation::{
    RecommendationContext, RecommendationOutcome, RecommendationSet,
};
use shopsense_core::ranking::Jitter;
use shopsense_db::repositories::{
    AgentMemoryRepository, CustomerRepository, ProductRepository, RecommendationRepository,
    SqlAgentMemoryRepository, SqlCustomerRepository, SqlProductRepository,
    SqlRecommendationRepository,
};
use shopsense_db::{connect_with_settings, migrations};

pub fn run(args: RecommendArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "recommend",
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
                "recommend",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let llm = match OllamaClient::new(&config.ollama) {
        Ok(client) => Arc::new(client) as Arc<dyn LlmClient>,
        Err(error) => {
            return CommandResult::failure(
                "recommend",
                "ollama_client",
                format!("failed to build HTTP client: {error}"),
                3,
            );
        }
    };

    let context = context_from_args(&args);
    let limit = args.limit.unwrap_or(config.recommendation.top_n);
    let customer_id = CustomerId(args.customer_id.clone());

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

        let customers =
            Arc::new(SqlCustomerRepository::new(pool.clone())) as Arc<dyn CustomerRepository>;
        let products =
            Arc::new(SqlProductRepository::new(pool.clone())) as Arc<dyn ProductRepository>;
        let log = Arc::new(SqlRecommendationRepository::new(pool.clone()))
            as Arc<dyn RecommendationRepository>;
        let memories = Arc::new(SqlAgentMemoryRepository::new(pool.clone()))
            as Arc<dyn AgentMemoryRepository>;

        let agent = RecommendationAgent::new(
            customers,
            products,
            log,
            Arc::clone(&llm),
            AgentMemory::new("recommendation", memories, Arc::clone(&llm)),
            Jitter::Entropy,
            config.recommendation.min_score,
        );

        let outcome = match &context {
            RecommendationContext::General => agent.general(&customer_id, limit).await,
            RecommendationContext::Category(category) => {
                agent.by_category(&customer_id, category, limit).await
            }
            RecommendationContext::Occasion(occasion) => {
                agent.by_occasion(&customer_id, occasion, limit).await
            }
            RecommendationContext::Season(season) => {
                agent.by_season(&customer_id, season, limit).await
            }
            RecommendationContext::SimilarCustomers => {
                agent.from_similar_customers(&customer_id, limit).await
            }
        }
        .map_err(|error| ("recommendation", error.to_string(), 1u8));

        pool.close().await;
        outcome
    });

    match result {
        Ok(outcome) => CommandResult { exit_code: 0, output: render(&outcome, args.json) },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("recommend", error_class, message, exit_code)
        }
    }
}

fn context_from_args(args: &RecommendArgs) -> RecommendationContext {
    if let Some(category) = &args.category {
        return RecommendationContext::Category(category.clone());
    }
    if let Some(occasion) = &args.occasion {
        return RecommendationContext::Occasion(occasion.clone());
    }
    if let Some(season) = &args.season {
        return RecommendationContext::Season(season.clone());
    }
    if args.similar_customers {
        return RecommendationContext::SimilarCustomers;
    }
    RecommendationContext::General
}

fn render(outcome: &RecommendationOutcome, json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(outcome)
            .unwrap_or_else(|error| format!("{{\"status\":\"serialization_error\",\"message\":\"{error}\"}}"));
    }

    match outcome {
        RecommendationOutcome::Ranked(set) => render_set(set),
        RecommendationOutcome::CustomerNotFound { customer_id } => {
            format!("customer {} not found", customer_id.0)
        }
        RecommendationOutcome::NoCandidates { message } => message.clone(),
        RecommendationOutcome::GenerationFailed { message } => message.clone(),
    }
}

fn render_set(set: &RecommendationSet) -> String {
    let mut lines =
        vec![format!("recommendations for {} ({}):", set.customer_id.0, context_label(&set.context))];

    if set.recommendations.is_empty() {
        lines.push("  (no suitable products)".to_string());
    }
    for item in &set.recommendations {
        lines.push(format!(
            "- {} {}/{} {} ${:.2} (score {:.2})",
            item.product_id.0, item.category, item.subcategory, item.brand, item.price, item.score
        ));
    }

    lines.push(String::new());
    lines.push(set.explanation.clone());
    lines.join("\n")
}

fn context_label(context: &RecommendationContext) -> String {
    match context {
        RecommendationContext::General => "general".to_string(),
        RecommendationContext::Category(category) => format!("category: {category}"),
        RecommendationContext::Occasion(occasion) => format!("occasion: {occasion}"),
        RecommendationContext::Season(season) => format!("season: {season}"),
        RecommendationContext::SimilarCustomers => "similar customers".to_string(),
    }
}
