//! The recommendation ranker: general, category, occasion/season, and
//! similar-customer variants. Business outcomes are values; only
//! repository failures surface as errors.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use shopsense_core::chrono::Utc;
use shopsense_core::domain::customer::{CustomerId, CustomerProfile};
use shopsense_core::domain::memory::MemoryKind;
use shopsense_core::domain::product::ProductRecord;
use shopsense_core::domain::recommendation::{
    LoggedRecommendation, RecommendationContext, RecommendationOutcome, RecommendationSet,
    RecommendedProduct,
};
use shopsense_core::ranking::{
    Jitter, RankingEngine, ScoredCandidate, CATEGORY_CANDIDATE_POOL, CURATED_CANDIDATE_POOL,
    CURATED_PROMPT_PRODUCTS, GENERAL_CANDIDATE_POOL, SIMILAR_CANDIDATE_POOL,
    SIMILAR_CUSTOMER_LIMIT, SIMILAR_CUSTOMER_MAX_AGE_GAP,
};
use shopsense_db::repositories::{
    CustomerRepository, ProductRepository, RecommendationRepository,
};

use crate::json::parse_ranked_picks;
use crate::llm::{GenerateOptions, LlmClient};
use crate::memory::AgentMemory;
use crate::{prompts, AgentError};

const EMPTY_CATALOG_MESSAGE: &str = "No products available for recommendations";

pub struct RecommendationAgent {
    customers: Arc<dyn CustomerRepository>,
    products: Arc<dyn ProductRepository>,
    log: Arc<dyn RecommendationRepository>,
    llm: Arc<dyn LlmClient>,
    engine: Mutex<RankingEngine>,
    memory: AgentMemory,
}

impl RecommendationAgent {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        products: Arc<dyn ProductRepository>,
        log: Arc<dyn RecommendationRepository>,
        llm: Arc<dyn LlmClient>,
        memory: AgentMemory,
        jitter: Jitter,
        min_score: f64,
    ) -> Self {
        Self {
            customers,
            products,
            log,
            llm,
            engine: Mutex::new(RankingEngine::new(jitter, min_score)),
            memory,
        }
    }

    /// Rank the whole catalog for one customer.
    pub async fn general(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<RecommendationOutcome, AgentError> {
        let Some(customer) = self.customers.find_by_id(customer_id).await? else {
            return Ok(RecommendationOutcome::CustomerNotFound {
                customer_id: customer_id.clone(),
            });
        };

        let pool = self.products.top_rated(GENERAL_CANDIDATE_POOL).await?;
        if pool.is_empty() {
            return Ok(RecommendationOutcome::NoCandidates {
                message: EMPTY_CATALOG_MESSAGE.to_string(),
            });
        }

        let ranked = self.engine.lock().await.rank(&customer, pool, limit);
        if ranked.is_empty() {
            return Ok(RecommendationOutcome::NoCandidates {
                message: EMPTY_CATALOG_MESSAGE.to_string(),
            });
        }

        self.finish_ranked(&customer, ranked, RecommendationContext::General).await
    }

    /// Rank one category only.
    pub async fn by_category(
        &self,
        customer_id: &CustomerId,
        category: &str,
        limit: usize,
    ) -> Result<RecommendationOutcome, AgentError> {
        let Some(customer) = self.customers.find_by_id(customer_id).await? else {
            return Ok(RecommendationOutcome::CustomerNotFound {
                customer_id: customer_id.clone(),
            });
        };

        let pool = self.products.top_rated_in_category(category, CATEGORY_CANDIDATE_POOL).await?;
        if pool.is_empty() {
            return Ok(RecommendationOutcome::NoCandidates {
                message: format!("No products available in category {category}"),
            });
        }

        let ranked = self.engine.lock().await.rank(&customer, pool, limit);
        if ranked.is_empty() {
            return Ok(RecommendationOutcome::NoCandidates {
                message: format!("No products available in category {category}"),
            });
        }

        self.finish_ranked(&customer, ranked, RecommendationContext::Category(category.to_string()))
            .await
    }

    /// LLM-curated picks for an occasion (birthday, anniversary, ...).
    pub async fn by_occasion(
        &self,
        customer_id: &CustomerId,
        occasion: &str,
        limit: usize,
    ) -> Result<RecommendationOutcome, AgentError> {
        self.curated(customer_id, CuratedKind::Occasion, occasion, limit).await
    }

    /// LLM-curated picks for a season (winter, summer, ...).
    pub async fn by_season(
        &self,
        customer_id: &CustomerId,
        season: &str,
        limit: usize,
    ) -> Result<RecommendationOutcome, AgentError> {
        self.curated(customer_id, CuratedKind::Season, season, limit).await
    }

    /// Boost products that similar customers were recommended. Falls back
    /// to [`general`](Self::general) when no similar customers or no
    /// co-recommended candidates exist.
    pub async fn from_similar_customers(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<RecommendationOutcome, AgentError> {
        let Some(customer) = self.customers.find_by_id(customer_id).await? else {
            return Ok(RecommendationOutcome::CustomerNotFound {
                customer_id: customer_id.clone(),
            });
        };

        let similar = self
            .customers
            .find_similar(&customer, SIMILAR_CUSTOMER_MAX_AGE_GAP, SIMILAR_CUSTOMER_LIMIT)
            .await?;
        if similar.is_empty() {
            debug!(customer_id = %customer_id.0, "no similar customers; using general ranking");
            return self.general(customer_id, limit).await;
        }

        let similar_ids: Vec<CustomerId> = similar.into_iter().map(|c| c.id).collect();
        let mut pool =
            self.log.co_recommended_products(&similar_ids, SIMILAR_CANDIDATE_POOL).await?;

        // Pad a thin pool with top-rated products at zero boost.
        if pool.len() < SIMILAR_CANDIDATE_POOL {
            let fill = self.products.top_rated(SIMILAR_CANDIDATE_POOL).await?;
            for product in fill {
                if pool.len() >= SIMILAR_CANDIDATE_POOL {
                    break;
                }
                if pool.iter().all(|(existing, _)| existing.id != product.id) {
                    pool.push((product, 0));
                }
            }
        }
        if pool.is_empty() {
            return self.general(customer_id, limit).await;
        }

        let ranked = self.engine.lock().await.rank_with_boosts(&customer, pool, limit);
        if ranked.is_empty() {
            return Ok(RecommendationOutcome::NoCandidates {
                message: EMPTY_CATALOG_MESSAGE.to_string(),
            });
        }

        self.finish_ranked(&customer, ranked, RecommendationContext::SimilarCustomers).await
    }

    async fn curated(
        &self,
        customer_id: &CustomerId,
        kind: CuratedKind,
        label: &str,
        limit: usize,
    ) -> Result<RecommendationOutcome, AgentError> {
        let Some(customer) = self.customers.find_by_id(customer_id).await? else {
            return Ok(RecommendationOutcome::CustomerNotFound {
                customer_id: customer_id.clone(),
            });
        };

        let pool = self.products.top_rated(CURATED_CANDIDATE_POOL).await?;
        if pool.is_empty() {
            return Ok(RecommendationOutcome::NoCandidates {
                message: EMPTY_CATALOG_MESSAGE.to_string(),
            });
        }

        let prompt_pool = &pool[..pool.len().min(CURATED_PROMPT_PRODUCTS)];
        let selection_prompt = match kind {
            CuratedKind::Occasion => {
                prompts::occasion_selection(&customer, prompt_pool, label, limit)
            }
            CuratedKind::Season => prompts::season_selection(&customer, prompt_pool, label, limit),
        };
        let reply = self.llm.generate(&selection_prompt, &GenerateOptions::default()).await;

        let Some(mut picks) = parse_ranked_picks(&reply) else {
            return Ok(RecommendationOutcome::GenerationFailed {
                message: format!(
                    "Failed to generate recommendations for {label} {}",
                    kind.noun()
                ),
            });
        };
        picks.truncate(limit);

        // Ids are resolved against the full candidate pool, not just the
        // products shown in the prompt. Unknown ids are dropped without
        // comment; small models invent ids often enough that this is routine.
        let recommendations: Vec<RecommendedProduct> = picks
            .iter()
            .filter_map(|pick| {
                pool.iter()
                    .find(|product| product.id.0 == pick.product_id)
                    .map(|product| to_recommended(product, pick.score_or_default().clamp(0.0, 1.0)))
            })
            .collect();

        if recommendations.is_empty() {
            let message = match kind {
                CuratedKind::Occasion => format!(
                    "We couldn't find suitable products for a {label} occasion based on your preferences."
                ),
                CuratedKind::Season => format!(
                    "We couldn't find suitable products for the {label} season based on your preferences."
                ),
            };
            return Ok(RecommendationOutcome::Ranked(RecommendationSet {
                customer_id: customer.id.clone(),
                context: kind.context(label),
                recommendations,
                explanation: message,
            }));
        }

        self.log_recommendations(&customer.id, &recommendations).await?;

        let explanation_prompt = match kind {
            CuratedKind::Occasion => {
                prompts::occasion_explanation(&customer, &recommendations, label)
            }
            CuratedKind::Season => prompts::season_explanation(&customer, &recommendations, label),
        };
        let explanation =
            self.llm.generate(&explanation_prompt, &GenerateOptions::default()).await;

        self.remember(&customer, kind.context(label), recommendations.len()).await;

        Ok(RecommendationOutcome::Ranked(RecommendationSet {
            customer_id: customer.id.clone(),
            context: kind.context(label),
            recommendations,
            explanation,
        }))
    }

    async fn finish_ranked(
        &self,
        customer: &CustomerProfile,
        ranked: Vec<ScoredCandidate>,
        context: RecommendationContext,
    ) -> Result<RecommendationOutcome, AgentError> {
        let recommendations: Vec<RecommendedProduct> = ranked
            .iter()
            .map(|candidate| to_recommended(&candidate.product, candidate.score))
            .collect();

        self.log_recommendations(&customer.id, &recommendations).await?;

        let prompt = prompts::recommendation_explanation(customer, &recommendations);
        let explanation = self.llm.generate(&prompt, &GenerateOptions::default()).await;

        self.remember(customer, context.clone(), recommendations.len()).await;

        Ok(RecommendationOutcome::Ranked(RecommendationSet {
            customer_id: customer.id.clone(),
            context,
            recommendations,
            explanation,
        }))
    }

    async fn log_recommendations(
        &self,
        customer_id: &CustomerId,
        recommendations: &[RecommendedProduct],
    ) -> Result<(), AgentError> {
        for item in recommendations {
            self.log
                .log(LoggedRecommendation {
                    customer_id: customer_id.clone(),
                    product_id: item.product_id.clone(),
                    score: item.score,
                    recommended_at: Utc::now(),
                })
                .await?;
        }
        Ok(())
    }

    async fn remember(
        &self,
        customer: &CustomerProfile,
        context: RecommendationContext,
        count: usize,
    ) {
        let value = format!(
            "recommended {count} products to {} (context: {context:?})",
            customer.id.0
        );
        self.memory.record(MemoryKind::Experience, Some(&customer.id.0), &value).await;
    }
}

#[derive(Clone, Copy)]
enum CuratedKind {
    Occasion,
    Season,
}

impl CuratedKind {
    fn noun(self) -> &'static str {
        match self {
            Self::Occasion => "occasion",
            Self::Season => "season",
        }
    }

    fn context(self, label: &str) -> RecommendationContext {
        match self {
            Self::Occasion => RecommendationContext::Occasion(label.to_string()),
            Self::Season => RecommendationContext::Season(label.to_string()),
        }
    }
}

fn to_recommended(product: &ProductRecord, score: f64) -> RecommendedProduct {
    RecommendedProduct {
        product_id: product.id.clone(),
        category: product.category.clone(),
        subcategory: product.subcategory.clone(),
        price: product.price,
        brand: product.brand.clone(),
        score,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shopsense_core::chrono::{DateTime, Utc};
    use shopsense_core::domain::customer::{CustomerId, CustomerProfile};
    use shopsense_core::domain::product::{ProductId, ProductRecord};
    use shopsense_core::domain::recommendation::{
        LoggedRecommendation, RecommendationContext, RecommendationOutcome,
    };
    use shopsense_core::ranking::{Jitter, MIN_RECOMMENDATION_SCORE};
    use shopsense_db::repositories::{
        CustomerRepository, InMemoryAgentMemoryRepository, InMemoryCustomerRepository,
        InMemoryProductRepository, InMemoryRecommendationRepository, ProductRepository,
        RecommendationRepository,
    };

    use super::RecommendationAgent;
    use crate::llm::testing::MockLlm;
    use crate::memory::AgentMemory;

    struct Harness {
        agent: RecommendationAgent,
        llm: Arc<MockLlm>,
        customers: Arc<InMemoryCustomerRepository>,
        products: Arc<InMemoryProductRepository>,
        log: Arc<InMemoryRecommendationRepository>,
    }

    fn harness(replies: &[&str]) -> Harness {
        let customers = Arc::new(InMemoryCustomerRepository::new());
        let products = Arc::new(InMemoryProductRepository::new());
        let log = Arc::new(InMemoryRecommendationRepository::new(Arc::clone(&products)));
        let llm = Arc::new(MockLlm::with_replies(replies));
        let memory = AgentMemory::new(
            "recommendation",
            Arc::new(InMemoryAgentMemoryRepository::new()),
            Arc::clone(&llm) as Arc<dyn crate::llm::LlmClient>,
        );
        let agent = RecommendationAgent::new(
            Arc::clone(&customers) as Arc<dyn CustomerRepository>,
            Arc::clone(&products) as Arc<dyn ProductRepository>,
            Arc::clone(&log) as Arc<dyn RecommendationRepository>,
            Arc::clone(&llm) as Arc<dyn crate::llm::LlmClient>,
            memory,
            Jitter::Disabled,
            MIN_RECOMMENDATION_SCORE,
        );
        Harness { agent, llm, customers, products, log }
    }

    fn ts() -> DateTime<Utc> {
        Utc::now()
    }

    fn customer(id: &str) -> CustomerProfile {
        CustomerProfile {
            id: CustomerId(id.to_string()),
            age: 30,
            gender: None,
            location: "Chicago".to_string(),
            browsing_history: vec!["Electronics".to_string()],
            purchase_history: vec!["Electronics".to_string()],
            segment: "Frequent Buyer".to_string(),
            avg_order_value: 1000.0,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn product(id: &str, category: &str, price: f64, rating: f64) -> ProductRecord {
        ProductRecord {
            id: ProductId(id.to_string()),
            category: category.to_string(),
            subcategory: format!("{category} Sub"),
            price,
            brand: "TestBrand".to_string(),
            rating: Some(rating),
            sentiment_score: None,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    #[tokio::test]
    async fn general_ranks_logs_and_explains() {
        let h = harness(&["Because you buy electronics at this price point."]);
        h.customers.save(customer("C-1")).await.expect("save customer");
        // Electronics at the customer's order value scores high; the
        // off-category bargain falls below threshold.
        h.products.save(product("P-HIT", "Electronics", 1000.0, 5.0)).await.expect("save");
        h.products.save(product("P-MISS", "Gardening", 9900.0, 0.5)).await.expect("save");

        let outcome = h.agent.general(&CustomerId("C-1".to_string()), 5).await.expect("rank");
        let set = outcome.as_ranked().expect("ranked outcome");

        assert_eq!(set.context, RecommendationContext::General);
        assert_eq!(set.recommendations.len(), 1);
        assert_eq!(set.recommendations[0].product_id.0, "P-HIT");
        // affinity 0.8*0.4 + price_fit 1.0*0.3 + quality 1.0*0.3 = 0.92
        assert!((set.recommendations[0].score - 0.92).abs() < 1e-9);
        assert_eq!(set.explanation, "Because you buy electronics at this price point.");

        let logged = h
            .log
            .recent_for_customer(&CustomerId("C-1".to_string()), 10)
            .await
            .expect("read log");
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].0.id.0, "P-HIT");
    }

    #[tokio::test]
    async fn unknown_customer_is_a_value_not_an_error() {
        let h = harness(&[]);

        let outcome =
            h.agent.general(&CustomerId("C-GHOST".to_string()), 5).await.expect("rank");

        assert_eq!(
            outcome,
            RecommendationOutcome::CustomerNotFound {
                customer_id: CustomerId("C-GHOST".to_string())
            }
        );
    }

    #[tokio::test]
    async fn empty_catalog_yields_no_candidates() {
        let h = harness(&[]);
        h.customers.save(customer("C-1")).await.expect("save customer");

        let outcome = h.agent.general(&CustomerId("C-1".to_string()), 5).await.expect("rank");

        assert_eq!(
            outcome,
            RecommendationOutcome::NoCandidates {
                message: "No products available for recommendations".to_string()
            }
        );
    }

    #[tokio::test]
    async fn empty_category_names_the_category() {
        let h = harness(&[]);
        h.customers.save(customer("C-1")).await.expect("save customer");
        h.products.save(product("P-1", "Electronics", 100.0, 4.0)).await.expect("save");

        let outcome = h
            .agent
            .by_category(&CustomerId("C-1".to_string()), "Gardening", 5)
            .await
            .expect("rank");

        assert_eq!(
            outcome,
            RecommendationOutcome::NoCandidates {
                message: "No products available in category Gardening".to_string()
            }
        );
    }

    #[tokio::test]
    async fn occasion_picks_are_parsed_and_unknown_ids_dropped() {
        let picks = r#"Here you go:
[
  {"product_id": "P-A", "suitability_score": 0.9, "explanation": "great gift"},
  {"product_id": "P-INVENTED", "suitability_score": 0.8},
  {"product_id": "P-B"}
]"#;
        let h = harness(&[picks, "A birthday set that suits you."]);
        h.customers.save(customer("C-1")).await.expect("save customer");
        h.products.save(product("P-A", "Electronics", 500.0, 4.8)).await.expect("save");
        h.products.save(product("P-B", "Books", 25.0, 4.2)).await.expect("save");

        let outcome = h
            .agent
            .by_occasion(&CustomerId("C-1".to_string()), "birthday", 5)
            .await
            .expect("rank");
        let set = outcome.as_ranked().expect("ranked outcome");

        assert_eq!(set.context, RecommendationContext::Occasion("birthday".to_string()));
        let ids: Vec<&str> = set.recommendations.iter().map(|r| r.product_id.0.as_str()).collect();
        assert_eq!(ids, vec!["P-A", "P-B"]);
        assert!((set.recommendations[0].score - 0.9).abs() < 1e-9);
        // Missing score defaults to the neutral midpoint.
        assert!((set.recommendations[1].score - 0.5).abs() < 1e-9);
        assert_eq!(set.explanation, "A birthday set that suits you.");

        let prompts = h.llm.recorded_prompts().await;
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("birthday"));
    }

    #[tokio::test]
    async fn unparseable_occasion_reply_is_generation_failed() {
        let h = harness(&["I would suggest some nice products for you!"]);
        h.customers.save(customer("C-1")).await.expect("save customer");
        h.products.save(product("P-A", "Electronics", 500.0, 4.8)).await.expect("save");

        let outcome = h
            .agent
            .by_occasion(&CustomerId("C-1".to_string()), "birthday", 5)
            .await
            .expect("rank");

        assert_eq!(
            outcome,
            RecommendationOutcome::GenerationFailed {
                message: "Failed to generate recommendations for birthday occasion".to_string()
            }
        );
    }

    #[tokio::test]
    async fn empty_season_picks_use_fixed_message_without_second_call() {
        let h = harness(&["[]"]);
        h.customers.save(customer("C-1")).await.expect("save customer");
        h.products.save(product("P-A", "Electronics", 500.0, 4.8)).await.expect("save");

        let outcome =
            h.agent.by_season(&CustomerId("C-1".to_string()), "winter", 5).await.expect("rank");
        let set = outcome.as_ranked().expect("ranked outcome");

        assert!(set.recommendations.is_empty());
        assert_eq!(
            set.explanation,
            "We couldn't find suitable products for the winter season based on your preferences."
        );
        // Only the selection prompt went out.
        assert_eq!(h.llm.recorded_prompts().await.len(), 1);
    }

    #[tokio::test]
    async fn occasion_picks_resolve_against_the_full_candidate_pool() {
        let picks = r#"[{"product_id": "P-DEEP", "suitability_score": 0.7}]"#;
        let h = harness(&[picks, "A quieter pick from further down the list."]);
        h.customers.save(customer("C-1")).await.expect("save customer");
        // Twenty higher-rated products fill the prompt; the picked product
        // sits past them in the candidate pool.
        for n in 0..20 {
            h.products
                .save(product(&format!("P-{n:02}"), "Electronics", 500.0, 4.9))
                .await
                .expect("save");
        }
        h.products.save(product("P-DEEP", "Books", 30.0, 4.0)).await.expect("save");

        let outcome = h
            .agent
            .by_occasion(&CustomerId("C-1".to_string()), "birthday", 5)
            .await
            .expect("rank");
        let set = outcome.as_ranked().expect("ranked outcome");

        assert_eq!(set.recommendations.len(), 1);
        assert_eq!(set.recommendations[0].product_id.0, "P-DEEP");
        // The prompt itself still carries only the leading products.
        let prompts = h.llm.recorded_prompts().await;
        assert!(!prompts[0].contains("P-DEEP"));
    }

    #[tokio::test]
    async fn similar_customers_fall_back_to_general_when_none_match() {
        let h = harness(&["General picks for you."]);
        h.customers.save(customer("C-1")).await.expect("save customer");
        h.products.save(product("P-HIT", "Electronics", 1000.0, 5.0)).await.expect("save");

        let outcome = h
            .agent
            .from_similar_customers(&CustomerId("C-1".to_string()), 5)
            .await
            .expect("rank");
        let set = outcome.as_ranked().expect("ranked outcome");

        assert_eq!(set.context, RecommendationContext::General);
        assert_eq!(set.recommendations.len(), 1);
    }

    #[tokio::test]
    async fn co_recommendation_boost_admits_borderline_products() {
        let h = harness(&["Neighbors with your taste liked these."]);

        let mut subject = customer("C-1");
        subject.browsing_history = vec!["Books".to_string()];
        subject.purchase_history.clear();
        h.customers.save(subject).await.expect("save customer");

        for peer_id in ["C-2", "C-3", "C-4"] {
            h.customers.save(customer(peer_id)).await.expect("save customer");
        }

        // Without a boost this product scores 0.072 for the subject:
        // affinity 0, price_fit 0, quality 1.2/5 * 0.3. Three peers give
        // the capped 0.3 boost, which lifts it past the threshold.
        let borderline = product("P-EDGE", "Gardening", 9900.0, 1.2);
        h.products.save(borderline).await.expect("save");

        for peer_id in ["C-2", "C-3", "C-4"] {
            h.log
                .log(LoggedRecommendation {
                    customer_id: CustomerId(peer_id.to_string()),
                    product_id: ProductId("P-EDGE".to_string()),
                    score: 0.8,
                    recommended_at: Utc::now(),
                })
                .await
                .expect("log");
        }

        let outcome = h
            .agent
            .from_similar_customers(&CustomerId("C-1".to_string()), 5)
            .await
            .expect("rank");
        let set = outcome.as_ranked().expect("ranked outcome");

        assert_eq!(set.context, RecommendationContext::SimilarCustomers);
        let ids: Vec<&str> = set.recommendations.iter().map(|r| r.product_id.0.as_str()).collect();
        assert!(ids.contains(&"P-EDGE"), "boosted product should be admitted: {ids:?}");
    }
}
