//! Orchestration across the customer, product, and recommendation agents.
//! Each operation fans out to the other agents and folds their results
//! into one combined report or guide.

use std::sync::Arc;

use shopsense_core::domain::customer::{CustomerId, CustomerProfile};
use shopsense_core::domain::product::{CategoryStats, ProductId, ProductRecord};
use shopsense_core::domain::recommendation::{RecommendationContext, RecommendationOutcome};
use shopsense_core::ranking::SIMILAR_CUSTOMER_LIMIT;

use crate::customer::{CustomerAgent, CustomerAnalysis};
use crate::llm::{GenerateOptions, LlmClient};
use crate::memory::AgentMemory;
use crate::product::{ProductAgent, ProductAnalysis};
use crate::recommendation::RecommendationAgent;
use crate::{prompts, AgentError};

const TREND_PRODUCT_LIMIT: usize = 5;

/// Recommendations wrapped with the interest prediction and the combined
/// shopping guide.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalizedGuide {
    pub outcome: RecommendationOutcome,
    pub interests: Option<String>,
    pub guide: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerProfileReport {
    pub profile: CustomerProfile,
    pub browsing_analysis: String,
    pub purchase_analysis: String,
    pub similar_customers: Vec<CustomerProfile>,
    pub recommendations: RecommendationOutcome,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductReport {
    pub product: ProductRecord,
    pub similar_commentary: String,
    pub complementary_commentary: String,
    pub category_insights: Option<String>,
    pub report: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTrendReport {
    pub stats: CategoryStats,
    pub insights: String,
    pub trending: Vec<ProductRecord>,
    pub narrative: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalGuide {
    pub outcome: RecommendationOutcome,
    pub category_insights: Option<String>,
    pub guide: Option<String>,
}

pub struct CoordinationAgent {
    customer: Arc<CustomerAgent>,
    product: Arc<ProductAgent>,
    recommendation: Arc<RecommendationAgent>,
    llm: Arc<dyn LlmClient>,
    memory: AgentMemory,
}

impl CoordinationAgent {
    pub fn new(
        customer: Arc<CustomerAgent>,
        product: Arc<ProductAgent>,
        recommendation: Arc<RecommendationAgent>,
        llm: Arc<dyn LlmClient>,
        memory: AgentMemory,
    ) -> Self {
        Self { customer, product, recommendation, llm, memory }
    }

    /// Route to the ranker variant for `context`, prepend an interest
    /// prediction, and produce a combined shopping guide.
    pub async fn personalized_recommendations(
        &self,
        customer_id: &CustomerId,
        context: &RecommendationContext,
        limit: usize,
    ) -> Result<PersonalizedGuide, AgentError> {
        let interests = match self.customer.predict_interests(customer_id).await? {
            CustomerAnalysis::Analysis { text } => Some(text),
            _ => None,
        };

        let outcome = match context {
            RecommendationContext::General => {
                self.recommendation.general(customer_id, limit).await?
            }
            RecommendationContext::Category(category) => {
                self.recommendation.by_category(customer_id, category, limit).await?
            }
            RecommendationContext::Occasion(occasion) => {
                self.recommendation.by_occasion(customer_id, occasion, limit).await?
            }
            RecommendationContext::Season(season) => {
                self.recommendation.by_season(customer_id, season, limit).await?
            }
            RecommendationContext::SimilarCustomers => {
                self.recommendation.from_similar_customers(customer_id, limit).await?
            }
        };

        let Some(set) = outcome.as_ranked() else {
            return Ok(PersonalizedGuide { outcome, interests, guide: None });
        };
        let Some(profile) = self.customer.profile(customer_id).await? else {
            return Ok(PersonalizedGuide { outcome, interests, guide: None });
        };

        let top_pick = match set.recommendations.first() {
            Some(first) => self.product.details(&first.product_id).await?,
            None => None,
        };
        let prompt = prompts::shopping_guide(
            &profile,
            interests.as_deref().unwrap_or("n/a"),
            &set.recommendations,
            top_pick.as_ref(),
        );
        let guide = self.llm.generate(&prompt, &GenerateOptions::default()).await;
        self.memory
            .observe(Some(&customer_id.0), &format!("produced shopping guide for {}", customer_id.0))
            .await;

        Ok(PersonalizedGuide { outcome, interests, guide: Some(guide) })
    }

    /// Full customer work-up: profile, both history analyses, similar
    /// customers, general recommendations, and a composed summary.
    pub async fn customer_profile_analysis(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Option<CustomerProfileReport>, AgentError> {
        let Some(profile) = self.customer.profile(customer_id).await? else {
            return Ok(None);
        };

        let browsing_analysis =
            analysis_text(self.customer.analyze_browsing_history(customer_id).await?);
        let purchase_analysis =
            analysis_text(self.customer.analyze_purchase_history(customer_id).await?);
        let similar_customers = self
            .customer
            .similar_customers(customer_id, SIMILAR_CUSTOMER_LIMIT)
            .await?
            .unwrap_or_default();
        let recommendations = self.recommendation.general(customer_id, limit).await?;

        let prompt = prompts::profile_summary(&profile, &browsing_analysis, &purchase_analysis);
        let summary = self.llm.generate(&prompt, &GenerateOptions::default()).await;
        self.memory.reflect(Some(&customer_id.0), &summary).await;

        Ok(Some(CustomerProfileReport {
            profile,
            browsing_analysis,
            purchase_analysis,
            similar_customers,
            recommendations,
            summary,
        }))
    }

    /// Full product work-up: details, similar, complementary, category
    /// insights, and the composed report.
    pub async fn product_analysis(
        &self,
        product_id: &ProductId,
        limit: usize,
    ) -> Result<Option<ProductReport>, AgentError> {
        let Some(product) = self.product.details(product_id).await? else {
            return Ok(None);
        };

        let similar_commentary =
            product_analysis_text(self.product.similar_products(product_id, limit).await?);
        let complementary_commentary =
            product_analysis_text(self.product.complementary_products(product_id, limit).await?);
        let category_insights = self
            .product
            .category_insights(&product.category)
            .await?
            .map(|(_, text)| text);
        let report = product_analysis_text(self.product.insight_report(product_id).await?);

        Ok(Some(ProductReport {
            product,
            similar_commentary,
            complementary_commentary,
            category_insights,
            report,
        }))
    }

    /// Category insights plus trending products and a trend narrative.
    pub async fn category_trend_analysis(
        &self,
        category: &str,
    ) -> Result<Option<CategoryTrendReport>, AgentError> {
        let Some((stats, insights)) = self.product.category_insights(category).await? else {
            return Ok(None);
        };

        let trending = self.product.trending(Some(category), TREND_PRODUCT_LIMIT).await?;
        let prompt = prompts::category_trend_narrative(category, &insights, &trending);
        let narrative = self.llm.generate(&prompt, &GenerateOptions::default()).await;

        Ok(Some(CategoryTrendReport { stats, insights, trending, narrative }))
    }

    /// Seasonal ranking plus category context for the top pick and a
    /// season-specific shopping guide.
    pub async fn seasonal_recommendations(
        &self,
        customer_id: &CustomerId,
        season: &str,
        limit: usize,
    ) -> Result<SeasonalGuide, AgentError> {
        let outcome = self.recommendation.by_season(customer_id, season, limit).await?;

        let Some(set) = outcome.as_ranked() else {
            return Ok(SeasonalGuide { outcome, category_insights: None, guide: None });
        };
        let Some(profile) = self.customer.profile(customer_id).await? else {
            return Ok(SeasonalGuide { outcome, category_insights: None, guide: None });
        };
        if set.recommendations.is_empty() {
            return Ok(SeasonalGuide { outcome, category_insights: None, guide: None });
        }

        let category_insights = match set.recommendations.first() {
            Some(first) => {
                self.product.category_insights(&first.category).await?.map(|(_, text)| text)
            }
            None => None,
        };
        let prompt = prompts::seasonal_guide(
            &profile,
            season,
            &set.recommendations,
            category_insights.as_deref(),
        );
        let guide = self.llm.generate(&prompt, &GenerateOptions::default()).await;

        Ok(SeasonalGuide { outcome, category_insights, guide: Some(guide) })
    }
}

fn analysis_text(analysis: CustomerAnalysis) -> String {
    match analysis {
        CustomerAnalysis::Analysis { text } => text,
        CustomerAnalysis::NoHistory { message } => message,
        CustomerAnalysis::NotFound { customer_id } => {
            format!("Customer {} not found", customer_id.0)
        }
    }
}

fn product_analysis_text(analysis: ProductAnalysis) -> String {
    match analysis {
        ProductAnalysis::Analysis { text, .. } => text,
        ProductAnalysis::NotFound { product_id } => {
            format!("Product {} not found", product_id.0)
        }
    }
}
