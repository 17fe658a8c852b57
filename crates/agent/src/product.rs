//! Product analysis flows: similar and complementary products, category
//! insights, trending, and the composed insight report.

use std::sync::Arc;

use shopsense_core::domain::product::{CategoryStats, ProductId, ProductRecord};
use shopsense_db::repositories::ProductRepository;

use crate::llm::{GenerateOptions, LlmClient};
use crate::memory::AgentMemory;
use crate::{prompts, AgentError};

const CATEGORY_TOP_PRODUCTS: usize = 5;

/// Outcome of one product analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductAnalysis {
    NotFound { product_id: ProductId },
    Analysis { text: String, products: Vec<ProductRecord> },
}

pub struct ProductAgent {
    products: Arc<dyn ProductRepository>,
    llm: Arc<dyn LlmClient>,
    memory: AgentMemory,
}

impl ProductAgent {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        llm: Arc<dyn LlmClient>,
        memory: AgentMemory,
    ) -> Self {
        Self { products, llm, memory }
    }

    pub async fn details(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ProductRecord>, AgentError> {
        Ok(self.products.find_by_id(product_id).await?)
    }

    /// Same-category products ordered by price/rating closeness, with LLM
    /// commentary on the comparison.
    pub async fn similar_products(
        &self,
        product_id: &ProductId,
        limit: usize,
    ) -> Result<ProductAnalysis, AgentError> {
        let Some(product) = self.products.find_by_id(product_id).await? else {
            return Ok(ProductAnalysis::NotFound { product_id: product_id.clone() });
        };

        let similar = self.products.similar_to(&product, limit).await?;
        let prompt = prompts::similar_products_commentary(&product, &similar);
        let text = self.llm.generate(&prompt, &GenerateOptions::default()).await;
        Ok(ProductAnalysis::Analysis { text, products: similar })
    }

    /// Top-rated products from every other category, with pairing
    /// commentary.
    pub async fn complementary_products(
        &self,
        product_id: &ProductId,
        limit: usize,
    ) -> Result<ProductAnalysis, AgentError> {
        let Some(product) = self.products.find_by_id(product_id).await? else {
            return Ok(ProductAnalysis::NotFound { product_id: product_id.clone() });
        };

        let complementary = self.products.in_other_categories(&product.category, limit).await?;
        let prompt = prompts::complementary_products_commentary(&product, &complementary);
        let text = self.llm.generate(&prompt, &GenerateOptions::default()).await;
        Ok(ProductAnalysis::Analysis { text, products: complementary })
    }

    /// Aggregate statistics plus an LLM summary for one category. `None`
    /// when the category has no products.
    pub async fn category_insights(
        &self,
        category: &str,
    ) -> Result<Option<(CategoryStats, String)>, AgentError> {
        let Some(stats) = self.products.category_stats(category).await? else {
            return Ok(None);
        };

        let top = self.products.top_rated_in_category(category, CATEGORY_TOP_PRODUCTS).await?;
        let prompt = prompts::category_insights(&stats, &top);
        let text = self.llm.generate(&prompt, &GenerateOptions::default()).await;
        Ok(Some((stats, text)))
    }

    pub async fn trending(
        &self,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, AgentError> {
        Ok(self.products.trending(category, limit).await?)
    }

    /// Composes similar, complementary, and category analyses into one
    /// report; stored as a reflection keyed by the product id.
    pub async fn insight_report(
        &self,
        product_id: &ProductId,
    ) -> Result<ProductAnalysis, AgentError> {
        let Some(product) = self.products.find_by_id(product_id).await? else {
            return Ok(ProductAnalysis::NotFound { product_id: product_id.clone() });
        };

        let similar = match self.similar_products(product_id, CATEGORY_TOP_PRODUCTS).await? {
            ProductAnalysis::Analysis { text, .. } => text,
            not_found @ ProductAnalysis::NotFound { .. } => return Ok(not_found),
        };
        let complementary =
            match self.complementary_products(product_id, CATEGORY_TOP_PRODUCTS).await? {
                ProductAnalysis::Analysis { text, .. } => text,
                not_found @ ProductAnalysis::NotFound { .. } => return Ok(not_found),
            };
        let category = match self.category_insights(&product.category).await? {
            Some((_, text)) => text,
            None => "n/a".to_string(),
        };

        let prompt = prompts::insight_report(&product, &similar, &complementary, &category);
        let text = self.llm.generate(&prompt, &GenerateOptions::default()).await;
        self.memory.reflect(Some(&product.id.0), &text).await;
        Ok(ProductAnalysis::Analysis { text, products: Vec::new() })
    }
}
