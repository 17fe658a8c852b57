//! Customer analysis flows: history analysis, interest prediction,
//! similar-customer lookup, and the composed profile summary.

use std::sync::Arc;

use shopsense_core::domain::customer::{CustomerId, CustomerProfile};
use shopsense_core::ranking::SIMILAR_CUSTOMER_MAX_AGE_GAP;
use shopsense_db::repositories::CustomerRepository;

use crate::llm::{GenerateOptions, LlmClient};
use crate::memory::AgentMemory;
use crate::{prompts, AgentError};

/// Outcome of one customer analysis. `NoHistory` carries the operator-facing
/// message for a customer with nothing to analyze.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerAnalysis {
    NotFound { customer_id: CustomerId },
    NoHistory { message: String },
    Analysis { text: String },
}

pub struct CustomerAgent {
    customers: Arc<dyn CustomerRepository>,
    llm: Arc<dyn LlmClient>,
    memory: AgentMemory,
}

impl CustomerAgent {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        llm: Arc<dyn LlmClient>,
        memory: AgentMemory,
    ) -> Self {
        Self { customers, llm, memory }
    }

    pub async fn profile(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<CustomerProfile>, AgentError> {
        Ok(self.customers.find_by_id(customer_id).await?)
    }

    pub async fn analyze_browsing_history(
        &self,
        customer_id: &CustomerId,
    ) -> Result<CustomerAnalysis, AgentError> {
        let Some(customer) = self.customers.find_by_id(customer_id).await? else {
            return Ok(CustomerAnalysis::NotFound { customer_id: customer_id.clone() });
        };
        if customer.browsing_history.is_empty() {
            return Ok(CustomerAnalysis::NoHistory {
                message: "No browsing history available".to_string(),
            });
        }

        let prompt = prompts::browsing_analysis(&customer);
        let text = self.llm.generate(&prompt, &GenerateOptions::default()).await;
        self.memory.observe(Some(&customer.id.0), &text).await;
        Ok(CustomerAnalysis::Analysis { text })
    }

    pub async fn analyze_purchase_history(
        &self,
        customer_id: &CustomerId,
    ) -> Result<CustomerAnalysis, AgentError> {
        let Some(customer) = self.customers.find_by_id(customer_id).await? else {
            return Ok(CustomerAnalysis::NotFound { customer_id: customer_id.clone() });
        };
        if customer.purchase_history.is_empty() {
            return Ok(CustomerAnalysis::NoHistory {
                message: "No purchase history available".to_string(),
            });
        }

        let prompt = prompts::purchase_analysis(&customer);
        let text = self.llm.generate(&prompt, &GenerateOptions::default()).await;
        self.memory.observe(Some(&customer.id.0), &text).await;
        Ok(CustomerAnalysis::Analysis { text })
    }

    pub async fn predict_interests(
        &self,
        customer_id: &CustomerId,
    ) -> Result<CustomerAnalysis, AgentError> {
        let Some(customer) = self.customers.find_by_id(customer_id).await? else {
            return Ok(CustomerAnalysis::NotFound { customer_id: customer_id.clone() });
        };

        let prompt = prompts::interest_prediction(&customer);
        let text = self.llm.generate(&prompt, &GenerateOptions::default()).await;
        Ok(CustomerAnalysis::Analysis { text })
    }

    pub async fn similar_customers(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Option<Vec<CustomerProfile>>, AgentError> {
        let Some(customer) = self.customers.find_by_id(customer_id).await? else {
            return Ok(None);
        };
        let similar =
            self.customers.find_similar(&customer, SIMILAR_CUSTOMER_MAX_AGE_GAP, limit).await?;
        Ok(Some(similar))
    }

    /// Composes both history analyses into one summary and stores it as a
    /// reflection keyed by the customer id.
    pub async fn profile_summary(
        &self,
        customer_id: &CustomerId,
    ) -> Result<CustomerAnalysis, AgentError> {
        let Some(customer) = self.customers.find_by_id(customer_id).await? else {
            return Ok(CustomerAnalysis::NotFound { customer_id: customer_id.clone() });
        };

        let browsing = match self.analyze_browsing_history(customer_id).await? {
            CustomerAnalysis::Analysis { text } => text,
            CustomerAnalysis::NoHistory { message } => message,
            not_found @ CustomerAnalysis::NotFound { .. } => return Ok(not_found),
        };
        let purchases = match self.analyze_purchase_history(customer_id).await? {
            CustomerAnalysis::Analysis { text } => text,
            CustomerAnalysis::NoHistory { message } => message,
            not_found @ CustomerAnalysis::NotFound { .. } => return Ok(not_found),
        };

        let prompt = prompts::profile_summary(&customer, &browsing, &purchases);
        let text = self.llm.generate(&prompt, &GenerateOptions::default()).await;
        self.memory.reflect(Some(&customer.id.0), &text).await;
        Ok(CustomerAnalysis::Analysis { text })
    }
}
