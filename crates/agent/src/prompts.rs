//! Prompt construction for every agent. Prompts serialize domain values
//! to JSON so the model sees the same fields the repositories store.

use serde_json::json;

use shopsense_core::domain::customer::CustomerProfile;
use shopsense_core::domain::product::{CategoryStats, ProductRecord};
use shopsense_core::domain::recommendation::RecommendedProduct;

pub fn product_view(product: &ProductRecord) -> serde_json::Value {
    json!({
        "product_id": product.id.0,
        "category": product.category,
        "subcategory": product.subcategory,
        "price": product.price,
        "brand": product.brand,
        "product_rating": product.rating,
        "sentiment_score": product.sentiment_score,
    })
}

fn recommended_view(item: &RecommendedProduct) -> serde_json::Value {
    json!({
        "product_id": item.product_id.0,
        "category": item.category,
        "subcategory": item.subcategory,
        "price": item.price,
        "brand": item.brand,
        "score": item.score,
    })
}

pub fn recommendation_explanation(
    customer: &CustomerProfile,
    recommendations: &[RecommendedProduct],
) -> String {
    let items: Vec<serde_json::Value> = recommendations.iter().map(recommended_view).collect();
    format!(
        "You are a retail recommendation assistant.\n\
         Customer profile:\n{}\n\nRecommended products:\n{}\n\n\
         In 2-3 sentences, explain why these products suit this customer. \
         Mention concrete categories or price points, not scores.",
        customer.prompt_view(),
        serde_json::Value::Array(items)
    )
}

pub fn occasion_selection(
    customer: &CustomerProfile,
    products: &[ProductRecord],
    occasion: &str,
    limit: usize,
) -> String {
    let items: Vec<serde_json::Value> = products.iter().map(product_view).collect();
    format!(
        "Select up to {limit} products suitable for a {occasion} occasion.\n\
         Customer profile:\n{}\n\nAvailable products:\n{}\n\n\
         Respond with ONLY a JSON array, no other text. Each element:\n\
         {{\"product_id\": \"...\", \"suitability_score\": 0.0-1.0, \"explanation\": \"...\"}}",
        customer.prompt_view(),
        serde_json::Value::Array(items)
    )
}

pub fn season_selection(
    customer: &CustomerProfile,
    products: &[ProductRecord],
    season: &str,
    limit: usize,
) -> String {
    let items: Vec<serde_json::Value> = products.iter().map(product_view).collect();
    format!(
        "Select up to {limit} products suitable for the {season} season.\n\
         Customer profile:\n{}\n\nAvailable products:\n{}\n\n\
         Respond with ONLY a JSON array, no other text. Each element:\n\
         {{\"product_id\": \"...\", \"seasonal_score\": 0.0-1.0, \"explanation\": \"...\"}}",
        customer.prompt_view(),
        serde_json::Value::Array(items)
    )
}

pub fn occasion_explanation(
    customer: &CustomerProfile,
    recommendations: &[RecommendedProduct],
    occasion: &str,
) -> String {
    let items: Vec<serde_json::Value> = recommendations.iter().map(recommended_view).collect();
    format!(
        "These products were selected for a {occasion} occasion.\n\
         Customer profile:\n{}\n\nSelected products:\n{}\n\n\
         Write one cohesive 2-3 sentence explanation of why this set works \
         for the occasion.",
        customer.prompt_view(),
        serde_json::Value::Array(items)
    )
}

pub fn season_explanation(
    customer: &CustomerProfile,
    recommendations: &[RecommendedProduct],
    season: &str,
) -> String {
    let items: Vec<serde_json::Value> = recommendations.iter().map(recommended_view).collect();
    format!(
        "These products were selected for the {season} season.\n\
         Customer profile:\n{}\n\nSelected products:\n{}\n\n\
         Write one cohesive 2-3 sentence explanation of why this set works \
         for the season.",
        customer.prompt_view(),
        serde_json::Value::Array(items)
    )
}

pub fn browsing_analysis(customer: &CustomerProfile) -> String {
    format!(
        "Analyze this customer's browsing history and describe their \
         interests and likely shopping intent in 2-3 sentences.\n\
         Browsing history: {:?}\nCustomer segment: {}\nLocation: {}",
        customer.browsing_history, customer.segment, customer.location
    )
}

pub fn purchase_analysis(customer: &CustomerProfile) -> String {
    format!(
        "Analyze this customer's purchase history and describe their buying \
         patterns and preferences in 2-3 sentences.\n\
         Purchase history: {:?}\nAverage order value: {:.2}\nCustomer segment: {}",
        customer.purchase_history, customer.avg_order_value, customer.segment
    )
}

pub fn interest_prediction(customer: &CustomerProfile) -> String {
    format!(
        "Based on this customer profile, predict the product categories and \
         price range they are most likely to shop for next. Answer in 2-3 \
         sentences.\n\nCustomer profile:\n{}",
        customer.prompt_view()
    )
}

pub fn profile_summary(
    customer: &CustomerProfile,
    browsing_analysis: &str,
    purchase_analysis: &str,
) -> String {
    format!(
        "Compose a concise profile summary for customer {} combining the \
         analyses below. 3-4 sentences, suitable for a store associate.\n\n\
         Browsing analysis:\n{browsing_analysis}\n\n\
         Purchase analysis:\n{purchase_analysis}",
        customer.id.0
    )
}

pub fn similar_products_commentary(
    product: &ProductRecord,
    similar: &[ProductRecord],
) -> String {
    let items: Vec<serde_json::Value> = similar.iter().map(product_view).collect();
    format!(
        "Reference product:\n{}\n\nSimilar products in the same category:\n{}\n\n\
         In 2-3 sentences, compare the similar products to the reference on \
         price and rating.",
        product_view(product),
        serde_json::Value::Array(items)
    )
}

pub fn complementary_products_commentary(
    product: &ProductRecord,
    complementary: &[ProductRecord],
) -> String {
    let items: Vec<serde_json::Value> = complementary.iter().map(product_view).collect();
    format!(
        "Reference product:\n{}\n\nHighly rated products from other categories:\n{}\n\n\
         In 2-3 sentences, explain which of these pair well with the \
         reference product and why.",
        product_view(product),
        serde_json::Value::Array(items)
    )
}

pub fn category_insights(stats: &CategoryStats, top_products: &[ProductRecord]) -> String {
    let items: Vec<serde_json::Value> = top_products.iter().map(product_view).collect();
    format!(
        "Category statistics for {}:\n\
         products: {}, avg price: {:.2}, price range: {:.2}-{:.2}, \
         avg rating: {}, subcategories: {:?}\n\n\
         Top products:\n{}\n\n\
         Summarize the state of this category for a merchandising team in \
         3-4 sentences.",
        stats.category,
        stats.product_count,
        stats.avg_price,
        stats.min_price,
        stats.max_price,
        stats.avg_rating.map(|r| format!("{r:.2}")).unwrap_or_else(|| "n/a".to_string()),
        stats.subcategories,
        serde_json::Value::Array(items)
    )
}

pub fn insight_report(
    product: &ProductRecord,
    similar_commentary: &str,
    complementary_commentary: &str,
    category_insights: &str,
) -> String {
    format!(
        "Write a product insight report for:\n{}\n\n\
         Similar-product comparison:\n{similar_commentary}\n\n\
         Complementary products:\n{complementary_commentary}\n\n\
         Category context:\n{category_insights}\n\n\
         Produce a structured report with short sections for positioning, \
         pairing opportunities, and category outlook.",
        product_view(product)
    )
}

pub fn shopping_guide(
    customer: &CustomerProfile,
    interests: &str,
    recommendations: &[RecommendedProduct],
    top_pick: Option<&ProductRecord>,
) -> String {
    let items: Vec<serde_json::Value> = recommendations.iter().map(recommended_view).collect();
    let top = top_pick.map(product_view).unwrap_or(serde_json::Value::Null);
    format!(
        "Create a short personalized shopping guide.\n\
         Customer profile:\n{}\n\nPredicted interests:\n{interests}\n\n\
         Recommendations:\n{}\n\nTop pick detail:\n{top}\n\n\
         Address the customer directly, highlight the top pick, and keep it \
         under 6 sentences.",
        customer.prompt_view(),
        serde_json::Value::Array(items)
    )
}

pub fn category_trend_narrative(
    category: &str,
    insights: &str,
    trending: &[ProductRecord],
) -> String {
    let items: Vec<serde_json::Value> = trending.iter().map(product_view).collect();
    format!(
        "Category: {category}\n\nInsights:\n{insights}\n\n\
         Currently trending products:\n{}\n\n\
         Write a 3-4 sentence trend narrative for this category.",
        serde_json::Value::Array(items)
    )
}

pub fn seasonal_guide(
    customer: &CustomerProfile,
    season: &str,
    recommendations: &[RecommendedProduct],
    category_insights: Option<&str>,
) -> String {
    let items: Vec<serde_json::Value> = recommendations.iter().map(recommended_view).collect();
    format!(
        "Create a {season}-season shopping guide.\n\
         Customer profile:\n{}\n\nSeasonal picks:\n{}\n\n\
         Category context for the top pick:\n{}\n\n\
         Address the customer directly and keep it under 6 sentences.",
        customer.prompt_view(),
        serde_json::Value::Array(items),
        category_insights.unwrap_or("n/a")
    )
}
