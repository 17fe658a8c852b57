use std::collections::HashSet;

use serde::Deserialize;

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
    ($left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            return Err(format!($($arg)*));
        }
    };
}

#[derive(Debug, Deserialize)]
struct CustomerContract {
    customer_id: String,
    age: i64,
    location: String,
    customer_segment: String,
    avg_order_value: f64,
    browsing_history: Vec<String>,
    purchase_history: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProductContract {
    product_id: String,
    category: String,
    subcategory: String,
    price: f64,
    product_rating: f64,
}

#[derive(Debug, Deserialize)]
struct RecommendationContract {
    customer_id: String,
    product_id: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct SeedContract {
    dataset_version: String,
    seed_dataset: String,
    customer_count: usize,
    product_count: usize,
    recommendation_count: usize,
    customers: Vec<CustomerContract>,
    products: Vec<ProductContract>,
    recommendations: Vec<RecommendationContract>,
}

fn load_contract() -> SeedContractTestResult<SeedContract> {
    serde_json::from_str(include_str!("../../../config/fixtures/demo_seed_contract.json"))
        .map_err(|error| format!("seed contract JSON must parse: {error}"))
}

#[test]
fn seed_contract_matches_demo_seed_sql_fixture() -> SeedContractTestResult {
    let fixture_sql = include_str!("../../../config/fixtures/demo_seed_data.sql");
    let contract = load_contract()?;

    require_eq!(contract.dataset_version, "demo-2026.1");
    require_eq!(contract.seed_dataset, "deterministic_demo_catalog");
    require_eq!(contract.customers.len(), contract.customer_count);
    require_eq!(contract.products.len(), contract.product_count);
    require_eq!(contract.recommendations.len(), contract.recommendation_count);

    let mut customer_ids = HashSet::new();
    for customer in &contract.customers {
        require!(
            customer_ids.insert(customer.customer_id.clone()),
            "duplicate customer id: {}",
            customer.customer_id
        );
        require!(customer.age > 0);
        require!(!customer.location.is_empty());
        require!(!customer.customer_segment.is_empty());
        require!(customer.avg_order_value > 0.0);
        require!(
            fixture_sql.contains(&format!("'{}'", customer.customer_id)),
            "seed SQL fixture should include customer {}",
            customer.customer_id
        );
        for entry in customer.browsing_history.iter().chain(&customer.purchase_history) {
            require!(
                fixture_sql.contains(entry),
                "seed SQL fixture should mention history entry {} for {}",
                entry,
                customer.customer_id
            );
        }
    }

    let mut product_ids = HashSet::new();
    for product in &contract.products {
        require!(
            product_ids.insert(product.product_id.clone()),
            "duplicate product id: {}",
            product.product_id
        );
        require!(!product.category.is_empty());
        require!(!product.subcategory.is_empty());
        require!(product.price > 0.0);
        require!(
            product.product_rating >= 1.0 && product.product_rating <= 5.0,
            "rating for {} should be on the 1-5 scale, got {}",
            product.product_id,
            product.product_rating
        );
        require!(
            fixture_sql.contains(&format!("'{}'", product.product_id)),
            "seed SQL fixture should include product {}",
            product.product_id
        );
    }

    for recommendation in &contract.recommendations {
        require!(
            customer_ids.contains(&recommendation.customer_id),
            "recommendation references unknown customer {}",
            recommendation.customer_id
        );
        require!(
            product_ids.contains(&recommendation.product_id),
            "recommendation references unknown product {}",
            recommendation.product_id
        );
        require!(
            recommendation.score > 0.0 && recommendation.score <= 1.0,
            "recommendation score for {} should be in (0, 1], got {}",
            recommendation.product_id,
            recommendation.score
        );
        require!(
            fixture_sql.contains(&format!(
                "('{}', '{}', {:.2}",
                recommendation.customer_id, recommendation.product_id, recommendation.score
            )),
            "seed SQL fixture should include recommendation {} -> {}",
            recommendation.customer_id,
            recommendation.product_id
        );
    }
    Ok(())
}

#[test]
fn demo_catalog_covers_every_browsed_category() -> SeedContractTestResult {
    let contract = load_contract()?;

    let categories: HashSet<&str> =
        contract.products.iter().map(|product| product.category.as_str()).collect();
    for customer in &contract.customers {
        for browsed in &customer.browsing_history {
            require!(
                categories.contains(browsed.as_str()),
                "browsed category {} for {} has no product in the demo catalog",
                browsed,
                customer.customer_id
            );
        }
    }
    Ok(())
}

#[test]
fn demo_subcategories_match_purchase_histories() -> SeedContractTestResult {
    let contract = load_contract()?;

    let subcategories: HashSet<&str> =
        contract.products.iter().map(|product| product.subcategory.as_str()).collect();
    for customer in &contract.customers {
        for purchased in &customer.purchase_history {
            require!(
                subcategories.contains(purchased.as_str()),
                "purchased subcategory {} for {} has no product in the demo catalog",
                purchased,
                customer.customer_id
            );
        }
    }
    Ok(())
}

#[test]
fn contract_counts_match_loader_constants() -> SeedContractTestResult {
    let contract = load_contract()?;

    require_eq!(contract.customer_count as i64, shopsense_db::fixtures::DEMO_CUSTOMER_COUNT);
    require_eq!(contract.product_count as i64, shopsense_db::fixtures::DEMO_PRODUCT_COUNT);
    require_eq!(
        contract.recommendation_count as i64,
        shopsense_db::fixtures::DEMO_RECOMMENDATION_COUNT
    );
    Ok(())
}
