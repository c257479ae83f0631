//! Order and review records.

use chrono::{NaiveDateTime, TimeDelta};
use rand::Rng;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use super::catalog::ProductCatalog;
use crate::config::GeneratorConfig;
use crate::error::GeneratorError;

/// Timestamp layout shared by `order_date` and review `timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Template sentences a review text is drawn from.
pub const REVIEW_TEXTS: [&str; 10] = [
    "This product is amazing! I love it.",
    "Terrible, broke after one day.",
    "It's okay, not worth the price.",
    "Fast delivery, good data quality.",
    "Five stars for the design, but performance is lacking.",
    "Does exactly what it says on the box.",
    "I would not recommend this to my worst enemy.",
    "Best purchase of the year!",
    "Cloud scalable architecture was missing from this toaster.",
    "ACID compliance achieved in my kitchen.",
];

/// A money amount held as whole cents.
///
/// Serialized with exactly two fraction digits, e.g. `149.70`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> u64 {
        self.0
    }

    /// Multiply by a quantity. Exact, so no rounding is involved.
    pub fn times(&self, quantity: u8) -> Self {
        Self(self.0 * u64::from(quantity))
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One row of `orders.csv`. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub user_id: String,
    pub product_id: String,
    pub quantity: u8,
    pub order_date: String,
    pub total_amount: Amount,
}

/// One line of `reviews.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub review_id: String,
    pub product_id: String,
    pub user_id: String,
    pub rating: u8,
    pub review_text: String,
    pub timestamp: String,
}

/// Generate `config.num_orders` orders against `catalog`.
pub fn generate_orders<R: Rng + ?Sized>(
    rng: &mut R,
    catalog: &ProductCatalog,
    config: &GeneratorConfig,
    now: NaiveDateTime,
) -> Result<Vec<OrderRecord>, GeneratorError> {
    (0..config.num_orders)
        .map(|i| {
            let product = catalog.choose(rng)?;
            let quantity: u8 = rng.random_range(1..=5);
            Ok(OrderRecord {
                order_id: format!("O-{i:06}"),
                user_id: random_user(rng, config.num_users),
                product_id: product.product_id.clone(),
                quantity,
                order_date: random_past_timestamp(rng, now, config.lookback_days),
                total_amount: product.price.times(quantity),
            })
        })
        .collect()
}

/// Generate `config.num_reviews` reviews against `catalog`.
pub fn generate_reviews<R: Rng + ?Sized>(
    rng: &mut R,
    catalog: &ProductCatalog,
    config: &GeneratorConfig,
    now: NaiveDateTime,
) -> Result<Vec<ReviewRecord>, GeneratorError> {
    (0..config.num_reviews)
        .map(|_| {
            let review_id = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
            let product = catalog.choose(rng)?;
            Ok(ReviewRecord {
                review_id: review_id.to_string(),
                product_id: product.product_id.clone(),
                user_id: random_user(rng, config.num_users),
                rating: rng.random_range(1..=5),
                review_text: random_review_text(rng),
                timestamp: random_past_timestamp(rng, now, config.lookback_days),
            })
        })
        .collect()
}

/// Format a user id, `U-` followed by a zero-padded 4-digit number.
pub fn user_id(index: usize) -> String {
    format!("U-{index:04}")
}

fn random_user<R: Rng + ?Sized>(rng: &mut R, num_users: usize) -> String {
    user_id(rng.random_range(0..num_users))
}

fn random_review_text<R: Rng + ?Sized>(rng: &mut R) -> String {
    let template = REVIEW_TEXTS[rng.random_range(0..REVIEW_TEXTS.len())];
    let reference: u16 = rng.random_range(1000..=9999);
    format!("{template} (Random Ref: {reference})")
}

fn random_past_timestamp<R: Rng + ?Sized>(
    rng: &mut R,
    now: NaiveDateTime,
    lookback_days: u32,
) -> String {
    let days_back = rng.random_range(0..=lookback_days);
    (now - TimeDelta::days(i64::from(days_back)))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Check that a review id parses as a UUID.
pub fn is_valid_review_id(review_id: &str) -> bool {
    Uuid::parse_str(review_id).is_ok()
}
