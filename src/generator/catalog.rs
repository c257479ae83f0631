//! Transient product catalog.
//!
//! Products only exist while a dataset is being generated; orders and reviews
//! reference them by id and orders copy their price.

use rand::Rng;
use serde::Serialize;
use snafu::ensure;

use super::records::Amount;
use crate::error::{EmptyCatalogSnafu, GeneratorError};

pub const CATEGORIES: [&str; 5] = ["Electronics", "Books", "Clothing", "Home", "Toys"];

const ADJECTIVES: [&str; 5] = ["Super", "Generic", "Awesome", "Budget", "Luxury"];

const NOUNS: [&str; 5] = ["Widget", "Gadget", "Thingamajig", "Doohickey", "Device"];

/// Lowest generated unit price, in cents.
pub const MIN_PRICE_CENTS: u64 = 1_000;

/// Highest generated unit price, in cents.
pub const MAX_PRICE_CENTS: u64 = 50_000;

/// A product offered in the synthetic shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub category: &'static str,
    pub price: Amount,
}

/// Ordered set of products, indexed by their sequence number.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    /// Generate `size` products with sequential ids starting at `P-0000`.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, size: usize) -> Self {
        let products = (0..size)
            .map(|i| Product {
                product_id: product_id(i),
                name: format!(
                    "{} {} {}",
                    pick(rng, &ADJECTIVES),
                    pick(rng, &NOUNS),
                    i
                ),
                category: pick(rng, &CATEGORIES),
                price: Amount::from_cents(rng.random_range(MIN_PRICE_CENTS..=MAX_PRICE_CENTS)),
            })
            .collect();
        Self { products }
    }

    /// Build a catalog from explicit products.
    pub fn from_products(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Pick a product uniformly at random.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&Product, GeneratorError> {
        ensure!(!self.is_empty(), EmptyCatalogSnafu);
        Ok(&self.products[rng.random_range(0..self.products.len())])
    }

    /// Look up a product by id.
    pub fn get(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.product_id == product_id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }
}

/// Format a product id, `P-` followed by a zero-padded 4-digit sequence.
pub fn product_id(index: usize) -> String {
    format!("P-{index:04}")
}

fn pick<R: Rng + ?Sized>(rng: &mut R, values: &[&'static str]) -> &'static str {
    values[rng.random_range(0..values.len())]
}
