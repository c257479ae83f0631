//! Gold tier: per-product rating and sales statistics.
//!
//! The statistics are defined over the inner, record-level join of silver
//! orders and silver reviews on `product_id`. A product with M orders and
//! N reviews contributes M×N joined rows, so:
//!
//! - `average_rating` is the mean of the product's review ratings
//! - `total_sales` is N times the sum of the product's order amounts
//!
//! Both are computed from per-product partial sums instead of materialising
//! the join. NaN or infinite amounts carry through to `total_sales`.

use deltalake::arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use snafu::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{float64_column, int32_column, string_column};
use crate::error::{ArrowSnafu, SumOverflowSnafu, TransformError};
use crate::schema;

#[derive(Debug, Default)]
struct OrderSide {
    /// Sum of finite non-null amounts, in cents.
    amount_cents: Option<i128>,
    /// Sum of NaN and infinite amounts, which absorb the finite part.
    non_finite: Option<f64>,
}

impl OrderSide {
    fn add(&mut self, product: &str, amount: f64) -> Result<(), TransformError> {
        if !amount.is_finite() {
            *self.non_finite.get_or_insert(0.0) += amount;
            return Ok(());
        }
        let sum = self.amount_cents.get_or_insert(0);
        *sum = sum
            .checked_add(to_cents(amount))
            .context(SumOverflowSnafu { product })?;
        Ok(())
    }

    /// Total over the joined rows, each amount repeated `rows` times.
    fn total(&self, product: &str, rows: i64) -> Result<Option<f64>, TransformError> {
        if let Some(non_finite) = self.non_finite {
            return Ok(Some(non_finite * rows as f64));
        }
        self.amount_cents
            .map(|cents| {
                cents
                    .checked_mul(i128::from(rows))
                    .map(|total| total as f64 / 100.0)
                    .context(SumOverflowSnafu { product })
            })
            .transpose()
    }
}

#[derive(Debug, Default)]
struct ReviewSide {
    rows: i64,
    rating_sum: i64,
    rating_count: i64,
}

/// Compute the product stats table from silver orders and silver reviews.
///
/// Rows are sorted by `product_id`. Products missing from either side, and
/// rows with a null `product_id`, do not appear.
pub fn product_stats(
    orders: &RecordBatch,
    reviews: &RecordBatch,
) -> Result<RecordBatch, TransformError> {
    let order_products = string_column(orders, schema::PRODUCT_ID)?;
    let amounts = float64_column(orders, schema::TOTAL_AMOUNT)?;
    let review_products = string_column(reviews, schema::PRODUCT_ID)?;
    let ratings = int32_column(reviews, schema::RATING)?;

    let mut order_sides: BTreeMap<&str, OrderSide> = BTreeMap::new();
    for (product, amount) in order_products.iter().zip(amounts.iter()) {
        let Some(product) = product else { continue };
        let side = order_sides.entry(product).or_default();
        if let Some(amount) = amount {
            side.add(product, amount)?;
        }
    }

    let mut review_sides: BTreeMap<&str, ReviewSide> = BTreeMap::new();
    for (product, rating) in review_products.iter().zip(ratings.iter()) {
        let Some(product) = product else { continue };
        let side = review_sides.entry(product).or_default();
        side.rows += 1;
        if let Some(rating) = rating {
            side.rating_sum += i64::from(rating);
            side.rating_count += 1;
        }
    }

    let mut product_ids = Vec::new();
    let mut average_ratings = Vec::new();
    let mut total_sales = Vec::new();

    for (product, order_side) in &order_sides {
        let Some(review_side) = review_sides.get(product) else {
            continue;
        };
        product_ids.push(*product);
        average_ratings.push(
            (review_side.rating_count > 0)
                .then(|| review_side.rating_sum as f64 / review_side.rating_count as f64),
        );
        total_sales.push(order_side.total(product, review_side.rows)?);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(product_ids)),
        Arc::new(Float64Array::from(average_ratings)),
        Arc::new(Float64Array::from(total_sales)),
    ];
    RecordBatch::try_new(schema::product_stats(), columns).context(ArrowSnafu)
}

// Amounts carry two fraction digits; summing whole cents keeps the result
// independent of row order. Out of range amounts saturate and then fail the
// checked sum.
fn to_cents(amount: f64) -> i128 {
    (amount * 100.0).round() as i128
}
