//! Synthetic dataset generator.
//!
//! Produces `orders.csv` and `reviews.json` in the configured output
//! directory from a transient product catalog.

pub mod catalog;
pub mod records;
pub mod writer;

use chrono::{Local, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{GeneratorConfig, ORDERS_FILE, REVIEWS_FILE};
use crate::emit;
use crate::error::{CreateDirSnafu, GeneratorError, InvalidConfigSnafu};
use crate::metrics::events::{Dataset, RecordsGenerated};

pub use catalog::{Product, ProductCatalog};
pub use records::{Amount, OrderRecord, ReviewRecord, generate_orders, generate_reviews};
pub use writer::{
    StagedFile, publish_all, stage_orders_csv, stage_reviews_ndjson, write_orders_csv,
    write_reviews_ndjson,
};

/// Result of a generator run.
#[derive(Debug, Clone)]
pub struct GenerationSummary {
    pub orders_path: PathBuf,
    pub reviews_path: PathBuf,
    pub orders: usize,
    pub reviews: usize,
    /// Seed the run was drawn from; pass it back to reproduce the content.
    pub seed: u64,
    pub catalog: ProductCatalog,
}

/// In-memory dataset, before it is written out.
#[derive(Debug, Clone)]
pub struct SyntheticData {
    pub catalog: ProductCatalog,
    pub orders: Vec<OrderRecord>,
    pub reviews: Vec<ReviewRecord>,
}

impl SyntheticData {
    /// Draw a complete dataset from `rng`.
    pub fn generate<R: Rng + ?Sized>(
        rng: &mut R,
        config: &GeneratorConfig,
        now: NaiveDateTime,
    ) -> Result<Self, GeneratorError> {
        config.validate().context(InvalidConfigSnafu)?;
        let catalog = ProductCatalog::generate(rng, config.num_products);
        let orders = generate_orders(rng, &catalog, config, now)?;
        let reviews = generate_reviews(rng, &catalog, config, now)?;
        Ok(Self {
            catalog,
            orders,
            reviews,
        })
    }
}

/// Writes a fresh dataset on every run.
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate relative to the current local time.
    pub fn run(&self) -> Result<GenerationSummary, GeneratorError> {
        self.run_at(Local::now().naive_local())
    }

    /// Generate with `now` as the upper end of the timestamp window.
    ///
    /// Both files are replaced together; on failure the previous files are
    /// left as they were.
    pub fn run_at(&self, now: NaiveDateTime) -> Result<GenerationSummary, GeneratorError> {
        let seed = self.config.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        info!(
            "Generating {} products, {} orders and {} reviews (seed {})",
            self.config.num_products, self.config.num_orders, self.config.num_reviews, seed
        );

        let data = SyntheticData::generate(&mut rng, &self.config, now)?;

        let output_dir = Path::new(&self.config.output_dir);
        std::fs::create_dir_all(output_dir).context(CreateDirSnafu {
            path: output_dir.display().to_string(),
        })?;

        let orders_path = output_dir.join(ORDERS_FILE);
        let reviews_path = output_dir.join(REVIEWS_FILE);

        let staged = [
            stage_orders_csv(&orders_path, &data.orders)?,
            stage_reviews_ndjson(&reviews_path, &data.reviews)?,
        ];
        publish_all(&staged)?;

        emit!(RecordsGenerated {
            dataset: Dataset::Orders,
            count: data.orders.len() as u64,
        });
        emit!(RecordsGenerated {
            dataset: Dataset::Reviews,
            count: data.reviews.len() as u64,
        });
        info!("Generated {} orders at {}", data.orders.len(), orders_path.display());
        info!("Generated {} reviews at {}", data.reviews.len(), reviews_path.display());

        Ok(GenerationSummary {
            orders_path,
            reviews_path,
            orders: data.orders.len(),
            reviews: data.reviews.len(),
            seed,
            catalog: data.catalog,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn config_in(dir: &Path, seed: Option<u64>) -> GeneratorConfig {
        GeneratorConfig {
            output_dir: dir.join("raw").display().to_string(),
            num_products: 5,
            num_users: 10,
            num_orders: 40,
            num_reviews: 25,
            seed,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_run_creates_directory_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let summary = Generator::new(config_in(dir.path(), Some(7)))
            .run_at(fixed_now())
            .unwrap();

        assert_eq!(summary.orders, 40);
        assert_eq!(summary.reviews, 25);
        assert_eq!(summary.seed, 7);
        assert_eq!(summary.catalog.len(), 5);
        assert!(summary.orders_path.ends_with("raw/orders.csv"));

        let orders = std::fs::read_to_string(&summary.orders_path).unwrap();
        let reviews = std::fs::read_to_string(&summary.reviews_path).unwrap();
        assert_eq!(orders.lines().count(), 41);
        assert_eq!(reviews.lines().count(), 25);
    }

    #[test]
    fn test_same_seed_reproduces_content() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        let a = Generator::new(config_in(first.path(), Some(99)))
            .run_at(fixed_now())
            .unwrap();
        let b = Generator::new(config_in(second.path(), Some(99)))
            .run_at(fixed_now())
            .unwrap();

        assert_eq!(
            std::fs::read(&a.orders_path).unwrap(),
            std::fs::read(&b.orders_path).unwrap()
        );
        assert_eq!(
            std::fs::read(&a.reviews_path).unwrap(),
            std::fs::read(&b.reviews_path).unwrap()
        );
    }

    #[test]
    fn test_rerun_overwrites_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path(), None);
        Generator::new(config.clone()).run_at(fixed_now()).unwrap();

        config.num_orders = 3;
        let summary = Generator::new(config).run_at(fixed_now()).unwrap();

        let orders = std::fs::read_to_string(&summary.orders_path).unwrap();
        assert_eq!(orders.lines().count(), 4);
    }

    #[test]
    fn test_failed_run_keeps_previous_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), Some(5));
        let raw = dir.path().join("raw");
        std::fs::create_dir_all(raw.join(REVIEWS_FILE).join("keep")).unwrap();
        std::fs::write(raw.join(ORDERS_FILE), "OLD\n").unwrap();

        let err = Generator::new(config).run_at(fixed_now()).unwrap_err();

        assert!(matches!(err, GeneratorError::Persist { .. }));
        assert_eq!(
            std::fs::read_to_string(raw.join(ORDERS_FILE)).unwrap(),
            "OLD\n"
        );
        let leftovers: Vec<_> = std::fs::read_dir(&raw)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .filter(|name| name.ends_with(".tmp") || name.ends_with(".bak"))
            .collect();
        assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
    }

    #[test]
    fn test_invalid_population_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        for (users, products) in [(0, 5), (10, 0)] {
            let config = GeneratorConfig {
                num_users: users,
                num_products: products,
                ..config_in(dir.path(), Some(1))
            };

            let err = Generator::new(config).run_at(fixed_now()).unwrap_err();
            assert!(matches!(err, GeneratorError::InvalidConfig { .. }));
        }
        assert!(!dir.path().join("raw").exists());
    }

    #[test]
    fn test_synthetic_data_references_catalog() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = config_in(Path::new("/unused"), None);
        let data = SyntheticData::generate(&mut rng, &config, fixed_now()).unwrap();

        for order in &data.orders {
            let product = data.catalog.get(&order.product_id).unwrap();
            assert_eq!(order.total_amount, product.price.times(order.quantity));
        }
        assert!(
            data.reviews
                .iter()
                .all(|r| data.catalog.get(&r.product_id).is_some())
        );
    }
}
