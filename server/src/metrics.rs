use rocket_prometheus::{
    prometheus::{IntCounter, IntCounterVec, Opts},
    PrometheusMetrics,
};
use shared::{BulkCreateStats, ItemOutcome};

#[derive(Clone)]
pub struct DiscoveryMetrics {
    bulk_items: IntCounterVec,
    bulk_setup_failures: IntCounter,
    significance_checks: IntCounterVec,
}

impl DiscoveryMetrics {
    pub fn register(prometheus: &PrometheusMetrics) -> anyhow::Result<Self> {
        let bulk_items = IntCounterVec::new(
            Opts::new(
                "discovery_bulk_issue_items",
                "Pain points processed by bulk issue creation, by outcome",
            ),
            &["outcome"],
        )?;
        let bulk_setup_failures = IntCounter::new(
            "discovery_bulk_issue_setup_failures",
            "Bulk issue batches rejected before processing any item",
        )?;
        let significance_checks = IntCounterVec::new(
            Opts::new(
                "discovery_significance_checks",
                "Activity windows classified, by result",
            ),
            &["significant"],
        )?;

        let registry = prometheus.registry();
        registry.register(Box::new(bulk_items.clone()))?;
        registry.register(Box::new(bulk_setup_failures.clone()))?;
        registry.register(Box::new(significance_checks.clone()))?;

        Ok(Self {
            bulk_items,
            bulk_setup_failures,
            significance_checks,
        })
    }

    pub fn record_bulk(&self, stats: &BulkCreateStats) {
        for (outcome, amount) in [
            (ItemOutcome::Created, stats.created),
            (ItemOutcome::Skipped, stats.skipped),
            (ItemOutcome::Failed, stats.errors),
        ] {
            let label: &'static str = outcome.into();
            self.bulk_items
                .with_label_values(&[label])
                .inc_by(amount as u64);
        }
    }

    pub fn record_setup_failure(&self) {
        self.bulk_setup_failures.inc();
    }

    pub fn record_significance(&self, significant: bool) {
        self.significance_checks
            .with_label_values(&[if significant { "true" } else { "false" }])
            .inc();
    }
}
