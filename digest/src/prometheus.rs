use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;
use shared::RepositoryId;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ScanRecord {
    pub organization: String,
    pub repository: String,
    pub significant: u32,
    pub success: u32,
}

pub struct PrometheusClient {
    registry: Registry,
    scans: Family<ScanRecord, Counter>,
    scan_duration: Histogram,
    notifications: Counter,
    // Taken from the rate-limit endpoint on every scrape
    github_api_read_request: Gauge,
}

impl Default for PrometheusClient {
    fn default() -> Self {
        let mut registry = Registry::default();
        let scans = Family::default();
        let notifications = Counter::default();
        let github_api_read_request = Gauge::default();
        let scan_duration =
            Histogram::new([0.5, 1., 2.5, 5., 10., 30., 60., 120., f64::INFINITY].into_iter());

        registry.register(
            "github_api_read_requests",
            "Display used github read requests at a metric time",
            github_api_read_request.clone(),
        );
        registry.register(
            "digest_scans",
            "Repository activity windows scanned",
            scans.clone(),
        );
        registry.register(
            "digest_scan_duration_seconds",
            "Time spent collecting a single activity window",
            scan_duration.clone(),
        );
        registry.register(
            "digest_notifications",
            "Digests sent for significant activity",
            notifications.clone(),
        );

        Self {
            registry,
            scans,
            scan_duration,
            notifications,
            github_api_read_request,
        }
    }
}

impl PrometheusClient {
    pub fn record_scan(
        &self,
        repository: &RepositoryId,
        significant: bool,
        success: bool,
        started: chrono::DateTime<chrono::Utc>,
    ) {
        self.scans
            .get_or_create(&ScanRecord {
                organization: repository.owner.clone(),
                repository: repository.repo.clone(),
                significant: significant as u32,
                success: success as u32,
            })
            .inc();

        let elapsed = chrono::Utc::now() - started;
        self.scan_duration
            .observe(elapsed.num_milliseconds() as f64 / 1000.0);
    }

    pub fn add_notification(&self) {
        self.notifications.inc();
    }

    pub fn set_read_requests(&self, value: i64) {
        self.github_api_read_request.set(value);
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}
