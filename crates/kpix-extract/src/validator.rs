//! Shape validator: runs a fixed matrix of known-good accounts through the
//! orchestrator and checks that the expected fields per platform are
//! populated.
//!
//! This is a drift detector, not a correctness oracle. Platform APIs and
//! markup change under this codebase; a falling pass rate means extractors
//! need attention, not that a specific number is wrong.

use kpix_core::{Platform, ProfileKpi};
use tracing::{info, warn};

use crate::hybrid::HybridOrchestrator;

/// Accounts that are expected to stay public and popular indefinitely.
pub const TEST_MATRIX: &[(Platform, &[&str])] = &[
    (Platform::Twitter, &["elonmusk", "BillGates", "BarackObama"]),
    (Platform::Linkedin, &["satyanadella", "jeffweiner", "billgates"]),
    (Platform::Facebook, &["meta", "microsoft", "cocacola"]),
    (Platform::Instagram, &["instagram", "natgeo", "nike"]),
    (Platform::Youtube, &["@MrBeast", "@PewDiePie", "@TEDx"]),
    (Platform::Tiktok, &["charlidamelio", "khaby.lame", "addisonre"]),
];

/// Fields that must be non-null for the platform's response shape to count
/// as intact.
#[must_use]
pub fn expected_fields(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Facebook | Platform::Instagram | Platform::Tiktok => {
            &["username", "followers_count", "avg_likes", "avg_comments"]
        }
        Platform::Youtube => &["followers_count", "avg_views", "avg_likes", "avg_comments"],
        Platform::Twitter => &["username", "followers_count", "avg_likes"],
        Platform::Linkedin => &["username", "followers_count"],
    }
}

fn field_present(kpi: &ProfileKpi, field: &str) -> bool {
    match field {
        "username" => kpi.username.is_some(),
        "followers_count" => kpi.followers_count.is_some(),
        "posts_count" => kpi.posts_count.is_some(),
        "avg_likes" => kpi.avg_likes.is_some(),
        "avg_comments" => kpi.avg_comments.is_some(),
        "avg_shares" => kpi.avg_shares.is_some(),
        "avg_views" => kpi.avg_views.is_some(),
        "total_engagement" => kpi.total_engagement.is_some(),
        "engagement_rate" => kpi.engagement_rate.is_some(),
        _ => false,
    }
}

/// One account's shape check.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub platform: Platform,
    pub target: String,
    pub passed: bool,
    pub missing_fields: Vec<&'static str>,
}

/// Aggregate of a full validation run.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub outcomes: Vec<ValidationOutcome>,
}

impl ValidationReport {
    /// Fraction of checked accounts whose expected fields were all present.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pass_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let passed = self.outcomes.iter().filter(|o| o.passed).count();
        passed as f64 / self.outcomes.len() as f64
    }

    /// Per-platform `(passed, total)` counts.
    #[must_use]
    pub fn platform_counts(&self, platform: Platform) -> (usize, usize) {
        let for_platform: Vec<_> = self
            .outcomes
            .iter()
            .filter(|o| o.platform == platform)
            .collect();
        let passed = for_platform.iter().filter(|o| o.passed).count();
        (passed, for_platform.len())
    }
}

/// Check the response shape of one extracted snapshot.
#[must_use]
pub fn check_shape(kpi: &ProfileKpi) -> ValidationOutcome {
    let missing_fields: Vec<&'static str> = expected_fields(kpi.platform)
        .iter()
        .filter(|field| !field_present(kpi, field))
        .copied()
        .collect();
    ValidationOutcome {
        platform: kpi.platform,
        target: kpi.target.clone(),
        passed: kpi.extraction_success && missing_fields.is_empty(),
        missing_fields,
    }
}

/// Run the full matrix through the orchestrator.
pub async fn run_validation(orchestrator: &HybridOrchestrator) -> ValidationReport {
    let mut report = ValidationReport::default();
    for (platform, targets) in TEST_MATRIX {
        for &target in *targets {
            let kpi = orchestrator.extract(*platform, target).await;
            let outcome = check_shape(&kpi);
            if outcome.passed {
                info!(platform = %outcome.platform, target, "shape check passed");
            } else {
                warn!(
                    platform = %outcome.platform,
                    target,
                    missing = ?outcome.missing_fields,
                    "shape check failed"
                );
            }
            report.outcomes.push(outcome);
        }
    }
    report
}
