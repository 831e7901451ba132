//! Run command.

use std::path::Path;

use crate::cli::output;
use crate::core::cipher::Age;
use crate::core::engine::{self, Context, LiveConnector, RunOptions, RunReport};
use crate::core::layout::Layout;
use crate::core::lifecycle::Persisted;
use crate::core::settings::Settings;
use crate::core::vcs::Git;
use crate::error::Result;

/// Reconcile the checkout at `root`.
pub fn execute(root: &Path, offline: bool) -> Result<()> {
    let layout = Layout::new(root);
    let settings = Settings::load(&layout.settings())?;
    let git = Git::new(root)?;
    let cipher = Age::new();

    let ctx = Context {
        layout: &layout,
        settings: &settings,
        vcs: &git,
        cipher: &cipher,
        connector: &LiveConnector,
        today: chrono::Local::now().date_naive(),
        options: RunOptions {
            sync: !offline,
            ..RunOptions::default()
        },
    };

    let report = engine::run(&ctx)?;
    print_report(&layout, &report);
    Ok(())
}

fn print_report(layout: &Layout, report: &RunReport) {
    output::section("Catapult");
    output::kv("branch", report.branch);
    output::kv("company", &report.configuration.company.name);

    for kind in &report.reencrypted {
        let blob = layout.blob(*kind);
        output::success(&format!(
            "{} changed and was re-encrypted, please commit {}",
            kind.file_name(),
            output::path(&blob.ciphertext_relative())
        ));
    }

    match report.persisted {
        Some(Persisted::Written) => output::success(&format!(
            "discovered changes written, please commit {}",
            output::path(&layout.configuration().ciphertext_relative())
        )),
        Some(Persisted::Skipped) => {
            output::dimmed("discovered changes are only written on develop")
        }
        None => output::dimmed("no changes discovered"),
    }

    if !report.instances.is_empty() {
        output::section("Instances");
        for instance in &report.instances {
            let status = match (&instance.fact, instance.available) {
                (_, false) => "unavailable".to_string(),
                (None, true) => "not found".to_string(),
                (Some(fact), true) => fact.status.clone(),
            };
            output::list_item(&format!("{:<36} {:<14} {}", instance.name, instance.provider.as_str(), status));
        }
    }

    for remediation in &report.remediations {
        match &remediation.failure {
            None => output::success(&format!("{}: {}", remediation.instance, remediation.action)),
            Some(reason) => output::warn(&format!(
                "{}: {} failed, will retry next run: {}",
                remediation.instance, remediation.action, reason
            )),
        }
    }

    for warning in &report.warnings {
        output::warn(warning);
    }
}
