//! Present command - run the paywall flow against the simulated store

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use paywall_interactive::{
    present_if_needed, FetchFailurePolicy, PaywallCallbacks, PaywallHost, PaywallViewModel,
    PresentationConfig, PresentationDecision, PurchaseHandler,
};
use paywall_lib::{PackageId, PurchaseError};
use std::sync::{Arc, Mutex};

use super::FailureMode;
use crate::config::DemoConfig;
use crate::ui;

/// Options of the `present` command
#[derive(Debug, Clone, Default)]
pub struct PresentOptions {
    pub entitled: bool,
    pub package: Option<String>,
    pub fail: Option<FailureMode>,
    pub delay_ms: Option<u64>,
    pub restore: bool,
    pub yes: bool,
}

/// Paywall host that renders to the terminal and keeps the mounted paywall.
#[derive(Default)]
struct TerminalHost {
    mounted: Mutex<Option<PaywallViewModel>>,
}

impl TerminalHost {
    fn paywall(&self) -> Option<PaywallViewModel> {
        self.mounted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl PaywallHost for TerminalHost {
    fn mount(&self, paywall: PaywallViewModel) {
        ui::header(&format!("Paywall: {}", paywall.offering().server_description));
        for package in paywall.packages() {
            let status = paywall.intro_eligibility(&package.id);
            let selected = if paywall.is_selected(&package.id) {
                "▸"
            } else {
                " "
            };
            println!(
                "  {} {} - {}",
                selected,
                package.display_name,
                package.price.formatted()
            );
            if paywall.shows_intro_offer(&package.id) {
                ui::key_value(
                    "    Intro offer",
                    &super::offering::intro_summary(package, status),
                );
            }
        }
        *self.mounted.lock().unwrap_or_else(|e| e.into_inner()) = Some(paywall);
    }

    fn unmount(&self) {
        ui::info("Paywall dismissed");
        self.mounted.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}

/// Callback trail, printed as it happens and summarised at the end.
#[derive(Clone, Default)]
struct Trail {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Trail {
    fn push(&self, entry: String) {
        tracing::debug!(callback = %entry, "paywall callback");
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn callbacks(&self) -> PaywallCallbacks {
        let started = self.clone();
        let completed = self.clone();
        let purchase_failed = self.clone();
        let restored = self.clone();
        let restore_failed = self.clone();
        let dismissed = self.clone();

        PaywallCallbacks::new()
            .on_purchase_started(move || started.push("purchase_started".to_string()))
            .on_purchase_completed(move |info| {
                completed.push(format!("purchase_completed({})", info.app_user_id))
            })
            .on_purchase_failure(move |err| {
                purchase_failed.push(format!("purchase_failure({})", err))
            })
            .on_restore_completed(move |info| {
                restored.push(format!("restore_completed({})", info.app_user_id))
            })
            .on_restore_failure(move |err| {
                restore_failed.push(format!("restore_failure({})", err))
            })
            .on_dismiss(move || dismissed.push("dismissed".to_string()))
    }
}

/// Run the presentation flow once
pub async fn run(config: &DemoConfig, opts: PresentOptions, verbose: bool) -> Result<()> {
    let package_id = match &opts.package {
        Some(id) => PackageId::new(id.clone()),
        None => config
            .offering
            .default_package()
            .map(|p| p.id.clone())
            .ok_or_else(|| anyhow!("Offering '{}' has no packages", config.offering.id))?,
    };
    let product_id = config
        .offering
        .package(&package_id)
        .map(|p| p.product_id.clone())
        .unwrap_or_else(|| package_id.to_string());

    let backend = super::backend(config, opts.fail, opts.delay_ms, &product_id);
    let handler = PurchaseHandler::with_config(Arc::new(backend), config.handler.clone());
    let policy = if config.skip_paywall_on_lookup_failure {
        FetchFailurePolicy::SkipPaywall
    } else {
        FetchFailurePolicy::PresentPaywall
    };

    let trail = Trail::default();
    let presentation = PresentationConfig::new(
        config.offering.clone(),
        handler.clone(),
        super::fetcher(config, opts.entitled || config.entitled),
        super::eligibility(config),
    )
    .requiring_entitlement(config.entitlement.clone())
    .with_fetch_failure_policy(policy)
    .with_callbacks(trail.callbacks());

    let host = Arc::new(TerminalHost::default());
    let spinner = ui::spinner("Checking entitlements...");
    let handle = present_if_needed(presentation, host.clone());
    let decision = handle.wait_for_decision().await;
    spinner.finish_and_clear();

    if decision == PresentationDecision::Skipped {
        ui::success(&format!(
            "User already has '{}', paywall skipped",
            config.entitlement
        ));
        return Ok(());
    }

    let mut paywall = host.paywall().context("Paywall was not mounted")?;
    if let Err(err) = paywall.select(&package_id) {
        handle.dispose();
        return Err(anyhow!(err).context("Unknown package"));
    }

    let outcome = if opts.restore {
        restore(&paywall, opts.yes).await
    } else {
        purchase(&paywall).await
    };

    handle.dispose();

    ui::header("Callbacks");
    let entries = trail.entries();
    if entries.is_empty() {
        ui::info("No callbacks fired");
    }
    for entry in entries {
        ui::key_value("→", &entry);
    }

    if verbose {
        ui::header("Metrics");
        ui::json(&serde_json::to_value(handler.metrics().snapshot())?);
    }

    match outcome {
        Err(err) if !err.is_cancellation() => {
            Err(anyhow!(err).context("Purchase flow failed"))
        }
        _ => Ok(()),
    }
}

async fn purchase(paywall: &PaywallViewModel) -> Result<(), PurchaseError> {
    let package = paywall
        .selected_package()
        .map(|p| p.display_name.clone())
        .unwrap_or_default();
    let spinner = ui::spinner(&format!("Purchasing {}...", package));
    let result = paywall.purchase_selected().await;
    spinner.finish_and_clear();

    match &result {
        Ok(info) => ui::success(&format!(
            "Purchased {} for {} at {}",
            package,
            info.app_user_id,
            info.request_date.with_timezone(&Local).format("%H:%M:%S")
        )),
        Err(err) if err.is_cancellation() => ui::warning("Purchase cancelled"),
        Err(err) => ui::error(&format!("Purchase failed [{:?}]: {}", err.code(), err)),
    }
    result.map(|_| ())
}

async fn restore(paywall: &PaywallViewModel, yes: bool) -> Result<(), PurchaseError> {
    let spinner = ui::spinner("Restoring purchases...");
    let result = paywall.restore().await;
    spinner.finish_and_clear();

    match result {
        Ok(info) => {
            let active: Vec<&str> = info
                .active_entitlements()
                .into_iter()
                .map(|e| e.identifier.as_str())
                .collect();
            ui::success(&format!("Restored entitlements: {}", active.join(", ")));

            let acknowledged =
                yes || ui::confirm("Continue with restored purchases?", true).unwrap_or(true);
            if acknowledged {
                paywall.acknowledge_restore(info);
            } else {
                ui::warning("Restore not acknowledged");
            }
            Ok(())
        }
        Err(err) if err.is_cancellation() => {
            ui::warning("Restore cancelled");
            Err(err)
        }
        Err(err) => {
            ui::error(&format!("Restore failed [{:?}]: {}", err.code(), err));
            Err(err)
        }
    }
}
