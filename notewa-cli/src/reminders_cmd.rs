use anyhow::{Context, Result};
use chrono::Utc;
use notewa_core::{
    format_reminder_raw, normalize, DispatchOutcome, Dispatcher, NoteCheck, ReminderError,
    ReminderService, SweepReport,
};
use notewa_gateway::{DryRunDispatcher, FonnteGateway};
use std::sync::Arc;

use crate::config::{load_config, Config, TOKEN_ENV};
use crate::state::{open_store, require_session};

fn build_dispatcher(cfg: &Config, dry_run: bool) -> Result<Arc<dyn Dispatcher>> {
    if dry_run {
        return Ok(Arc::new(DryRunDispatcher));
    }
    let gateway = FonnteGateway::new(cfg.gateway_config(std::env::var(TOKEN_ENV).ok()))?;
    Ok(Arc::new(gateway))
}

fn build_service(
    cfg: &Config,
    dry_run: bool,
) -> Result<ReminderService<notewa_store::FileStore, Arc<dyn Dispatcher>>> {
    let service = ReminderService::new(open_store()?, build_dispatcher(cfg, dry_run)?)
        .with_options(cfg.sweep_options())
        .with_window_hours(cfg.sweep.window_hours);

    // Let in-flight sends finish; start nothing new.
    let cancel = service.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling: waiting for in-flight messages to finish…");
            cancel.cancel();
        }
    });

    Ok(service)
}

/// Scheduled trigger: remind every note due within the configured window.
pub async fn sweep(json: bool, dry_run: bool) -> Result<()> {
    let cfg = load_config()?;
    let service = build_service(&cfg, dry_run)?;

    let report = service
        .run_scheduled(Utc::now())
        .await
        .map_err(explain)
        .context("reminder sweep failed")?;
    print_report(&report, json)
}

/// On-demand trigger for one of the current user's notes.
pub async fn check(note_id: &str, deadline: Option<&str>, json: bool, dry_run: bool) -> Result<()> {
    let session = require_session()?;
    let mut request = NoteCheck::new(note_id, &session.user_id);
    if let Some(raw) = deadline {
        request = request.with_raw_deadline(raw)?;
    }

    let cfg = load_config()?;
    let service = build_service(&cfg, dry_run)?;
    let report = service
        .check_note(request, Utc::now())
        .await
        .map_err(explain)
        .with_context(|| format!("reminder check for {note_id} failed"))?;
    print_report(&report, json)
}

/// Check run right after a note with a deadline was created or edited.
///
/// The note is already saved, so problems are reported but never fail the command.
pub async fn auto_check(note_id: &str, user_id: &str) {
    let run = async {
        let cfg = load_config()?;
        let service = build_service(&cfg, false)?;
        let report = service
            .check_note(NoteCheck::new(note_id, user_id), Utc::now())
            .await
            .map_err(explain)?;
        Ok::<_, anyhow::Error>(report)
    };

    match run.await {
        Ok(report) => {
            for o in &report.outcomes {
                match o {
                    DispatchOutcome::Sent { phone_number, hours_diff, .. } => {
                        println!("WhatsApp reminder sent to {phone_number} ({hours_diff} jam lagi)");
                    }
                    DispatchOutcome::Failed { error, .. } => {
                        println!("Reminder not sent: {error}");
                    }
                    DispatchOutcome::Skipped { .. } => {}
                }
            }
        }
        Err(e) => {
            tracing::warn!(note_id, error = %e, "auto reminder check failed");
            println!("Reminder check skipped: {e:#}");
        }
    }
}

/// Send a single WhatsApp message immediately.
pub async fn send(to: &str, text: &str) -> Result<()> {
    let cfg = load_config()?;
    let phone = normalize(to)?.dispatch_form();
    let gateway = FonnteGateway::new(cfg.gateway_config(std::env::var(TOKEN_ENV).ok()))?;
    gateway.ensure_ready().map_err(explain)?;

    let receipt = gateway.dispatch(&phone, text).await?;
    println!(
        "Sent WhatsApp to {phone}: {}",
        receipt.detail.as_deref().unwrap_or("accepted")
    );
    if !receipt.message_ids.is_empty() {
        println!("Message ids: {}", receipt.message_ids.join(", "));
    }
    Ok(())
}

/// Print the reminder text that would be sent, without sending it.
pub fn preview(title: &str, deadline: &str) {
    println!("{}", format_reminder_raw(title, deadline, Utc::now()));
}

fn explain(e: ReminderError) -> anyhow::Error {
    match e {
        ReminderError::GatewayAuth => anyhow::anyhow!(
            "gateway token not configured (set {TOKEN_ENV} or [gateway].token in config.toml)"
        ),
        other => other.into(),
    }
}

fn print_report(report: &SweepReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let skipped = report.processed - report.sent() - report.failed();
    println!(
        "Processed {} notes: {} sent, {} failed, {} skipped",
        report.processed,
        report.sent(),
        report.failed(),
        skipped
    );
    for o in &report.outcomes {
        match o {
            DispatchOutcome::Sent {
                note_id,
                phone_number,
                hours_diff,
            } => println!("  sent     {note_id} -> {phone_number} ({hours_diff} jam lagi)"),
            DispatchOutcome::Skipped { note_id, reason } => println!("  skipped  {note_id} ({reason})"),
            DispatchOutcome::Failed { note_id, error } => println!("  failed   {note_id}: {error}"),
        }
    }
    Ok(())
}
