//! Command handlers. Data goes to stdout, logs to stderr.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chartdeck_data::{ChartConfig, ChartDataError, ChartRegistry, FetchAttempt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Command, OutputFormat};

pub async fn run(command: Command, registry: ChartRegistry) -> Result<()> {
    let registry = Arc::new(registry);
    match command {
        Command::List { production } => list(&registry, production),
        Command::Dashboard { id } => dashboard(&registry, &id),
        Command::Fetch {
            chart,
            format,
            timeout_secs,
        } => fetch(&registry, &chart, format, timeout_secs.map(Duration::from_secs)).await,
        Command::Status { chart } => status(&registry, &chart).await,
        Command::Check => check(&registry),
        Command::Watch { report_secs } => watch(registry, Duration::from_secs(report_secs)).await,
    }
}

fn list(registry: &ChartRegistry, production_only: bool) -> Result<()> {
    let configs: Vec<Arc<ChartConfig>> = if production_only {
        registry.production_ready_charts()
    } else {
        registry
            .chart_types()
            .filter_map(|chart_type| registry.get_chart_config(chart_type))
            .collect()
    };

    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "{:<24} {:<16} {:<10} {:<4} TITLE",
        "CHART", "DATA", "STATUS", "PROD"
    )?;
    for config in configs {
        writeln!(out, "{}", describe(&config))?;
    }
    Ok(())
}

fn describe(config: &ChartConfig) -> String {
    let (data, status) = match &config.requirements {
        Some(r) => (r.category().to_string(), format!("{:?}", r.chart_status()).to_lowercase()),
        None => ("-".to_string(), "-".to_string()),
    };
    format!(
        "{:<24} {:<16} {:<10} {:<4} {}",
        config.chart_type,
        data,
        status,
        if config.production_ready { "yes" } else { "no" },
        config.title
    )
}

fn dashboard(registry: &ChartRegistry, id: &str) -> Result<()> {
    if registry.dashboard_chart_types(id).is_none() {
        bail!("Unknown dashboard '{}'", id);
    }

    let mut out = std::io::stdout().lock();
    for config in registry.get_charts_for_dashboard(id) {
        writeln!(out, "{}", describe(&config))?;
    }
    Ok(())
}

async fn fetch(
    registry: &ChartRegistry,
    chart: &str,
    format: OutputFormat,
    timeout: Option<Duration>,
) -> Result<()> {
    let token = CancellationToken::new();
    let watchdog = cancel_on_interrupt(token.clone(), timeout);

    let result = match format {
        OutputFormat::Csv => registry.fetch_csv(chart, Some(&token)).await,
        OutputFormat::Json => registry
            .fetch_data(chart, Some(&token))
            .await
            .and_then(|rows| {
                serde_json::to_string_pretty(&rows).map_err(|e| ChartDataError::ParseError {
                    location: chart.to_string(),
                    message: e.to_string(),
                })
            })
            .map(|mut text| {
                text.push('\n');
                text
            }),
    };

    token.cancel();
    watchdog.await.ok();

    let output = result.map_err(|e| {
        report_attempts(&e);
        e
    })?;
    std::io::stdout().lock().write_all(output.as_bytes())?;
    Ok(())
}

async fn status(registry: &ChartRegistry, chart: &str) -> Result<()> {
    let (report, failure) = status_report(registry, chart).await?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Refresh `chart` and describe the outcome. A failed refresh still yields a
/// report, with the error alongside it.
async fn status_report(
    registry: &ChartRegistry,
    chart: &str,
) -> Result<(serde_json::Value, Option<ChartDataError>)> {
    if !registry.is_supported(chart) {
        bail!(ChartDataError::UnknownChartType(chart.to_string()));
    }
    let adapter = registry
        .adapter(chart)
        .ok_or_else(|| ChartDataError::NoDataSource(chart.to_string()))?;

    let (attempts, failure) = match adapter.refresh(None).await {
        Ok(diagnostics) => {
            info!("Refresh of '{}': {}", chart, diagnostics.summary());
            (diagnostics.attempts, None)
        }
        Err(ChartDataError::ManualRefreshDisabled(_)) => {
            warn!("Manual refresh is disabled for '{}', using a regular fetch", chart);
            match adapter.fetch_json(None).await {
                Ok(_) => (Vec::new(), None),
                Err(e) => {
                    report_attempts(&e);
                    (e.attempts().to_vec(), Some(e))
                }
            }
        }
        Err(e) => {
            report_attempts(&e);
            (e.attempts().to_vec(), Some(e))
        }
    };

    let report = serde_json::json!({
        "chartType": chart,
        "productionReady": registry.is_production_ready(chart),
        "cache": adapter.cache_status(),
        "attempts": attempts,
        "error": failure.as_ref().map(ToString::to_string),
    });
    Ok((report, failure))
}

fn check(registry: &ChartRegistry) -> Result<()> {
    let mut problems = 0usize;

    let mut dashboard_ids: Vec<&str> = registry.dashboard_ids().collect();
    dashboard_ids.sort_unstable();
    for id in dashboard_ids {
        for chart_type in registry.dashboard_chart_types(id).unwrap_or_default() {
            if !registry.is_supported(chart_type) {
                error!(
                    "Dashboard '{}' references unregistered chart '{}'",
                    id, chart_type
                );
                problems += 1;
            }
        }
    }

    if problems > 0 {
        bail!("Catalog check found {} problem(s)", problems);
    }

    let with_adapter = registry
        .chart_types()
        .filter(|chart_type| registry.adapter(chart_type).is_some())
        .count();
    writeln!(
        std::io::stdout().lock(),
        "Catalog OK: {} charts ({} with data sources), {} production ready",
        registry.len(),
        with_adapter,
        registry.production_ready_charts().len()
    )
    .context("Failed to write report")?;
    Ok(())
}

async fn watch(registry: Arc<ChartRegistry>, report_every: Duration) -> Result<()> {
    let shutdown = CancellationToken::new();
    let handles = registry.spawn_auto_refresh(&shutdown);
    if handles.is_empty() {
        warn!("No chart has auto_refresh enabled, nothing to watch");
        return Ok(());
    }
    info!("Watching {} auto-refreshing charts", handles.len());

    let mut ticker = tokio::time::interval(report_every);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                for chart_type in registry.chart_types() {
                    if let Some(status) = registry.adapter(chart_type).and_then(|a| a.cache_status()) {
                        info!(
                            "{}: {} rows from '{}', {:.2}h old ({})",
                            chart_type, status.rows, status.source, status.age_hours, status.freshness
                        );
                    }
                }
            }
        }
    }

    info!("Shutting down auto refresh");
    shutdown.cancel();
    for handle in handles {
        handle.await.ok();
    }
    Ok(())
}

/// Cancel `token` on Ctrl-C or once `timeout` elapses. Ends quietly when the
/// token is cancelled by someone else.
fn cancel_on_interrupt(token: CancellationToken, timeout: Option<Duration>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::signal::ctrl_c() => warn!("Interrupted, cancelling fetch"),
            _ = deadline => warn!("Fetch timed out, cancelling"),
        }
        token.cancel();
    })
}

fn report_attempts(err: &ChartDataError) {
    for FetchAttempt {
        source,
        attempt,
        outcome,
        ..
    } in err.attempts()
    {
        error!("  {} attempt {}: {:?}", source, attempt, outcome);
    }
}
