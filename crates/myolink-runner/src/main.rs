//! `myolink`: bridge Myo armbands to OSC.

use std::process::ExitCode;

use clap::Parser;
use myolink_driver::{CancelToken, DriverError};
use myolink_runner::{
    spawn_link, supervise, BridgeConfig, Cli, LinkMode, LinkOptions, LinkPlan, LinkReport, OscSink, RunnerError,
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.verbose);
    if let Some(port) = config.metrics_port {
        if let Err(e) = install_metrics(port) {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    }
    myolink_metrics::describe_metrics();

    let mode = if cli.shutdown { LinkMode::Shutdown } else { LinkMode::Stream };
    match run(&config, mode) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();
}

#[cfg(feature = "prometheus")]
fn install_metrics(port: u16) -> Result<(), RunnerError> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    myolink_metrics::install_prometheus(addr).map_err(|e| RunnerError::Metrics(e.to_string()))?;
    info!(%addr, "serving metrics");
    Ok(())
}

#[cfg(not(feature = "prometheus"))]
fn install_metrics(_port: u16) -> Result<(), RunnerError> {
    Err(RunnerError::Metrics(
        "built without the `prometheus` feature".to_string(),
    ))
}

/// Start every link and wait for all of them. Returns whether every link
/// finished cleanly and released all of its armbands.
fn run(config: &BridgeConfig, mode: LinkMode) -> Result<bool, RunnerError> {
    let plans = config.link_plans()?;
    let target = config.osc_target();
    info!(links = plans.len(), osc = %target, "starting");

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    ctrlc::set_handler(move || {
        info!("interrupt received, shutting down");
        on_interrupt.cancel();
    })?;

    let options = LinkOptions {
        mode,
        command_delay: config.command_delay(),
        deep_sleep_on_exit: config.deep_sleep_on_exit,
    };

    let sinks = plans
        .iter()
        .map(|plan| OscSink::new(&target, plan.driver.label.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    let links: Vec<_> = plans.into_iter().zip(sinks).collect();

    let all_ok = supervise(
        links,
        &cancel,
        |(plan, sink): (LinkPlan, OscSink), reports| {
            debug!(link = %plan.driver.label, osc = %sink.target(), "starting link");
            spawn_link(plan, sink, options, cancel.clone(), reports)
        },
        print_report,
    )?;
    info!("done");
    Ok(all_ok)
}

/// Tell the operator how a link ended and what happened to each armband.
fn print_report(report: &LinkReport) {
    match &report.result {
        Ok(()) => info!(link = %report.label, "finished"),
        Err(DriverError::Interrupted) => info!(link = %report.label, "stopped"),
        Err(e @ DriverError::Open { .. }) => {
            eprintln!(
                "{}: {}. Close any other program using this serial port.",
                report.label, e
            );
        }
        Err(e) => eprintln!("{}: {}", report.label, e),
    }

    if let Some(teardown) = &report.teardown {
        for outcome in &teardown.outcomes {
            match &outcome.result {
                Ok(()) => info!(link = %report.label, address = %outcome.address, "{} sent", teardown.mode),
                Err(reason) => eprintln!("{}: couldn't reach {}: {}", report.label, outcome.address, reason),
            }
        }
    }
}
