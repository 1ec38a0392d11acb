use anyhow::Context;
use clap::Parser;
use driver::PlayDriver;
use generator::profile::{write_drive, DriveProfile};
use gui_bridge::bridge::GuiBridge;
use gui_bridge::model::VisualizationModel;
use log::info;
use slipcore::ingest::write_merged;
use slipcore::playback::SessionHandle;
use slipcore::processing::{TrackedField, WindowSpec};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod driver;
mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Side-slip telemetry playback driver")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Base receiver CSV
    #[arg(long)]
    base: Option<PathBuf>,
    /// Rover receiver CSV
    #[arg(long)]
    rover: Option<PathBuf>,
    /// Previously merged CSV (skips the merge)
    #[arg(long)]
    merged: Option<PathBuf>,
    /// Trailing window length ("30s", "2m") or "all"
    #[arg(long, default_value = "30s")]
    window: WindowSpec,
    /// Write a synthetic base/rover drive into this directory and use it as input
    #[arg(long)]
    generate: Option<PathBuf>,
    /// Write the merged timeline to this path
    #[arg(long)]
    write_merged: Option<PathBuf>,
    /// Run once over the whole timeline and print a summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Play from the start to the end, logging each position
    #[arg(long, default_value_t = false)]
    play: bool,
    /// Serve frames and accept cursor commands over HTTP
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(
            args.base.clone(),
            args.rover.clone(),
            args.merged.clone(),
            args.window,
        )
    };

    if let Some(dir) = &args.generate {
        let (base, rover) = write_drive(dir, &DriveProfile::default())?;
        info!("synthetic drive written to {}", dir.display());
        workflow_config.base = Some(base);
        workflow_config.rover = Some(rover);
        workflow_config.merged = None;
    }

    let runner = Runner::new(workflow_config.clone());
    let mut session = runner.open_session()?;

    if let Some(path) = &args.write_merged {
        write_merged(path, session.timeline())
            .with_context(|| format!("writing merged timeline {}", path.display()))?;
        info!("merged timeline written to {}", path.display());
    }

    if args.offline {
        let summary = runner.execute(&mut session);
        println!(
            "Offline run -> rows {}, span {} .. {}, window seconds {}, segmentation seconds {}, final speed {:.3}, final slip {:.3}",
            summary.rows,
            summary.first_stamp.as_deref().unwrap_or("-"),
            summary.last_stamp.as_deref().unwrap_or("-"),
            summary.window_seconds,
            summary.segmentation_seconds,
            summary.final_speed.unwrap_or(f64::NAN),
            summary.final_slip_angle.unwrap_or(f64::NAN),
        );
    }

    if !args.play && !args.serve {
        return Ok(());
    }

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;
    let handle = SessionHandle::new(session);

    if args.play {
        runtime.block_on(play_through(&handle, &workflow_config))?;
    }
    if args.serve {
        let bridge = Arc::new(GuiBridge::new(handle, &workflow_config));
        let address = workflow_config.bind;
        runtime.block_on(async {
            tokio::select! {
                _ = bridge.clone().serve(address) => {}
                result = signal::ctrl_c() => {
                    result.context("awaiting Ctrl+C to exit")?;
                    bridge.publish_status("shutting down");
                }
            }
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}

async fn play_through(handle: &SessionHandle, config: &WorkflowConfig) -> anyhow::Result<()> {
    let metric_view = config.metric_view();
    let mut updates = handle.subscribe();
    let mut driver = PlayDriver::new();

    handle.mutate(|session| session.restart()).await;
    let first = handle.mutate(|session| session.play()).await;
    if !first.is_playing() {
        info!("nothing to play");
        return Ok(());
    }
    driver.start(handle.clone(), config.tick_interval());

    loop {
        let frame = {
            let mut session = handle.lock().await;
            VisualizationModel::capture(&mut session, &config.window, &metric_view)
        };
        if let Some(snapshot) = &frame.snapshot {
            println!(
                "{} [{}/{}] beta {:.2} ({:+.2}) window {}s",
                frame.clock.as_deref().unwrap_or("-"),
                frame.cursor.index + 1,
                frame.cursor.len,
                snapshot.current.beta,
                snapshot.delta(TrackedField::SlipAngle),
                frame.metrics.stamps.len(),
            );
        }
        if !frame.cursor.is_playing() {
            break;
        }
        updates
            .changed()
            .await
            .context("session closed during playback")?;
    }
    driver.join().await;
    Ok(())
}
