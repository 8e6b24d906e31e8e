use anyhow::Result;
use clap::Parser;
use rs_surveillance::{
    alerts::AlertLog,
    api::ApiClient,
    channel::EventChannelClient,
    cli::Args,
    config::Config,
    events::{DashboardEvent, channel_callbacks, create_event_channel, frame_display},
    frames::FrameDeliveryClient,
    monitoring::setup_metrics,
    tracing_setup::setup_tracing,
    ui::{UIController, UIOptions},
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup tracing/logging
    setup_tracing(&args.log_level, args.json_logs)?;

    info!(
        "Starting surveillance dashboard v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_args(&args)?;
    info!(backend = %config.api.base_url, channel = %config.channel.url, "Configuration loaded");

    // Setup metrics server if enabled
    if config.metrics.enabled {
        setup_metrics(config.metrics.port).await?;
    }

    let api = ApiClient::new(&config.api)?;
    if config.api.start_processing {
        match api.start_processing().await {
            Ok(reply) => info!("{}", reply.message),
            Err(e) => warn!("Could not start processing: {}", e),
        }
    }

    let mut alert_log = AlertLog::new(config.api.alert_history);
    match api.list_alerts(config.api.alert_history, 0).await {
        Ok(page) => {
            info!(loaded = page.alerts.len(), total = page.total, "Alert history loaded");
            alert_log.seed(page.alerts);
        }
        Err(e) => warn!("Could not load alert history: {}", e),
    }

    let (event_sender, event_receiver) = create_event_channel();

    let channel = EventChannelClient::new(&config.channel);
    channel.set_callbacks(channel_callbacks(event_sender.clone()));
    channel.connect();

    let frames = if config.frames.enabled {
        let frames = FrameDeliveryClient::new(&config.frames, frame_display(event_sender.clone()))?;
        frames.start();
        Some(frames)
    } else {
        info!("Video feed disabled");
        None
    };

    let config_refresh = (!config.api.config_refresh.is_zero()).then(|| {
        let api = api.clone();
        let sender = event_sender.clone();
        let interval = config.api.config_refresh;
        tokio::spawn(async move {
            api.poll_config(interval, |latest| {
                sender.send(DashboardEvent::ConfigUpdated(Box::new(latest)));
            })
            .await
        })
    });

    let mut ui = UIController::new(
        event_receiver,
        config.display.format,
        UIOptions {
            colored: config.display.colored,
            quiet: config.display.quiet,
            max_alerts: config.display.max_alerts,
            reconnect_delay: config.channel.reconnect_delay,
        },
        alert_log,
    );

    info!("Dashboard running. Press Ctrl+C to shutdown...");
    tokio::select! {
        _ = ui.run() => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
            event_sender.send(DashboardEvent::Stopping);
        }
    }

    if let Some(refresh) = config_refresh {
        refresh.abort();
    }
    channel.disconnect();
    if let Some(frames) = frames {
        frames.shutdown();
    }

    ui.print_summary();
    info!("Dashboard stopped successfully");
    Ok(())
}
