use clap::Subcommand;
use lifedash::dto::CreateTrackingDto;

use crate::client::LifedashClient;
use crate::output::{self, OutputConfig};

/// Tracking commands
#[derive(Subcommand, Debug)]
pub enum TrackingCommands {
    /// Record a measurement
    Add {
        /// Metric name, e.g. sleep or weight
        metric: String,
        value: f64,
        #[clap(long)]
        unit: Option<String>,
        #[clap(long)]
        note: Option<String>,
    },
    /// List measurements
    List {
        #[clap(long)]
        metric: Option<String>,
        /// today, week, month, year or all
        #[clap(long, default_value = "week")]
        range: String,
    },
    /// Min, max, mean and latest value per metric
    Summary {
        #[clap(long)]
        metric: Option<String>,
        /// today, week, month, year or all
        #[clap(long, default_value = "month")]
        range: String,
    },
}

/// Executes a tracking command
pub async fn execute(
    client: &LifedashClient,
    cmd: TrackingCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        TrackingCommands::Add { metric, value, unit, note } => {
            let dto = CreateTrackingDto { metric, value, unit, note, recorded_at: None };
            let entry = client.create_tracking(&dto).await?;
            output::print_tracking_entry(&entry, config);
        }

        TrackingCommands::List { metric, range } => {
            let entries = client.list_tracking(metric.as_deref(), &range).await?;
            output::print_tracking_entries(&entries, config);
        }

        TrackingCommands::Summary { metric, range } => {
            let summaries = client.tracking_summary(metric.as_deref(), &range).await?;
            output::print_tracking_summaries(&summaries, config);
        }
    }
    Ok(())
}
