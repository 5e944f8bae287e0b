use std::collections::HashMap;
use std::time::{Duration, Instant};

use argh::FromArgs;
use chrono::Utc;

use weathervane::config::{self, Config};
use weathervane::ingest::buienradar;
use weathervane::logging::{self, Component};
use weathervane::pipeline::Pipeline;
use weathervane::transport::{self, FrameSink, LogSink};

#[derive(FromArgs)]
/// Fetch Buienradar station data and push it to the display as bit frames.
struct Args {
    /// path to the TOML configuration file
    #[argh(option, short = 'c')]
    config: Option<String>,

    /// run one collection cycle and exit
    #[argh(switch)]
    once: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let args: Args = argh::from_env();

    let config_path = config::resolve_path(args.config.as_deref());
    let config = Config::load(&config_path)?;

    logging::init_logger(
        config.logging.min_level()?,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );
    logging::info(
        Component::System,
        None,
        &format!(
            "Loaded {} ({} stations, {} bit frame)",
            config_path,
            config.stations.len(),
            config.layout.total_bits()
        ),
    );

    let mut sink = LogSink::new();
    let display_interval = Duration::from_secs_f64(config.general.data_display_interval.max(0.1));

    if config.general.test {
        return run_test_pattern(&mut sink, display_interval, args.once);
    }

    let client = buienradar::build_client()?;
    let collection_interval = Duration::from_secs(config.general.data_collection_interval);
    let mut pipeline = Pipeline::from_config(&config);

    let mut frame: Vec<u8> = Vec::new();
    let mut last_collection: Option<Instant> = None;

    loop {
        let due = last_collection.is_none_or(|at| at.elapsed() >= collection_interval);
        if due {
            let records = match buienradar::fetch_records(&client, &config.general.feed_url) {
                Ok(records) => {
                    logging::info(
                        Component::Feed,
                        None,
                        &format!("Received {} stations", records.len()),
                    );
                    records
                }
                Err(e) => {
                    logging::log_feed_failure("Buienradar download", &e);
                    HashMap::new()
                }
            };

            let output = pipeline.run_cycle(&records, Utc::now());
            if output.changed {
                logging::info(Component::Encode, None, "New frame ready");
            }
            frame = output.frame;
            last_collection = Some(Instant::now());
        }

        if let Err(e) = sink.send(&frame) {
            logging::error(Component::Transport, None, &e.to_string());
        }

        if args.once {
            return Ok(());
        }
        std::thread::sleep(display_interval);
    }
}

fn run_test_pattern(
    sink: &mut dyn FrameSink,
    interval: Duration,
    once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    logging::info(Component::System, None, "Test mode: sending wiring test pattern");
    let mut counter: u32 = 0;
    loop {
        counter = counter.wrapping_add(1);
        sink.send(&transport::test_pattern(counter))?;
        if once {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}
