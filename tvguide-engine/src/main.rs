//! tvguide - program guide engine driven from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use tvguide_engine::channels::ChannelList;
use tvguide_engine::config::{ConfigError, EngineConfig};
use tvguide_engine::grid::{GridNavigator, GuideRenderer, TextRenderer};
use tvguide_engine::logging;
use tvguide_engine::scheduler::RefreshScheduler;
use tvguide_engine::search::{ChannelSelection, SearchFilter};
use tvguide_engine::source::{JsonFileSource, RecordingSource, TimerSource};
use tvguide_engine::store::EpgStore;

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_RETENTION_DAYS: u64 = 7;

/// Program guide engine.
#[derive(Parser, Debug)]
#[command(name = "tvguide")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log directory
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    /// Number of days to keep log files
    #[arg(long, default_value_t = DEFAULT_LOG_RETENTION_DAYS)]
    log_retention_days: u64,

    /// Backend fixture (JSON)
    #[arg(long, default_value = "demos/fixture.json")]
    fixture: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Clock override (RFC 3339) for replaying a fixture
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the guide grid after replaying key presses.
    Grid {
        /// Keys: u/d/l/r move, U/D page, h/e begin/end, n now, </> skip an hour
        #[arg(long, default_value = "")]
        keys: String,

        /// Window start (RFC 3339); defaults to now
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Window length in hours
        #[arg(long, default_value_t = 6)]
        hours: i64,

        /// Characters per block in text output
        #[arg(long, default_value_t = 2)]
        cell_width: usize,
    },

    /// Search the guide.
    Search(SearchArgs),

    /// Keep the store refreshed until interrupted.
    Serve,
}

/// Search criteria. Every flag maps onto one [`SearchFilter`] field.
#[derive(clap::Args, Debug)]
struct SearchArgs {
    /// Text searched in titles
    text: Option<String>,

    /// Also search plot and outline
    #[arg(long)]
    description: bool,

    #[arg(long)]
    case_sensitive: bool,

    /// Genre type code (e.g. 16 for movies)
    #[arg(long)]
    genre: Option<u8>,

    /// Let events with an unknown genre code pass the genre check
    #[arg(long)]
    include_unknown_genres: bool,

    /// Display channel number
    #[arg(long, conflicts_with_all = ["tv", "radio"])]
    channel: Option<u32>,

    /// TV channels only
    #[arg(long, conflicts_with = "radio")]
    tv: bool,

    /// Radio channels only
    #[arg(long)]
    radio: bool,

    /// Channel group id
    #[arg(long)]
    group: Option<u32>,

    #[arg(long)]
    min_duration: Option<u32>,

    #[arg(long)]
    max_duration: Option<u32>,

    #[arg(long)]
    free_to_air: bool,

    /// Earliest start time of day (HH:MM, UTC)
    #[arg(long, value_parser = parse_hour_minute)]
    from_time: Option<NaiveTime>,

    /// Latest end time of day (HH:MM, UTC)
    #[arg(long, value_parser = parse_hour_minute)]
    to_time: Option<NaiveTime>,

    /// Earliest start date (YYYY-MM-DD)
    #[arg(long)]
    from_date: Option<NaiveDate>,

    /// Latest end date (YYYY-MM-DD)
    #[arg(long)]
    to_date: Option<NaiveDate>,

    /// Drop events that already have a timer
    #[arg(long)]
    no_timers: bool,

    /// Drop events that are already recorded
    #[arg(long)]
    no_recordings: bool,

    /// Drop repeated airings
    #[arg(long)]
    no_repeats: bool,
}

impl SearchArgs {
    fn to_filter(&self) -> SearchFilter {
        let channel = match (self.channel, self.tv, self.radio) {
            (Some(number), _, _) => ChannelSelection::Number(number),
            (None, true, _) => ChannelSelection::AnyTv,
            (None, _, true) => ChannelSelection::AnyRadio,
            _ => ChannelSelection::Any,
        };

        SearchFilter {
            search_text: self.text.clone(),
            case_sensitive: self.case_sensitive,
            search_description: self.description,
            genre_type: self.genre,
            include_unknown_genres: self.include_unknown_genres,
            min_duration_mins: self.min_duration,
            max_duration_mins: self.max_duration,
            channel,
            group_id: self.group,
            free_to_air_only: self.free_to_air,
            start_time: self.from_time,
            end_time: self.to_time,
            start_date: self.from_date,
            end_date: self.to_date,
            ignore_present_timers: self.no_timers,
            ignore_present_recordings: self.no_recordings,
            prevent_repeats: self.no_repeats,
        }
    }
}

fn parse_hour_minute(value: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(value, "%H:%M")
}

/// `[epg]` and `[grid]` values given on the command line; they win over the file.
#[derive(clap::Args, Debug, Default)]
struct ConfigOverrides {
    #[arg(long)]
    linger_time_mins: Option<i64>,

    #[arg(long)]
    days_to_display: Option<i64>,

    #[arg(long)]
    refresh_interval_secs: Option<u64>,

    #[arg(long)]
    cleanup_interval_secs: Option<u64>,

    #[arg(long)]
    minutes_per_block: Option<u32>,

    #[arg(long)]
    blocks_per_page: Option<usize>,

    #[arg(long)]
    channels_per_page: Option<usize>,

    /// Wrap up/down around the channel list (true/false)
    #[arg(long)]
    wraparound: Option<bool>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut EngineConfig) -> Result<(), ConfigError> {
        let epg = &mut config.epg;
        epg.linger_time_mins = self.linger_time_mins.or(epg.linger_time_mins);
        epg.days_to_display = self.days_to_display.or(epg.days_to_display);
        epg.refresh_interval_secs = self.refresh_interval_secs.or(epg.refresh_interval_secs);
        epg.cleanup_interval_secs = self.cleanup_interval_secs.or(epg.cleanup_interval_secs);

        let grid = &mut config.grid;
        grid.minutes_per_block = self.minutes_per_block.or(grid.minutes_per_block);
        grid.blocks_per_page = self.blocks_per_page.or(grid.blocks_per_page);
        grid.channels_per_page = self.channels_per_page.or(grid.channels_per_page);
        grid.wraparound = self.wraparound.or(grid.wraparound);

        config.validate()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match EngineConfig::locate(args.config.clone()) {
        Some(path) => {
            let config = EngineConfig::load(&path)?;
            eprintln!("Loaded config from {:?}", path);
            config
        }
        None => EngineConfig::default(),
    };
    args.overrides.apply(&mut config)?;

    // CLI values win when they differ from the defaults
    let log_dir = if args.log_dir != PathBuf::from(DEFAULT_LOG_DIR) {
        args.log_dir.clone()
    } else {
        config
            .logging
            .log_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| args.log_dir.clone())
    };
    let log_retention_days = if args.log_retention_days != DEFAULT_LOG_RETENTION_DAYS {
        args.log_retention_days
    } else {
        config
            .logging
            .retention_days
            .unwrap_or(args.log_retention_days)
    };

    logging::init_logging(
        &log_dir,
        log_retention_days,
        args.verbose,
        config.logging.level.as_deref(),
    )?;

    let store_config = config.store_config();
    info!("tvguide v{}", env!("CARGO_PKG_VERSION"));
    info!("  Fixture: {:?}", args.fixture);
    info!("  Log directory: {:?}", log_dir);
    info!("  Log retention: {} days", log_retention_days);
    info!("  Linger time: {} min", store_config.linger_time.num_minutes());
    info!("  Days to display: {}", store_config.days_to_display);

    let source = Arc::new(JsonFileSource::load(&args.fixture)?);
    let store = Arc::new(EpgStore::new(store_config));
    let report = store.set_channels(source.channels().iter().cloned().collect::<ChannelList>());
    if !report.dropped.is_empty() {
        warn!("Dropped {} channels: {:?}", report.dropped.len(), report.dropped);
    }

    let now = args.now.unwrap_or_else(Utc::now);

    match args.command {
        Command::Grid {
            keys,
            start,
            hours,
            cell_width,
        } => {
            load_once(&store, source.as_ref(), now);

            let start = start.unwrap_or(now);
            let mut navigator = GridNavigator::new(config.grid_config());
            navigator.set_window(start, start + Duration::hours(hours.max(1)))?;
            navigator.refresh(&store);

            for key in keys.chars() {
                replay_key(&mut navigator, key, now);
            }

            let frame = navigator.frame();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&frame)?);
            } else {
                let mut renderer = TextRenderer::new(cell_width);
                renderer.render(&frame);
                print!("{}", renderer.take_output());
                if let Some(program) = navigator.selected_program() {
                    println!(
                        "Selected: {} ({} - {})",
                        program.title,
                        program.start.format("%H:%M"),
                        program.end.format("%H:%M")
                    );
                }
            }
        }

        Command::Search(search) => {
            load_once(&store, source.as_ref(), now);

            let filter = search.to_filter();
            let results = filter.search(&store, &source.timers(), &source.recordings());
            info!("Search returned {} results", results.len());

            if args.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for result in &results {
                    println!(
                        "{:>4} {:<16} {} - {}  {}{}",
                        result.channel_number,
                        result.channel_name,
                        result.tag.start.format("%m-%d %H:%M"),
                        result.tag.end.format("%H:%M"),
                        result.tag.title,
                        if result.timer.is_some() { "  [timer]" } else { "" }
                    );
                }
            }
        }

        Command::Serve => {
            let (scheduler, mut reports) = RefreshScheduler::new(
                Arc::clone(&store),
                source.clone(),
                config.scheduler_config(),
            );
            let scheduler = Arc::new(scheduler.with_timers(source.clone()));
            let handle = Arc::clone(&scheduler).start();

            tokio::spawn(async move {
                while let Some(report) = reports.recv().await {
                    info!(
                        "{:?} cycle: {} channels ({} failed), +{} ~{} -{}",
                        report.kind,
                        report.channels_total,
                        report.channels_failed,
                        report.inserted,
                        report.updated,
                        report.removed
                    );
                }
            });

            info!("Serving; press Ctrl+C to stop");
            tokio::signal::ctrl_c().await?;
            scheduler.stop().await;
            if let Err(e) = handle.await {
                error!("Scheduler task failed: {}", e);
            }
            info!("Shutdown complete");
        }
    }

    Ok(())
}

/// Run one refresh cycle and link timers.
fn load_once(store: &EpgStore, source: &JsonFileSource, now: DateTime<Utc>) {
    let report = store.refresh_cycle(source, now);
    let linked = store.relink_timers(&source.timers());
    info!(
        "Loaded {} events from {} channels ({} failed), {} timers linked",
        report.inserted, report.channels_total, report.channels_failed, linked
    );
}

fn replay_key(navigator: &mut GridNavigator, key: char, now: DateTime<Utc>) {
    match key {
        'u' => {
            navigator.on_up();
        }
        'd' => {
            navigator.on_down();
        }
        'l' => {
            navigator.on_left();
        }
        'r' => {
            navigator.on_right();
        }
        'U' => navigator.page_up(),
        'D' => navigator.page_down(),
        'h' => navigator.go_to_begin(),
        'e' => navigator.go_to_end(),
        'n' => navigator.go_to_now(now),
        '<' => navigator.skip_hours(-1),
        '>' => navigator.skip_hours(1),
        other => warn!("Ignoring unknown key {:?}", other),
    }
}
