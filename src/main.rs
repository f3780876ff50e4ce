use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stepsync::config;
use stepsync::game::autoplay::{self, AutoplayOptions, MAX_FRAME_RATE, MIN_FRAME_RATE};
use stepsync::game::difficulty::Difficulty;
use stepsync::game::judgment::Judgement;
use stepsync::game::parsing::simfile::SimfileCache;
use stepsync::game::song::{SongHeader, difficulty_meters};
use stepsync::game::stage_stats::JudgementSummary;

#[derive(Parser, Debug)]
#[command(name = "stepsync", version, about = "Plays a simfile chart headlessly and reports the judgement summary")]
struct Args {
    /// Path to the .sm simfile
    simfile: PathBuf,

    /// Difficulty to play (Beginner, Easy, Medium, Hard, Challenge)
    #[arg(long, default_value = "Medium", value_parser = parse_difficulty)]
    difficulty: Difficulty,

    /// Config file path
    #[arg(long, default_value = config::CONFIG_PATH)]
    config: PathBuf,

    /// Autoplay timing error in milliseconds, alternating late and early
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    error_ms: f64,

    /// Simulated ticks per second (1 to 10000)
    #[arg(long, default_value_t = 240.0, value_parser = parse_frame_rate)]
    frame_rate: f64,

    /// Print header metadata and difficulty meters instead of playing
    #[arg(long)]
    header: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
    Difficulty::from_sm_name(s).ok_or_else(|| format!("unknown difficulty '{s}'"))
}

fn parse_frame_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("invalid frame rate '{s}': {e}"))?;
    if rate.is_finite() && (MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("frame rate must be between {MIN_FRAME_RATE} and {MAX_FRAME_RATE}"))
    }
}

fn print_summary(title: &str, difficulty: Difficulty, summary: &JudgementSummary) {
    println!("{title} [{difficulty}]");
    for tier in Judgement::HIT_TIERS {
        println!("  {:<10} {:>5}", tier.label(), summary.count(tier));
    }
    println!("  {:<10} {:>5}", Judgement::Miss.label(), summary.miss_count);
    println!("  Max combo  {:>5} / {}", summary.max_combo, summary.total_notes);
    println!("  Score    {:>7}", summary.score);
    println!("  Grade    {:>7}", summary.grade);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    let args = Args::parse();
    let cfg = config::load(&args.config);
    log::set_max_level(cfg.log_level.as_level_filter());

    let mut cache = SimfileCache::new(cfg.cache_songs);
    let header_tags = cache.header_tags(&args.simfile)?;
    let header = SongHeader::from_header(&header_tags);

    if args.header {
        let all_tags = cache.all_tags(&args.simfile)?;
        let meters = difficulty_meters(&all_tags);
        if args.json {
            let meters: Vec<_> = meters
                .iter()
                .map(|(d, m)| serde_json::json!({ "difficulty": d, "meter": m }))
                .collect();
            let out = serde_json::json!({ "header": header, "meters": meters });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("{} / {}", header.display_title(), header.artist);
            println!("  Music: {}", header.music);
            if !header.formatted_display_bpm().is_empty() {
                println!("  BPM:   {}", header.formatted_display_bpm());
            }
            for (difficulty, meter) in meters {
                println!("  {:<10} {meter}", difficulty.sm_name());
            }
        }
        return Ok(());
    }

    let chart = Arc::new(cache.load_chart(&args.simfile, args.difficulty)?);
    let options = AutoplayOptions { error_seconds: args.error_ms / 1000.0, frame_rate: args.frame_rate };
    let summary = autoplay::run(chart, cfg.session_config(), options);

    if args.json {
        println!("{}", serde_json::to_string_pretty(summary.as_ref())?);
    } else {
        print_summary(&header.display_title(), args.difficulty, &summary);
    }
    Ok(())
}
