use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use matchdex::{
    AudioAmplitudeProbe, ClassifierConfig, FfmpegLogLevel, FrameSource, MatchResult,
    ReferenceLibrary, RejectedCandidate, ScanConfig, ScanObserver, ScanReport, TemporalScanner,
    VideoFrameSource, format_timestamp,
    report::{strip_time_parameter, video_id},
};

const CLI_AFTER_HELP: &str = "Examples:\n  matchdex scan vod.webm --data assets --out index.html\n  matchdex scan vod.webm --data assets --base-url https://youtu.be/abc123 --json\n  matchdex probe vod.webm --json\n  matchdex completions zsh > _matchdex";

#[derive(Debug, Parser)]
#[command(
    name = "matchdex",
    version,
    about = "Find fighting-game matches in recorded video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long)]
    progress: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan a video for match-start splash screens.
    #[command(
        about = "Scan a video for matches",
        after_help = "Examples:\n  matchdex scan vod.webm --data assets\n  matchdex scan vod.webm --data assets --out index.html --base-url https://youtu.be/abc123\n  matchdex scan vod.webm --data assets --no-audio --json"
    )]
    Scan {
        /// Input media path or URL.
        input: String,

        /// Reference asset directory (splash, banks, character references).
        #[arg(long, default_value = "data")]
        data: PathBuf,

        /// Optional JSON threshold configuration file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write an HTML index to this path.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Source URL used for deep links in the HTML index.
        #[arg(long)]
        base_url: Option<String>,

        /// Skip the audio silence check.
        #[arg(long)]
        no_audio: bool,

        /// Print the report as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print stream metadata for a media file (alias: info).
    #[command(
        about = "Print media metadata",
        visible_alias = "info",
        after_help = "Examples:\n  matchdex probe vod.webm\n  matchdex probe vod.webm --json"
    )]
    Probe {
        /// Input media path or URL.
        input: String,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions.
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some(FfmpegLogLevel::Quiet),
        "fatal" => Some(FfmpegLogLevel::Fatal),
        "error" => Some(FfmpegLogLevel::Error),
        "warning" | "warn" => Some(FfmpegLogLevel::Warning),
        "info" => Some(FfmpegLogLevel::Info),
        "debug" => Some(FfmpegLogLevel::Debug),
        _ => None,
    }
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed = parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?;
        matchdex::set_ffmpeg_log_level(parsed);
    } else {
        // Long decodes produce tons of FFmpeg warnings; keep only errors.
        matchdex::set_ffmpeg_log_level(FfmpegLogLevel::Error);
    }
    Ok(())
}

/// Observer wiring scan events to the terminal.
struct TerminalObserver {
    bar: Option<ProgressBar>,
    verbose: bool,
}

impl TerminalObserver {
    fn new(duration: Duration, progress: bool, verbose: bool) -> Self {
        let bar = (progress && !duration.is_zero()).then(|| {
            let bar = ProgressBar::new(duration.as_secs());
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} [{elapsed_precise}] [{bar:32.cyan/dim}] {pos}s/{len}s",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        });
        Self { bar, verbose }
    }

    fn suspended_println(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl ScanObserver for TerminalObserver {
    fn on_progress(&self, position: Duration, _duration: Duration) {
        if let Some(bar) = &self.bar {
            bar.set_position(position.as_secs());
        }
    }

    fn on_match(&self, result: &MatchResult) {
        self.suspended_println(format!(
            "{} {}",
            format_timestamp(result.timestamp).green().bold(),
            result.title,
        ));
    }

    fn on_rejection(&self, rejection: &RejectedCandidate) {
        if self.verbose {
            self.suspended_println(format!(
                "{} {} {}",
                format_timestamp(rejection.timestamp).dimmed(),
                "rejected:".yellow(),
                rejection.reason,
            ));
        }
    }
}

fn report_to_json(report: &ScanReport) -> serde_json::Value {
    serde_json::json!({
        "matches": report.matches.iter().map(|found| serde_json::json!({
            "timestamp_seconds": found.timestamp.as_secs(),
            "timestamp": format_timestamp(found.timestamp),
            "left": found.left,
            "right": found.right,
            "title": found.title,
        })).collect::<Vec<_>>(),
        "rejections": report.rejections.iter().map(|rejected| serde_json::json!({
            "timestamp_seconds": rejected.timestamp.as_secs(),
            "reason": rejected.reason.to_string(),
        })).collect::<Vec<_>>(),
    })
}

/// Deep link to a match position. YouTube URLs get an embeddable `?t=`
/// parameter; anything else is returned untouched.
fn deep_link(base_url: &str, timestamp: Duration) -> String {
    let stripped = strip_time_parameter(base_url);
    let separator = if stripped.contains('?') { '&' } else { '?' };
    format!("{stripped}{separator}t={}", timestamp.as_secs())
}

fn render_html(report: &ScanReport, base_url: Option<&str>, source_name: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>Matches — {source_name}</title>\n"));
    html.push_str("<style>body{font-family:sans-serif;margin:2em}li{margin:0.3em 0}</style>\n");
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{source_name}</h1>\n"));

    if let Some(url) = base_url
        && let Some(id) = video_id(url)
    {
        html.push_str(&format!(
            "<iframe width=\"640\" height=\"360\" src=\"https://www.youtube.com/embed/{id}\" \
             frameborder=\"0\" allowfullscreen></iframe>\n"
        ));
    }

    html.push_str(&format!("<p>{} matches found.</p>\n<ol>\n", report.matches.len()));
    for found in &report.matches {
        let label = format!("{} {}", format_timestamp(found.timestamp), found.title);
        match base_url {
            Some(url) => {
                let href = deep_link(url, found.timestamp);
                html.push_str(&format!("<li><a href=\"{href}\">{label}</a></li>\n"));
            }
            None => html.push_str(&format!("<li>{label}</li>\n")),
        }
    }
    html.push_str("</ol>\n</body>\n</html>\n");
    html
}

/// Write via a sibling temp file and rename, so a crash never leaves a
/// half-written index behind.
fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut temp_path = path.to_path_buf();
    temp_path.set_extension("tmp");
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Scan {
            input,
            data,
            config,
            out,
            base_url,
            no_audio,
            json,
        } => {
            let classifier_config = match &config {
                Some(path) => ClassifierConfig::from_path(path)?,
                None => ClassifierConfig::default(),
            };
            let library = ReferenceLibrary::load(&data)?;
            let scanner = TemporalScanner::new(&library, ScanConfig::default(), classifier_config);

            let mut source = VideoFrameSource::open(&input)?;
            let duration = source.duration();

            let mut probe = if no_audio {
                None
            } else {
                match AudioAmplitudeProbe::open(&input) {
                    Ok(probe) => Some(probe),
                    Err(error) => {
                        eprintln!(
                            "{} {}",
                            "warning:".yellow().bold(),
                            format!("audio probe unavailable ({error}); skipping silence check")
                                .yellow(),
                        );
                        None
                    }
                }
            };

            let observer =
                TerminalObserver::new(duration, cli.global.progress && !json, cli.global.verbose);
            let report = scanner.scan_with_observer(
                &mut source,
                probe.as_mut().map(|p| p as &mut dyn matchdex::AmplitudeProbe),
                &observer,
            )?;
            observer.finish();

            if json {
                println!("{}", serde_json::to_string_pretty(&report_to_json(&report))?);
            } else if report.matches.is_empty() {
                println!("{}", "No matches found.".yellow());
            }

            if let Some(out_path) = out {
                let source_name = Path::new(&input)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| input.clone());
                let html = render_html(&report, base_url.as_deref(), &source_name);
                write_atomic(&out_path, &html)?;
                if !json {
                    println!("Wrote {}", out_path.display().to_string().cyan());
                }
            }
        }
        Commands::Probe { input, json } => {
            let source = VideoFrameSource::open(&input)?;
            let (width, height) = source.source_dimensions();
            let duration = source.duration();
            let audio = AudioAmplitudeProbe::open(&input).is_ok();
            if json {
                let payload = serde_json::json!({
                    "duration_seconds": duration.as_secs_f64(),
                    "width": width,
                    "height": height,
                    "fps": source.frame_rate(),
                    "has_audio": audio,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Duration: {}", format_timestamp(duration));
                println!("Resolution: {width}x{height}");
                println!("Frame rate: {:.2}", source.frame_rate());
                println!("Audio: {}", if audio { "yes" } else { "no" });
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "matchdex", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{deep_link, parse_log_level, render_html};
    use matchdex::ScanReport;

    #[test]
    fn parse_log_level_aliases() {
        assert!(parse_log_level("quiet").is_some());
        assert!(parse_log_level("WARN").is_some());
        assert!(parse_log_level("debug").is_some());
        assert!(parse_log_level("trace").is_none());
    }

    #[test]
    fn deep_link_appends_time() {
        let link = deep_link("https://youtu.be/abc123", Duration::from_secs(754));
        assert_eq!(link, "https://youtu.be/abc123?t=754");

        let link = deep_link(
            "https://www.youtube.com/watch?v=abc123",
            Duration::from_secs(10),
        );
        assert_eq!(link, "https://www.youtube.com/watch?v=abc123&t=10");
    }

    #[test]
    fn deep_link_replaces_existing_time() {
        let link = deep_link("https://youtu.be/abc123?t=99", Duration::from_secs(5));
        assert_eq!(link, "https://youtu.be/abc123?t=5");
    }

    #[test]
    fn render_html_embeds_known_video() {
        let report = ScanReport::default();
        let html = render_html(&report, Some("https://youtu.be/abc123"), "vod");
        assert!(html.contains("youtube.com/embed/abc123"));
        assert!(html.contains("0 matches found."));
    }
}
