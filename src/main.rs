use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use callsight::{
    read_transcript_file, segment_transcript, AnalysisPipeline, ChatClient, HumanReport,
    MemoryStore, ModelConfig, NormalizerConfig, PipelineConfig, SegmenterConfig, Speaker,
};

#[derive(Parser)]
#[command(name = "callsight")]
#[command(author, version, about = "Call transcript intelligence pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment, mask, and analyze a call transcript
    Process {
        /// Input transcript file (provider JSON or plain text)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the machine-readable report (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Output file for the human-readable report (text)
        #[arg(long)]
        human_readable: Option<PathBuf>,

        /// Call identifier; generated when omitted
        #[arg(long)]
        call_id: Option<String>,

        /// Language assumed when the provider does not report one
        #[arg(long, default_value = "en")]
        language: String,

        /// Skip all model calls and analyze with the local keyword scan
        #[arg(long)]
        offline: bool,

        /// Analyze the raw transcript without producing a masked view
        #[arg(long)]
        skip_masking: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Segment a transcript and print statistics without analyzing
    Segment {
        /// Input transcript file (provider JSON or plain text)
        #[arg(short, long)]
        input: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output,
            human_readable,
            call_id,
            language,
            offline,
            skip_masking,
            verbose,
        } => {
            setup_logging(verbose);
            process_call(
                input,
                output,
                human_readable,
                call_id,
                language,
                offline,
                skip_masking,
            )
            .await
        }
        Commands::Segment { input, verbose } => {
            setup_logging(verbose);
            segment_stats(input)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

async fn process_call(
    input: PathBuf,
    output: PathBuf,
    human_readable: Option<PathBuf>,
    call_id: Option<String>,
    language: String,
    offline: bool,
    skip_masking: bool,
) -> Result<()> {
    info!("Loading transcript from {:?}", input);
    let provider = read_transcript_file(&input).context("Failed to parse input transcript")?;

    let call_id = call_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let config = PipelineConfig {
        normalizer: NormalizerConfig { offline },
        // Offline runs make no model calls, so there is nothing to mask with
        skip_masking: skip_masking || offline,
        ..PipelineConfig::default()
    };

    let model_config = if offline {
        ModelConfig::new(String::new())
    } else {
        ModelConfig::from_env()?
    };
    let masking_client = ChatClient::masking(model_config.clone());
    let analysis_client = ChatClient::analysis(model_config);

    let store = MemoryStore::new();
    let pipeline = AnalysisPipeline::new(&masking_client, &analysis_client, &store, config);
    let report = pipeline
        .process_transcript(&call_id, &provider, &language)
        .await?;

    report.write_json(&output)?;
    info!("Report written to {:?}", output);

    if let Some(path) = &human_readable {
        HumanReport::new(&report).write_file(path)?;
        info!("Human-readable report written to {:?}", path);
    }

    info!(
        "Complete: call {} analyzed with {} ({} drug mention(s), {} flag(s))",
        report.analysis.call_id,
        report.analysis.metadata.model,
        report.drug_mentions.len(),
        report.flags.len()
    );

    Ok(())
}

fn segment_stats(input: PathBuf) -> Result<()> {
    info!("Loading transcript from {:?}", input);
    let provider = read_transcript_file(&input).context("Failed to parse input transcript")?;

    let result = segment_transcript("preview", &provider, "en", &SegmenterConfig::default());
    let transcription = result.transcription;

    println!("Transcript Segmentation");
    println!("=======================");
    println!("Language: {}", transcription.language);
    println!("Segments: {}", transcription.segments.len());
    println!(
        "Duration: {:.1}s ({})",
        transcription.duration_secs(),
        if result.timing_estimated {
            "estimated timing"
        } else {
            "provider timing"
        }
    );
    println!();

    println!("Speaker Statistics");
    println!("------------------");
    for speaker in [Speaker::Agent, Speaker::Customer] {
        let segments: Vec<_> = transcription
            .segments
            .iter()
            .filter(|s| s.speaker == speaker)
            .collect();
        let words: usize = segments.iter().map(|s| s.word_count()).sum();
        let talk_time: f64 = segments.iter().map(|s| s.duration_secs()).sum();
        let avg_confidence = if segments.is_empty() {
            0.0
        } else {
            segments.iter().map(|s| s.confidence).sum::<f64>() / segments.len() as f64
        };

        println!(
            "{}: {} segments, {} words, {:.1}s talk time, avg conf {:.2}",
            speaker.label(),
            segments.len(),
            words,
            talk_time,
            avg_confidence
        );
    }

    println!();
    println!("Preview");
    println!("-------");
    for segment in transcription.segments.iter().take(10) {
        println!(
            "[{:.1}s] {}: {}",
            segment.start_time,
            segment.speaker.label(),
            segment.text
        );
    }
    if transcription.segments.len() > 10 {
        println!("... {} more segment(s)", transcription.segments.len() - 10);
    }

    Ok(())
}
