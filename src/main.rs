use accident_analyzer::pipeline::domain::ResultSummary;
use accident_analyzer::{
    AnalysisRequest, AppError, Coordinator, CoordinatorBuilder, Jurisdiction, LanguageMode,
    SceneImage, Settings,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error, info};

#[derive(Parser, Debug)]
#[command(name = "accident-analyzer")]
#[command(version, about = "Annotates accident photos and writes an analysis report")]
struct Args {
    /// Settings file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// saudi-arabia, uae or kuwait
    #[arg(short, long)]
    jurisdiction: Option<Jurisdiction>,

    /// en or ar-en
    #[arg(short, long)]
    language: Option<LanguageMode>,

    /// Directory for the annotated image, diagram and findings
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Also analyze <samples_dir>/sample<N>.jpg
    #[arg(long)]
    sample: Option<u32>,

    #[arg(short, long)]
    verbose: bool,

    /// Images to analyze
    images: Vec<PathBuf>,
}

fn init_logging(level: Level) {
    // stdout carries the JSON summaries
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("accident-analyzer: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, AppError> {
    let settings = Settings::load(args.config.as_deref())?;
    let level = if args.verbose {
        Level::DEBUG
    } else {
        settings.log_level()?
    };
    init_logging(level);

    let mut images = args.images.clone();
    if let Some(sample) = args.sample {
        images.push(settings.samples_dir.join(format!("sample{}.jpg", sample)));
    }
    if images.is_empty() {
        error!("No input image given; pass image paths or --sample N");
        return Ok(ExitCode::FAILURE);
    }

    let jurisdiction = args
        .jurisdiction
        .unwrap_or(settings.pipeline.default_jurisdiction);
    let language = args.language.unwrap_or(settings.pipeline.default_language);

    let mut builder = CoordinatorBuilder::new(settings);
    if let Some(timeout_ms) = args.timeout_ms {
        builder = builder.timeout(Duration::from_millis(timeout_ms));
    }
    let coordinator = builder.build()?;

    let cancel = coordinator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    std::fs::create_dir_all(&args.out_dir)?;
    info!(
        "Analyzing {} image(s) for {} [{}]",
        images.len(),
        jurisdiction,
        language
    );

    let mut failures = 0;
    for path in &images {
        match analyze_file(&coordinator, path, jurisdiction, language, &args.out_dir).await {
            Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            Err(e) => {
                error!("{}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    if failures == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        error!("{} of {} request(s) failed", failures, images.len());
        Ok(ExitCode::FAILURE)
    }
}

async fn analyze_file(
    coordinator: &Coordinator,
    path: &Path,
    jurisdiction: Jurisdiction,
    language: LanguageMode,
    out_dir: &Path,
) -> Result<ResultSummary, AppError> {
    let scene = SceneImage::open(path)?;
    let result = coordinator
        .analyze(AnalysisRequest::new(scene, jurisdiction, language))
        .await?;

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scene".to_string());

    if let Some(annotated) = &result.annotated_image {
        annotated.save(out_dir.join(format!("{}_annotated.png", stem)))?;
    }
    if let Some(diagram) = &result.diagram_image {
        diagram.save(out_dir.join(format!("{}_diagram.png", stem)))?;
    }
    if let Some(findings) = &result.findings {
        std::fs::write(
            out_dir.join(format!("{}_findings.json", stem)),
            serde_json::to_vec_pretty(findings)?,
        )?;
    }

    Ok(result.summary())
}
