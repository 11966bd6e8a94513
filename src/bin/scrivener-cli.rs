use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser};
use tracing::error;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use scrivener::backends::ctc::CtcRecognizer;
use scrivener::backends::dit::{DitClassifier, DitConfig};
use scrivener::backends::openai::{self, OpenAiConfig, OpenAiTranscriber};
use scrivener::init_logging;
use scrivener::prompt::load_prompt;
use scrivener::router::DEFAULT_CONFIDENCE_THRESHOLD;
use scrivener::{BatchSummary, Opts, Scrivener};

const DEFAULT_PROMPT_PATH: &str = "./default_transcription_prompt.txt";

fn main() -> ExitCode {
    let params = match Params::try_parse() {
        Ok(params) => params,
        Err(err) => {
            // Help and version requests are successful exits; everything else is a usage error.
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging();

    match run(&params) {
        Ok(outcome) => {
            println!("{}", outcome.report());
            ExitCode::from(outcome.exit_status())
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "run aborted");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// How a run that got past setup ended.
#[derive(Debug, Clone, PartialEq)]
enum RunOutcome {
    Item { image: PathBuf, succeeded: bool },
    Batch(BatchSummary),
}

impl RunOutcome {
    /// `0` only if every considered image was transcribed (an empty batch counts as success).
    fn exit_status(&self) -> u8 {
        let ok = match self {
            RunOutcome::Item { succeeded, .. } => *succeeded,
            RunOutcome::Batch(summary) => summary.is_success(),
        };
        if ok { 0 } else { 1 }
    }

    fn report(&self) -> String {
        match self {
            RunOutcome::Item { image, succeeded } => format!(
                "{}: {}",
                image.display(),
                if *succeeded { "transcribed" } else { "failed" }
            ),
            RunOutcome::Batch(summary) => format!(
                "{} image(s) considered: {} succeeded, {} failed",
                summary.total_considered, summary.succeeded, summary.failed
            ),
        }
    }
}

fn run(params: &Params) -> Result<RunOutcome> {
    if let Some(dir) = &params.output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;
    }

    let prompt = load_prompt(&params.prompt_file)?;

    check_input(params)?;

    let scrivener = Scrivener::new(
        build_classifier(params)?,
        CtcRecognizer::new(&params.recognizer_model, &params.recognizer_dict)
            .context("failed to load handwriting recognizer")?,
        OpenAiTranscriber::new(OpenAiConfig::from_env().with_model(&params.openai_model))?,
        Opts {
            confidence_threshold: params.confidence_threshold,
            jobs: params.jobs,
        },
    );

    let output_dir = params.output_dir.as_deref();

    if let Some(image) = &params.image_file {
        let succeeded = scrivener.process_item(image, &prompt, output_dir);
        return Ok(RunOutcome::Item {
            image: image.clone(),
            succeeded,
        });
    }

    let Some(dir) = &params.image_dir else {
        bail!("either --image-file or --image-dir is required");
    };

    let summary = scrivener.process_batch(dir, &prompt, output_dir)?;
    Ok(RunOutcome::Batch(summary))
}

fn check_input(params: &Params) -> Result<()> {
    if let Some(image) = &params.image_file {
        if !image.exists() {
            bail!("image file not found: '{}'", image.display());
        }
    }
    if let Some(dir) = &params.image_dir {
        if !dir.is_dir() {
            bail!("image directory not found: '{}'", dir.display());
        }
    }
    Ok(())
}

fn build_classifier(params: &Params) -> Result<DitClassifier> {
    let classifier = DitClassifier::with_config(
        &params.classifier_model,
        params.classifier_labels.as_deref(),
        DitConfig::default(),
    )
    .context("failed to load document classifier")?;
    Ok(classifier)
}

#[derive(Parser, Debug)]
#[command(name = "scrivener")]
#[command(about = "Transcribe scanned document images, routing handwriting to a local model")]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["image_file", "image_dir"])
))]
struct Params {
    /// A single JPEG image to transcribe.
    #[arg(short = 'i', long = "image-file", alias = "image_file")]
    pub image_file: Option<PathBuf>,

    /// A directory whose JPEG images are transcribed (not recursive).
    #[arg(short = 'd', long = "image-dir", alias = "image_dir")]
    pub image_dir: Option<PathBuf>,

    /// Prompt sent with every cloud transcription request.
    #[arg(
        short = 'p',
        long = "prompt-file",
        alias = "prompt_file",
        default_value = DEFAULT_PROMPT_PATH
    )]
    pub prompt_file: PathBuf,

    /// Where `.txt` transcriptions are written. Defaults to next to each image.
    #[arg(short = 'o', long = "output-dir", alias = "output_dir")]
    pub output_dir: Option<PathBuf>,

    #[arg(long = "classifier-model")]
    pub classifier_model: PathBuf,

    /// Label file for the classifier, one label per line in class-id order.
    #[arg(long = "classifier-labels")]
    pub classifier_labels: Option<PathBuf>,

    #[arg(long = "recognizer-model")]
    pub recognizer_model: PathBuf,

    /// Character dictionary for the recognizer, one symbol per line.
    #[arg(long = "recognizer-dict")]
    pub recognizer_dict: PathBuf,

    #[arg(long = "openai-model", default_value = openai::DEFAULT_MODEL)]
    pub openai_model: String,

    /// Minimum classifier confidence for trusting its label.
    #[arg(long = "confidence-threshold", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    pub confidence_threshold: f32,

    /// Images processed concurrently in directory mode (0 = one per CPU).
    #[arg(short = 'j', long = "jobs", default_value_t = 1)]
    pub jobs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivener::prompt::DEFAULT_PROMPT_FILENAME;
    use std::path::Path;

    const MODELS: [&str; 6] = [
        "--classifier-model",
        "dit.onnx",
        "--recognizer-model",
        "rec.onnx",
        "--recognizer-dict",
        "dict.txt",
    ];

    fn parse(args: &[&str]) -> Result<Params, clap::Error> {
        let argv = std::iter::once("scrivener-cli")
            .chain(args.iter().copied())
            .chain(MODELS);
        Params::try_parse_from(argv)
    }

    #[test]
    fn defaults_apply_in_file_mode() -> anyhow::Result<()> {
        let params = parse(&["--image-file", "photo.jpg"])?;
        assert_eq!(params.image_file, Some(PathBuf::from("photo.jpg")));
        assert_eq!(params.image_dir, None);
        assert_eq!(
            params.prompt_file,
            Path::new(".").join(DEFAULT_PROMPT_FILENAME)
        );
        assert_eq!(params.output_dir, None);
        assert_eq!(params.openai_model, openai::DEFAULT_MODEL);
        assert_eq!(params.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(params.jobs, 1);
        Ok(())
    }

    #[test]
    fn underscore_aliases_are_accepted() -> anyhow::Result<()> {
        let params = parse(&[
            "--image_dir",
            "scans",
            "--prompt_file",
            "p.txt",
            "--output_dir",
            "out",
        ])?;
        assert_eq!(params.image_dir, Some(PathBuf::from("scans")));
        assert_eq!(params.prompt_file, PathBuf::from("p.txt"));
        assert_eq!(params.output_dir, Some(PathBuf::from("out")));
        Ok(())
    }

    #[test]
    fn input_modes_are_mutually_exclusive() {
        assert!(parse(&["--image-file", "a.jpg", "--image-dir", "scans"]).is_err());
    }

    #[test]
    fn one_input_mode_is_required() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn one_failed_image_makes_the_batch_exit_nonzero() {
        let outcome = RunOutcome::Batch(BatchSummary {
            total_considered: 3,
            succeeded: 2,
            failed: 1,
        });
        assert_eq!(outcome.exit_status(), 1);
        assert_eq!(
            outcome.report(),
            "3 image(s) considered: 2 succeeded, 1 failed"
        );
    }

    #[test]
    fn clean_and_empty_batches_exit_zero() {
        let clean: BatchSummary = [true, true].into_iter().collect();
        assert_eq!(RunOutcome::Batch(clean).exit_status(), 0);
        assert_eq!(RunOutcome::Batch(BatchSummary::default()).exit_status(), 0);
    }

    #[test]
    fn single_image_exit_status_follows_the_item() {
        let image = PathBuf::from("photo.jpg");
        let ok = RunOutcome::Item {
            image: image.clone(),
            succeeded: true,
        };
        let failed = RunOutcome::Item {
            image,
            succeeded: false,
        };
        assert_eq!(ok.exit_status(), 0);
        assert_eq!(failed.exit_status(), 1);
        assert_eq!(failed.report(), "photo.jpg: failed");
    }
}
