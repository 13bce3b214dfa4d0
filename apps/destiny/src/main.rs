mod render;

use anyhow::Context;
use bazi::almanac::{almanac_day, zodiac_forecast};
use bazi::i18n::Lang;
use bazi::luck::DEFAULT_LUCK_CYCLES;
use bazi::{
    compute_luck_cycles, compute_ten_gods, evaluate_five_elements_weighted, BirthMoment, PillarResolver,
    ScoringWeights, ZodiacAnimal,
};
use chrono::{Datelike, NaiveDate};
use clap::{Args, Parser, Subcommand};
use destiny_config::DestinySettings;
use oracle::{AssetStatus, GenerationConfig, GenerationOutcome, Generator, HfTokenizer, ModelAssets};
use scribe::{build_prompt, ReportInput, ReportJob, ScribeError};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Four Pillars charts, almanac and on-device reports")]
struct Cli {
    /// Config file (default: configs/destiny.toml, then ../../configs/destiny.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output language tag, e.g. zh-TW or en (overrides bazi.lang).
    #[arg(long, global = true)]
    lang: Option<String>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct BirthArgs {
    /// Birth time: RFC 3339, `YYYY-MM-DDTHH:MM[:SS]`, or `YYYY-MM-DD` when the hour is unknown.
    #[arg(long)]
    birth: String,

    /// IANA zone of the birth place (overrides bazi.default_zone).
    #[arg(long)]
    zone: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the four pillars.
    Chart {
        #[command(flatten)]
        birth: BirthArgs,

        /// Also list the ten-year luck cycles.
        #[arg(long)]
        luck: bool,
    },
    /// Five-Elements balance and Ten Gods.
    Score {
        #[command(flatten)]
        birth: BirthArgs,

        #[arg(long)]
        stem_weight: Option<f64>,

        #[arg(long)]
        hidden_multiplier: Option<f64>,

        #[arg(long)]
        month_hidden_boost: Option<f64>,

        /// Polarity school used to mark Ten Gods (default, altA..altD).
        #[arg(long)]
        school: Option<String>,
    },
    /// Daily almanac, optionally with a zodiac-year forecast.
    Almanac {
        /// Day to show (default: today).
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Zodiac animal for the yearly forecast, in Chinese or English.
        #[arg(long)]
        zodiac: Option<String>,
    },
    /// Write a report with the on-device model, streaming it to stdout.
    Report {
        #[command(flatten)]
        birth: BirthArgs,

        /// Directory holding the .onnx model and tokenizer.json (overrides llm.model_dir).
        #[arg(long)]
        model_dir: Option<PathBuf>,

        #[arg(long)]
        max_tokens: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Include the almanac of this day in the prompt.
        #[arg(long)]
        almanac: Option<NaiveDate>,

        /// Print the prompt and exit.
        #[arg(long)]
        prompt_only: bool,
    },
    /// Locate the model files, verify the checksum and show the detected I/O.
    CheckModel {
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Expected SHA-256 of the .onnx file (overrides llm.expected_sha256).
        #[arg(long)]
        sha256: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

fn birth_moment(args: &BirthArgs, settings: &DestinySettings) -> anyhow::Result<BirthMoment> {
    let zone = args.zone.as_deref().unwrap_or(&settings.bazi.default_zone);
    BirthMoment::parse(&args.birth, zone).with_context(|| format!("Invalid birth input {:?}", args.birth))
}

fn weights(settings: &DestinySettings) -> ScoringWeights {
    ScoringWeights {
        stem_weight: settings.bazi.stem_weight,
        hidden_multiplier: settings.bazi.hidden_multiplier,
        month_hidden_boost: settings.bazi.month_hidden_boost,
    }
}

fn generation_config(settings: &DestinySettings) -> GenerationConfig {
    GenerationConfig {
        max_tokens: settings.llm.max_tokens,
        temperature: settings.llm.temperature,
        top_p: settings.llm.top_p,
        stub_chunk_chars: settings.llm.stub_chunk_chars,
        seed: settings.llm.seed,
    }
    .with_env_overrides()
}

fn parse_zodiac(s: &str) -> anyhow::Result<ZodiacAnimal> {
    ZodiacAnimal::parse(s).ok_or_else(|| anyhow::anyhow!("Unknown zodiac animal {:?}", s))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelCheck {
    model_path: PathBuf,
    tokenizer_path: PathBuf,
    tokenizer_present: bool,
    status: AssetStatus,
    schema: Option<oracle::DetectedSchema>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let settings = destiny_config::load_settings_or_default(cli.config.as_deref())?;
    let lang = Lang::from_tag(cli.lang.as_deref().unwrap_or(&settings.bazi.lang));
    let resolver = PillarResolver::new();

    match cli.command {
        Command::Chart { birth, luck } => {
            let moment = birth_moment(&birth, &settings)?;
            let chart = resolver.resolve(&moment);
            let cycles = if luck {
                compute_luck_cycles(&moment.datetime, DEFAULT_LUCK_CYCLES)
            } else {
                Vec::new()
            };
            if cli.json {
                print_json(&serde_json::json!({ "chart": chart, "luckCycles": cycles }))?;
            } else {
                print!("{}", render::chart(&chart, lang));
                if luck {
                    print!("\n{}", render::luck(&cycles));
                }
            }
        }
        Command::Score {
            birth,
            stem_weight,
            hidden_multiplier,
            month_hidden_boost,
            school,
        } => {
            let moment = birth_moment(&birth, &settings)?;
            let chart = resolver.resolve(&moment);
            let mut settings = settings.clone();
            let b = &mut settings.bazi;
            b.stem_weight = stem_weight.unwrap_or(b.stem_weight);
            b.hidden_multiplier = hidden_multiplier.unwrap_or(b.hidden_multiplier);
            b.month_hidden_boost = month_hidden_boost.unwrap_or(b.month_hidden_boost);
            destiny_config::validate(&settings).context("Invalid weight override")?;
            let w = weights(&settings);

            let score = evaluate_five_elements_weighted(&chart, &w);
            let gods = compute_ten_gods(&chart);
            if cli.json {
                print_json(&serde_json::json!({ "fiveElements": score, "tenGods": gods }))?;
            } else {
                print!("{}", render::chart(&chart, lang));
                println!();
                print!("{}", render::scores(&score, &gods, lang, school.as_deref()));
            }
        }
        Command::Almanac { date, zodiac } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let day = almanac_day(date);
            let forecast = zodiac
                .as_deref()
                .map(parse_zodiac)
                .transpose()?
                .map(|animal| zodiac_forecast(date.year(), animal));
            if cli.json {
                print_json(&serde_json::json!({ "almanac": day, "forecast": forecast }))?;
            } else {
                print!("{}", render::almanac(&day, lang));
                if let Some(f) = &forecast {
                    print!("\n{}", render::forecast(f));
                }
            }
        }
        Command::Report {
            birth,
            model_dir,
            max_tokens,
            seed,
            almanac,
            prompt_only,
        } => {
            let moment = birth_moment(&birth, &settings)?;
            let chart = resolver.resolve(&moment);
            let mut input = ReportInput::from_chart(chart, &weights(&settings));
            if let Some(date) = almanac {
                input = input.with_almanac(almanac_day(date));
            }
            let prompt = build_prompt(&input, lang);
            if prompt_only {
                print!("{}", prompt);
                return Ok(());
            }

            let mut config = generation_config(&settings);
            config.max_tokens = max_tokens.unwrap_or(config.max_tokens);
            config.seed = seed.or(config.seed);

            let dir = model_dir.unwrap_or_else(|| settings.llm.model_dir.clone());
            let mut job = ReportJob::new();
            job.max_steps = config.max_tokens;
            let mut generator = match ModelAssets::locate(&dir, settings.llm.expected_sha256.as_deref()) {
                Ok(assets) => {
                    if assets.has_tokenizer() {
                        match HfTokenizer::from_file(&assets.tokenizer_path) {
                            Ok(codec) => job = job.with_codec(Box::new(codec)),
                            Err(e) => log::warn!("Progress will count chunks: {}", e),
                        }
                    }
                    Generator::load(&assets, config)
                }
                Err(e) => {
                    log::warn!("{}; writing a stub report", e);
                    Generator::stub(config)
                }
            };

            let mut stdout = std::io::stdout();
            let report = job.run(&mut generator, &prompt, |chunk, progress| {
                if !cli.json {
                    stdout
                        .write_all(chunk.text.as_bytes())
                        .and_then(|_| stdout.flush())
                        .map_err(|e| ScribeError::Sink(e.to_string()))?;
                }
                log::debug!(
                    "progress {}% ({} / ~{} sections)",
                    progress.percent(),
                    progress.sections_done,
                    progress.sections_estimated
                );
                Ok(())
            })?;

            if cli.json {
                print_json(&report)?;
            } else {
                println!();
            }
            match &report.outcome {
                GenerationOutcome::GeneratedReal { tokens, .. } => log::info!("Report generated ({} tokens)", tokens),
                GenerationOutcome::GeneratedStub { reason, .. } => {
                    log::warn!("Report is stub output, not model text: {}", reason)
                }
                GenerationOutcome::Failed { reason } => anyhow::bail!("Report generation failed: {}", reason),
            }
        }
        Command::CheckModel { model_dir, sha256 } => {
            let dir = model_dir.unwrap_or_else(|| settings.llm.model_dir.clone());
            let expected = sha256.or_else(|| settings.llm.expected_sha256.clone());
            let assets = ModelAssets::locate(&dir, expected.as_deref())
                .with_context(|| format!("No model found in {}", dir.display()))?;
            let status = assets.verify();
            let schema = match status {
                AssetStatus::Verified | AssetStatus::Unverified => {
                    Generator::load(&assets, generation_config(&settings)).schema()
                }
                AssetStatus::ChecksumMismatch | AssetStatus::Missing => None,
            };
            let check = ModelCheck {
                tokenizer_present: assets.has_tokenizer(),
                model_path: assets.model_path,
                tokenizer_path: assets.tokenizer_path,
                status,
                schema,
            };
            if cli.json {
                print_json(&check)?;
            } else {
                println!("model:     {} ({:?})", check.model_path.display(), check.status);
                println!(
                    "tokenizer: {} ({})",
                    check.tokenizer_path.display(),
                    if check.tokenizer_present { "present" } else { "missing" }
                );
                match &check.schema {
                    Some(s) => {
                        println!("input ids: {} (int64: {})", s.input_ids, s.ids_int64);
                        println!("mask:      {}", s.attention_mask.as_deref().unwrap_or("-"));
                        println!("logits:    {}", s.logits);
                        println!("kv cache:  {} past / {} present", s.past_keys.len(), s.present_keys.len());
                    }
                    None => println!("schema:    not recognised"),
                }
            }
            if check.status == AssetStatus::ChecksumMismatch {
                anyhow::bail!("Model checksum mismatch; re-download the model assets");
            }
        }
    }
    Ok(())
}
