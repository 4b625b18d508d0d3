use anyhow::{bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use generator::profile::ScenarioProfile;
use gui_bridge::bridge::GuiBridge;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use tokio::sync::mpsc::unbounded_channel;
use trackcore::target::ensure_identity;
use trackcore::wire::{describe_hex, encode_hex, Compression};
use trackcore::MessageAssembler;
use workflow::config::SenderConfig;
use workflow::runner::SenderRunner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Synthetic vessel-track sender")]
struct Args {
    #[command(subcommand)]
    command: Mode,
}

#[derive(ClapArgs)]
struct ConfigArg {
    /// Load a sender config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Mode {
    /// Play a YAML scenario against live timers
    Run {
        scenario: PathBuf,
        #[command(flatten)]
        config: ConfigArg,
        /// Also host the HTTP operator bridge
        #[arg(long, default_value_t = false)]
        serve: bool,
    },
    /// Host the HTTP operator bridge until Ctrl+C
    Serve {
        #[command(flatten)]
        config: ConfigArg,
    },
    /// Decode hex text from the argument, a file, or stdin
    Decode {
        hex: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Assemble one record from a scenario form and print it as hex
    Encode {
        scenario: PathBuf,
        #[command(flatten)]
        config: ConfigArg,
        /// none, zlib or deflate; defaults to the config value
        #[arg(long, value_parser = parse_compression)]
        compression: Option<Compression>,
    },
}

fn parse_compression(text: &str) -> Result<Compression, String> {
    match text.to_ascii_lowercase().as_str() {
        "none" => Ok(Compression::None),
        "zlib" => Ok(Compression::Zlib),
        "deflate" | "raw_deflate" => Ok(Compression::RawDeflate),
        other => Err(format!("unknown compression {:?}", other)),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Mode::Run {
            scenario,
            config,
            serve,
        } => {
            let config = SenderConfig::load_or_default(config.config.as_deref())?;
            let profile = ScenarioProfile::load(&scenario)?;
            stream(config, Some(profile), serve)
        }
        Mode::Serve { config } => {
            let config = SenderConfig::load_or_default(config.config.as_deref())?;
            stream(config, None, true)
        }
        Mode::Decode { hex, file } => decode(hex, file),
        Mode::Encode {
            scenario,
            config,
            compression,
        } => {
            let config = SenderConfig::load_or_default(config.config.as_deref())?;
            println!("{}", encode_scenario(&scenario, &config, compression)?);
            Ok(())
        }
    }
}

/// Assembles one batch from a scenario's form, filling identifiers the way
/// the controller does before the first publish.
fn encode_scenario(
    scenario: &Path,
    config: &SenderConfig,
    compression: Option<Compression>,
) -> anyhow::Result<String> {
    let profile = ScenarioProfile::load(scenario)?;
    let mut snapshot = profile
        .form
        .seed_snapshot()
        .with_context(|| format!("scenario form in {}", scenario.display()))?;
    let mut rng = rand::thread_rng();
    ensure_identity(&mut snapshot, &config.identity, &mut rng).context("generating identifiers")?;
    let timestamp_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let batch = MessageAssembler::new(config.assembler.clone()).assemble_batch(&snapshot, timestamp_ms);
    encode_hex(&batch, compression.unwrap_or(config.compression)).context("encoding record")
}

fn decode(hex: Option<String>, file: Option<PathBuf>) -> anyhow::Result<()> {
    let text = match (hex, file) {
        (Some(hex), None) => hex,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("reading hex from {}", path.display()))?,
        (None, None) => std::io::read_to_string(std::io::stdin()).context("reading hex from stdin")?,
        (Some(_), Some(_)) => bail!("pass hex text or --file, not both"),
    };
    match describe_hex(&text) {
        Ok(rendered) => {
            println!("{}", rendered);
            Ok(())
        }
        Err(diagnostic) => {
            eprintln!("{}", diagnostic);
            bail!("payload could not be decoded")
        }
    }
}

fn stream(config: SenderConfig, scenario: Option<ScenarioProfile>, serve: bool) -> anyhow::Result<()> {
    let publisher = config.sink.open()?;
    let mut runner = SenderRunner::new(&config, publisher)?;
    if let Some(profile) = &scenario {
        runner = runner.with_form(profile.form.clone());
    }

    let (commands, receiver) = unbounded_channel();
    if serve {
        let bridge = GuiBridge::spawn(config.bind, runner.status(), commands.clone());
        bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
    }

    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating sender runtime")?;
    runtime.block_on(async {
        if let Some(profile) = scenario {
            tokio::spawn(profile.feed(commands.clone()));
        }
        tokio::select! {
            _ = runner.run(receiver) => {}
            interrupted = signal::ctrl_c() => {
                interrupted.context("awaiting Ctrl+C to exit")?;
                info!("interrupted");
            }
        }
        Ok::<(), anyhow::Error>(())
    })?;

    let status = runner.status();
    if let Ok(model) = status.read() {
        info!(
            "final state {:?}: {} published, {} failed, {} deletes",
            model.state, model.metrics.published, model.metrics.failed, model.metrics.deletes
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackcore::wire::{decode_hex, DecodedMessage};

    fn demo(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos").join(name)
    }

    #[test]
    fn subcommands_parse() {
        let args = Args::try_parse_from(["simulator", "encode", "s.yaml", "--compression", "Deflate"]).unwrap();
        match args.command {
            Mode::Encode { compression, .. } => assert_eq!(compression, Some(Compression::RawDeflate)),
            _ => panic!("expected encode"),
        }
        assert!(Args::try_parse_from(["simulator", "encode", "s.yaml", "--compression", "lz4"]).is_err());

        let args = Args::try_parse_from(["simulator", "run", "s.yaml", "--serve"]).unwrap();
        assert!(matches!(args.command, Mode::Run { serve: true, .. }));
    }

    #[test]
    fn encoded_scenario_decodes_back() {
        let config = SenderConfig::load(demo("sender.yaml")).unwrap();
        let hex = encode_scenario(&demo("harbour_exit.yaml"), &config, None).unwrap();

        let report = decode_hex(&hex).unwrap();
        assert_eq!(report.compression, config.compression);
        let record = match report.message {
            DecodedMessage::Batch(mut batch) => batch.records.remove(0),
            other => panic!("expected a batch, got {:?}", other),
        };
        assert_ne!(record.id, 0);
        assert_eq!(record.track_status(), Some(trackcore::target::TrackStatus::New));
        assert!(describe_hex(&hex).unwrap().contains("\"sources\""));
    }

    #[test]
    fn encode_overrides_compression_and_rejects_missing_scenario() {
        let config = SenderConfig::default();
        let hex = encode_scenario(&demo("harbour_exit.yaml"), &config, Some(Compression::Zlib)).unwrap();
        assert_eq!(decode_hex(&hex).unwrap().compression, Compression::Zlib);
        assert!(encode_scenario(&demo("missing.yaml"), &config, None).is_err());
    }
}
