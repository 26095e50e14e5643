use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use voice2midi::{validate_input, Config, VoiceToMidi};

/// Voice-to-MIDI Transcription System
#[derive(Parser)]
#[command(name = "voice2midi")]
#[command(about = "Transcribe a monophonic vocal recording into a MIDI melody")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe an audio file and write MIDI output
    Transcribe {
        /// Input audio file (WAV)
        input: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the MIDI output filename
        #[arg(long)]
        midi_name: Option<String>,

        /// Skip QA plots
        #[arg(long)]
        no_plots: bool,

        /// Run the pitch and rhythm analyses one after the other
        #[arg(long)]
        sequential: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Transcribe {
            input,
            output,
            config,
            midi_name,
            no_plots,
            sequential,
            verbose,
            quiet,
        } => {
            if verbose && quiet {
                anyhow::bail!("Cannot specify both --verbose and --quiet");
            }
            init_logging(verbose, quiet);

            // Load configuration
            let mut config = if let Some(config_path) = config {
                voice2midi::config::load_config(config_path)?
            } else {
                Config::default()
            };
            if let Some(name) = midi_name {
                config.export.midi_filename = name;
            }
            if no_plots {
                config.export.generate_plots = false;
            }
            if sequential {
                config.pipeline.parallel_analysis = false;
            }

            // Validate input
            validate_input(&input, &config)?;

            let midi_path = output.join(&config.export.midi_filename);
            let processor = VoiceToMidi::new(config);

            match processor.process(&input, &output) {
                Ok(transcription) => {
                    if !quiet {
                        println!(
                            "Transcribed {} notes at {:.1} BPM",
                            transcription.notes.len(),
                            transcription.tempo_bpm
                        );
                        for note in &transcription.notes {
                            println!(
                                "  {:>4}  {:7.3}s - {:7.3}s",
                                note.pitch.to_string(),
                                note.start,
                                note.end
                            );
                        }
                        println!("MIDI saved to {}", midi_path.display());
                    }
                }
                Err(err) if err.is_rejection() => {
                    eprintln!("{}", err.user_message());
                    return Ok(ExitCode::from(2));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::ValidateConfig { config } => {
            let config = voice2midi::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(ExitCode::SUCCESS)
}
