use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;

use labelscope_client::LabelServerClient;
use labelscope_core::AppConfig;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "labelscope",
    about = "Interactive segmentation client for annotation inference servers",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting LABELSCOPE_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Annotation server URL, overriding the configured one.
    #[arg(long, global = true)]
    server: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the server's capability metadata.
    Info,

    /// List the server's models.
    Models {
        /// Only models that accept click guidance.
        #[arg(long)]
        interactive: bool,
    },

    /// Run full-volume inference and save the returned mask.
    Infer {
        model: String,
        image: String,
        /// Where to write the mask; defaults to the server's file name.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run point-guided inference.
    Smartedit {
        model: String,
        image: String,
        /// Foreground voxel, repeatable.
        #[arg(long = "foreground", value_name = "X,Y,Z")]
        foreground: Vec<String>,
        /// Background voxel, repeatable.
        #[arg(long = "background", value_name = "X,Y,Z")]
        background: Vec<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Ask the active-learning strategy for the next image to annotate.
    Sample {
        #[arg(long, default_value = "random")]
        strategy: String,
    },

    /// Upload a finished label for an image.
    Submit { image: String, label: PathBuf },

    /// Training control.
    Train {
        #[command(subcommand)]
        action: TrainAction,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TrainAction {
    /// Show training status.
    Status,
    /// Start a training session.
    Start,
    /// Stop the running training session.
    Stop,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved configuration.
    Show,
    /// Persist a new server URL.
    SetServer { url: String },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("LABELSCOPE_JSON").as_deref() == Ok("1");

    let mut config = AppConfig::load()?;
    if let Some(server) = cli.server {
        config.server.url = server;
    }

    match cli.command {
        Commands::Info => {
            let client = LabelServerClient::from_config(&config)?;
            let info = client.info().await?;

            if json_output {
                print_json(&json!({"status": "ok", "data": info}))?;
            } else {
                println!("{} {}", info.name, info.version);
                if !info.description.is_empty() {
                    println!("{}", info.description);
                }
                println!(
                    "{} models, {} strategies, {} trainers",
                    info.models.len(),
                    info.strategies.len(),
                    info.trainers.len()
                );
            }
        }

        Commands::Models { interactive } => {
            let client = LabelServerClient::from_config(&config)?;
            let info = client.info().await?;

            let mut names: Vec<&str> = if interactive {
                info.interactive_models()
            } else {
                info.models.keys().map(String::as_str).collect()
            };
            names.sort_unstable();

            if json_output {
                let data: Vec<_> = names
                    .iter()
                    .filter_map(|name| info.model(name).map(|m| json!({"name": name, "model": m})))
                    .collect();
                print_json(&json!({"status": "ok", "data": data}))?;
            } else if names.is_empty() {
                println!("No models available.");
            } else {
                for name in names {
                    let model = &info.models[name];
                    let labels: Vec<String> = model
                        .labels
                        .entries()
                        .into_iter()
                        .map(|(id, label)| format!("{label}={id}"))
                        .collect();
                    println!(
                        "{name:<28} {:<14} {}D  [{}]",
                        format!("{:?}", model.model_type).to_lowercase(),
                        model.dimension,
                        labels.join(", ")
                    );
                }
            }
        }

        Commands::Infer {
            model,
            image,
            output,
        } => {
            let client = LabelServerClient::from_config(&config)?;
            let params = config.params_for(&model)?;
            let result = client.infer(&model, &image, &params).await?;
            report_mask(&image, result, output, json_output)?;
        }

        Commands::Smartedit {
            model,
            image,
            foreground,
            background,
            output,
        } => {
            let foreground = parse_points(&foreground)?;
            let background = parse_points(&background)?;
            if foreground.is_empty() {
                bail!("at least one --foreground point is required");
            }

            let client = LabelServerClient::from_config(&config)?;
            let params = config.params_for(&model)?;
            let result = client
                .infer_with_points(&model, &image, &foreground, &background, &params)
                .await?;
            report_mask(&image, result, output, json_output)?;
        }

        Commands::Sample { strategy } => {
            let client = LabelServerClient::from_config(&config)?;
            let sample = client.next_sample(&json!({"strategy": strategy})).await?;

            if json_output {
                print_json(&json!({"status": "ok", "data": sample}))?;
            } else {
                println!("Next sample: {}", sample.id);
            }
        }

        Commands::Submit { image, label } => {
            let bytes = std::fs::read(&label)
                .with_context(|| format!("reading label file {}", label.display()))?;
            let filename = label
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("{image}.nrrd"));

            let client = LabelServerClient::from_config(&config)?;
            let response = client.save_label(&image, &filename, bytes).await?;

            if json_output {
                print_json(&json!({"status": "ok", "data": response}))?;
            } else {
                println!("Label for {image} uploaded.");
            }
        }

        Commands::Train { action } => {
            let client = LabelServerClient::from_config(&config)?;
            let response = match action {
                TrainAction::Status => client.train_status().await?,
                TrainAction::Start => client.train_start(&json!({})).await?,
                TrainAction::Stop => client.train_stop().await?,
            };

            if json_output {
                print_json(&json!({"status": "ok", "data": response}))?;
            } else {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    print_json(&json!({"status": "ok", "data": config}))?;
                } else {
                    print!("{}", toml::to_string_pretty(&config)?);
                }
            }
            ConfigAction::SetServer { url } => {
                config.server.url = url;
                config.save()?;
                if json_output {
                    print_json(&json!({"status": "ok", "data": {"server": config.server.url}}))?;
                } else {
                    println!(
                        "Server set to {} ({})",
                        config.server.url,
                        AppConfig::config_path().display()
                    );
                }
            }
        },
    }

    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn report_mask(
    image: &str,
    result: labelscope_client::InferenceResult,
    output: Option<PathBuf>,
    json_output: bool,
) -> Result<()> {
    let path = output.unwrap_or_else(|| {
        if result.file_name.is_empty() {
            PathBuf::from(format!("{image}_seg.nrrd"))
        } else {
            PathBuf::from(&result.file_name)
        }
    });
    std::fs::write(&path, &result.file_bytes)
        .with_context(|| format!("writing mask to {}", path.display()))?;

    if json_output {
        print_json(&json!({
            "status": "ok",
            "data": {
                "file": path.to_string_lossy(),
                "shape": result.volume.shape,
                "element_type": result.volume.buffer.type_name(),
                "params": result.params,
            }
        }))?;
    } else {
        let [x, y, z] = result.volume.shape;
        println!(
            "Mask {x}x{y}x{z} ({}) written to {}",
            result.volume.buffer.type_name(),
            path.display()
        );
    }
    Ok(())
}

/// `X,Y,Z` → voxel triplet.
fn parse_point(value: &str) -> Result<[i32; 3]> {
    let parts: Vec<i32> = value
        .split(',')
        .map(|p| {
            p.trim()
                .parse()
                .with_context(|| format!("invalid point component in '{value}'"))
        })
        .collect::<Result<_>>()?;
    let [x, y, z] = parts[..] else {
        bail!("expected X,Y,Z but got '{value}'");
    };
    Ok([x, y, z])
}

fn parse_points(values: &[String]) -> Result<Vec<[i32; 3]>> {
    values.iter().map(|v| parse_point(v)).collect()
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_point_triplets() {
        assert_eq!(parse_point("153,175,60").unwrap(), [153, 175, 60]);
        assert_eq!(parse_point(" 1, -2, 3 ").unwrap(), [1, -2, 3]);
        assert!(parse_point("1,2").is_err());
        assert!(parse_point("a,b,c").is_err());
    }

    #[test]
    fn smartedit_args_parse() {
        let cli = Cli::parse_from([
            "labelscope",
            "smartedit",
            "deepgrow_3d",
            "la_003",
            "--foreground",
            "153,175,60",
            "--background",
            "10,10,10",
        ]);
        match cli.command {
            Commands::Smartedit {
                model, foreground, ..
            } => {
                assert_eq!(model, "deepgrow_3d");
                assert_eq!(foreground, vec!["153,175,60"]);
            }
            _ => panic!("expected smartedit"),
        }
    }
}
