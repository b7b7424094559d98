use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands;
use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "resume-tailor", version, about = "Tailor a RenderCV resume to a job description")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Tailor the base resume to one job description
    Generate(GenerateArgs),
    /// Tailor the base resume to every .txt job description in a directory
    Batch(BatchArgs),
    /// Render the base resume without any tailoring
    Original(OriginalArgs),
    /// Create a new resume file
    Init(InitArgs),
    /// Show the effective configuration
    Info,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Job description text file
    #[arg(value_name = "JOB_FILE")]
    pub job_file: PathBuf,
    /// Output directory (default: <output_dir>/<Name>_<Company>_<timestamp>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub base_resume: Option<PathBuf>,
    #[arg(long)]
    pub static_sections: Option<PathBuf>,
    /// Model name override
    #[arg(short, long)]
    pub model: Option<String>,
    /// RenderCV theme override
    #[arg(short, long)]
    pub theme: Option<String>,
    /// Only write the tailored YAML
    #[arg(long)]
    pub no_render: bool,
    /// Ask the model for bold keywords instead of using the term catalog
    #[arg(long)]
    pub llm_keywords: bool,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    /// Directory containing .txt job descriptions
    #[arg(value_name = "JOBS_DIR")]
    pub jobs_dir: PathBuf,
    #[arg(short, long, default_value = "./batch_output")]
    pub output: PathBuf,
    #[arg(long)]
    pub base_resume: Option<PathBuf>,
    #[arg(short, long)]
    pub model: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct OriginalArgs {
    /// Output directory (default: <output_dir>/original)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub base_resume: Option<PathBuf>,
    #[arg(long)]
    pub static_sections: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct InitArgs {
    /// Full name for the new resume
    pub name: String,
}

impl Cli {
    pub async fn run(self, config: &Config) -> anyhow::Result<()> {
        match self.command {
            Command::Generate(args) => commands::generate(config, args).await,
            Command::Batch(args) => commands::batch(config, args).await,
            Command::Original(args) => commands::original(config, args).await,
            Command::Init(args) => commands::init(config, args).await,
            Command::Info => commands::info(config).await,
        }
    }
}
