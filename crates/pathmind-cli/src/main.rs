//! pathmind CLI: take adaptive tests and browse learning paths.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use pathmind_core::model::{PathId, TestFilter, TestId, UserId};

mod commands;

#[derive(Parser)]
#[command(name = "pathmind", version, about = "Adaptive tests and learning paths")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available adaptive tests
    Tests {
        /// Only tests whose title, description or tags contain this text
        #[arg(long)]
        search: Option<String>,

        /// Only tests of this difficulty (e.g. beginner)
        #[arg(long)]
        difficulty: Option<String>,

        /// List the tests you have already submitted instead
        #[arg(long)]
        completed: bool,

        /// Learner id for --completed (defaults to `user_id` from the config)
        #[arg(long)]
        user: Option<UserId>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Take a timed test interactively
    Take {
        /// Test to take
        #[arg(long)]
        test: TestId,

        /// Learner id (defaults to `user_id` from the config)
        #[arg(long)]
        user: Option<UserId>,

        /// Override the time limit in seconds
        #[arg(long)]
        time_limit: Option<u64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the stored result of a test
    Results {
        /// Test whose result to show
        #[arg(long)]
        test: TestId,

        /// Learner id (defaults to `user_id` from the config)
        #[arg(long)]
        user: Option<UserId>,

        /// Output format: text, markdown, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List learning paths and enrollment status
    Paths {
        /// Show the steps and progress of one path
        #[arg(long)]
        id: Option<PathId>,

        /// Learner id (defaults to `user_id` from the config)
        #[arg(long)]
        user: Option<UserId>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Enroll in a learning path
    Enroll {
        /// Learning path to join
        #[arg(long)]
        path: PathId,

        /// Learner id (defaults to `user_id` from the config)
        #[arg(long)]
        user: Option<UserId>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show progress, recent activity and recommended paths
    Dashboard {
        /// Learner id (defaults to `user_id` from the config)
        #[arg(long)]
        user: Option<UserId>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Create a starter config and example question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pathmind=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tests {
            search,
            difficulty,
            completed,
            user,
            config,
        } => {
            let filter = TestFilter::new(search, difficulty);
            commands::tests::execute(filter, completed, user, config).await
        }
        Commands::Take {
            test,
            user,
            time_limit,
            config,
        } => commands::take::execute(test, user, time_limit, config).await,
        Commands::Results {
            test,
            user,
            format,
            config,
        } => commands::results::execute(test, user, format, config).await,
        Commands::Paths { id, user, config } => commands::paths::execute(id, user, config).await,
        Commands::Enroll { path, user, config } => {
            commands::paths::enroll(path, user, config).await
        }
        Commands::Dashboard { user, config } => commands::dashboard::execute(user, config).await,
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
