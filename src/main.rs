//! puckcast CLI
//!
//! NHL game outcome prediction: ingest schedule exports, backtest the
//! embedding model day by day, and score upcoming games.

use clap::{Parser, Subcommand};
use puckcast::{Config, Result};

#[derive(Parser)]
#[command(name = "puckcast")]
#[command(about = "NHL game outcome prediction with walk-forward training", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Backtest a model over historical games
    Backtest {
        /// First prediction date (YYYY-MM-DD); defaults to the earliest
        /// game on record
        #[arg(long)]
        start: Option<String>,
        /// Last prediction date (YYYY-MM-DD); defaults to the latest game
        #[arg(long)]
        end: Option<String>,
        /// Training strategy
        #[arg(long, default_value = "incremental")]
        strategy: Strategy,
        /// Split date for the one-split strategy (YYYY-MM-DD)
        #[arg(long)]
        split_date: Option<String>,
        /// Predicter name used when recording
        #[arg(long, default_value = "nn-incremental")]
        name: String,
        /// Record predictions and save a checkpoint
        #[arg(long)]
        record: bool,
    },
    /// Score games on a date with the latest checkpoint
    Predict {
        /// Date to score (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Predicter name used when recording
        #[arg(long, default_value = "nn-incremental")]
        name: String,
        /// Record predictions in the database
        #[arg(long)]
        record: bool,
    },
    /// List recorded predictions for a date range
    Report {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// End date (YYYY-MM-DD); defaults to start
        #[arg(long)]
        end: Option<String>,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Load downloader exports (seasons.txt, teams.txt, games.txt)
    Load {
        /// Directory with the export files; defaults to the configured
        /// data directory
        #[arg(long)]
        dir: Option<String>,
    },
    /// Show database status
    Status,
}

#[derive(Clone, Debug)]
enum Strategy {
    Incremental,
    OneSplit,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "incremental" => Ok(Strategy::Incremental),
            "one-split" => Ok(Strategy::OneSplit),
            _ => Err(format!(
                "Unknown strategy: {}. Use incremental or one-split.",
                s
            )),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Load { dir } => commands::data_load(&config, dir),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Backtest {
            start,
            end,
            strategy,
            split_date,
            name,
            record,
        } => commands::backtest(&config, start, end, strategy, split_date, &name, record),
        Commands::Predict { date, name, record } => {
            commands::predict(&config, date, &name, record)
        }
        Commands::Report { start, end } => commands::report(&config, &start, end),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use chrono::NaiveDate;
    use puckcast::data::dataset::{continuous_features, GameDataset, TeamIndexer, CONT_DIM};
    use puckcast::data::{Database, Loader, TeamDirectory};
    use puckcast::features::assemble;
    use puckcast::model::{CheckpointState, EmbedNet, EmbedNetConfig, ModelStore};
    use puckcast::predict::Predictor;
    use puckcast::training::{
        IncrementalStrategy, OneSplitStrategy, ResultsAnalyzer, StandardScaler, Trainer,
    };
    use puckcast::PuckError;

    fn parse_date(s: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| PuckError::Parse(format!("Bad date '{}': {}", s, e)))
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.data_dir)?;
        std::fs::create_dir_all(&config.data.model_dir)?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Drop downloader exports into data/ and run 'puckcast data load'");
        println!("  3. Run 'puckcast backtest --record' to train and evaluate");
        println!("  4. Run 'puckcast predict' to score today's games");

        Ok(())
    }

    pub fn data_load(config: &Config, dir: Option<String>) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let dir = dir.unwrap_or_else(|| config.data.data_dir.clone());

        let loader = Loader::new(&db);
        let summary = loader.load_dir(&dir)?;
        println!(
            "Loaded {} seasons, {} teams, {} games ({} skipped) from {}",
            summary.seasons, summary.teams, summary.games, summary.skipped, dir
        );

        let stats = db.get_stats()?;
        println!(
            "Database now holds {} games ({} completed) across {} teams",
            stats.game_count, stats.completed_count, stats.team_count
        );
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database: {}", config.data.database_path);
        println!("  Teams:           {}", stats.team_count);
        println!("  Games:           {}", stats.game_count);
        println!("  Completed games: {}", stats.completed_count);
        match (stats.earliest_game, stats.latest_game) {
            (Some(first), Some(last)) => println!("  Date range:      {} to {}", first, last),
            _ => println!("  Date range:      (no games)"),
        }
        Ok(())
    }

    pub fn backtest(
        config: &Config,
        start: Option<String>,
        end: Option<String>,
        strategy: Strategy,
        split_date: Option<String>,
        name: &str,
        record: bool,
    ) -> Result<()> {
        use burn::backend::{Autodiff, NdArray};

        type MyBackend = NdArray<f32>;
        type MyAutodiffBackend = Autodiff<MyBackend>;

        let start = start.as_deref().map(parse_date).transpose()?;
        let end = end.as_deref().map(parse_date).transpose()?;

        let db = Database::open(&config.data.database_path)?;

        // One bulk read: history before the prediction window still feeds
        // the aggregates
        let games = db.games_in_range(None, None)?;
        let dataset = GameDataset::new(assemble(&games));
        let labeled = dataset.labeled();
        if labeled.is_empty() {
            return Err(PuckError::NoTrainingData {
                start: start.unwrap_or(NaiveDate::MIN),
                end: end.unwrap_or(NaiveDate::MAX),
            });
        }
        println!(
            "Assembled {} rows ({} with results) from {} games",
            dataset.len(),
            labeled.len(),
            games.len()
        );

        let indexer = TeamIndexer::from_rows(labeled.rows());
        let net_config = EmbedNetConfig {
            continuous_dim: CONT_DIM,
            hidden_size: config.model.hidden_size,
            num_teams: config.model.num_teams.max(indexer.num_teams()),
            embed_dim: config.model.embed_dim,
        };
        let device = Default::default();
        let model = EmbedNet::<MyAutodiffBackend>::new(&device, &net_config);
        let mut trainer = Trainer::new(model, config.training.learning_rate, device);

        let outcome = match strategy {
            Strategy::Incremental => IncrementalStrategy::new(&dataset, config.training.batch_size)
                .with_bounds(start, end)
                .run(&mut trainer, &indexer)?,
            Strategy::OneSplit => {
                let split = split_date
                    .as_deref()
                    .map(parse_date)
                    .transpose()?
                    .ok_or_else(|| {
                        PuckError::Config(
                            "--split-date is required for the one-split strategy".to_string(),
                        )
                    })?;
                OneSplitStrategy::new(
                    &dataset,
                    split,
                    config.training.batch_size,
                    config.training.epochs,
                )
                .run(&mut trainer, &indexer)?
            }
        };

        println!(
            "\n{} predictions over {} days ({} training days)",
            outcome.predictions.len(),
            outcome.days_evaluated,
            outcome.days_trained
        );
        let analyzer = ResultsAnalyzer::new(outcome.predictions.clone(), outcome.labels.clone());
        for threshold in [0.5f32, 0.6, 0.7, 0.8, 0.9] {
            println!(
                "Accuracy at {:.0}%: {:.2}%",
                threshold * 100.0,
                analyzer.get_accuracy(threshold) * 100.0
            );
        }

        if record {
            let predicter = db.ensure_predicter(name, "EmbedNet", true)?;
            for (game_id, score) in outcome.game_ids.iter().zip(&outcome.predictions) {
                db.record_prediction(*game_id, predicter, *score)?;
            }
            println!("Recorded {} predictions as '{}'", outcome.game_ids.len(), name);

            if let Some((_, last)) = labeled.date_bounds() {
                db.set_last_training_date(predicter, end.unwrap_or(last))?;
            }

            // Checkpoint with a scaler refit over the full labeled history
            let mut scaler = StandardScaler::new();
            let features: Vec<_> = labeled.rows().iter().map(continuous_features).collect();
            scaler.fit(&features);
            let store = ModelStore::new(&config.data.model_dir);
            store.save(
                trainer.model(),
                &CheckpointState {
                    model: net_config,
                    scaler,
                    team_index: indexer,
                },
            )?;
        }

        Ok(())
    }

    pub fn predict(
        config: &Config,
        date: Option<String>,
        name: &str,
        record: bool,
    ) -> Result<()> {
        use burn::backend::NdArray;

        type MyBackend = NdArray<f32>;

        let date = match date {
            Some(s) => parse_date(&s)?,
            None => chrono::Local::now().date_naive(),
        };

        let db = Database::open(&config.data.database_path)?;
        let games = db.games_in_range(None, Some(date))?;
        let dataset = GameDataset::new(assemble(&games));
        let todays: Vec<_> = dataset
            .select_by_date(Some(date), Some(date))
            .to_vec();
        if todays.is_empty() {
            println!("No games on {}", date);
            return Ok(());
        }

        let store = ModelStore::new(&config.data.model_dir);
        let device = Default::default();
        let predictor = Predictor::<MyBackend>::load(&store, device)?;
        let predictions = predictor.predict(&todays)?;

        let directory = TeamDirectory::from_database(&db)?;
        println!("Predictions for {}:", date);
        for prediction in &predictions {
            let pick = if prediction.home_win { "home" } else { "away" };
            println!(
                "  {} vs {}: P(home) = {:.3} -> {}",
                directory.abbrev_from_id(prediction.home_team),
                directory.abbrev_from_id(prediction.away_team),
                prediction.score,
                pick
            );
        }

        if record {
            let predicter = db.ensure_predicter(name, "EmbedNet", true)?;
            for prediction in &predictions {
                db.record_prediction(prediction.game_id, predicter, prediction.score)?;
            }
            println!("Recorded {} predictions as '{}'", predictions.len(), name);
        }

        Ok(())
    }

    pub fn report(config: &Config, start: &str, end: Option<String>) -> Result<()> {
        let start = parse_date(start)?;
        let end = match end {
            Some(s) => parse_date(&s)?,
            None => start,
        };

        let db = Database::open(&config.data.database_path)?;
        let rows = db.games_with_predictions(start, end)?;
        if rows.is_empty() {
            println!("No recorded predictions between {} and {}", start, end);
            return Ok(());
        }

        for row in &rows {
            let final_score = match (row.home_goals, row.away_goals) {
                (Some(h), Some(a)) => format!("{}-{}", h, a),
                _ => "pending".to_string(),
            };
            println!(
                "{}  {} vs {}  {}  P(home) = {:.3}  [{}]",
                row.date_played,
                row.home_abbrev,
                row.away_abbrev,
                final_score,
                row.score,
                row.predicter_name
            );
        }
        Ok(())
    }
}
