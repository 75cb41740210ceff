use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use time::OffsetDateTime;
use uuid::Uuid;

use mealmind_client::{
    analysis::{analyze_meal, AnalysisImage, UserProfile},
    auth::AuthUser,
    config::AnalysisVariant,
    images::{prepare_image, ImageSource},
    meals::{log_meal, MealRecord},
    ClientState,
};

#[derive(Parser)]
#[command(name = "mealmind-client", about = "Analyze meal photos and log meals")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// User id issued by the session provider
    #[arg(long, global = true)]
    user: Option<Uuid>,

    /// Access token forwarded as a bearer token
    #[arg(long, global = true, env = "MEALMIND_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Prepare a photo and print the normalized analysis as JSON
    Analyze {
        #[arg(long)]
        image: PathBuf,
        /// Override ANALYSIS_VARIANT (multipart | json)
        #[arg(long)]
        variant: Option<AnalysisVariant>,
        #[arg(long = "diet")]
        dietary_restrictions: Vec<String>,
        #[arg(long = "condition")]
        health_conditions: Vec<String>,
    },
    /// Log a meal, optionally drafting it from a photo analysis first
    Log {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        image_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "mealmind_client=debug,reqwest=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let mut state = ClientState::init().context("load client configuration")?;
    let user = cli.user.map(|id| {
        let u = AuthUser::new(id);
        match &cli.token {
            Some(t) => u.with_access_token(t.clone()),
            None => u,
        }
    });

    match cli.command {
        Command::Analyze {
            image,
            variant,
            dietary_restrictions,
            health_conditions,
        } => {
            if let Some(variant) = variant {
                let mut config = (*state.config).clone();
                config.variant = variant;
                state.config = config.into();
            }
            let profile = user.as_ref().map(|u| UserProfile {
                user_id: u.id,
                dietary_restrictions,
                health_conditions,
            });
            let prepared = prepare_image(&state.config.image, ImageSource::Path(image)).await?;
            let result = analyze_meal(
                &state,
                user.as_ref(),
                &AnalysisImage::Prepared(prepared),
                profile,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Log {
            name,
            notes,
            image,
            image_url,
        } => {
            let user_ref = user.as_ref().context("--user is required to log a meal")?;
            let now = OffsetDateTime::now_utc();
            let mut record = match image {
                Some(path) => {
                    let prepared =
                        prepare_image(&state.config.image, ImageSource::Path(path)).await?;
                    let analysis = analyze_meal(
                        &state,
                        Some(user_ref),
                        &AnalysisImage::Prepared(prepared),
                        None,
                    )
                    .await?;
                    MealRecord::draft_from_analysis(user_ref.id, &analysis, now)
                }
                None => MealRecord {
                    user_id: user_ref.id,
                    meal_name: "Meal".into(),
                    timestamp: now,
                    image_url: None,
                    audio_url: None,
                    nutrition: None,
                    food_items: Vec::new(),
                    notes: String::new(),
                },
            };
            if let Some(name) = name {
                record.meal_name = name;
            }
            if !notes.is_empty() {
                record.notes = notes;
            }
            record.image_url = image_url.or(record.image_url);

            let logged = log_meal(&state, Some(user_ref), &record).await?;
            println!("{}", serde_json::to_string_pretty(&logged)?);
        }
    }

    Ok(())
}
