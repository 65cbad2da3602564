use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tilegen::{WorldGenerationParams, generate_world};
use tracing_subscriber::EnvFilter;

/// Генератор клеточных карт мира
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML
    #[arg(short, long)]
    config: PathBuf,

    /// Заменить сид из конфигурации
    #[arg(short, long)]
    seed: Option<u64>,

    /// Сохранить цветной предпросмотр карты (PNG, клетка = пиксель)
    #[arg(short, long)]
    preview: Option<PathBuf>,

    /// Сохранить сводку карты в JSON
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    tracing::info!(config = %cli.config.display(), "загрузка конфигурации");
    let mut params = WorldGenerationParams::from_toml_file(&cli.config)?;
    if let Some(seed) = cli.seed {
        params.seed = seed;
    }

    let world = generate_world(&params)?;

    if let Some(path) = &cli.preview {
        world.grid.save_preview_png(path)?;
        tracing::info!(path = %path.display(), "предпросмотр сохранён");
    }

    let summary = world.summary(&params);
    if let Some(path) = &cli.summary {
        fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        tracing::info!(path = %path.display(), "сводка сохранена");
    }

    println!(
        "Готово: {}×{}, генератор {:?}, суша {} клеток, континентов {}, рек {} клеток",
        summary.width,
        summary.height,
        summary.generator,
        summary.land_tiles,
        summary.continents.len(),
        summary.river_tiles
    );
    Ok(())
}
