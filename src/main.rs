use xyz_reader::app::{self, App};
use xyz_reader::config::Config;
use xyz_reader::db::{build_dir_uri, item_id};
use xyz_reader::error::{AppError, Result};

const USAGE: &str = "Usage: xyz-reader [--refresh | --show <id>]";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = Config::load()?;
    let app = App::new(&config)?;

    match args.get(1).map(String::as_str) {
        None => {
            let articles = app.articles().await?;
            if articles.is_empty() {
                println!("No articles yet, run with --refresh");
            }
            for article in &articles {
                println!("{}", app::list_line(article));
            }
        }
        Some("--refresh") => match app.refresh().await? {
            Some(count) => println!("Stored {} articles", count),
            None => println!("Feed unavailable, kept stored articles"),
        },
        Some("--show") => {
            let segment = args
                .get(2)
                .ok_or_else(|| AppError::InvalidArgument(USAGE.to_string()))?;
            let id = item_id(&format!("{}/{}", build_dir_uri(), segment))?;
            match app.article(id).await? {
                Some(article) => println!("{}", app::detail(&article)),
                None => println!("No article with id {}", id),
            }
        }
        Some(_) => {
            eprintln!("{}", USAGE);
        }
    }

    Ok(())
}
