use std::process::ExitCode;

use anyhow::{anyhow, bail};
use chrono::Local;
use clap::Parser;

use crate::{
    cli::{Cli, Command, FetchArgs, LogFormat, Source},
    publish::Published,
    record::Publication,
    splice::Outcome,
};

mod cli;
mod error;
mod normalize;
mod publish;
mod record;
mod render;
mod report;
mod source;
mod splice;
mod sync;

const PLACEHOLDER_ID: &str = "YOUR_SCHOLAR_ID";

fn main() -> ExitCode {
    let args = Cli::parse();
    init_tracing(&args);
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report::error(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(args: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match args.verbose {
        0 => "pubsync=warn",
        1 => "pubsync=info",
        _ => "pubsync=debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match args.log_format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn run(args: Cli) -> anyhow::Result<()> {
    match args.command {
        Command::Update {
            fetch,
            file,
            markers,
            push,
        } => {
            let markers = markers.markers()?;
            let Some(publications) = gather(&fetch)? else {
                return Ok(());
            };
            eprint!("{}", report::listing(&publications));

            match sync::update_page(&publications, &file, &markers, Local::now().naive_local())? {
                Outcome::Updated => report::success(format!("updated {}", file.display())),
                Outcome::Unchanged => {
                    report::note(format!("{} is already up to date", file.display()))
                }
            }

            if push {
                match sync::publish_page(&file, Local::now().date_naive()) {
                    Ok(Published::NothingToDo) => report::note(
                        "no changes detected, publications are already up to date",
                    ),
                    Ok(Published::Pushed) => report::success("pushed to remote"),
                    Err(e) => {
                        report::warning(format!(
                            "{} was updated locally but not published",
                            file.display()
                        ));
                        return Err(e.into());
                    }
                }
            }
        }
        Command::Render { fetch, markers } => {
            let markers = markers.markers()?;
            if let Some(publications) = gather(&fetch)? {
                let region =
                    render::render_region(&publications, &markers, Local::now().naive_local());
                println!("{region}");
            }
        }
        Command::List { fetch } => {
            if let Some(publications) = gather(&fetch)? {
                print!("{}", report::listing(&publications));
            }
        }
    }
    Ok(())
}

/// Fetch, normalise and apply the empty-result policy. `None` means there is nothing to do.
fn gather(args: &FetchArgs) -> anyhow::Result<Option<Vec<Publication>>> {
    let source = match &args.from {
        Some(Source::Identifier(id)) if id.is_empty() || id == PLACEHOLDER_ID => {
            bail!("please set your Google Scholar ID, as an argument or via SCHOLAR_ID")
        }
        Some(source) => source,
        None => {
            return Err(anyhow!(
                "no source given: pass a Google Scholar ID or a JSON file, or set SCHOLAR_ID"
            ));
        }
    };

    let provider = source::open(source);
    report::note(format!("fetching publications from {}", provider.describe()));
    let publications = sync::fetch_publications(provider.as_ref(), args.limit);

    match sync::apply_empty_policy(publications, args.on_empty)? {
        Some(publications) => {
            report::success(format!("found {} publications", publications.len()));
            Ok(Some(publications))
        }
        None => {
            report::note("no publications found, leaving the page untouched");
            Ok(None)
        }
    }
}
