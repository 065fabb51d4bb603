use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use waymark::backup;
use waymark::config::Config;
use waymark::db::places::{NewPlace, PlaceUpdate};
use waymark::db::Database;
use waymark::logging;
use waymark::storage::PhotoStore;

fn print_help() {
    println!(
        r#"waymark - local-first travel log

USAGE:
    waymark [OPTIONS] <COMMAND>

COMMANDS:
    places list                         List cataloged places
    places add NAME [--description TEXT] [--lat LAT --lon LON] [--liked]
    places like ID                      Toggle the liked flag
    places rm ID                        Delete a place and its photos
    trips list                          List trips
    trips current ID                    Make a trip the current one
    trips rm ID                         Delete a trip and its itinerary
    stats                               Show catalog statistics
    export [--out DIR]                  Write a backup file
    import FILE                         Replace the catalog from a backup file

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    WAYMARK_LOG         Log level (trace, debug, info, warn, error)
"#
    );
}

fn parse_args() -> (Option<PathBuf>, Vec<String>) {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config_path = None;
    let mut rest = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("waymark {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            _ => rest.push(args[i].clone()),
        }
        i += 1;
    }

    (config_path, rest)
}

fn main() -> Result<()> {
    let (config_path, command) = parse_args();

    logging::init(None)?;
    let config = Config::load(config_path.as_deref())?;
    let db = Database::open(&config.db_path)?;
    db.initialize()?;
    let store = PhotoStore::new(config.photos_dir.clone());

    match command.first().map(String::as_str) {
        Some("places") => cmd_places(&db, &store, &command[1..]),
        Some("trips") => cmd_trips(&db, &store, &command[1..]),
        Some("stats") => cmd_stats(&db),
        Some("export") => cmd_export(&db, &config, &command[1..]),
        Some("import") => cmd_import(&db, &store, &command[1..]),
        Some(other) => {
            eprintln!("Unknown command: {other}");
            print_help();
            std::process::exit(1);
        }
        None => {
            print_help();
            std::process::exit(1);
        }
    }
}

fn parse_id(args: &[String]) -> Result<i64> {
    let Some(raw) = args.first() else {
        bail!("expected an id argument");
    };
    Ok(raw.parse()?)
}

fn cmd_places(db: &Database, store: &PhotoStore, args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("list") | None => {
            for place in db.get_all_places()? {
                let marks = match (place.liked, place.visit_later) {
                    (true, true) => " [liked, visit later]",
                    (true, false) => " [liked]",
                    (false, true) => " [visit later]",
                    (false, false) => "",
                };
                let coords = match (place.latitude, place.longitude) {
                    (Some(lat), Some(lon)) => format!(" ({lat}, {lon})"),
                    _ => String::new(),
                };
                println!("{:>4}  {}{}{}", place.id, place.name, coords, marks);
            }
            Ok(())
        }
        Some("add") => {
            let mut input = NewPlace::default();
            let mut lat = None;
            let mut lon = None;
            let mut i = 1;
            while i < args.len() {
                match args[i].as_str() {
                    "--description" => {
                        input.description = args.get(i + 1).cloned().unwrap_or_default();
                        i += 1;
                    }
                    "--lat" => {
                        lat = args.get(i + 1).map(|v| v.parse()).transpose()?;
                        i += 1;
                    }
                    "--lon" => {
                        lon = args.get(i + 1).map(|v| v.parse()).transpose()?;
                        i += 1;
                    }
                    "--liked" => input.liked = true,
                    name if input.name.is_empty() => input.name = name.to_string(),
                    other => bail!("unexpected argument: {other}"),
                }
                i += 1;
            }
            input.coordinates = match (lat, lon) {
                (Some(lat), Some(lon)) => Some((lat, lon)),
                (None, None) => None,
                _ => bail!("--lat and --lon must be given together"),
            };
            let id = db.insert_place(&input)?;
            println!("Added place {id}");
            Ok(())
        }
        Some("like") => {
            let id = parse_id(&args[1..])?;
            let Some(place) = db.get_place(id)? else {
                bail!("no place with id {id}");
            };
            db.update_place(
                id,
                &PlaceUpdate {
                    liked: Some(!place.liked),
                    ..PlaceUpdate::default()
                },
            )?;
            Ok(())
        }
        Some("rm") => {
            let id = parse_id(&args[1..])?;
            let uris = db.delete_place(id)?;
            for uri in &uris {
                store.remove_file(uri);
            }
            println!("Deleted place {id} ({} photo files removed)", uris.len());
            Ok(())
        }
        Some(other) => bail!("unknown places subcommand: {other}"),
    }
}

fn cmd_trips(db: &Database, store: &PhotoStore, args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("list") | None => {
            for trip in db.get_all_trips()? {
                let marker = if trip.current { "*" } else { " " };
                println!(
                    "{marker}{:>4}  {}  {} .. {}",
                    trip.id, trip.title, trip.start_date, trip.end_date
                );
            }
            Ok(())
        }
        Some("current") => {
            let id = parse_id(&args[1..])?;
            db.set_current_trip(id)?;
            Ok(())
        }
        Some("rm") => {
            let id = parse_id(&args[1..])?;
            let uris = db.delete_trip(id)?;
            for uri in &uris {
                store.remove_file(uri);
            }
            println!("Deleted trip {id} ({} photo files removed)", uris.len());
            Ok(())
        }
        Some(other) => bail!("unknown trips subcommand: {other}"),
    }
}

fn cmd_stats(db: &Database) -> Result<()> {
    let stats = db.get_stats()?;
    println!("Trips:          {}", stats.trips_total);
    println!("  last year:    {}", stats.trips_last_year);
    println!("Places:         {}", stats.places_total);
    println!("Photos:         {}", stats.photos_total);

    let top = db.get_top_visited_places()?;
    if !top.is_empty() {
        println!("Most visited:");
        for place in top.iter().take(5) {
            println!("  {} ({}x)", place.name, place.visit_count);
        }
    }
    Ok(())
}

fn cmd_export(db: &Database, config: &Config, args: &[String]) -> Result<()> {
    let mut out_dir = config.backup_dir.clone();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--out" => {
                if let Some(dir) = args.get(i + 1) {
                    out_dir = PathBuf::from(dir);
                    i += 1;
                } else {
                    bail!("--out requires a directory argument");
                }
            }
            other => bail!("unexpected argument: {other}"),
        }
        i += 1;
    }
    let path = backup::export::create_backup_file(db, &out_dir)?;
    println!("Backup written to {}", path.display());
    Ok(())
}

fn cmd_import(db: &Database, store: &PhotoStore, args: &[String]) -> Result<()> {
    let Some(file) = args.first() else {
        bail!("import requires a backup file argument");
    };
    let data = backup::read_backup_file(Path::new(file))?;
    backup::import::import_from_backup(db, store, &data)?;
    println!(
        "Imported {} places and {} trips",
        data.places.len(),
        data.trips.len()
    );
    Ok(())
}
