// fakeloc - manager command-line interface
// Writes the shared preferences that hooked processes read, and can probe
// how a target process would behave with the current settings.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fakeloc::bridge::ConfigBridge;
use fakeloc::hooks::LocationApi;
use fakeloc::location::{FavoriteLocation, LocationRecord};
use fakeloc::manager::{
    parse_setting_input, FavoritesRepository, PreferencesWriter, SettingsRepository, SettingsUpdate,
};
use fakeloc::store::PreferencesFile;
use fakeloc::TargetProcess;
use log::warn;
use std::path::PathBuf;
use std::sync::Arc;

/// Manager for the fake location engine
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Manage the location reported to hooked applications",
    long_about = "Manage the location reported to hooked applications.

Settings are written to a world-readable preferences file. Every hooked
process reads it afresh on each location call, so changes apply without
restarting target apps. Activation (start/stop) is read only when a target
process loads.

PREFERENCES FILE:
  Default location is the platform data directory (fakeloc/fakeloc_prefs.toml).
  Override with --prefs or the FAKELOC_PREFS_PATH environment variable."
)]
struct Args {
    /// Preferences file to use instead of the standard location
    #[arg(long, global = true)]
    prefs: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Turn spoofing on for processes loaded from now on
    Start,
    /// Turn spoofing off for processes loaded from now on
    Stop,
    /// Show the stored settings
    Status,
    /// Set the location picked on the map and make it the base location
    SetLocation {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
        #[arg(long, allow_hyphen_values = true)]
        altitude: Option<f64>,
    },
    /// Change accuracy, altitude and randomization overrides
    Settings {
        #[arg(long)]
        use_accuracy: Option<bool>,
        /// Meters
        #[arg(long)]
        accuracy: Option<String>,
        #[arg(long)]
        use_altitude: Option<bool>,
        /// Meters
        #[arg(long, allow_hyphen_values = true)]
        altitude: Option<String>,
        #[arg(long)]
        use_randomize: Option<bool>,
        /// Meters
        #[arg(long)]
        randomize_radius: Option<String>,
    },
    /// Manage saved locations
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// Simulate a target process loading with the current settings
    Probe {
        /// Package identifier of the simulated process
        #[arg(long, default_value = "com.example.maps")]
        package: String,
        /// Number of location queries to run
        #[arg(long, default_value_t = 3)]
        samples: usize,
    },
}

#[derive(Subcommand, Debug)]
enum FavoritesCommand {
    /// List saved locations
    List,
    /// Save a location
    Add {
        label: String,
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
    },
    /// Remove a saved location by id
    Remove { id: String },
    /// Use a saved location as the base location
    Select { id: String },
}

fn parse_field(name: &str, input: Option<String>) -> Result<Option<f64>> {
    match input {
        None => Ok(None),
        Some(raw) => parse_setting_input(&raw)
            .map(Some)
            .with_context(|| format!("Invalid {}: '{}' is not a number", name, raw)),
    }
}

fn print_status(settings: &SettingsRepository, favorites: &FavoritesRepository, path: &std::path::Path) -> Result<()> {
    let current = settings.load()?;
    let p = current.params;

    println!("Preferences: {}", path.display());
    println!("Active:      {}", current.is_playing);
    match current.last_clicked_location {
        Some(loc) => println!("Location:    {:.6}, {:.6}", loc.latitude, loc.longitude),
        None => println!("Location:    (none)"),
    }
    println!("Base:        {:?}", favorites.active_base()?);
    println!("Accuracy:    {} ({} m)", p.use_accuracy, p.accuracy);
    println!("Altitude:    {} ({} m)", p.use_altitude, p.altitude);
    println!("Randomize:   {} ({} m)", p.use_randomize, p.randomize_radius);
    Ok(())
}

fn run_favorites(favorites: &FavoritesRepository, command: FavoritesCommand) -> Result<()> {
    match command {
        FavoritesCommand::List => {
            let list = favorites.list()?;
            if list.is_empty() {
                println!("No favorites saved.");
            }
            for fav in list {
                println!(
                    "{}  {:<24} {:.6}, {:.6}",
                    fav.id, fav.label, fav.location.latitude, fav.location.longitude
                );
            }
        }
        FavoritesCommand::Add {
            label,
            latitude,
            longitude,
        } => {
            let fav = FavoriteLocation::new(label, LocationRecord::new(latitude, longitude).stamped_now());
            let id = fav.id.clone();
            if favorites.add(fav)? {
                println!("Saved favorite {}", id);
            } else {
                println!("Favorite {} already saved", id);
            }
        }
        FavoritesCommand::Remove { id } => {
            if !favorites.remove(&id)? {
                anyhow::bail!("No favorite with id {}", id);
            }
            println!("Removed favorite {}", id);
        }
        FavoritesCommand::Select { id } => {
            favorites.select(&id)?;
            println!("Favorite {} is now the base location", id);
        }
    }
    Ok(())
}

fn run_probe(file: PreferencesFile, package: String, samples: usize) {
    let bridge = ConfigBridge::new(Arc::new(file));
    let mut process = TargetProcess::new(package.clone(), bridge);
    let (decision, report) = process.start();

    println!("Package:  {}", package);
    println!("Decision: {:?}", decision);
    println!("Gate:     {:?}", process.gate_state());
    if let Some(report) = report {
        for (api, reason) in &report.failed {
            println!("Hook {} failed: {}", api, reason);
        }
    }

    // Stand-in for whatever the device itself would have reported
    let real = LocationRecord::new(0.0, 0.0).with_accuracy(20.0).stamped_now();
    for i in 0..samples {
        match process.query_location(LocationApi::LastKnownLocation, Some(real.clone())) {
            Some(loc) => println!(
                "#{:<3} {:.7}, {:.7}  alt={:?} acc={:?}",
                i + 1,
                loc.latitude,
                loc.longitude,
                loc.altitude,
                loc.accuracy
            ),
            None => println!("#{:<3} (no location)", i + 1),
        }
    }
    println!(
        "Provider gps enabled: {}",
        process.query_provider_enabled("gps", false)
    );
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let file = match args.prefs {
        Some(path) => PreferencesFile::new(path),
        None => PreferencesFile::at_default_location(),
    };
    let path = file.path().to_path_buf();

    let writer = Arc::new(PreferencesWriter::new(file.clone()));
    let settings = SettingsRepository::new(writer.clone());
    let favorites = FavoritesRepository::new(writer);

    match args.command {
        Command::Probe { package, samples } => run_probe(file, package, samples),
        Command::Start => {
            settings.set_playing(true)?;
            if settings.load()?.last_clicked_location.is_none() {
                warn!("No location set yet - hooked apps will see their real location until one is set");
            }
        }
        Command::Stop => settings.set_playing(false)?,
        Command::Status => print_status(&settings, &favorites, &path)?,
        Command::SetLocation {
            latitude,
            longitude,
            altitude,
        } => {
            let mut location = LocationRecord::new(latitude, longitude).stamped_now();
            location.altitude = altitude;
            settings.set_last_clicked_location(&location)?;
        }
        Command::Settings {
            use_accuracy,
            accuracy,
            use_altitude,
            altitude,
            use_randomize,
            randomize_radius,
        } => {
            // Parse everything before writing anything
            let update = SettingsUpdate {
                use_accuracy,
                accuracy: parse_field("accuracy", accuracy)?,
                use_altitude,
                altitude: parse_field("altitude", altitude)?,
                use_randomize,
                randomize_radius: parse_field("randomize radius", randomize_radius)?,
            };
            if update.is_empty() {
                warn!("No settings given, nothing changed");
            } else {
                settings.update(&update)?;
            }
        }
        Command::Favorites(command) => run_favorites(&favorites, command)?,
    }

    Ok(())
}
