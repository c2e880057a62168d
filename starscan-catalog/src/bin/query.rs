use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Instant;

use starscan_catalog::{
    CatalogScanner, CatalogStar, HttpTransport, ResourceLocator, StarScan,
};
use starscan_coords::{angular_separation, Angle, Coor};

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum CatalogKind {
    /// GSC 1.1 region files
    Gsc11,
    /// Compact zone catalog with proper motions
    ZoneCompact,
    /// USNO SA2.0 (single volume)
    UsnoSa20,
    /// USNO A2.0 (eleven volumes)
    UsnoA20,
    /// PPM text catalog
    Ppm,
    /// Remote minor-planet checker
    Remote,
}

#[derive(Parser)]
#[command(name = "query")]
#[command(about = "Cone searches over large star catalogs")]
struct Cli {
    /// Catalog locations, TOML; a missing file means nothing configured
    #[arg(long, default_value = "starscan.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the configured catalogs and whether their bases exist
    Info,
    /// Run a cone search
    Search {
        /// Catalog to scan
        #[arg(long, value_enum)]
        catalog: CatalogKind,
        /// Right ascension of the field center, degrees
        ra: f64,
        /// Declination of the field center, degrees
        #[arg(allow_negative_numbers = true)]
        dec: f64,
        /// Full field-of-view width, degrees
        #[arg(long, default_value = "1.0")]
        fov: f64,
        /// Drop records fainter than this magnitude
        #[arg(long, allow_negative_numbers = true)]
        mag_max: Option<f64>,
        /// Stop after this many records
        #[arg(long)]
        limit: Option<usize>,
        /// Observation date for the remote checker (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Print scan timing
        #[arg(long)]
        timing: bool,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Debug, Default, Deserialize)]
struct Config {
    #[serde(default)]
    gsc11: Vec<PathBuf>,
    #[serde(default)]
    zone_compact: Vec<PathBuf>,
    #[serde(default)]
    usno_sa20: Vec<PathBuf>,
    #[serde(default)]
    usno_a20: Vec<PathBuf>,
    #[serde(default)]
    ppm: Vec<PathBuf>,
    #[serde(default)]
    remote: RemoteConfig,
}

#[derive(Debug, Deserialize)]
struct RemoteConfig {
    #[serde(default = "default_remote_url")]
    url: String,
    /// Largest request radius the service accepts, arcminutes.
    #[serde(default = "default_remote_radius")]
    max_radius_arcmin: f64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: default_remote_url(),
            max_radius_arcmin: default_remote_radius(),
        }
    }
}

fn default_remote_url() -> String {
    "https://www.minorplanetcenter.net/cgi-bin/mpcheck.cgi".to_string()
}

fn default_remote_radius() -> f64 {
    300.0
}

impl Config {
    fn load(path: &PathBuf) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    fn catalogs(&self) -> [(&'static str, &Vec<PathBuf>); 5] {
        [
            ("gsc11", &self.gsc11),
            ("zone-compact", &self.zone_compact),
            ("usno-sa20", &self.usno_sa20),
            ("usno-a20", &self.usno_a20),
            ("ppm", &self.ppm),
        ]
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Info => {
            for (name, bases) in config.catalogs() {
                println!("{:<14} {} base(s)", name, bases.len());
                for base in bases {
                    let mark = if base.is_dir() { "ok      " } else { "missing " };
                    println!("    {}{}", mark, base.display());
                }
            }
            println!(
                "{:<14} {} (max radius {}')",
                "remote", config.remote.url, config.remote.max_radius_arcmin
            );
        }
        Commands::Search {
            catalog,
            ra,
            dec,
            fov,
            mag_max,
            limit,
            date,
            timing,
            format,
        } => {
            let date = date.unwrap_or_else(|| chrono::Utc::now().date_naive());
            let mut scanner = build_scanner(catalog, &config, date)?;
            scanner.set_magnitude_ceiling(mag_max);

            let center = Coor::from_degrees(ra, dec)?;
            let start = Instant::now();
            let stars = run_scan(&mut scanner, center, Angle::from_degrees(fov), limit)?;
            if timing {
                eprintln!(
                    "Scan completed in {:.2} ms",
                    start.elapsed().as_secs_f64() * 1000.0
                );
            }

            match format {
                OutputFormat::Table => print_table(&center, &stars),
                OutputFormat::Json => print_json(&center, &stars)?,
                OutputFormat::Csv => print_csv(&center, &stars),
            }
        }
    }

    Ok(())
}

fn build_scanner(
    kind: CatalogKind,
    config: &Config,
    date: NaiveDate,
) -> anyhow::Result<CatalogScanner> {
    let locator = |bases: &Vec<PathBuf>, name: &str| -> anyhow::Result<ResourceLocator> {
        if bases.is_empty() {
            anyhow::bail!("no base directories configured for {name}");
        }
        Ok(bases.iter().collect())
    };

    Ok(match kind {
        CatalogKind::Gsc11 => CatalogScanner::gsc11(locator(&config.gsc11, "gsc11")?),
        CatalogKind::ZoneCompact => {
            CatalogScanner::zone_compact(locator(&config.zone_compact, "zone-compact")?)
        }
        CatalogKind::UsnoSa20 => {
            CatalogScanner::usno_sa20(locator(&config.usno_sa20, "usno-sa20")?)
        }
        CatalogKind::UsnoA20 => CatalogScanner::usno_a20(locator(&config.usno_a20, "usno-a20")?),
        CatalogKind::Ppm => CatalogScanner::ppm(locator(&config.ppm, "ppm")?),
        CatalogKind::Remote => {
            let transport = HttpTransport::new(config.remote.url.clone())?;
            CatalogScanner::remote(
                "MPCheck",
                Box::new(transport),
                Angle::from_arcminutes(config.remote.max_radius_arcmin),
                date,
            )
        }
    })
}

fn run_scan(
    scanner: &mut CatalogScanner,
    center: Coor,
    fov: Angle,
    limit: Option<usize>,
) -> anyhow::Result<Vec<CatalogStar>> {
    scanner.open(center, fov).context("open failed")?;
    let mut stars = Vec::new();
    loop {
        match scanner.read_next() {
            Ok(Some(star)) => {
                stars.push(star);
                if limit.is_some_and(|n| stars.len() >= n) {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                let _ = scanner.close();
                return Err(err).context("scan aborted");
            }
        }
    }
    scanner.close().context("close failed")?;
    Ok(stars)
}

fn print_table(center: &Coor, stars: &[CatalogStar]) {
    for (i, star) in stars.iter().enumerate() {
        let dist = angular_separation(center, &star.coor).degrees();
        println!(
            "{:4}: {:<20} RA={:10.6}° Dec={:+10.6}° Mag={} Dist={:.4}°",
            i + 1,
            star.name,
            star.coor.ra().degrees(),
            star.coor.dec().degrees(),
            fmt_mag(star.filter_mag()),
            dist
        );
    }

    if stars.is_empty() {
        println!("No records found.");
    } else {
        println!("\nTotal results: {}", stars.len());
    }
}

fn fmt_mag(mag: Option<f64>) -> String {
    match mag {
        Some(m) => format!("{:5.2}", m),
        None => "   --".to_string(),
    }
}

#[derive(serde::Serialize)]
struct JsonStar<'a> {
    name: &'a str,
    ra_deg: f64,
    dec_deg: f64,
    mag: Option<f64>,
    blue_mag: Option<f64>,
    red_mag: Option<f64>,
    distance_deg: f64,
}

fn print_json(center: &Coor, stars: &[CatalogStar]) -> anyhow::Result<()> {
    let rows: Vec<JsonStar> = stars
        .iter()
        .map(|s| JsonStar {
            name: &s.name,
            ra_deg: s.coor.ra().degrees(),
            dec_deg: s.coor.dec().degrees(),
            mag: s.mag,
            blue_mag: s.blue_mag,
            red_mag: s.red_mag,
            distance_deg: angular_separation(center, &s.coor).degrees(),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn print_csv(center: &Coor, stars: &[CatalogStar]) {
    println!("name,ra_deg,dec_deg,mag,distance_deg");
    for s in stars {
        println!(
            "{},{},{},{},{}",
            s.name,
            s.coor.ra().degrees(),
            s.coor.dec().degrees(),
            s.filter_mag().map(|m| m.to_string()).unwrap_or_default(),
            angular_separation(center, &s.coor).degrees()
        );
    }
}
