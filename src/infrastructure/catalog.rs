use crate::domain::errors::AppError;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const CATALOG_NAME: &str = "xeno-canto";

/// Shortest pause allowed between two downloads.
pub const MIN_WAIT: Duration = Duration::from_secs(1);

/// One catalog entry, normalised to lowercase, with the local file name it
/// is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub id: String,
    pub genus: String,
    pub species: String,
    pub subspecies: String,
    pub url: String,
    pub audio_type: String,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
struct RawRecording {
    id: String,
    #[serde(rename = "gen")]
    genus: String,
    #[serde(rename = "sp")]
    species: String,
    #[serde(rename = "ssp")]
    subspecies: String,
    #[serde(rename = "file")]
    url: String,
    #[serde(rename = "file-name")]
    file_name: String,
}

impl Recording {
    /// Builds a recording from one element of the catalog's `recordings`
    /// array. Missing fields are an error.
    pub fn from_json(value: Value) -> Result<Self, AppError> {
        let raw: RawRecording = serde_json::from_value(value)?;
        let audio_type = Path::new(&raw.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_lowercase();
        let filename = format!(
            "{}_{}_{}_{}.{}",
            raw.genus, raw.species, raw.subspecies, raw.id, audio_type
        )
        .to_lowercase();

        Ok(Recording {
            id: raw.id,
            genus: raw.genus.to_lowercase(),
            species: raw.species.to_lowercase(),
            subspecies: raw.subspecies.to_lowercase(),
            url: raw.url,
            audio_type,
            filename,
        })
    }
}

/// Converts a catalog response into recordings, dropping malformed entries.
/// A response without a `recordings` array yields nothing.
pub fn parse_recordings(response: Value) -> Vec<Recording> {
    let Value::Object(mut body) = response else {
        return Vec::new();
    };
    let Some(Value::Array(entries)) = body.remove("recordings") else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| match Recording::from_json(entry) {
            Ok(recording) => Some(recording),
            Err(err) => {
                debug!("dropping catalog entry: {err}");
                None
            }
        })
        .collect()
}

/// Query URL for every recording of one subspecies.
pub fn recordings_url(endpoint: &str, genus: &str, subspecies: &str) -> Result<Url, AppError> {
    let query = format!("ssp:\"{subspecies}\" gen:\"{genus}\"");
    Url::parse_with_params(
        &format!("{}/recordings", endpoint.trim_end_matches('/')),
        &[("query", query)],
    )
    .map_err(|e| AppError::Catalog(format!("bad endpoint {endpoint}: {e}")))
}

pub trait CatalogApi {
    fn fetch_json(&self, url: &str) -> Result<Value, AppError>;
}

pub trait Downloader {
    /// Stores the resource at `url` under `path` and returns where it landed.
    fn download(&self, url: &str, path: &Path) -> Result<PathBuf, AppError>;

    fn pause(&self, wait: Duration) {
        thread::sleep(wait);
    }
}

/// Blocking HTTP client for the catalog API and its audio files.
pub struct HttpCatalog {
    client: Client,
}

impl HttpCatalog {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("birdclips/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpCatalog { client })
    }
}

impl CatalogApi for HttpCatalog {
    fn fetch_json(&self, url: &str) -> Result<Value, AppError> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.json()?)
    }
}

impl Downloader for HttpCatalog {
    fn download(&self, url: &str, path: &Path) -> Result<PathBuf, AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut response = self.client.get(url).send()?.error_for_status()?;

        // Only complete downloads carry the final name.
        let mut partial = path.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);
        let mut file = File::create(&partial)?;
        response.copy_to(&mut file)?;
        drop(file);
        fs::rename(&partial, path)?;

        Ok(path.to_path_buf())
    }
}

pub fn get_recordings_list<A>(
    api: &A,
    endpoint: &str,
    genus: &str,
    subspecies: &str,
) -> Result<Vec<Recording>, AppError>
where
    A: CatalogApi + ?Sized,
{
    let url = recordings_url(endpoint, genus, subspecies)?;
    debug!(%url, "querying {CATALOG_NAME}");
    let recordings = parse_recordings(api.fetch_json(url.as_str())?);
    if recordings.is_empty() {
        warn!(genus, subspecies, "no recordings found on {CATALOG_NAME}");
    }
    Ok(recordings)
}

/// Downloads up to `limit` recordings (0 means all) into `output_dir`.
///
/// Files already present are kept unless `force` is set, and `wait` is
/// slept after every real download. Returns the path of each considered
/// recording by id, together with how many were actually downloaded.
pub fn download_recordings<D>(
    recordings: &[Recording],
    output_dir: &Path,
    limit: usize,
    wait: Duration,
    force: bool,
    downloader: &D,
) -> Result<(HashMap<String, PathBuf>, usize), AppError>
where
    D: Downloader + ?Sized,
{
    if wait < MIN_WAIT {
        return Err(AppError::InvalidWait(wait));
    }

    let take = if limit > 0 { limit } else { recordings.len() };
    fs::create_dir_all(output_dir)?;

    let mut paths = HashMap::new();
    let mut downloaded = 0;
    for recording in recordings.iter().take(take) {
        let target = output_dir.join(&recording.filename);
        let path = if force || !target.is_file() {
            let path = downloader.download(&recording.url, &target)?;
            downloaded += 1;
            info!(id = %recording.id, path = %path.display(), "downloaded recording");
            downloader.pause(wait);
            path
        } else {
            debug!(id = %recording.id, "already downloaded");
            target
        };
        paths.insert(recording.id.clone(), path);
    }

    Ok((paths, downloaded))
}
