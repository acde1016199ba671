use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::process;

use contentstore_lib::{Record, ResourceName};
use serde_json::Value;

use crate::server::config::ContentServerConfig;
use crate::server::content::ContentStore;
use crate::server::store::{open_backend, StoreError};

const INIT_CONFIG: &str = r#"[server]
port = 8080
hostname = "0.0.0.0"
content_dir = "./data"
storage = "file"

[content]
languages = ["en", "fr", "es", "nl"]
fallback_language = "en"
default_language = "en"
public_resources = ["hero", "products", "blog", "testimonials", "faq", "projects"]

[admin]
# Leave empty to disable admin authentication.
tokens = []

[forms]
notifier = "log"
recipient = "sales@example.com"
"#;

/// A content file that the server would read as an empty list.
#[derive(Debug, PartialEq)]
pub struct FileIssue {
    pub file: PathBuf,
    pub problem: String,
}

fn check_file(path: &Path, bytes: &[u8]) -> Option<String> {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if let Err(e) = ResourceName::parse(stem) {
        return Some(format!("file name is not a resource name ({})", e));
    }
    let value: Value = match serde_json::from_slice(bytes) {
        Ok(v) => v,
        Err(e) => return Some(format!("invalid JSON: {}", e)),
    };
    let Value::Array(entries) = value else {
        return Some("top level is not an array".to_string());
    };
    entries
        .iter()
        .position(|entry| !entry.is_object())
        .map(|i| format!("entry {} is not an object", i))
}

/// Inspect every `*.json` file in `dir`. Returns the number of healthy files
/// and the issues found in the others.
pub fn scan_content_dir(dir: &Path) -> io::Result<(usize, Vec<FileIssue>)> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut healthy = 0;
    let mut issues = Vec::new();
    for path in paths {
        let bytes = std::fs::read(&path)?;
        match check_file(&path, &bytes) {
            Some(problem) => issues.push(FileIssue { file: path, problem }),
            None => healthy += 1,
        }
    }
    Ok((healthy, issues))
}

/// Create the content root, an empty list for every public resource that has
/// no file yet, and a starter config. Returns the files created.
pub fn init_content(content_dir: &Path, config_path: &Path) -> io::Result<Vec<PathBuf>> {
    if config_path.exists() {
        return Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} already exists", config_path.display()),
        ));
    }

    std::fs::create_dir_all(content_dir)?;
    let mut created = Vec::new();
    for resource in ContentServerConfig::default().content.public_resources {
        let path = content_dir.join(format!("{}.json", resource));
        if path.exists() {
            continue;
        }
        std::fs::write(&path, "[]")?;
        created.push(path);
    }

    let config = INIT_CONFIG.replace(
        "content_dir = \"./data\"",
        &format!("content_dir = {:?}", content_dir.display().to_string()),
    );
    std::fs::write(config_path, config)?;
    created.push(config_path.to_path_buf());
    Ok(created)
}

pub fn run_init(content_dir: &str, config_path: &str) {
    match init_content(Path::new(content_dir), Path::new(config_path)) {
        Ok(created) => {
            for path in created {
                println!("Created {}", path.display());
            }
        }
        Err(e) => {
            eprintln!("Init failed: {}", e);
            process::exit(1);
        }
    }
}

/// Read a resource through the configured backend and localize it with the
/// configured languages. `lang` falls back to the default language.
pub async fn localized_records(
    config: &ContentServerConfig,
    resource: &ResourceName,
    lang: Option<&str>,
) -> Result<Vec<Record>, StoreError> {
    let store = ContentStore::new(open_backend(&config.server)?);
    let records = store.read(resource).await;
    let lang = lang
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(&config.content.default_language);
    Ok(config.content.localizer().localize_all(&records, lang))
}

pub async fn run_list(
    resource: &str,
    lang: Option<&str>,
    content_dir: Option<String>,
    config_path: &str,
) {
    let resource = ResourceName::parse(resource).unwrap_or_else(|e| {
        eprintln!("Invalid resource name: {}", e);
        process::exit(1);
    });

    // File < env vars < command line, as for serve
    let mut config = ContentServerConfig::load(config_path);
    config.apply_env_overrides();
    if let Some(dir) = content_dir {
        config.server.content_dir = dir;
    }
    if !Path::new(&config.server.content_dir).is_dir() {
        eprintln!("{} does not exist", config.server.content_dir);
        process::exit(1);
    }

    let localized = localized_records(&config, &resource, lang)
        .await
        .unwrap_or_else(|e| {
            eprintln!("{}", e);
            process::exit(1);
        });
    match serde_json::to_string_pretty(&localized) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to render {}: {}", resource, e);
            process::exit(1);
        }
    }
}

pub fn run_validate(content_dir: &str) {
    let (healthy, issues) = match scan_content_dir(Path::new(content_dir)) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Cannot read {}: {}", content_dir, e);
            process::exit(1);
        }
    };

    for issue in &issues {
        eprintln!("{}: {}", issue.file.display(), issue.problem);
    }
    println!("{} ok, {} with problems", healthy, issues.len());
    if !issues.is_empty() {
        process::exit(1);
    }
}
