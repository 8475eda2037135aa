use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use rand::seq::SliceRandom;
use tokio::fs;
use tracing::info;

use inspect_domain::Credential;

/// Searched in order when no accounts file is configured.
pub const FALLBACK_ACCOUNT_FILES: [&str; 3] = ["accounts.txt", "../accounts.txt", "/app/accounts.txt"];

pub struct AccountsFileRepository {
    configured: Option<PathBuf>,
}

impl AccountsFileRepository {
    pub fn new(configured: Option<&str>) -> Self {
        Self {
            configured: configured.map(PathBuf::from),
        }
    }

    fn candidates(&self) -> Vec<PathBuf> {
        match &self.configured {
            Some(path) => vec![path.clone()],
            None => FALLBACK_ACCOUNT_FILES.iter().map(PathBuf::from).collect(),
        }
    }

    /// Reads `username:password` lines from the first existing candidate and
    /// returns them shuffled. An empty or missing file is an error.
    pub async fn load(&self) -> Result<Vec<Credential>> {
        let path = self
            .candidates()
            .into_iter()
            .find(|candidate| Path::new(candidate).exists())
            .ok_or_else(|| anyhow!("no accounts file found"))?;
        let content = fs::read_to_string(&path).await?;
        let mut credentials = parse_credentials(&content);
        if credentials.is_empty() {
            return Err(anyhow!("accounts file {} has no accounts", path.display()));
        }
        credentials.shuffle(&mut rand::thread_rng());
        info!("loaded {} accounts from {}", credentials.len(), path.display());
        Ok(credentials)
    }
}

pub fn parse_credentials(content: &str) -> Vec<Credential> {
    content.lines().filter_map(Credential::parse).collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parse_skips_blank_and_malformed_lines() {
        let credentials = parse_credentials("bot_a:one\n\n  \nbroken\nbot_b:two:three\r\n");
        let names: Vec<&str> = credentials.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, vec!["bot_a", "bot_b"]);
        assert_eq!(credentials[1].password, "two:three");
    }

    #[tokio::test]
    async fn load_reads_configured_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "bot_a:one\nbot_b:two\nbot_c:three").expect("write");
        let repo = AccountsFileRepository::new(Some(&file.path().to_string_lossy()));
        let mut names: Vec<String> = repo
            .load()
            .await
            .expect("credentials")
            .into_iter()
            .map(|credential| credential.username)
            .collect();
        names.sort();
        assert_eq!(names, vec!["bot_a", "bot_b", "bot_c"]);
    }

    #[tokio::test]
    async fn empty_or_missing_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        let repo = AccountsFileRepository::new(Some(&file.path().to_string_lossy()));
        assert!(repo.load().await.is_err());

        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("accounts.txt");
        let repo = AccountsFileRepository::new(Some(&missing.to_string_lossy()));
        assert!(repo.load().await.is_err());
    }
}
