use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::{PersistenceError, Result, WalletList};

/// Append-only wallet files in a single output directory.
///
/// One wallet address per line. Files only ever grow during a run; a
/// [`WalletStore::dedup`] rewrite collapses repeats before a file is read back.
#[derive(Debug, Clone)]
pub struct WalletStore {
    outputs_dir: PathBuf,
}

impl WalletStore {
    /// Creates the directory if needed
    pub async fn open(outputs_dir: impl Into<PathBuf>) -> Result<Self> {
        let outputs_dir = outputs_dir.into();
        fs::create_dir_all(&outputs_dir)
            .await
            .map_err(|e| PersistenceError::io(&outputs_dir, e))?;
        debug!("Wallet store at {}", outputs_dir.display());
        Ok(Self { outputs_dir })
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    pub fn path(&self, list: WalletList) -> PathBuf {
        self.outputs_dir.join(list.file_name())
    }

    pub async fn append_wallet(&self, list: WalletList, wallet: &str) -> Result<()> {
        self.append_wallets(list, &[wallet.to_string()]).await
    }

    pub async fn append_wallets(&self, list: WalletList, wallets: &[String]) -> Result<()> {
        if wallets.is_empty() {
            return Ok(());
        }

        let path = self.path(list);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| PersistenceError::io(&path, e))?;

        let mut buffer = String::new();
        for wallet in wallets {
            buffer.push_str(wallet.trim());
            buffer.push('\n');
        }
        file.write_all(buffer.as_bytes())
            .await
            .map_err(|e| PersistenceError::io(&path, e))?;
        file.flush().await.map_err(|e| PersistenceError::io(&path, e))?;

        debug!("Appended {} wallets to {} list", wallets.len(), list);
        Ok(())
    }

    /// Lines of the file, blanks dropped. A missing file is an empty list.
    pub async fn read_wallets(&self, list: WalletList) -> Result<Vec<String>> {
        let path = self.path(list);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistenceError::io(&path, e)),
        };

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Rewrites the file with each wallet once, in first-seen order, and
    /// returns the unique wallets.
    pub async fn dedup(&self, list: WalletList) -> Result<Vec<String>> {
        let wallets = self.read_wallets(list).await?;
        let total = wallets.len();

        let mut seen = HashSet::with_capacity(total);
        let unique: Vec<String> = wallets
            .into_iter()
            .filter(|wallet| seen.insert(wallet.clone()))
            .collect();

        let path = self.path(list);
        let staging = path.with_extension("txt.tmp");
        let mut contents = unique.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        fs::write(&staging, contents)
            .await
            .map_err(|e| PersistenceError::io(&staging, e))?;
        fs::rename(&staging, &path)
            .await
            .map_err(|e| PersistenceError::io(&path, e))?;

        info!(
            "🧹 {} list: {} lines, {} unique wallets",
            list,
            total,
            unique.len()
        );
        Ok(unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("outputs").join("run");

        let store = WalletStore::open(&nested).await.unwrap();

        assert!(nested.is_dir());
        assert_eq!(
            store.path(WalletList::Qualified),
            nested.join("profitable_and_winning_and_not_sniping_wallets.txt")
        );
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::open(dir.path()).await.unwrap();

        assert!(store.read_wallets(WalletList::Profitable).await.unwrap().is_empty());
        assert!(store.dedup(WalletList::Profitable).await.unwrap().is_empty());
    }
}
