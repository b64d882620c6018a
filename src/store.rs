use crate::error::Result;
use crate::types::{LogRow, ResultRecord, LOG_HEADER};
use crate::utils::iso_to_epoch;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::task;

/// Append-only CSV file holding every completed run.
pub struct LogStore {
    path: PathBuf,
}

impl LogStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with its header row if it does not exist yet.
    pub async fn ensure_initialized(&self) -> Result<()> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(LOG_HEADER)?;
        file.write_all(&finish(wtr)?).await?;
        file.flush().await?;
        tracing::debug!("Created log file {:?}", self.path);
        Ok(())
    }

    /// Append one row; earlier content is never touched.
    pub async fn append(&self, record: &ResultRecord) -> Result<()> {
        let row = LogRow::from_record(record)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        wtr.serialize(&row)?;
        let line = finish(wtr)?;

        // flock blocks, so open and lock off the runtime thread.
        let path = self.path.clone();
        let locked = task::spawn_blocking(move || -> std::io::Result<std::fs::File> {
            let file = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)?;
            lock_exclusive(&file)?;
            Ok(file)
        })
        .await
        .map_err(|e| std::io::Error::new(ErrorKind::Other, e))??;

        let mut file = File::from_std(locked);
        file.write_all(&line).await?;
        file.flush().await?;
        tracing::debug!("Appended run at {} to {:?}", row.timestamp, self.path);
        Ok(())
    }

    /// Every row after the header. One bad row fails the whole read.
    pub async fn read_all(&self) -> Result<Vec<LogRow>> {
        let content = fs::read(&self.path).await?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(content.as_slice());

        let mut rows = Vec::new();
        for row in rdr.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Remove all history, leaving a header-only file behind.
    pub async fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!("Deleted log file {:?}", self.path);
        self.ensure_initialized().await
    }
}

impl LogRow {
    /// Column layout of a canonical record; the ISO timestamp becomes epoch seconds.
    pub fn from_record(record: &ResultRecord) -> Result<Self> {
        Ok(Self {
            timestamp: iso_to_epoch(&record.timestamp)?,
            client_ip: record.client_ip.clone(),
            server_id: record.server_id.to_string(),
            server_name: record.server_name.clone(),
            country: record.country.clone(),
            download: record.download,
            upload: record.upload,
            latency: record.latency,
            link: record.link.clone(),
        })
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    wtr.into_inner()
        .map_err(|e| std::io::Error::new(ErrorKind::Other, e.to_string()).into())
}

/// Advisory lock, released when the file is closed.
#[cfg(unix)]
fn lock_exclusive(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpeedtestError;
    use crate::types::ServerId;
    use tempfile::tempdir;

    fn record(timestamp: &str, download: f64) -> ResultRecord {
        ResultRecord {
            timestamp: timestamp.to_string(),
            client_ip: "203.0.113.7".to_string(),
            server_id: ServerId::Number(4087),
            server_name: "Example Telecom, Ljubljana".to_string(),
            country: "Slovenia".to_string(),
            latency: 3.46,
            download,
            upload: 20.0,
            link: "https://www.speedtest.net/result/c/abc-123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ensure_initialized_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("speedtest.csv");
        let store = LogStore::new(&path);

        store.ensure_initialized().await?;
        store.ensure_initialized().await?;

        let content = fs::read_to_string(&path).await?;
        assert_eq!(
            content,
            "Timestamp,ClientIp,ServerId,ServerName,Country,DlSpeed,UlSpeed,Latency,Link\n"
        );
        assert!(store.read_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_append_and_read_back() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("speedtest.csv");
        let store = LogStore::new(&path);
        store.ensure_initialized().await?;

        store.append(&record("2021-05-01T12:00:00Z", 1000.0)).await?;
        store.append(&record("2021-05-02T12:00:00Z", 512.25)).await?;

        let rows = store.read_all().await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            LogRow {
                timestamp: 1_619_870_400.0,
                client_ip: "203.0.113.7".to_string(),
                server_id: "4087".to_string(),
                server_name: "Example Telecom, Ljubljana".to_string(),
                country: "Slovenia".to_string(),
                download: 1000.0,
                upload: 20.0,
                latency: 3.46,
                link: "https://www.speedtest.net/result/c/abc-123".to_string(),
            }
        );
        assert_eq!(rows[1].download, 512.25);

        // the comma in the server name is quoted, not split
        let content = fs::read_to_string(&path).await?;
        assert!(content.contains("\"Example Telecom, Ljubljana\""));
        Ok(())
    }

    #[tokio::test]
    async fn test_reads_python_style_rows() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("speedtest.csv");
        fs::write(
            &path,
            "Timestamp,ClientIp,ServerId,ServerName,Country,DlSpeed,UlSpeed,Latency,Link\r\n\
             1619870400.0,203.0.113.7,4087,\"Example Telecom, Ljubljana\",Slovenia,50.0,9.88,12.35,\r\n",
        )
        .await?;

        let rows = LogStore::new(&path).read_all().await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].download, 50.0);
        assert_eq!(rows[0].link, "");
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_numeric_fails_whole_read() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("speedtest.csv");
        let store = LogStore::new(&path);
        store.ensure_initialized().await?;
        store.append(&record("2021-05-01T12:00:00Z", 1000.0)).await?;

        let mut file = OpenOptions::new().append(true).open(&path).await?;
        file.write_all(b"1619870500.0,1.2.3.4,1,x,y,fast,1.0,1.0,\n").await?;
        file.flush().await?;

        match store.read_all().await {
            Err(SpeedtestError::Csv(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() -> Result<()> {
        let dir = tempdir()?;
        let store = LogStore::new(&dir.path().join("nope").join("speedtest.csv"));
        match store.ensure_initialized().await {
            Err(SpeedtestError::Io(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_stay_line_intact() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("speedtest.csv");
        let store = std::sync::Arc::new(LogStore::new(&path));
        store.ensure_initialized().await?;

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(&record("2021-05-01T12:00:00Z", i as f64)).await
            }));
        }
        for handle in handles {
            handle.await.expect("append task panicked")?;
        }

        let rows = store.read_all().await?;
        assert_eq!(rows.len(), 20);
        let mut speeds: Vec<f64> = rows.iter().map(|r| r.download).collect();
        speeds.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(speeds, (0..20).map(|i| i as f64).collect::<Vec<_>>());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_leaves_header() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("speedtest.csv");
        let store = LogStore::new(&path);
        store.ensure_initialized().await?;
        store.append(&record("2021-05-01T12:00:00Z", 1000.0)).await?;

        store.delete().await?;
        assert!(store.read_all().await?.is_empty());
        assert!(store.path().exists());
        Ok(())
    }
}
