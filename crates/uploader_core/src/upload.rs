use std::collections::VecDeque;
use std::path::PathBuf;

use url::Url;

pub const CSV_MIME: &str = "text/csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Path(PathBuf),
    Inline(Vec<u8>),
}

/// A file picked by the user (or synthesised from a Sheet export) waiting
/// to be posted to an upload URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub source: FileSource,
}

impl UploadFile {
    pub fn csv(name: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content_type: CSV_MIME.to_string(),
            source: FileSource::Inline(body.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Feed,
    Asset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueRejection {
    WrongType,
    QueueFull,
}

/// Sequential upload queue. One item is active at a time; items leave the
/// queue once their upload finishes, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadQueue {
    csv_only: bool,
    limit: Option<usize>,
    pending: VecDeque<UploadFile>,
    active: Option<UploadFile>,
}

impl UploadQueue {
    /// Feed uploader: a single CSV.
    pub fn feed() -> Self {
        Self {
            csv_only: true,
            limit: Some(1),
            pending: VecDeque::new(),
            active: None,
        }
    }

    pub fn assets() -> Self {
        Self {
            csv_only: false,
            limit: None,
            pending: VecDeque::new(),
            active: None,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len() + usize::from(self.active.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active(&self) -> Option<&UploadFile> {
        self.active.as_ref()
    }

    pub fn try_enqueue(&mut self, file: UploadFile) -> Result<(), EnqueueRejection> {
        if self.csv_only && !is_csv(&file.content_type) {
            return Err(EnqueueRejection::WrongType);
        }
        if self.limit.is_some_and(|limit| self.len() >= limit) {
            return Err(EnqueueRejection::QueueFull);
        }
        self.pending.push_back(file);
        Ok(())
    }

    /// Promotes the next pending item when nothing is uploading.
    pub fn start_next(&mut self) -> Option<UploadFile> {
        if self.active.is_some() {
            return None;
        }
        self.active = self.pending.pop_front();
        self.active.clone()
    }

    /// Retires the active item. Returns true when the batch is complete.
    pub fn finish_active(&mut self) -> bool {
        self.active = None;
        self.pending.is_empty()
    }
}

fn is_csv(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|ct| ct.eq_ignore_ascii_case(CSV_MIME))
}

/// Pulls the spreadsheet id out of a Google Sheets URL such as
/// `https://docs.google.com/spreadsheets/d/<id>/edit#gid=0`.
pub fn sheet_id_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?;
    if !host.ends_with(".google.com") {
        return None;
    }
    let segments: Vec<&str> = url.path_segments()?.collect();
    let at = segments.iter().position(|s| *s == "d")?;
    // The id must be followed by another path segment.
    let id = segments.get(at + 1)?;
    segments.get(at + 2)?;
    (!id.is_empty()).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: &str) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            content_type: content_type.to_string(),
            source: FileSource::Path(PathBuf::from(name)),
        }
    }

    #[test]
    fn feed_queue_accepts_one_csv() {
        let mut queue = UploadQueue::feed();
        assert_eq!(
            queue.try_enqueue(file("a.png", "image/png")),
            Err(EnqueueRejection::WrongType)
        );
        assert!(queue.is_empty());
        queue.try_enqueue(file("a.csv", "text/csv")).unwrap();
        assert_eq!(
            queue.try_enqueue(file("b.csv", "text/csv; charset=utf-8")),
            Err(EnqueueRejection::QueueFull)
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn asset_queue_runs_items_in_order() {
        let mut queue = UploadQueue::assets();
        queue.try_enqueue(file("1.png", "image/png")).unwrap();
        queue.try_enqueue(file("2.jpg", "image/jpeg")).unwrap();

        assert_eq!(queue.start_next().unwrap().name, "1.png");
        assert!(queue.start_next().is_none());
        assert!(!queue.finish_active());
        assert_eq!(queue.start_next().unwrap().name, "2.jpg");
        assert!(queue.finish_active());
        assert!(queue.is_empty());
    }

    #[test]
    fn sheet_urls() {
        assert_eq!(
            sheet_id_from_url("https://docs.google.com/spreadsheets/d/1AbC_x/edit#gid=0"),
            Some("1AbC_x".to_string())
        );
        assert_eq!(
            sheet_id_from_url("  http://docs.google.com/spreadsheets/d/xyz/  "),
            Some("xyz".to_string())
        );
        assert_eq!(sheet_id_from_url("https://docs.google.com/spreadsheets/d/xyz"), None);
        assert_eq!(sheet_id_from_url("https://example.com/spreadsheets/d/xyz/edit"), None);
        assert_eq!(sheet_id_from_url("not a url"), None);
    }
}
