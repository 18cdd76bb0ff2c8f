//! State machine behind the files panel.
//!
//! Every remote call is split into a `begin_*` step, which validates the
//! request against the current state and hands out a ticket, and a
//! `complete_*` step, which applies the call's result to the state. The
//! completions only ever apply their own delta (replace, remove one, append
//! one), so they can land in any order.

use std::cmp::Ordering;

use log::{debug, error, info, warn};

use crate::selection::{RouteParams, Selection};
use crate::{Access, FetchRequest, FileEntry, FileHost, PanelError, UploadResponse};

/// Viewport widths below this get the stacked layout.
pub const LAYOUT_BREAKPOINT: u32 = 500;

pub type NameOrder = fn(&str, &str) -> Ordering;

/// Case-insensitive name ordering, used when no locale collation is available.
pub fn caseless_name_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// A file picked by the user and waiting to be uploaded.
pub trait StagedFile: Clone {
    fn file_name(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Stacked,
    Tabular,
}

impl Layout {
    pub fn for_width(width: u32) -> Self {
        if width < LAYOUT_BREAKPOINT {
            Layout::Stacked
        } else {
            Layout::Tabular
        }
    }
}

/// How a completion was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Failed,
    /// The state moved on since the call was issued; the result was dropped.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    pub request: FetchRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTicket {
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct UploadTicket<F> {
    pub file: F,
    pub file_name: String,
    pub selection: Selection,
}

impl<F> UploadTicket<F> {
    pub fn category(&self) -> &'static str {
        self.selection.category.label()
    }

    pub fn group_name(&self) -> &str {
        &self.selection.group_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub id: String,
    pub name: String,
    pub download_url: String,
    pub deletable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListView {
    Loading,
    Empty,
    Files(Vec<FileRow>),
}

#[derive(Debug, Clone)]
pub struct PanelState<F> {
    access: Access,
    host: FileHost,
    name_order: NameOrder,
    files: Vec<FileEntry>,
    loaded: bool,
    selection: Option<Selection>,
    generation: u64,
    pending_upload: Option<F>,
    uploading: bool,
    preview_target: Option<String>,
    preview_open: bool,
    viewport_width: u32,
    notice: Option<String>,
}

impl<F: StagedFile> PanelState<F> {
    pub fn new(access: Access, host: FileHost, viewport_width: u32) -> Self {
        Self {
            access,
            host,
            name_order: caseless_name_order,
            files: Vec::new(),
            loaded: false,
            selection: None,
            generation: 0,
            pending_upload: None,
            uploading: false,
            preview_target: None,
            preview_open: false,
            viewport_width,
            notice: None,
        }
    }

    pub fn with_name_order(mut self, order: NameOrder) -> Self {
        self.name_order = order;
        self
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn uploading(&self) -> bool {
        self.uploading
    }

    pub fn pending_upload(&self) -> Option<&F> {
        self.pending_upload.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    // Fetch

    /// Starts a fetch for the selection named by `params`.
    ///
    /// Returns `None` when the selection is unchanged since the last call or
    /// when it is incomplete. Files from the previous selection stay in place
    /// until the new response arrives.
    pub fn begin_fetch(&mut self, params: &RouteParams) -> Option<FetchTicket> {
        let selection = match params.selection() {
            Ok(selection) => selection,
            Err(err) => {
                warn!("Not fetching files: {err}");
                if self.selection.take().is_some() {
                    self.generation += 1;
                }
                return None;
            }
        };

        if self.selection.as_ref() == Some(&selection) {
            debug!("Selection unchanged, skipping fetch");
            return None;
        }

        self.generation += 1;
        let request = selection.fetch_request();
        info!(
            "Fetching files with category={} fileName={}",
            request.category, request.group_name
        );
        self.selection = Some(selection);
        Some(FetchTicket {
            generation: self.generation,
            request,
        })
    }

    /// Replaces the list with a fetch result. `Ok(None)` is an absent body.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Option<Vec<FileEntry>>, PanelError>,
    ) -> Completion {
        if ticket.generation != self.generation {
            debug!(
                "Dropping files for superseded selection {:?}",
                ticket.request
            );
            return Completion::Discarded;
        }

        match result {
            Ok(files) => {
                let files = files.unwrap_or_default();
                info!("Fetched {} files", files.len());
                self.files = dedup_by_id(files);
                self.loaded = true;
                self.notice = None;
                Completion::Applied
            }
            Err(err) => {
                error!("Error fetching files: {err}");
                self.notice = Some(format!("Could not load files: {err}"));
                Completion::Failed
            }
        }
    }

    // Delete

    pub fn begin_delete(&self, id: &str) -> Result<DeleteTicket, PanelError> {
        if !self.access.is_admin() {
            warn!("Refusing to delete {id}: read-only access");
            return Err(PanelError::ReadOnly);
        }
        info!("Deleting file with ID: {id}");
        Ok(DeleteTicket { id: id.to_string() })
    }

    pub fn complete_delete(
        &mut self,
        ticket: DeleteTicket,
        result: Result<String, PanelError>,
    ) -> Completion {
        match result {
            Ok(message) => {
                info!("Delete response: {message}");
                match self.files.iter().position(|f| f.id == ticket.id) {
                    Some(index) => {
                        self.files.remove(index);
                    }
                    None => debug!("Deleted file {} was not in the list", ticket.id),
                }
                self.notice = None;
                Completion::Applied
            }
            Err(err) => {
                error!("Error deleting file {}: {err}", ticket.id);
                self.notice = Some(format!("Could not delete file: {err}"));
                Completion::Failed
            }
        }
    }

    // Upload

    pub fn stage_upload(&mut self, file: Option<F>) {
        match &file {
            Some(file) => debug!("Staged {} for upload", file.file_name()),
            None => debug!("Cleared staged upload"),
        }
        self.pending_upload = file;
    }

    pub fn begin_upload(&mut self) -> Result<UploadTicket<F>, PanelError> {
        if !self.access.is_admin() {
            warn!("Refusing to upload: read-only access");
            return Err(PanelError::ReadOnly);
        }
        if self.uploading {
            warn!("Upload already in progress");
            return Err(PanelError::UploadInProgress);
        }
        let file = match &self.pending_upload {
            Some(file) => file.clone(),
            None => {
                error!("No file selected for upload.");
                return Err(PanelError::NothingStaged);
            }
        };
        let selection = match &self.selection {
            Some(selection) => selection.clone(),
            None => {
                error!("Not uploading: no file group selected");
                return Err(PanelError::MissingSelection { field: "groupName" });
            }
        };

        let file_name = file.file_name();
        info!(
            "Uploading {file_name} to {} / {}",
            selection.category, selection.group_name
        );
        self.uploading = true;
        Ok(UploadTicket {
            file,
            file_name,
            selection,
        })
    }

    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket<F>,
        result: Result<UploadResponse, PanelError>,
    ) -> Completion {
        self.uploading = false;
        self.pending_upload = None;

        let file_id = result.and_then(|response| {
            response
                .file_id
                .filter(|id| !id.is_empty())
                .ok_or(PanelError::MissingFileId)
        });
        let file_id = match file_id {
            Ok(file_id) => file_id,
            Err(err) => {
                error!("Error while uploading {}: {err}", ticket.file_name);
                self.notice = Some(format!("Could not upload {}: {err}", ticket.file_name));
                return Completion::Failed;
            }
        };
        self.notice = None;

        let current = self.selection.as_ref();
        if !current.is_some_and(|s| s.same_group(&ticket.selection)) {
            info!(
                "Uploaded {} as {file_id}, but the panel now shows another group",
                ticket.file_name
            );
            return Completion::Discarded;
        }

        if self.files.iter().any(|f| f.id == file_id) {
            debug!("File {file_id} already listed");
        } else {
            self.files.push(FileEntry {
                id: file_id,
                name: ticket.file_name,
            });
        }
        Completion::Applied
    }

    // Preview

    pub fn open_preview(&mut self, id: &str) {
        debug!("Viewing file: {id}");
        self.preview_target = Some(id.to_string());
        self.preview_open = true;
    }

    /// Closes the overlay. The target is kept until the next `open_preview`.
    pub fn close_preview(&mut self) {
        self.preview_open = false;
    }

    pub fn preview_open(&self) -> bool {
        self.preview_open
    }

    pub fn preview_url(&self) -> Option<String> {
        self.preview_target
            .as_deref()
            .map(|id| self.host.preview_url(id))
    }

    // Presentation

    pub fn set_viewport_width(&mut self, width: u32) {
        self.viewport_width = width;
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn layout(&self) -> Layout {
        Layout::for_width(self.viewport_width)
    }

    pub fn show_upload_controls(&self) -> bool {
        self.access.is_admin()
    }

    /// Rows in display order, both layouts sorted by name.
    pub fn list_view(&self) -> ListView {
        if !self.loaded {
            return ListView::Loading;
        }
        if self.files.is_empty() {
            return ListView::Empty;
        }

        let mut files: Vec<&FileEntry> = self.files.iter().collect();
        let order = self.name_order;
        files.sort_by(|a, b| order(&a.name, &b.name));

        let deletable = self.access.is_admin();
        ListView::Files(
            files
                .into_iter()
                .map(|f| FileRow {
                    id: f.id.clone(),
                    name: f.name.clone(),
                    download_url: self.host.download_url(&f.id),
                    deletable,
                })
                .collect(),
        )
    }
}

fn dedup_by_id(files: Vec<FileEntry>) -> Vec<FileEntry> {
    let mut unique: Vec<FileEntry> = Vec::with_capacity(files.len());
    for file in files {
        if unique.iter().any(|f| f.id == file.id) {
            warn!("Duplicate file id {} in listing, keeping the first", file.id);
            continue;
        }
        unique.push(file);
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Picked(&'static str);

    impl StagedFile for Picked {
        fn file_name(&self) -> String {
            self.0.to_string()
        }
    }

    fn entry(id: &str, name: &str) -> FileEntry {
        FileEntry {
            id: id.into(),
            name: name.into(),
        }
    }

    fn params() -> RouteParams {
        RouteParams::new("R21", "3", "2021_R1_DataStructures", "Question Papers")
    }

    fn loaded(access: Access, files: Vec<FileEntry>) -> PanelState<Picked> {
        let mut state = PanelState::new(access, FileHost::default(), 1024);
        let ticket = state.begin_fetch(&params()).unwrap();
        state.complete_fetch(ticket, Ok(Some(files)));
        state
    }

    fn ids(state: &PanelState<Picked>) -> Vec<&str> {
        state.files().iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn unchanged_selection_fetches_once() {
        let mut state: PanelState<Picked> = PanelState::new(Access::ReadOnly, FileHost::default(), 800);
        assert!(state.begin_fetch(&params()).is_some());
        assert!(state.begin_fetch(&params()).is_none());

        let mut other = params();
        other.semester = Some("4".into());
        assert!(state.begin_fetch(&other).is_some());
    }

    #[test]
    fn missing_group_skips_fetch() {
        let mut state: PanelState<Picked> = PanelState::new(Access::ReadOnly, FileHost::default(), 800);
        let mut incomplete = params();
        incomplete.group_name = None;
        assert!(state.begin_fetch(&incomplete).is_none());
        assert!(!state.loaded());
        assert_eq!(state.list_view(), ListView::Loading);
    }

    #[test]
    fn unknown_category_skips_fetch() {
        let mut state: PanelState<Picked> = PanelState::new(Access::ReadOnly, FileHost::default(), 800);
        let mut unknown = params();
        unknown.category = Some("Lab Manuals".into());
        assert!(state.begin_fetch(&unknown).is_none());
        assert!(state.selection().is_none());
        assert!(!state.loaded());
    }

    #[test]
    fn fetch_failure_keeps_loading() {
        let mut state: PanelState<Picked> = PanelState::new(Access::ReadOnly, FileHost::default(), 800);
        let ticket = state.begin_fetch(&params()).unwrap();
        let outcome = state.complete_fetch(ticket, Err(PanelError::Request("offline".into())));
        assert_eq!(outcome, Completion::Failed);
        assert!(!state.loaded());
        assert_eq!(state.list_view(), ListView::Loading);
        assert!(state.notice().unwrap().contains("offline"));
    }

    #[test]
    fn absent_body_is_empty_list() {
        let mut state: PanelState<Picked> = PanelState::new(Access::ReadOnly, FileHost::default(), 800);
        let ticket = state.begin_fetch(&params()).unwrap();
        assert_eq!(state.complete_fetch(ticket, Ok(None)), Completion::Applied);
        assert!(state.loaded());
        assert_eq!(state.list_view(), ListView::Empty);
    }

    #[test]
    fn superseded_fetch_is_dropped() {
        let mut state: PanelState<Picked> = PanelState::new(Access::ReadOnly, FileHost::default(), 800);
        let first = state.begin_fetch(&params()).unwrap();
        let mut next = params();
        next.category = Some("Notes".into());
        let second = state.begin_fetch(&next).unwrap();

        assert_eq!(
            state.complete_fetch(second, Ok(Some(vec![entry("n1", "Notes.pdf")]))),
            Completion::Applied
        );
        assert_eq!(
            state.complete_fetch(first, Ok(Some(vec![entry("q1", "Paper.pdf")]))),
            Completion::Discarded
        );
        assert_eq!(ids(&state), ["n1"]);
    }

    #[test]
    fn previous_files_stay_until_response() {
        let mut state = loaded(Access::ReadOnly, vec![entry("f1", "Unit1.pdf")]);
        let mut next = params();
        next.group_name = Some("2021_R1_Networks".into());
        let _ticket = state.begin_fetch(&next).unwrap();
        assert_eq!(ids(&state), ["f1"]);
        assert!(state.loaded());
    }

    #[test]
    fn duplicate_ids_in_listing_are_collapsed() {
        let state = loaded(
            Access::ReadOnly,
            vec![entry("f1", "A.pdf"), entry("f1", "B.pdf"), entry("f2", "C.pdf")],
        );
        assert_eq!(ids(&state), ["f1", "f2"]);
    }

    #[test]
    fn delete_removes_only_matching_entry() {
        let mut state = loaded(
            Access::Admin,
            vec![entry("a", "A"), entry("b", "B"), entry("c", "C")],
        );
        let ticket = state.begin_delete("b").unwrap();
        assert_eq!(
            state.complete_delete(ticket, Ok("File deleted".into())),
            Completion::Applied
        );
        assert_eq!(ids(&state), ["a", "c"]);
    }

    #[test]
    fn failed_delete_leaves_list() {
        let mut state = loaded(Access::Admin, vec![entry("a", "A"), entry("b", "B")]);
        let ticket = state.begin_delete("zzz").unwrap();
        let outcome = state.complete_delete(
            ticket,
            Err(PanelError::Status {
                status: 404,
                body: "not found".into(),
            }),
        );
        assert_eq!(outcome, Completion::Failed);
        assert_eq!(ids(&state), ["a", "b"]);
    }

    #[test]
    fn read_only_cannot_mutate() {
        let mut state = loaded(Access::ReadOnly, vec![entry("a", "A")]);
        assert_eq!(state.begin_delete("a"), Err(PanelError::ReadOnly));
        state.stage_upload(Some(Picked("x.pdf")));
        assert!(matches!(state.begin_upload(), Err(PanelError::ReadOnly)));
        assert!(!state.show_upload_controls());
        match state.list_view() {
            ListView::Files(rows) => assert!(rows.iter().all(|r| !r.deletable)),
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn upload_without_staged_file_is_noop() {
        let mut state = loaded(Access::Admin, vec![]);
        assert!(matches!(state.begin_upload(), Err(PanelError::NothingStaged)));
        assert!(!state.uploading());
    }

    #[test]
    fn upload_appends_returned_id_once() {
        let mut state = loaded(Access::Admin, vec![entry("a", "A.pdf")]);
        state.stage_upload(Some(Picked("Unit3.pdf")));
        let ticket = state.begin_upload().unwrap();
        assert!(state.uploading());
        assert!(matches!(state.begin_upload(), Err(PanelError::UploadInProgress)));

        let outcome = state.complete_upload(
            ticket,
            Ok(UploadResponse {
                file_id: Some("X".into()),
            }),
        );
        assert_eq!(outcome, Completion::Applied);
        assert!(!state.uploading());
        assert!(state.pending_upload().is_none());
        assert_eq!(state.files().last(), Some(&entry("X", "Unit3.pdf")));
        assert_eq!(state.files().len(), 2);
    }

    #[test]
    fn upload_without_file_id_changes_nothing() {
        let mut state = loaded(Access::Admin, vec![entry("a", "A.pdf")]);
        state.stage_upload(Some(Picked("Unit3.pdf")));
        let ticket = state.begin_upload().unwrap();
        let outcome = state.complete_upload(ticket, Ok(UploadResponse::default()));
        assert_eq!(outcome, Completion::Failed);
        assert_eq!(ids(&state), ["a"]);
        assert!(!state.uploading());
        assert!(state.pending_upload().is_none());
    }

    #[test]
    fn upload_for_previous_group_is_not_listed() {
        let mut state = loaded(Access::Admin, vec![]);
        state.stage_upload(Some(Picked("Unit3.pdf")));
        let ticket = state.begin_upload().unwrap();

        let mut next = params();
        next.category = Some("PPTs".into());
        let fetch = state.begin_fetch(&next).unwrap();
        state.complete_fetch(fetch, Ok(Some(vec![])));

        let outcome = state.complete_upload(
            ticket,
            Ok(UploadResponse {
                file_id: Some("X".into()),
            }),
        );
        assert_eq!(outcome, Completion::Discarded);
        assert!(state.files().is_empty());
    }

    #[test]
    fn delete_after_upload_removes_by_id() {
        let mut state = loaded(Access::Admin, vec![entry("a", "A.pdf")]);
        state.stage_upload(Some(Picked("B.pdf")));
        let upload = state.begin_upload().unwrap();
        let delete = state.begin_delete("a").unwrap();

        state.complete_upload(
            upload,
            Ok(UploadResponse {
                file_id: Some("b".into()),
            }),
        );
        state.complete_delete(delete, Ok("deleted".into()));
        assert_eq!(ids(&state), ["b"]);
    }

    #[test]
    fn layout_follows_breakpoint() {
        let mut state = loaded(Access::ReadOnly, vec![entry("a", "A")]);
        state.set_viewport_width(499);
        assert_eq!(state.layout(), Layout::Stacked);
        state.set_viewport_width(500);
        assert_eq!(state.layout(), Layout::Tabular);
        assert_eq!(ids(&state), ["a"]);
    }

    #[test]
    fn preview_keeps_target_after_close() {
        let mut state = loaded(Access::ReadOnly, vec![entry("f1", "A")]);
        assert_eq!(state.preview_url(), None);
        state.open_preview("f1");
        assert!(state.preview_open());
        assert_eq!(
            state.preview_url().as_deref(),
            Some("https://drive.google.com/file/d/f1/preview")
        );
        state.close_preview();
        assert!(!state.preview_open());
        assert!(state.preview_url().is_some());
    }

    #[test]
    fn rows_sorted_with_injected_order() {
        fn reverse(a: &str, b: &str) -> Ordering {
            b.cmp(a)
        }
        let state = loaded(Access::ReadOnly, vec![entry("1", "a"), entry("2", "b")])
            .with_name_order(reverse);
        match state.list_view() {
            ListView::Files(rows) => assert_eq!(rows[0].name, "b"),
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn caseless_order_ignores_case() {
        assert_eq!(caseless_name_order("apple", "Banana"), Ordering::Less);
        assert_eq!(caseless_name_order("B", "a"), Ordering::Greater);
    }
}
