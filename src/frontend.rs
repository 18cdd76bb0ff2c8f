use std::cmp::Ordering;

use leptos::*;
use leptos_dom::helpers::window_event_listener;
use leptos_meta::{provide_meta_context, Title};
use leptos_router::{use_params_map, ParamsMap, Route, Router, Routes};
use wasm_bindgen::prelude::*;
use gloo_net::http::{Request, Response};
use gloo_file::{File, FileList};
use web_sys::{Event, FormData};

use crate::panel::{Completion, FileRow, Layout, ListView, PanelState, StagedFile, UploadTicket, LAYOUT_BREAKPOINT};
use crate::selection::PathHeader;
use crate::{DeleteResponse, FetchRequest, FileEntry, FileHost, PanelConfig, PanelError, RouteParams, UploadResponse};

type Panel = RwSignal<PanelState<File>>;

impl StagedFile for File {
    fn file_name(&self) -> String {
        self.name()
    }
}

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();
    let (config, set_config) = create_signal(None::<PanelConfig>);

    // Load runtime configuration once on mount
    create_effect(move |_| {
        spawn_local(async move {
            let loaded = load_config().await;
            if loaded.debug {
                log::set_max_level(log::LevelFilter::Debug);
            }
            set_config.set(Some(loaded));
        });
    });

    let panel_view = move || {
        view! { <FilesPanel config=config.get_untracked().unwrap_or_default() /> }
    };

    view! {
        <StyleProvider />
        <Show
            when=move || config.with(Option::is_some)
            fallback=|| view! { <p class="placeholder">"Loading..."</p> }
        >
            <Router>
                <main>
                    <Routes>
                        <Route path="/:regulation/:semester/:group_name/:category" view=panel_view />
                        <Route path="/:regulation/:semester/:group_name" view=panel_view />
                        <Route path="/*any" view=NoSelection />
                    </Routes>
                </main>
            </Router>
        </Show>
    }
}

#[component]
fn NoSelection() -> impl IntoView {
    view! {
        <div class="navigations">
            <p class="placeholder">
                "Open /<regulation>/<semester>/<group>/<category> to browse files."
            </p>
        </div>
    }
}

/// The files panel for the group named by the current route.
#[component]
pub fn FilesPanel(config: PanelConfig) -> impl IntoView {
    let params = use_params_map();
    let route = create_memo(move |_| params.with(route_params));
    let header = create_memo(move |_| route.with(RouteParams::header));

    let state: Panel = create_rw_signal(
        PanelState::new(config.access(), FileHost::new(&config.file_host), viewport_width())
            .with_name_order(locale_name_order),
    );
    let api = store_value(ApiClient::new(&config));

    // Fetch whenever the selection changes
    create_effect(move |_| {
        let params = route.get();
        let Some(ticket) = state.try_update(|s| s.begin_fetch(&params)).flatten() else {
            return;
        };
        let client = api.get_value();
        spawn_local(async move {
            let result = client.fetch_files(&ticket.request).await;
            apply(state, "fetch", move |s| s.complete_fetch(ticket, result));
        });
    });

    let resize = window_event_listener(ev::resize, move |_| {
        state.try_update(|s| s.set_viewport_width(viewport_width()));
    });
    on_cleanup(move || resize.remove());

    let list = create_memo(move |_| state.with(PanelState::list_view));
    let layout = create_memo(move |_| state.with(PanelState::layout));

    view! {
        <Title text=move || header.with(PathHeader::title) />
        <div class="navigations">
            <div class="files-display">
                <PathBar header=header />
                {move || match list.get() {
                    ListView::Loading => view! { <p class="placeholder">"Loading..."</p> }.into_view(),
                    ListView::Empty => view! {
                        <p class="placeholder">"No files available for this semester."</p>
                    }.into_view(),
                    ListView::Files(rows) => match layout.get() {
                        Layout::Tabular => view! { <FilesTable rows=rows state=state api=api /> }.into_view(),
                        Layout::Stacked => view! { <FilesList rows=rows state=state api=api /> }.into_view(),
                    },
                }}
                <NoticeLine state=state />
                <Show when=move || state.with(PanelState::show_upload_controls)>
                    <UploadControls state=state api=api />
                </Show>
            </div>
        </div>
        <PreviewOverlay
            open=Signal::derive(move || state.with(PanelState::preview_open))
            content_url=Signal::derive(move || state.with(|s| s.preview_url().unwrap_or_default()))
            on_close=move |_: ()| state.update(PanelState::close_preview)
        />
    }
}

#[component]
fn PathBar(header: Memo<PathHeader>) -> impl IntoView {
    view! {
        <div class="path">
            <div class="regulation">{move || header.with(|h| h.regulation.clone())}</div>
            <div class="semester">{move || header.with(|h| h.semester.clone())}</div>
            <div class="group">{move || header.with(|h| h.short_name.clone())}</div>
            <div class="category" title=move || header.with(|h| h.category_label.clone())>
                {move || header.with(|h| h.category_code.clone())}
            </div>
        </div>
    }
}

#[component]
fn FilesTable(rows: Vec<FileRow>, state: Panel, api: StoredValue<ApiClient>) -> impl IntoView {
    let admin = state.with_untracked(|s| s.access().is_admin());
    view! {
        <div class="files-table-wrapper">
            <table class="files-table">
                <thead>
                    <tr>
                        <th>"File Name"</th>
                        <th>"Download"</th>
                        <th>"View"</th>
                        {admin.then(|| view! { <th>"Delete"</th> })}
                    </tr>
                </thead>
                <tbody>
                    {rows
                        .into_iter()
                        .map(|row| view! { <FileTableRow row=row state=state api=api /> })
                        .collect_view()}
                </tbody>
            </table>
        </div>
    }
}

#[component]
fn FileTableRow(row: FileRow, state: Panel, api: StoredValue<ApiClient>) -> impl IntoView {
    let FileRow { id, name, download_url, deletable } = row;
    let view_id = id.clone();
    view! {
        <tr>
            <td>{name}</td>
            <td class="operations">
                <DownloadLink href=download_url />
            </td>
            <td class="operations">
                <button class="view" on:click=move |_| view_file(state, &view_id)>"View"</button>
            </td>
            {deletable.then(|| view! {
                <td class="operations">
                    <DeleteButton id=id state=state api=api />
                </td>
            })}
        </tr>
    }
}

#[component]
fn FilesList(rows: Vec<FileRow>, state: Panel, api: StoredValue<ApiClient>) -> impl IntoView {
    view! {
        <div class="files-list-wrapper">
            {rows
                .into_iter()
                .map(|row| {
                    let FileRow { id, name, download_url, deletable } = row;
                    let view_id = id.clone();
                    view! {
                        <div class="file-container">
                            <div class="file-name">{name}</div>
                            <div class="buttons">
                                <DownloadLink href=download_url />
                                <button class="view" on:click=move |_| view_file(state, &view_id)>
                                    "View"
                                </button>
                                {deletable.then(|| view! { <DeleteButton id=id state=state api=api /> })}
                            </div>
                        </div>
                    }
                })
                .collect_view()}
        </div>
    }
}

#[component]
fn DownloadLink(href: String) -> impl IntoView {
    view! {
        <a href=href rel="noopener noreferrer">
            <button class="download">"Download"</button>
        </a>
    }
}

#[component]
fn DeleteButton(id: String, state: Panel, api: StoredValue<ApiClient>) -> impl IntoView {
    view! {
        <button class="delete" on:click=move |_| delete_file(state, api, id.clone())>
            "Delete"
        </button>
    }
}

#[component]
fn NoticeLine(state: Panel) -> impl IntoView {
    let notice = create_memo(move |_| state.with(|s| s.notice().map(str::to_string)));
    view! {
        <Show when=move || notice.with(Option::is_some)>
            <p class="notice">{move || notice.get().unwrap_or_default()}</p>
        </Show>
    }
}

#[component]
fn UploadControls(state: Panel, api: StoredValue<ApiClient>) -> impl IntoView {
    let file_input_ref = create_node_ref::<html::Input>();

    let on_file_change = move |_ev: Event| {
        let picked = file_input_ref
            .get_untracked()
            .and_then(|input| input.files())
            .and_then(|files| FileList::from(files).first().cloned());
        state.update(|s| s.stage_upload(picked));
    };

    let on_upload_click = move |_| {
        let ticket = match state.try_update(PanelState::begin_upload) {
            Some(Ok(ticket)) => ticket,
            _ => return,
        };
        let client = api.get_value();
        spawn_local(async move {
            let result = client.upload_file(&ticket).await;
            if apply(state, "upload", move |s| s.complete_upload(ticket, result)) {
                if let Some(input) = file_input_ref.get_untracked() {
                    input.set_value("");
                }
            }
        });
    };

    view! {
        <div class="upload-controls">
            <input
                type="file"
                class="input-container"
                ref=file_input_ref
                on:change=on_file_change
            />
            <button
                type="button"
                class="upload"
                disabled=move || state.with(PanelState::uploading)
                on:click=on_upload_click
            >
                "Upload"
            </button>
            <Show when=move || state.with(PanelState::uploading)>
                <p class="uploading">"Uploading..."</p>
            </Show>
        </div>
    }
}

/// Modal showing a hosted preview of one file.
#[component]
pub fn PreviewOverlay(
    #[prop(into)] open: Signal<bool>,
    #[prop(into)] content_url: Signal<String>,
    #[prop(into)] on_close: Callback<()>,
) -> impl IntoView {
    let escape = window_event_listener(ev::keydown, move |ev| {
        if ev.key() == "Escape" && open.get_untracked() {
            on_close.call(());
        }
    });
    on_cleanup(move || escape.remove());

    view! {
        <Show when=move || open.get()>
            <div class="modal-backdrop" on:click=move |_| on_close.call(())>
                <div class="modal-content" on:click=|ev| ev.stop_propagation()>
                    <button type="button" class="modal-close" on:click=move |_| on_close.call(())>
                        "Close"
                    </button>
                    <iframe
                        class="modal-frame"
                        title="File preview"
                        allow="autoplay"
                        src=move || content_url.get()
                    ></iframe>
                </div>
            </div>
        </Show>
    }
}

fn view_file(state: Panel, id: &str) {
    state.update(|s| s.open_preview(id));
}

fn delete_file(state: Panel, api: StoredValue<ApiClient>, id: String) {
    let ticket = match state.with_untracked(|s| s.begin_delete(&id)) {
        Ok(ticket) => ticket,
        Err(_) => return,
    };
    let client = api.get_value();
    spawn_local(async move {
        let result = client.delete_file(&ticket.id).await;
        apply(state, "delete", move |s| s.complete_delete(ticket, result));
    });
}

/// Applies a completion unless the panel has been disposed in the meantime.
/// Returns whether the panel was still alive.
fn apply(
    state: Panel,
    operation: &str,
    complete: impl FnOnce(&mut PanelState<File>) -> Completion,
) -> bool {
    match state.try_update(complete) {
        Some(outcome) => {
            log::debug!("{operation} completed: {outcome:?}");
            true
        }
        None => {
            log::debug!("Panel disposed before {operation} completed, dropping result");
            false
        }
    }
}

// The router has already percent-decoded each segment.
fn route_params(map: &ParamsMap) -> RouteParams {
    RouteParams::from_lookup(|key| map.get(key).cloned())
}

fn viewport_width() -> u32 {
    window()
        .inner_width()
        .ok()
        .and_then(|width| width.as_f64())
        .map(|width| width.max(0.0) as u32)
        .unwrap_or(LAYOUT_BREAKPOINT)
}

fn locale_name_order(a: &str, b: &str) -> Ordering {
    js_sys::JsString::from(a)
        .locale_compare(b, &js_sys::Array::new(), &js_sys::Object::new())
        .cmp(&0)
}

/// Client for the document store.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: PanelConfig,
}

impl ApiClient {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub async fn fetch_files(&self, request: &FetchRequest) -> Result<Option<Vec<FileEntry>>, PanelError> {
        let response = Request::post(&self.config.endpoint("fetchdata"))
            .json(request)
            .map_err(request_error)?
            .send()
            .await
            .map_err(request_error)?;

        let body = read_body(response).await?;
        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(body)?))
    }

    pub async fn delete_file(&self, id: &str) -> Result<String, PanelError> {
        let id = String::from(js_sys::encode_uri_component(id));
        let response = Request::delete(&self.config.endpoint(&format!("delete/{id}")))
            .send()
            .await
            .map_err(request_error)?;

        let body = read_body(response).await?;
        Ok(serde_json::from_str::<DeleteResponse>(&body)
            .map(|r| r.message)
            .unwrap_or(body))
    }

    pub async fn upload_file(&self, ticket: &UploadTicket<File>) -> Result<UploadResponse, PanelError> {
        let form_data = FormData::new().map_err(form_error)?;
        form_data
            .append_with_blob("file", &ticket.file.as_ref())
            .map_err(form_error)?;
        form_data
            .append_with_str("category", ticket.category())
            .map_err(form_error)?;
        form_data
            .append_with_str("fileName", ticket.group_name())
            .map_err(form_error)?;

        let response = Request::post(&self.config.endpoint("upload"))
            .body(form_data)
            .map_err(request_error)?
            .send()
            .await
            .map_err(request_error)?;

        let body = read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

async fn read_body(response: Response) -> Result<String, PanelError> {
    let status = response.status();
    let ok = response.ok();
    let body = response.text().await.map_err(request_error)?;
    if ok {
        Ok(body)
    } else {
        Err(PanelError::Status { status, body })
    }
}

fn request_error(err: gloo_net::Error) -> PanelError {
    PanelError::Request(err.to_string())
}

fn form_error(err: JsValue) -> PanelError {
    PanelError::Form(format!("{err:?}"))
}

async fn load_config() -> PanelConfig {
    match Request::get("/config").send().await {
        Ok(response) if response.ok() => match response.json::<PanelConfig>().await {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to parse /config, using defaults: {e}");
                PanelConfig::default()
            }
        },
        Ok(response) => {
            log::warn!("/config returned status {}, using defaults", response.status());
            PanelConfig::default()
        }
        Err(e) => {
            log::warn!("Failed to load /config, using defaults: {e}");
            PanelConfig::default()
        }
    }
}

/// Forwards `log` records to the browser console.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            log::Level::Info => web_sys::console::info_1(&line),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn init_console_logger() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }
}

#[wasm_bindgen]
pub fn run() {
    console_error_panic_hook::set_once();
    init_console_logger();
    mount_to_body(|| view! { <App /> });
}

const MAIN_STYLES: &str = r#"
body {
    font-family: "DM Mono", monospace;
    background-color: #1e1e2e;
    color: #cdd6f4;
    margin: 0;
    padding: 20px;
}

.navigations {
    height: fit-content;
    min-height: 70%;
    display: flex;
    flex-direction: column;
    align-items: center;
}

.files-display {
    width: 100%;
    max-width: 900px;
}

.path {
    display: flex;
    flex-wrap: wrap;
    gap: 10px;
    margin-bottom: 20px;
}

.path > div {
    border: 2px solid #45475a;
    padding: 6px 12px;
}

.path .category {
    border-color: #cba6f7;
}

.placeholder {
    color: #bac2de;
    text-align: center;
}

.notice {
    color: #f38ba8;
    font-size: 14px;
    text-align: center;
}

.files-table {
    width: 100%;
    border-collapse: collapse;
}

.files-table th,
.files-table td {
    border-bottom: 1px solid #45475a;
    padding: 10px;
    text-align: left;
}

.operations {
    text-align: center;
}

.file-container {
    border: 2px solid #45475a;
    padding: 12px;
    margin: 10px 0;
}

.file-name {
    word-break: break-word;
    margin-bottom: 10px;
}

.buttons {
    display: flex;
    gap: 10px;
    flex-wrap: wrap;
}

button {
    background-color: #1e1e2e;
    border: 2px solid #45475a;
    color: #cdd6f4;
    padding: 8px 14px;
    cursor: pointer;
    font-family: "DM Mono", monospace;
    transition: border-color 0.2s ease-out;
}

button.download:hover {
    border-color: #a6e3a1;
}

button.view:hover {
    border-color: #89b4fa;
}

button.delete:hover {
    border-color: #f38ba8;
}

button:disabled {
    border-color: #313244;
    color: #6c7086;
    cursor: not-allowed;
}

.upload-controls {
    display: flex;
    flex-direction: column;
    align-items: center;
    width: 100%;
    gap: 10px;
    margin-top: 20px;
}

.uploading {
    color: #f9e2af;
}

.modal-backdrop {
    position: fixed;
    inset: 0;
    background-color: rgba(17, 17, 27, 0.85);
    display: flex;
    align-items: center;
    justify-content: center;
    z-index: 10;
}

.modal-content {
    position: relative;
    width: 90vw;
    height: 85vh;
    max-width: 1000px;
    background-color: #1e1e2e;
    border: 2px solid #45475a;
    display: flex;
    flex-direction: column;
}

.modal-close {
    align-self: flex-end;
    margin: 8px;
}

.modal-frame {
    flex: 1;
    border: none;
    width: 100%;
}
"#;

#[component]
fn StyleProvider() -> impl IntoView {
    view! {
        <style>{MAIN_STYLES}</style>
    }
}
