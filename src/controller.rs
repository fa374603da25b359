use crate::directory::Directory;
use crate::error::DiscoveryError;
use crate::facets::{load_catalog, CatalogLoad, FacetCatalog};
use crate::models::{FacetKind, FilterSelection, SortKey, Station};
use crate::pagination::{page_view, PageView};
use crate::query::{build_query, SearchQuery};
use crate::refine::refine;
use crate::validity::retain_playable;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Snapshot published to the rendering layer after every mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryState {
    pub facets: FacetCatalog,
    pub selection: FilterSelection,
    pub loading_metadata: bool,
    pub loading_results: bool,
    /// Outcome of the latest search; cleared when a response is accepted.
    pub error: Option<DiscoveryError>,
    /// Facet catalog failure. Survives search outcomes until the next filter change.
    pub metadata_error: Option<DiscoveryError>,
    /// Last accepted, validated search response.
    pub results: Vec<Station>,
    /// `results` narrowed by the selection's term.
    pub displayed: Vec<Station>,
    pub page: PageView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status<'a> {
    Failed(&'a DiscoveryError),
    Searching,
    NoResults,
    Results,
}

impl DiscoveryState {
    /// Summary of the search side. A catalog failure is reported separately
    /// through `metadata_error`.
    pub fn status(&self) -> Status<'_> {
        if let Some(e) = &self.error {
            Status::Failed(e)
        } else if self.loading_results {
            Status::Searching
        } else if self.displayed.is_empty() {
            Status::NoResults
        } else {
            Status::Results
        }
    }
}

/// A search the controller wants issued. Only the response carrying the
/// latest `seq` is ever applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub seq: u64,
    pub query: SearchQuery,
}

/// Discovery state machine without any I/O. Every mutator that changes a
/// server-relevant filter hands back the request to issue.
#[derive(Debug)]
pub struct Discovery {
    state: DiscoveryState,
    page: usize,
    expected_seq: u64,
}

impl Discovery {
    pub fn new(selection: FilterSelection) -> Self {
        let mut discovery = Self {
            state: DiscoveryState {
                selection,
                ..DiscoveryState::default()
            },
            page: 1,
            expected_seq: 0,
        };
        discovery.rederive();
        discovery
    }

    pub fn state(&self) -> &DiscoveryState {
        &self.state
    }

    /// Marks the catalog as loading and returns the initial search.
    pub fn start(&mut self) -> SearchRequest {
        self.state.loading_metadata = true;
        self.issue()
    }

    pub fn set_facet(&mut self, kind: FacetKind, value: &str) -> Option<SearchRequest> {
        if !self.state.selection.set_facet(kind, value) {
            return None;
        }
        if let Some(v) = self.state.selection.facet(kind) {
            let vocab = self.state.facets.get(kind);
            if !self.state.loading_metadata && !vocab.values().is_empty() && !vocab.contains(v) {
                debug!(facet = %kind, value = v, "selected value not in loaded vocabulary");
            }
        }
        Some(self.issue())
    }

    pub fn set_sort(&mut self, sort: SortKey) -> Option<SearchRequest> {
        if self.state.selection.sort == sort {
            return None;
        }
        self.state.selection.sort = sort;
        Some(self.issue())
    }

    /// Changes the client-side refinement only; never produces a request.
    pub fn set_term(&mut self, term: &str) -> bool {
        if self.state.selection.term == term {
            return false;
        }
        self.state.selection.term = term.to_string();
        self.page = 1;
        self.rederive();
        true
    }

    pub fn next_page(&mut self) -> bool {
        if !self.state.page.has_next() {
            return false;
        }
        self.page += 1;
        self.state.page = page_view(&self.state.displayed, self.page);
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if !self.state.page.has_prev() {
            return false;
        }
        self.page -= 1;
        self.state.page = page_view(&self.state.displayed, self.page);
        true
    }

    /// Station at `index` on the visible page.
    pub fn chosen(&self, index: usize) -> Option<&Station> {
        self.state.page.entries.get(index)
    }

    pub fn catalog_loaded(&mut self, load: CatalogLoad) {
        self.state.loading_metadata = false;
        if !load.is_complete() {
            let reason = load
                .failures
                .iter()
                .map(|(kind, e)| format!("{kind}: {e:#}"))
                .collect::<Vec<_>>()
                .join("; ");
            self.state.metadata_error = Some(DiscoveryError::metadata(reason));
        }
        self.state.facets = load.catalog;
    }

    /// Applies a search outcome. Returns false when the response was stale
    /// and nothing changed.
    pub fn search_finished(&mut self, seq: u64, res: Result<Vec<Station>>) -> bool {
        if seq != self.expected_seq {
            debug!(seq, expected = self.expected_seq, "discarding stale search response");
            return false;
        }
        self.state.loading_results = false;
        match res {
            Ok(raw) => {
                let raw_count = raw.len();
                self.state.results = retain_playable(raw);
                self.state.error = None;
                info!(
                    seq,
                    count = self.state.results.len(),
                    dropped = raw_count - self.state.results.len(),
                    "search accepted"
                );
            }
            Err(e) => {
                warn!(seq, error = ?e, "search failed");
                self.state.results.clear();
                self.state.error = Some(DiscoveryError::search(&e));
            }
        }
        self.page = 1;
        self.rederive();
        true
    }

    fn issue(&mut self) -> SearchRequest {
        self.expected_seq += 1;
        self.state.loading_results = true;
        self.state.error = None;
        self.state.metadata_error = None;
        SearchRequest {
            seq: self.expected_seq,
            query: build_query(&self.state.selection),
        }
    }

    fn rederive(&mut self) {
        self.state.displayed = refine(&self.state.results, &self.state.selection.term);
        self.state.page = page_view(&self.state.displayed, self.page);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    SetCountry(String),
    SetLanguage(String),
    SetTag(String),
    SetTerm(String),
    SetSort(SortKey),
    NextPage,
    PrevPage,
    /// Index into the visible page.
    Choose(usize),
    Shutdown,
}

pub struct ControllerHandle {
    pub cmd_tx: mpsc::UnboundedSender<UiCommand>,
    pub state_rx: watch::Receiver<DiscoveryState>,
    task: Option<JoinHandle<()>>,
}

impl ControllerHandle {
    pub fn send(&self, cmd: UiCommand) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| anyhow!("discovery controller is not running"))
    }

    /// Asks the controller to stop and waits for it.
    pub async fn shutdown(mut self) {
        let _ = self.cmd_tx.send(UiCommand::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(UiCommand::Shutdown);
    }
}

/// Starts the controller on the current tokio runtime. `sink` receives every
/// station the user chooses.
pub fn spawn_controller<D, F>(directory: Arc<D>, selection: FilterSelection, sink: F) -> ControllerHandle
where
    D: Directory + 'static,
    F: FnMut(Station) + Send + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let discovery = Discovery::new(selection);
    let (state_tx, state_rx) = watch::channel(discovery.state().clone());

    let task = tokio::spawn(controller_main(directory, discovery, sink, cmd_rx, state_tx));

    ControllerHandle {
        cmd_tx,
        state_rx,
        task: Some(task),
    }
}

#[derive(Debug)]
enum InternalMsg {
    CatalogDone(CatalogLoad),
    SearchDone { seq: u64, res: Result<Vec<Station>> },
}

async fn controller_main<D, F>(
    directory: Arc<D>,
    mut discovery: Discovery,
    mut sink: F,
    mut cmd_rx: mpsc::UnboundedReceiver<UiCommand>,
    state_tx: watch::Sender<DiscoveryState>,
) where
    D: Directory + 'static,
    F: FnMut(Station) + Send + 'static,
{
    let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<InternalMsg>();

    {
        let directory = directory.clone();
        let tx = internal_tx.clone();
        tokio::spawn(async move {
            let load = load_catalog(directory.as_ref()).await;
            let _ = tx.send(InternalMsg::CatalogDone(load));
        });
    }
    let first = discovery.start();
    spawn_search(&directory, &internal_tx, first);
    let _ = state_tx.send(discovery.state().clone());

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { return; };
                let request = match cmd {
                    UiCommand::SetCountry(v) => discovery.set_facet(FacetKind::Country, &v),
                    UiCommand::SetLanguage(v) => discovery.set_facet(FacetKind::Language, &v),
                    UiCommand::SetTag(v) => discovery.set_facet(FacetKind::Tag, &v),
                    UiCommand::SetSort(sort) => discovery.set_sort(sort),
                    UiCommand::SetTerm(term) => {
                        if !discovery.set_term(&term) {
                            continue;
                        }
                        None
                    }
                    UiCommand::NextPage => {
                        if !discovery.next_page() {
                            continue;
                        }
                        None
                    }
                    UiCommand::PrevPage => {
                        if !discovery.prev_page() {
                            continue;
                        }
                        None
                    }
                    UiCommand::Choose(index) => {
                        match discovery.chosen(index).cloned() {
                            Some(station) => {
                                info!(stationuuid = %station.stationuuid, "station chosen");
                                sink(station);
                            }
                            None => debug!(index, "choice outside visible page"),
                        }
                        continue;
                    }
                    UiCommand::Shutdown => return,
                };
                if let Some(request) = request {
                    spawn_search(&directory, &internal_tx, request);
                }
                let _ = state_tx.send(discovery.state().clone());
            }
            Some(msg) = internal_rx.recv() => {
                match msg {
                    InternalMsg::CatalogDone(load) => discovery.catalog_loaded(load),
                    InternalMsg::SearchDone { seq, res } => {
                        if !discovery.search_finished(seq, res) {
                            continue;
                        }
                    }
                }
                let _ = state_tx.send(discovery.state().clone());
            }
        }
    }
}

fn spawn_search<D: Directory + 'static>(
    directory: &Arc<D>,
    tx: &mpsc::UnboundedSender<InternalMsg>,
    request: SearchRequest,
) {
    debug!(seq = request.seq, query = ?request.query, "issuing search");
    let directory = directory.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let res = directory.search(&request.query).await;
        let _ = tx.send(InternalMsg::SearchDone { seq: request.seq, res });
    });
}
