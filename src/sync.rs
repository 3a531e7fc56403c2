// src/sync.rs
//! In-memory views over the holdings and dashboard resources.
//!
//! Mutations update the local cache from the server's answer instead of
//! refetching the whole list.

use crate::api::ApiClient;
use crate::error::Result;
use crate::models::{Dashboard, Holding, HoldingCreate, HoldingUpdate};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Raises an in-flight flag for as long as it lives, so the flag drops back
/// even when the request errors or the future is cancelled.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        InFlight(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// At most one entry per symbol: any existing entry for the same symbol is
/// dropped and the new one appended.
pub fn upsert_by_symbol(cache: &mut Vec<Holding>, holding: Holding) {
    cache.retain(|h| h.symbol != holding.symbol);
    cache.push(holding);
}

/// Replaces the entry with the same id, keeping its position.
pub fn replace_by_id(cache: &mut [Holding], holding: Holding) -> bool {
    match cache.iter_mut().find(|h| h.id == holding.id) {
        Some(slot) => {
            *slot = holding;
            true
        }
        None => false,
    }
}

pub fn remove_by_id(cache: &mut Vec<Holding>, id: &str) -> bool {
    let before = cache.len();
    cache.retain(|h| h.id != id);
    cache.len() != before
}

#[derive(Default)]
struct HoldingsState {
    holdings: Vec<Holding>,
    last_error: Option<String>,
}

pub struct HoldingsSync {
    api: ApiClient,
    state: Mutex<HoldingsState>,
    loading: AtomicBool,
    submitting: AtomicBool,
}

impl HoldingsSync {
    pub fn new(api: ApiClient) -> Self {
        HoldingsSync {
            api,
            state: Mutex::new(HoldingsState::default()),
            loading: AtomicBool::new(false),
            submitting: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, HoldingsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn holdings(&self) -> Vec<Holding> {
        self.state().holdings.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    /// Replaces the cache with the server's list.
    pub async fn refetch(&self) -> Result<Vec<Holding>> {
        let _loading = InFlight::start(&self.loading);
        self.state().last_error = None;
        match self.api.list_holdings().await {
            Ok(holdings) => {
                self.state().holdings = holdings.clone();
                Ok(holdings)
            }
            Err(e) => {
                warn!("Failed to load holdings: {}", e);
                self.state().last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn add(&self, holding: HoldingCreate) -> Result<Holding> {
        let _submitting = InFlight::start(&self.submitting);
        let created = self.api.create_holding(&holding).await?;
        upsert_by_symbol(&mut self.state().holdings, created.clone());
        Ok(created)
    }

    pub async fn edit(&self, id: &str, update: HoldingUpdate) -> Result<Holding> {
        let _submitting = InFlight::start(&self.submitting);
        let updated = self.api.update_holding(id, &update).await?;
        if !replace_by_id(&mut self.state().holdings, updated.clone()) {
            info!("Updated holding {} was not cached", id);
        }
        Ok(updated)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let _submitting = InFlight::start(&self.submitting);
        self.api.delete_holding(id).await?;
        remove_by_id(&mut self.state().holdings, id);
        Ok(())
    }
}

/// What a dashboard screen should render.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    Loading,
    /// The account has no holdings yet.
    Empty,
    Failed(String),
    Ready(Dashboard),
}

pub struct DashboardSync {
    api: ApiClient,
    view: Mutex<Option<DashboardView>>,
    loading: AtomicBool,
}

impl DashboardSync {
    pub fn new(api: ApiClient) -> Self {
        DashboardSync {
            api,
            view: Mutex::new(None),
            loading: AtomicBool::new(false),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn view(&self) -> DashboardView {
        if self.is_loading() {
            return DashboardView::Loading;
        }
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or(DashboardView::Loading)
    }

    /// Fetches a fresh aggregate. The previous one is replaced wholesale.
    pub async fn refetch(&self) -> Result<Dashboard> {
        let _loading = InFlight::start(&self.loading);
        let result = self.api.get_dashboard().await;
        let view = match &result {
            Ok(dashboard) => DashboardView::Ready(dashboard.clone()),
            Err(e) if e.is_empty_portfolio() => DashboardView::Empty,
            Err(e) => DashboardView::Failed(e.to_string()),
        };
        *self.view.lock().unwrap_or_else(PoisonError::into_inner) = Some(view);
        result
    }
}
